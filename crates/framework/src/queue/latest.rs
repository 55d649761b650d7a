// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use crossbeam::channel::Sender;
use parking_lot::Mutex;

use super::{
	DeliveryQueue, Handler, QueueError, WorkerFailure,
	worker::{QueueWorker, Storage},
};
use crate::observer::FrameworkObserver;

/// Single-slot storage; a newer item replaces an unconsumed one
struct LatestSlot<T> {
	slot: Mutex<Option<T>>,
}

impl<T: Send> Storage<T> for LatestSlot<T> {
	fn take(&self) -> Option<T> {
		self.slot.lock().take()
	}

	fn len(&self) -> usize {
		usize::from(self.slot.lock().is_some())
	}
}

/// Capacity-one queue that only ever delivers the newest item
///
/// Used for order-book snapshots, where a stale snapshot is worthless
/// once a newer one exists. The handler never sees the same item twice
/// and may skip intermediate items when it falls behind.
///
/// Availability is signalled only on the empty to non-empty transition;
/// overwriting an unconsumed item is silent apart from the observer's
/// `on_overwrite` hook.
pub struct LatestValueQueue<T> {
	storage: Arc<LatestSlot<T>>,
	worker: QueueWorker,
}

impl<T: Send + 'static> LatestValueQueue<T> {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			storage: Arc::new(LatestSlot {
				slot: Mutex::new(None),
			}),
			worker: QueueWorker::new(name),
		}
	}

	pub fn with_observer(mut self, observer: Arc<dyn FrameworkObserver>) -> Self {
		self.worker.set_observer(observer);
		self
	}

	/// Report handler failures on `failures` in addition to logging them
	pub fn with_failure_sink(mut self, failures: Sender<WorkerFailure>) -> Self {
		self.worker.set_failure_sink(failures);
		self
	}
}

impl<T: Send + 'static> DeliveryQueue<T> for LatestValueQueue<T> {
	fn name(&self) -> &str {
		self.worker.name()
	}

	fn add(&self, item: T) {
		let was_empty = self.storage.slot.lock().replace(item).is_none();

		if was_empty {
			self.worker.notify();
		} else {
			self.worker.observer().on_overwrite(self.worker.name());
		}
	}

	fn start(&mut self, handler: Handler<T>) -> Result<(), QueueError> {
		self.worker.start(self.storage.clone(), handler)
	}

	fn stop(&self) {
		self.worker.stop();
	}

	fn join(&mut self) {
		self.worker.join();
	}

	fn pending(&self) -> usize {
		self.storage.len()
	}
}
