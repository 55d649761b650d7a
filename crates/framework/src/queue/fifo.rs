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

use std::{collections::VecDeque, sync::Arc};

use crossbeam::channel::Sender;
use parking_lot::Mutex;

use super::{
	DeliveryQueue, Handler, QueueError, WorkerFailure,
	worker::{QueueWorker, Storage},
};
use crate::observer::FrameworkObserver;

struct FifoStorage<T> {
	items: Mutex<VecDeque<T>>,
}

impl<T: Send> Storage<T> for FifoStorage<T> {
	fn take(&self) -> Option<T> {
		self.items.lock().pop_front()
	}

	fn len(&self) -> usize {
		self.items.lock().len()
	}
}

/// Unbounded queue delivering every item exactly once, in arrival order
///
/// Used for order events and transaction results, where every item
/// matters. Grows without bound if the handler falls behind.
pub struct FifoQueue<T> {
	storage: Arc<FifoStorage<T>>,
	worker: QueueWorker,
}

impl<T: Send + 'static> FifoQueue<T> {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			storage: Arc::new(FifoStorage {
				items: Mutex::new(VecDeque::new()),
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

impl<T: Send + 'static> DeliveryQueue<T> for FifoQueue<T> {
	fn name(&self) -> &str {
		self.worker.name()
	}

	fn add(&self, item: T) {
		self.storage.items.lock().push_back(item);
		self.worker.notify();
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
