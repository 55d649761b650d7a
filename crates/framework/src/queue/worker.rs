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

use std::{
	any::Any,
	panic::{self, AssertUnwindSafe},
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender, unbounded};
use tracing::{debug, error, info, warn};

use super::{Handler, QueueError, WorkerFailure};
use crate::observer::{FrameworkObserver, NoopObserver};

/// Storage policy of a delivery queue
pub(crate) trait Storage<T>: Send + Sync {
	/// Remove the next item to deliver, if any
	fn take(&self) -> Option<T>;

	fn len(&self) -> usize;
}

/// Counting signal: one `Available` per pending notification, plus a
/// sentinel that wakes a blocked worker on stop
pub(crate) enum Signal {
	Available,
	Shutdown,
}

/// Worker thread plumbing shared by both queue variants
pub(crate) struct QueueWorker {
	name: String,
	signal_tx: Sender<Signal>,
	signal_rx: Receiver<Signal>,
	running: Arc<AtomicBool>,
	stopped: AtomicBool,
	observer: Arc<dyn FrameworkObserver>,
	failures: Option<Sender<WorkerFailure>>,
	thread_handle: Option<JoinHandle<()>>,
}

impl QueueWorker {
	pub(crate) fn new(name: impl Into<String>) -> Self {
		let (signal_tx, signal_rx) = unbounded();
		Self {
			name: name.into(),
			signal_tx,
			signal_rx,
			running: Arc::new(AtomicBool::new(false)),
			stopped: AtomicBool::new(false),
			observer: Arc::new(NoopObserver),
			failures: None,
			thread_handle: None,
		}
	}

	pub(crate) fn name(&self) -> &str {
		&self.name
	}

	pub(crate) fn set_observer(&mut self, observer: Arc<dyn FrameworkObserver>) {
		self.observer = observer;
	}

	pub(crate) fn set_failure_sink(&mut self, failures: Sender<WorkerFailure>) {
		self.failures = Some(failures);
	}

	pub(crate) fn observer(&self) -> &dyn FrameworkObserver {
		self.observer.as_ref()
	}

	/// Release one unit of the counting signal
	pub(crate) fn notify(&self) {
		// The worker keeps the receiving end alive, so this cannot fail
		let _ = self.signal_tx.send(Signal::Available);
	}

	pub(crate) fn start<T, S>(
		&mut self,
		storage: Arc<S>,
		handler: Handler<T>,
	) -> Result<(), QueueError>
	where
		T: Send + 'static,
		S: Storage<T> + 'static,
	{
		if self.stopped.load(Ordering::Acquire) {
			return Err(QueueError::Stopped(self.name.clone()));
		}
		if self.thread_handle.is_some() {
			return Err(QueueError::AlreadyStarted(self.name.clone()));
		}

		self.running.store(true, Ordering::Release);

		let context = WorkerContext {
			queue: self.name.clone(),
			signals: self.signal_rx.clone(),
			running: self.running.clone(),
			observer: self.observer.clone(),
			failures: self.failures.clone(),
		};

		let handle = thread::Builder::new()
			.name(format!("{}-worker", self.name))
			.spawn(move || {
				info!(target: "queue", queue = %context.queue, "Queue worker started");
				run_worker_loop(&context, storage.as_ref(), handler);
				info!(target: "queue", queue = %context.queue, "Queue worker stopped");
			})
			.map_err(|source| {
				self.running.store(false, Ordering::Release);
				QueueError::Spawn {
					queue: self.name.clone(),
					source,
				}
			})?;

		self.thread_handle = Some(handle);
		Ok(())
	}

	pub(crate) fn stop(&self) {
		if self.stopped.swap(true, Ordering::AcqRel) {
			return;
		}
		self.running.store(false, Ordering::Release);
		let _ = self.signal_tx.send(Signal::Shutdown);
		debug!(target: "queue", queue = %self.name, "Queue stop requested");
	}

	pub(crate) fn join(&mut self) {
		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "queue", queue = %self.name, error = ?e, "Queue worker panicked");
		}
	}
}

impl Drop for QueueWorker {
	fn drop(&mut self) {
		self.stop();
		self.join();
	}
}

struct WorkerContext {
	queue: String,
	signals: Receiver<Signal>,
	running: Arc<AtomicBool>,
	observer: Arc<dyn FrameworkObserver>,
	failures: Option<Sender<WorkerFailure>>,
}

/// Main worker loop
///
/// This loop:
/// 1. Blocks until a signal arrives
/// 2. Exits on the shutdown sentinel or once the running flag is cleared
/// 3. Takes one item from storage (the lock is released before step 4)
/// 4. Invokes the handler; an error or panic terminates the worker
fn run_worker_loop<T, S>(context: &WorkerContext, storage: &S, mut handler: Handler<T>)
where
	S: Storage<T> + ?Sized,
{
	loop {
		match context.signals.recv() {
			Ok(Signal::Available) => {}
			Ok(Signal::Shutdown) | Err(_) => break,
		}

		if !context.running.load(Ordering::Acquire) {
			break;
		}

		// A signal can outlive its item when a latest-value add raced the take
		let Some(item) = storage.take() else {
			continue;
		};

		let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(item)));
		let error = match outcome {
			Ok(Ok(())) => {
				context.observer.on_delivered(&context.queue);
				continue;
			}
			Ok(Err(error)) => error,
			Err(payload) => anyhow::anyhow!("handler panicked: {}", panic_message(payload.as_ref())),
		};

		error!(
			target: "queue",
			queue = %context.queue,
			error = %format!("{:#}", error),
			"Handler failed, stopping worker"
		);
		context.observer.on_worker_failed(&context.queue, &error);
		context.running.store(false, Ordering::Release);

		if let Some(failures) = &context.failures {
			let _ = failures.send(WorkerFailure {
				queue: context.queue.clone(),
				error,
			});
		}
		break;
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}
