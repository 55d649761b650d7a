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

//! Delivery queues between the router and the strategy callbacks
//!
//! Each queue owns one worker thread. The router adds items without
//! blocking; the worker waits for an availability signal, takes one item
//! according to the queue's policy and invokes the handler with no lock
//! held.
//!
//! Two policies are provided:
//! - [`LatestValueQueue`]: capacity one, newer items overwrite unconsumed ones
//! - [`FifoQueue`]: unbounded, strict arrival order, nothing is dropped

mod fifo;
mod latest;
mod worker;

pub use fifo::FifoQueue;
pub use latest::LatestValueQueue;

/// Callback invoked by a queue worker once per delivered item
///
/// Returning an error terminates the worker and is reported through the
/// queue's failure channel.
pub type Handler<T> = Box<dyn FnMut(T) -> anyhow::Result<()> + Send + 'static>;

/// Common contract of the delivery queue variants
pub trait DeliveryQueue<T: Send + 'static>: Send + Sync {
	/// Queue name used in logs and failure reports
	fn name(&self) -> &str;

	/// Hand an item to the queue (never blocks on the handler)
	fn add(&self, item: T);

	/// Spawn the worker thread and start delivering to `handler`
	fn start(&mut self, handler: Handler<T>) -> Result<(), QueueError>;

	/// Ask the worker to exit after its current item
	fn stop(&self);

	/// Wait for the worker thread to exit
	fn join(&mut self);

	/// Items added but not yet taken by the worker
	fn pending(&self) -> usize;
}

/// A handler failure reported by a terminated worker
#[derive(Debug)]
pub struct WorkerFailure {
	pub queue: String,
	pub error: anyhow::Error,
}

/// Errors that can occur when managing a delivery queue
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
	#[error("Queue {0} already started")]
	AlreadyStarted(String),
	#[error("Queue {0} is stopped")]
	Stopped(String),
	#[error("Failed to spawn worker for queue {queue}: {source}")]
	Spawn {
		queue: String,
		#[source]
		source: std::io::Error,
	},
}
