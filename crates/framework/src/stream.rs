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

use std::time::Duration;

use crossbeam::channel::{
	Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, unbounded,
};
use meridian_sdk::{Event, TransactionResult};
use meridian_settlement::{ResultSink, SinkError};

/// Ingress event stream feeding the router
///
/// The stream is the single entry point for everything the strategy
/// reacts to. Market-data feeds push order-book snapshots and order
/// events into it, and the transaction manager pushes completion
/// results back into it, so the router sees one totally ordered
/// sequence of events.
///
/// Properties:
/// - Multiple Producers (feeds, transaction manager)
/// - Single Consumer (router loop)
/// - Unbounded by default; a bounded stream blocks producers when full
///
/// A framework is built from exactly one stream. The transaction
/// manager is wired to that stream's sender at construction, so results
/// cannot end up on a channel the router never reads.
pub struct EventStream {
	sender: Sender<Event>,
	receiver: Receiver<Event>,
}

impl EventStream {
	/// Create an unbounded stream
	pub fn unbounded() -> Self {
		let (sender, receiver) = unbounded();
		Self { sender, receiver }
	}

	/// Create a stream that holds at most `capacity` undelivered events
	///
	/// Producers block while the stream is full. Only use this when every
	/// producer can tolerate blocking, since the transaction manager's
	/// drain thread is one of them.
	pub fn bounded(capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity);
		Self { sender, receiver }
	}

	/// Split the stream into sender and receiver ends
	///
	/// The sender can be cloned for every producer.
	/// The receiver must remain unique for the router loop.
	pub fn split(self) -> (EventSender, EventReceiver) {
		(
			EventSender {
				sender: self.sender,
			},
			EventReceiver {
				receiver: self.receiver,
			},
		)
	}
}

impl Default for EventStream {
	fn default() -> Self {
		Self::unbounded()
	}
}

/// Sender end of the event stream
///
/// This can be cloned and shared across multiple threads.
#[derive(Clone)]
pub struct EventSender {
	sender: Sender<Event>,
}

impl EventSender {
	/// Push an event onto the stream
	///
	/// Blocks only if the stream is bounded and full.
	pub fn send(&self, event: impl Into<Event>) -> Result<(), StreamError> {
		self.sender
			.send(event.into())
			.map_err(|_| StreamError::Disconnected)
	}

	/// Number of events waiting for the router
	pub fn len(&self) -> usize {
		self.sender.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sender.is_empty()
	}
}

impl ResultSink for EventSender {
	fn deliver(&self, result: TransactionResult) -> Result<(), SinkError> {
		self.sender
			.send(Event::TransactionResult(result))
			.map_err(|_| SinkError::Disconnected)
	}
}

/// Receiver end of the event stream (used by the router loop)
///
/// This should NOT be cloned - only one router should consume.
pub struct EventReceiver {
	receiver: Receiver<Event>,
}

impl EventReceiver {
	/// Receive the next event (blocking)
	pub fn recv(&self) -> Result<Event, StreamError> {
		self.receiver.recv().map_err(|_| StreamError::Disconnected)
	}

	/// Receive the next event, waiting at most `timeout`
	pub fn recv_timeout(&self, timeout: Duration) -> Result<Event, StreamError> {
		self.receiver.recv_timeout(timeout).map_err(|e| match e {
			RecvTimeoutError::Timeout => StreamError::Timeout,
			RecvTimeoutError::Disconnected => StreamError::Disconnected,
		})
	}

	/// Try to receive an event (non-blocking)
	pub fn try_recv(&self) -> Result<Event, StreamError> {
		self.receiver.try_recv().map_err(|e| match e {
			TryRecvError::Empty => StreamError::Empty,
			TryRecvError::Disconnected => StreamError::Disconnected,
		})
	}

	pub fn len(&self) -> usize {
		self.receiver.len()
	}

	pub fn is_empty(&self) -> bool {
		self.receiver.is_empty()
	}

	/// Raw channel for `select!` in the router loop
	pub(crate) fn channel(&self) -> &Receiver<Event> {
		&self.receiver
	}
}

/// Errors that can occur when interacting with the event stream
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
	#[error("Event stream is empty")]
	Empty,
	#[error("Timed out waiting for an event")]
	Timeout,
	#[error("Event stream disconnected")]
	Disconnected,
}
