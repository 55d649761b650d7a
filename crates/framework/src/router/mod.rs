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

//! Event router and framework orchestrator
//!
//! The router owns the three delivery queues and the transaction
//! manager. Its loop pulls events off the ingress stream and forwards
//! each one to the queue for its kind:
//!
//! | event                | queue                | policy       |
//! |----------------------|----------------------|--------------|
//! | `OrderBook`          | `orderbook`          | latest value |
//! | `Order`              | `order`              | FIFO         |
//! | `TransactionResult`  | `transaction_result` | FIFO         |
//!
//! Threads: the router loop runs on the caller of [`Framework::start`],
//! each queue has one worker and the transaction manager has one drain
//! thread.

mod state;

use std::{sync::Arc, time::Duration};

use crossbeam::channel::{Receiver, Sender, bounded, unbounded};
use meridian_sdk::{
	Event, EventKind, OrderBookSnapshot, OrderEvent, Transaction, TransactionId, TransactionResult,
};
use meridian_settlement::{
	SubmissionError, SubmissionObserver, TransactionExecutor, TransactionManager,
	TransactionSubmitter,
};
use thiserror::Error;
use tracing::{error, info, warn};

pub use state::FrameworkState;
use state::AtomicState;

use crate::{
	config::FrameworkConfig,
	observer::{FrameworkObserver, TracingObserver},
	queue::{DeliveryQueue, FifoQueue, LatestValueQueue, QueueError, WorkerFailure},
	strategy::Strategy,
	stream::{EventReceiver, EventSender, EventStream},
};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors returned by [`Framework::start`]
#[derive(Debug, Error)]
pub enum FrameworkError {
	#[error("Framework cannot start from state {0:?}")]
	InvalidState(FrameworkState),
	#[error("Strategy startup hook failed: {0:#}")]
	Startup(anyhow::Error),
	#[error("Strategy shutdown hook failed: {0:#}")]
	Shutdown(anyhow::Error),
	#[error("Handler on {queue} queue failed: {error:#}")]
	HandlerFailed { queue: String, error: anyhow::Error },
	#[error(transparent)]
	Queue(#[from] QueueError),
	#[error(transparent)]
	Submission(#[from] SubmissionError),
}

/// State shared between the framework and its handles
struct Control {
	state: AtomicState,
	stop_tx: Sender<()>,
}

impl Control {
	fn request_stop(&self) {
		let previous = self.state.stop();
		if previous != FrameworkState::Stopped {
			// Capacity one: repeated requests collapse
			let _ = self.stop_tx.try_send(());
			info!(target: "router", ?previous, "Framework stop requested");
		}
	}
}

/// Cloneable handle to a framework, usable from strategies and other threads
#[derive(Clone)]
pub struct FrameworkHandle {
	control: Arc<Control>,
	submitter: TransactionSubmitter,
	events: EventSender,
}

impl FrameworkHandle {
	/// Queue a transaction for serialized execution
	///
	/// Returns the transaction's identifier immediately. Its result is
	/// delivered later through `Strategy::on_transaction_result`.
	pub fn submit_transaction(
		&self,
		executor: Arc<dyn TransactionExecutor>,
		transaction: Transaction,
	) -> Result<TransactionId, SubmissionError> {
		self.submitter.place_transaction(executor, transaction)
	}

	/// Stop the framework (best effort, queued items are not drained)
	pub fn stop(&self) {
		self.control.request_stop();
	}

	pub fn state(&self) -> FrameworkState {
		self.control.state.load()
	}

	/// Sender for pushing external events into the ingress stream
	pub fn event_sender(&self) -> EventSender {
		self.events.clone()
	}

	/// Transactions placed but not yet completed
	pub fn pending_transactions(&self) -> usize {
		self.submitter.backlog_len()
	}
}

/// Event-driven strategy runtime
///
/// Built from one [`EventStream`]; the transaction manager delivers its
/// results into that same stream.
pub struct Framework {
	sender: EventSender,
	receiver: EventReceiver,
	manager: TransactionManager,
	orderbooks: Box<dyn DeliveryQueue<OrderBookSnapshot>>,
	orders: Box<dyn DeliveryQueue<OrderEvent>>,
	results: Box<dyn DeliveryQueue<TransactionResult>>,
	failures: Receiver<WorkerFailure>,
	stop_rx: Receiver<()>,
	control: Arc<Control>,
	observer: Arc<dyn FrameworkObserver>,
}

impl Framework {
	/// Create a framework that logs through [`TracingObserver`]
	pub fn new(config: FrameworkConfig, stream: EventStream) -> Self {
		let observer = Arc::new(
			TracingObserver::new(config.verbose_logging)
				.with_settlement_verbosity(config.verbose_logging || config.settlement.verbose_logging),
		);
		Self::with_observer(config, stream, observer)
	}

	/// Create a framework reporting to `observer`
	pub fn with_observer<O>(config: FrameworkConfig, stream: EventStream, observer: Arc<O>) -> Self
	where
		O: FrameworkObserver + SubmissionObserver + 'static,
	{
		let (sender, receiver) = stream.split();
		let (failure_tx, failures) = unbounded();
		let (stop_tx, stop_rx) = bounded(1);

		let framework_observer: Arc<dyn FrameworkObserver> = observer.clone();
		let submission_observer: Arc<dyn SubmissionObserver> = observer;

		let manager = TransactionManager::with_observer(
			Arc::new(sender.clone()),
			config.settlement.clone(),
			submission_observer,
		);

		let orderbooks = LatestValueQueue::new(EventKind::OrderBook.as_str())
			.with_observer(framework_observer.clone())
			.with_failure_sink(failure_tx.clone());
		let orders = FifoQueue::new(EventKind::Order.as_str())
			.with_observer(framework_observer.clone())
			.with_failure_sink(failure_tx.clone());
		let results = FifoQueue::new(EventKind::TransactionResult.as_str())
			.with_observer(framework_observer.clone())
			.with_failure_sink(failure_tx);

		Self {
			sender,
			receiver,
			manager,
			orderbooks: Box::new(orderbooks),
			orders: Box::new(orders),
			results: Box::new(results),
			failures,
			stop_rx,
			control: Arc::new(Control {
				state: AtomicState::new(FrameworkState::Created),
				stop_tx,
			}),
			observer: framework_observer,
		}
	}

	pub fn handle(&self) -> FrameworkHandle {
		FrameworkHandle {
			control: self.control.clone(),
			submitter: self.manager.submitter(),
			events: self.sender.clone(),
		}
	}

	/// Sender for pushing external events into the ingress stream
	pub fn event_sender(&self) -> EventSender {
		self.sender.clone()
	}

	pub fn state(&self) -> FrameworkState {
		self.control.state.load()
	}

	/// Run the framework on the calling thread until it stops
	///
	/// Startup order:
	/// 1. Strategy startup hook
	/// 2. Transaction manager
	/// 3. Queue workers
	/// 4. Router loop
	///
	/// Returns `Ok(())` after a requested stop, or the first error:
	/// a failed startup hook, a handler failure, or a failed shutdown hook.
	pub fn start<S: Strategy>(mut self, strategy: Arc<S>) -> Result<(), FrameworkError> {
		if let Err(state) = self
			.control
			.state
			.transition(FrameworkState::Created, FrameworkState::Started)
		{
			return Err(FrameworkError::InvalidState(state));
		}
		info!(target: "router", "Starting framework");

		let outcome = match strategy.on_startup() {
			Ok(()) => self
				.start_components(&strategy)
				.and_then(|()| self.run_loop()),
			Err(e) => Err(FrameworkError::Startup(e)),
		};

		if let Err(e) = &outcome {
			error!(target: "router", error = %e, "Framework terminated with error");
		}

		let run_shutdown_hook = !matches!(outcome, Err(FrameworkError::Startup(_)));
		let shutdown = self.tear_down(strategy.as_ref(), run_shutdown_hook);

		outcome.and(shutdown)
	}

	fn start_components<S: Strategy>(&mut self, strategy: &Arc<S>) -> Result<(), FrameworkError> {
		self.manager.start()?;

		let on_orderbook = strategy.clone();
		self.orderbooks.start(Box::new(move |snapshot: OrderBookSnapshot| {
			on_orderbook.on_orderbook(snapshot)
		}))?;

		let on_order = strategy.clone();
		self.orders.start(Box::new(move |event: OrderEvent| {
			on_order.on_order(event)
		}))?;

		let on_result = strategy.clone();
		self.results.start(Box::new(move |result: TransactionResult| {
			on_result.on_transaction_result(result)
		}))?;

		Ok(())
	}

	/// Main router loop
	///
	/// Waits on three channels at once: ingress events, stop requests and
	/// worker failures. Events are classified by an exhaustive match, so
	/// every kind has exactly one queue.
	fn run_loop(&self) -> Result<(), FrameworkError> {
		if let Err(state) = self
			.control
			.state
			.transition(FrameworkState::Started, FrameworkState::Running)
		{
			info!(target: "router", ?state, "Stopped during startup");
			return Ok(());
		}
		info!(target: "router", "Framework running");

		let ingress = self.receiver.channel();
		loop {
			crossbeam::select! {
				recv(ingress) -> event => match event {
					Ok(event) => self.route(event),
					Err(_) => {
						warn!(target: "router", "Ingress stream disconnected");
						return Ok(());
					}
				},
				recv(self.stop_rx) -> _ => return Ok(()),
				recv(self.failures) -> failure => match failure {
					Ok(WorkerFailure { queue, error }) => {
						return Err(FrameworkError::HandlerFailed { queue, error });
					}
					Err(_) => return Ok(()),
				},
			}
		}
	}

	fn route(&self, event: Event) {
		let kind = event.kind();
		match event {
			Event::OrderBook(snapshot) => self.orderbooks.add(snapshot),
			Event::Order(order) => self.orders.add(order),
			Event::TransactionResult(result) => self.results.add(result),
		}
		self.observer.on_routed(kind);
	}

	/// Stop everything without draining
	fn tear_down<S: Strategy>(
		mut self,
		strategy: &S,
		run_shutdown_hook: bool,
	) -> Result<(), FrameworkError> {
		let previous = self.control.state.stop();
		info!(target: "router", ?previous, "Stopping framework");

		let hook = if run_shutdown_hook {
			strategy.on_shutdown().map_err(FrameworkError::Shutdown)
		} else {
			Ok(())
		};

		self.orderbooks.stop();
		self.orders.stop();
		self.results.stop();
		self.manager.stop();

		self.orderbooks.join();
		self.orders.join();
		self.results.join();

		// The drain thread may block on a full bounded stream until it
		// delivers its last result, so keep consuming while it finishes
		let mut dropped = 0;
		while !self.manager.is_finished() {
			if self.receiver.recv_timeout(DRAIN_POLL_INTERVAL).is_ok() {
				dropped += 1;
			}
		}
		self.manager.shutdown();

		dropped += self.receiver.len();
		if dropped > 0 {
			info!(target: "router", dropped, "Discarding unrouted events");
		}
		info!(target: "router", "Framework stopped");

		hook
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use anyhow::Result;
	use meridian_sdk::{BookLevel, Side};
	use parking_lot::Mutex;
	use rust_decimal_macros::dec;

	use super::*;

	const WAIT: Duration = Duration::from_secs(5);

	#[derive(Default)]
	struct Recorder {
		books: Mutex<Vec<u64>>,
		orders: Mutex<Vec<u64>>,
		fail_startup: bool,
		shutdown_calls: Mutex<u32>,
	}

	impl Strategy for Recorder {
		fn on_startup(&self) -> Result<()> {
			if self.fail_startup {
				anyhow::bail!("no node connection");
			}
			Ok(())
		}

		fn on_shutdown(&self) -> Result<()> {
			*self.shutdown_calls.lock() += 1;
			Ok(())
		}

		fn on_orderbook(&self, snapshot: OrderBookSnapshot) -> Result<()> {
			self.books.lock().push(snapshot.block_number);
			Ok(())
		}

		fn on_order(&self, event: OrderEvent) -> Result<()> {
			self.orders.lock().push(event.limit_order_id);
			Ok(())
		}

		fn on_transaction_result(&self, _result: TransactionResult) -> Result<()> {
			Ok(())
		}
	}

	fn snapshot(block_number: u64) -> OrderBookSnapshot {
		OrderBookSnapshot::new(
			"WETH/USDC",
			[BookLevel::new(dec!(1999), dec!(1))],
			[BookLevel::new(dec!(2001), dec!(1))],
			block_number,
		)
	}

	#[test]
	fn test_routes_each_kind_to_its_queue() {
		let framework = Framework::new(FrameworkConfig::default(), EventStream::unbounded());
		let handle = framework.handle();
		let strategy = Arc::new(Recorder::default());

		let runner = {
			let strategy = strategy.clone();
			std::thread::spawn(move || framework.start(strategy))
		};

		let events = handle.event_sender();
		events.send(snapshot(7)).unwrap();
		for id in 1..=3 {
			events
				.send(OrderEvent::limit(id, "0xA11CE", "WETH/USDC", Side::Buy, dec!(1999), dec!(1)))
				.unwrap();
		}

		let deadline = std::time::Instant::now() + WAIT;
		while (strategy.orders.lock().len() < 3 || strategy.books.lock().is_empty())
			&& std::time::Instant::now() < deadline
		{
			std::thread::sleep(Duration::from_millis(5));
		}
		assert_eq!(handle.state(), FrameworkState::Running);

		handle.stop();
		runner.join().unwrap().unwrap();

		assert_eq!(*strategy.books.lock(), vec![7]);
		assert_eq!(*strategy.orders.lock(), vec![1, 2, 3]);
		assert_eq!(*strategy.shutdown_calls.lock(), 1);
		assert_eq!(handle.state(), FrameworkState::Stopped);
	}

	#[test]
	fn test_stop_before_start_prevents_start() {
		let framework = Framework::new(FrameworkConfig::default(), EventStream::unbounded());
		framework.handle().stop();

		assert!(matches!(
			framework.start(Arc::new(Recorder::default())),
			Err(FrameworkError::InvalidState(FrameworkState::Stopped))
		));
	}

	#[test]
	fn test_startup_hook_failure_aborts_start() {
		let framework = Framework::new(FrameworkConfig::default(), EventStream::unbounded());
		let handle = framework.handle();
		let strategy = Arc::new(Recorder {
			fail_startup: true,
			..Default::default()
		});

		let result = framework.start(strategy.clone());

		assert!(matches!(result, Err(FrameworkError::Startup(_))));
		assert_eq!(*strategy.shutdown_calls.lock(), 0);
		assert_eq!(handle.state(), FrameworkState::Stopped);
	}
}
