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

//! Paper trading harness
//!
//! Everything needed to run a strategy end to end without a node:
//! - [`PaperExecutor`]: simulated node that confirms orders after a fixed
//!   latency, times out every n-th transaction and publishes the
//!   resulting order events back into the ingress stream
//! - [`SimulatedBookFeed`]: thread producing order-book snapshots
//! - [`PaperStrategy`]: quotes the best bid on every book update and
//!   gives up after [`MAX_CONSECUTIVE_FAILURES`] failed transactions

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
	},
	thread::{self, JoinHandle},
	time::Duration,
};

use anyhow::{Context, Result};
use crossbeam::channel::{RecvTimeoutError, Sender, bounded};
use meridian_sdk::{
	BookLevel, ExecutionError, OrderBookSnapshot, OrderEvent, OrderEventKind, Side, Transaction,
	TransactionReceipt, TransactionResult,
};
use meridian_settlement::{ExecutionResult, SubmissionError, TransactionExecutor};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
	config::PaperConfig,
	router::FrameworkHandle,
	strategy::Strategy,
	stream::EventSender,
	tracker::{OrderStateTracker, TrackerUpdate},
};

/// Failed transactions in a row after which the strategy gives up
pub const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Gas reported for every simulated transaction
const SIMULATED_GAS_USED: u64 = 120_000;

/// Gas limit attached to every paper order transaction
const ORDER_GAS_LIMIT: u64 = 150_000;

/// Address the simulated taker fills orders from
const SIMULATED_TAKER: &str = "0x00000000000000000000000000000000000face5";

/// Limit order carried in a paper transaction's payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperOrder {
	pub pair_name: String,
	pub side: Side,
	pub price: Decimal,
	pub size: Decimal,
}

impl PaperOrder {
	pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
		serde_json::to_vec(self)
	}

	pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
		serde_json::from_slice(data)
	}
}

/// Simulated node
///
/// Every confirmed order rests on the simulated book until the next
/// order is confirmed, at which point a taker fills it completely. With
/// an event sender attached, both the new order and the fill are
/// published as order events.
pub struct PaperExecutor {
	owner: String,
	latency: Duration,
	fail_every: u64,
	attempts: AtomicU64,
	next_order_id: AtomicU64,
	block_number: AtomicU64,
	resting: Mutex<Option<OrderEvent>>,
	events: Option<EventSender>,
}

impl PaperExecutor {
	pub fn new(owner: impl Into<String>, config: &PaperConfig) -> Self {
		Self {
			owner: owner.into(),
			latency: Duration::from_millis(config.executor_latency_ms),
			fail_every: config.fail_every,
			attempts: AtomicU64::new(0),
			next_order_id: AtomicU64::new(1),
			block_number: AtomicU64::new(0),
			resting: Mutex::new(None),
			events: None,
		}
	}

	/// Publish order events for confirmed orders on `events`
	pub fn with_event_sender(mut self, events: EventSender) -> Self {
		self.events = Some(events);
		self
	}

	fn publish(&self, order: PaperOrder, block_number: u64) {
		let id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
		let placed = OrderEvent::limit(
			id,
			self.owner.clone(),
			order.pair_name,
			order.side,
			order.price,
			order.size,
		)
		.at_block(block_number);

		let taken = self.resting.lock().replace(placed.clone()).map(|resting| {
			let size = resting.size;
			let mut taken = resting
				.with_kind(OrderEventKind::LimitTaken, size)
				.at_block(block_number);
			taken.market_order_owner = Some(SIMULATED_TAKER.to_string());
			taken
		});

		let Some(events) = &self.events else {
			return;
		};
		for event in taken.into_iter().chain([placed]) {
			if let Err(e) = events.send(event) {
				warn!(target: "paper", error = %e, "Failed to publish simulated order event");
			}
		}
	}
}

impl TransactionExecutor for PaperExecutor {
	fn execute(&self, transaction: &Transaction) -> ExecutionResult {
		let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
		thread::sleep(self.latency);

		if self.fail_every > 0 && attempt % self.fail_every == 0 {
			return Err(ExecutionError::Timeout(self.latency));
		}

		let order = PaperOrder::decode(&transaction.data)
			.map_err(|e| ExecutionError::Rejected(format!("invalid order payload: {}", e)))?;

		let block_number = self.block_number.fetch_add(1, Ordering::Relaxed) + 1;
		let receipt = TransactionReceipt {
			transaction_hash: format!("0x{}", hex::encode(Uuid::new_v4().as_bytes())),
			block_number,
			gas_used: SIMULATED_GAS_USED.min(transaction.gas),
			status: 1,
			effective_gas_price: transaction.max_fee_per_gas,
		};

		self.publish(order, block_number);
		Ok(receipt)
	}
}

/// Thread producing a snapshot of a simulated book at a fixed interval
///
/// The mid price walks a triangle wave around the configured start
/// price so strategies see the market move without any randomness.
pub struct SimulatedBookFeed {
	thread_handle: Option<JoinHandle<()>>,
	stop_tx: Sender<()>,
}

impl SimulatedBookFeed {
	/// Half-width of the simulated spread, in price units
	const HALF_SPREAD: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

	pub fn start(events: EventSender, config: &PaperConfig) -> std::io::Result<Self> {
		let (stop_tx, stop_rx) = bounded::<()>(1);
		let interval = Duration::from_millis(config.book_interval_ms);
		let config = config.clone();

		let thread_handle = thread::Builder::new()
			.name("book-feed".to_string())
			.spawn(move || {
				info!(target: "paper", pair = %config.pair_name, "Book feed started");
				let mut block_number = 0;
				loop {
					match stop_rx.recv_timeout(interval) {
						Err(RecvTimeoutError::Timeout) => {}
						Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
					}

					block_number += 1;
					let snapshot = Self::snapshot(&config, block_number);
					if events.send(snapshot).is_err() {
						warn!(target: "paper", "Ingress stream closed, stopping book feed");
						break;
					}
				}
				info!(target: "paper", "Book feed stopped");
			})?;

		Ok(Self {
			thread_handle: Some(thread_handle),
			stop_tx,
		})
	}

	/// Snapshot of the simulated book at `block_number`
	pub fn snapshot(config: &PaperConfig, block_number: u64) -> OrderBookSnapshot {
		let phase = (block_number % 20) as i64;
		let offset = Decimal::from((phase - 10).abs() - 5) * Self::HALF_SPREAD;
		let mid = config.start_price + offset;

		let level = |depth: u32, sign: Decimal| {
			let depth = Decimal::from(depth);
			BookLevel::new(mid + sign * Self::HALF_SPREAD * depth, config.order_size * depth)
		};
		let bids = (1..=3).map(|depth| level(depth, Decimal::NEGATIVE_ONE));
		let asks = (1..=3).map(|depth| level(depth, Decimal::ONE));

		OrderBookSnapshot::new(config.pair_name.clone(), bids, asks, block_number)
	}

	pub fn shutdown(mut self) {
		info!(target: "paper", "Shutting down book feed");
		let _ = self.stop_tx.try_send(());

		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "paper", error = ?e, "Book feed thread panicked");
		}
	}
}

impl Drop for SimulatedBookFeed {
	fn drop(&mut self) {
		let _ = self.stop_tx.try_send(());
		if let Some(handle) = self.thread_handle.take() {
			let _ = handle.join();
		}
	}
}

/// Strategy quoting the best bid of every book update
///
/// At most one transaction is outstanding at a time; book updates that
/// arrive while one is pending are skipped. Owned orders are followed
/// through an [`OrderStateTracker`].
pub struct PaperStrategy {
	handle: FrameworkHandle,
	executor: Arc<dyn TransactionExecutor>,
	tracker: Arc<OrderStateTracker>,
	order_size: Decimal,
	allowed_to_place: AtomicBool,
	consecutive_failures: AtomicU32,
}

impl PaperStrategy {
	pub fn new(
		handle: FrameworkHandle,
		executor: Arc<dyn TransactionExecutor>,
		tracker: Arc<OrderStateTracker>,
		order_size: Decimal,
	) -> Self {
		Self {
			handle,
			executor,
			tracker,
			order_size,
			allowed_to_place: AtomicBool::new(false),
			consecutive_failures: AtomicU32::new(0),
		}
	}

	pub fn tracker(&self) -> &OrderStateTracker {
		&self.tracker
	}

	pub fn consecutive_failures(&self) -> u32 {
		self.consecutive_failures.load(Ordering::Relaxed)
	}

	pub fn is_placing(&self) -> bool {
		self.allowed_to_place.load(Ordering::Relaxed)
	}
}

impl Strategy for PaperStrategy {
	fn on_startup(&self) -> Result<()> {
		self.allowed_to_place.store(true, Ordering::Relaxed);
		info!(target: "paper", owner = %self.tracker.owner(), "Paper strategy started");
		Ok(())
	}

	fn on_shutdown(&self) -> Result<()> {
		self.allowed_to_place.store(false, Ordering::Relaxed);
		info!(target: "paper", open_orders = self.tracker.len(), "Paper strategy shutting down");
		Ok(())
	}

	fn on_orderbook(&self, snapshot: OrderBookSnapshot) -> Result<()> {
		if !self.is_placing() {
			debug!(target: "paper", "Not currently allowed to place new orders");
			return Ok(());
		}
		if self.handle.pending_transactions() > 0 {
			return Ok(());
		}
		let Some(price) = snapshot.best_bid() else {
			return Ok(());
		};

		let order = PaperOrder {
			pair_name: snapshot.pair_name.clone(),
			side: Side::Buy,
			price,
			size: self.order_size,
		};
		let payload = order.encode().context("Failed to encode order")?;
		let transaction = Transaction::new(payload)
			.with_gas(ORDER_GAS_LIMIT)
			.for_pair(&snapshot.pair_name);

		match self.handle.submit_transaction(self.executor.clone(), transaction) {
			Ok(id) => {
				info!(
					target: "paper",
					tx_id = id,
					price = %price,
					block = snapshot.block_number,
					"Placing limit order"
				);
				Ok(())
			}
			// Shutdown raced the book update
			Err(SubmissionError::Stopped) => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	fn on_order(&self, event: OrderEvent) -> Result<()> {
		match self.tracker.apply(&event) {
			Ok(TrackerUpdate::Ignored) => {}
			Ok(TrackerUpdate::FullyFilled(order)) => {
				info!(target: "paper", order_id = order.id, price = %order.price, "Order fully filled");
			}
			Ok(update) => debug!(target: "paper", ?update, "Order state updated"),
			Err(e) => warn!(target: "paper", error = %e, "Inconsistent order event"),
		}
		Ok(())
	}

	fn on_transaction_result(&self, result: TransactionResult) -> Result<()> {
		if result.is_success() {
			self.consecutive_failures.store(0, Ordering::Relaxed);
			info!(target: "paper", tx_id = result.id, "Successful transaction");
			return Ok(());
		}

		let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
		warn!(
			target: "paper",
			tx_id = result.id,
			status = ?result.status,
			cause = ?result.cause,
			failures,
			"Failed transaction"
		);

		if failures >= MAX_CONSECUTIVE_FAILURES {
			self.allowed_to_place.store(false, Ordering::Relaxed);
			error!(target: "paper", failures, "Too many consecutive failures, giving up");
			anyhow::bail!(
				"Failed to place transactions {} times in a row, not placing any more orders",
				failures
			);
		}
		Ok(())
	}
}
