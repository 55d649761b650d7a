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

//! Observability hooks for the router, queues and transaction pipeline
//!
//! Components never log per-event records on their own; they notify
//! the observer they were built with. [`TracingObserver`] turns those
//! notifications into `tracing` records, [`ObserverCounters`] counts
//! them.

use std::{
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};

use meridian_sdk::{EventKind, TransactionId, TransactionResult};
use meridian_settlement::SubmissionObserver;
use tracing::{debug, error, trace};

/// Hooks invoked by the router and the queue workers
///
/// Every method has an empty default. Hooks run on the router thread
/// (`on_routed`), the adding thread (`on_overwrite`) or a worker thread
/// (`on_delivered`, `on_worker_failed`) and must return promptly.
pub trait FrameworkObserver: Send + Sync {
	/// An ingress event was forwarded to its queue
	fn on_routed(&self, _kind: EventKind) {}

	/// A latest-value queue replaced an unconsumed item
	fn on_overwrite(&self, _queue: &str) {}

	/// A handler returned successfully
	fn on_delivered(&self, _queue: &str) {}

	/// A handler failed and its worker terminated
	fn on_worker_failed(&self, _queue: &str, _error: &anyhow::Error) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FrameworkObserver for NoopObserver {}

impl SubmissionObserver for NoopObserver {}

/// Observer that emits `tracing` records
///
/// Per-event notifications are logged at `trace`; with the matching
/// verbose flag set they are promoted to `debug` so they show up under
/// the filter used while developing strategies. Failures always log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver {
	verbose: bool,
	verbose_settlement: bool,
}

impl TracingObserver {
	pub fn new(verbose: bool) -> Self {
		Self {
			verbose,
			verbose_settlement: verbose,
		}
	}

	/// Verbosity for the transaction pipeline records
	pub fn with_settlement_verbosity(mut self, verbose: bool) -> Self {
		self.verbose_settlement = verbose;
		self
	}
}

impl FrameworkObserver for TracingObserver {
	fn on_routed(&self, kind: EventKind) {
		if self.verbose {
			debug!(target: "router", kind = %kind, "Event routed");
		} else {
			trace!(target: "router", kind = %kind, "Event routed");
		}
	}

	fn on_overwrite(&self, queue: &str) {
		debug!(target: "queue", queue, "Unconsumed item overwritten");
	}

	fn on_delivered(&self, queue: &str) {
		trace!(target: "queue", queue, "Item delivered");
	}

	fn on_worker_failed(&self, queue: &str, error: &anyhow::Error) {
		error!(target: "queue", queue, error = %format!("{:#}", error), "Handler failed");
	}
}

impl SubmissionObserver for TracingObserver {
	fn on_placed(&self, id: TransactionId, backlog_len: usize) {
		if self.verbose_settlement {
			debug!(target: "settlement", tx_id = id, backlog = backlog_len, "Transaction placed");
		} else {
			trace!(target: "settlement", tx_id = id, backlog = backlog_len, "Transaction placed");
		}
	}

	fn on_executing(&self, id: TransactionId) {
		if self.verbose_settlement {
			debug!(target: "settlement", tx_id = id, "Executing transaction");
		} else {
			trace!(target: "settlement", tx_id = id, "Executing transaction");
		}
	}

	fn on_completed(&self, result: &TransactionResult, elapsed: Duration) {
		let elapsed_ms = elapsed.as_millis() as u64;
		if self.verbose_settlement {
			debug!(target: "settlement", tx_id = result.id, status = ?result.status, elapsed_ms, "Transaction completed");
		} else {
			trace!(target: "settlement", tx_id = result.id, status = ?result.status, elapsed_ms, "Transaction completed");
		}
	}

	fn on_abandoned(&self, ids: &[TransactionId]) {
		debug!(target: "settlement", count = ids.len(), "Transactions abandoned");
	}
}

/// Observer that counts notifications
///
/// Cheap enough to leave on in production and convenient in tests.
#[derive(Debug, Default)]
pub struct ObserverCounters {
	routed: AtomicU64,
	overwrites: AtomicU64,
	delivered: AtomicU64,
	worker_failures: AtomicU64,
	placed: AtomicU64,
	completed: AtomicU64,
	failed: AtomicU64,
	abandoned: AtomicU64,
}

/// Point-in-time copy of [`ObserverCounters`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
	pub routed: u64,
	pub overwrites: u64,
	pub delivered: u64,
	pub worker_failures: u64,
	pub placed: u64,
	pub completed: u64,
	pub failed: u64,
	pub abandoned: u64,
}

impl ObserverCounters {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn snapshot(&self) -> CounterSnapshot {
		CounterSnapshot {
			routed: self.routed.load(Ordering::Relaxed),
			overwrites: self.overwrites.load(Ordering::Relaxed),
			delivered: self.delivered.load(Ordering::Relaxed),
			worker_failures: self.worker_failures.load(Ordering::Relaxed),
			placed: self.placed.load(Ordering::Relaxed),
			completed: self.completed.load(Ordering::Relaxed),
			failed: self.failed.load(Ordering::Relaxed),
			abandoned: self.abandoned.load(Ordering::Relaxed),
		}
	}
}

impl FrameworkObserver for ObserverCounters {
	fn on_routed(&self, _kind: EventKind) {
		self.routed.fetch_add(1, Ordering::Relaxed);
	}

	fn on_overwrite(&self, _queue: &str) {
		self.overwrites.fetch_add(1, Ordering::Relaxed);
	}

	fn on_delivered(&self, _queue: &str) {
		self.delivered.fetch_add(1, Ordering::Relaxed);
	}

	fn on_worker_failed(&self, _queue: &str, _error: &anyhow::Error) {
		self.worker_failures.fetch_add(1, Ordering::Relaxed);
	}
}

impl SubmissionObserver for ObserverCounters {
	fn on_placed(&self, _id: TransactionId, _backlog_len: usize) {
		self.placed.fetch_add(1, Ordering::Relaxed);
	}

	fn on_completed(&self, result: &TransactionResult, _elapsed: Duration) {
		self.completed.fetch_add(1, Ordering::Relaxed);
		if !result.is_success() {
			self.failed.fetch_add(1, Ordering::Relaxed);
		}
	}

	fn on_abandoned(&self, ids: &[TransactionId]) {
		self.abandoned.fetch_add(ids.len() as u64, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	use meridian_sdk::{ExecutionError, Transaction};

	use super::*;

	#[test]
	fn test_counters_track_notifications() {
		let counters = ObserverCounters::new();

		counters.on_routed(EventKind::Order);
		counters.on_overwrite("orderbook");
		counters.on_delivered("order");
		counters.on_placed(1, 1);
		counters.on_completed(
			&TransactionResult::failed(
				1,
				Transaction::new(vec![]),
				ExecutionError::Rejected("underpriced".to_string()),
			),
			Duration::from_millis(3),
		);
		counters.on_abandoned(&[2, 3]);

		assert_eq!(
			counters.snapshot(),
			CounterSnapshot {
				routed: 1,
				overwrites: 1,
				delivered: 1,
				worker_failures: 0,
				placed: 1,
				completed: 1,
				failed: 1,
				abandoned: 2,
			}
		);
	}

	#[test]
	fn test_settlement_verbosity_is_independent() {
		let observer = TracingObserver::new(false).with_settlement_verbosity(true);
		assert!(!observer.verbose);
		assert!(observer.verbose_settlement);

		let observer = TracingObserver::new(true);
		assert!(observer.verbose_settlement);
	}
}
