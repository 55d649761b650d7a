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
	collections::VecDeque,
	panic::{self, AssertUnwindSafe},
	sync::{
		Arc,
		atomic::{AtomicU8, Ordering},
	},
	thread::{self, JoinHandle},
	time::Instant,
};

use crossbeam::channel::{Receiver, Sender, unbounded};
use meridian_sdk::{ExecutionError, Transaction, TransactionId, TransactionResult, TransactionStatus};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
	config::{FailurePolicy, SettlementConfig},
	executor::TransactionExecutor,
	observer::{NoopSubmissionObserver, SubmissionObserver},
	sink::ResultSink,
};

/// First identifier handed out by a fresh manager
pub const FIRST_TRANSACTION_ID: TransactionId = 1;

/// Error types for transaction placement and manager lifecycle
#[derive(Debug, Error)]
pub enum SubmissionError {
	#[error("Transaction manager is stopped")]
	Stopped,
	#[error("Transaction manager already started")]
	AlreadyStarted,
	#[error("Failed to spawn transaction manager thread: {0}")]
	Spawn(#[from] std::io::Error),
}

/// Lifecycle of a transaction manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
	/// Accepting placements, nothing executes yet
	Created,
	/// Drain thread running
	Running,
	/// No further placements or executions
	Stopped,
}

impl ManagerState {
	fn from_u8(value: u8) -> Self {
		match value {
			0 => ManagerState::Created,
			1 => ManagerState::Running,
			_ => ManagerState::Stopped,
		}
	}
}

/// A placed transaction waiting for its turn
struct PendingTransaction {
	id: TransactionId,
	transaction: Transaction,
	executor: Arc<dyn TransactionExecutor>,
}

/// Backlog and counters, guarded together so that identifier
/// assignment and enqueue are atomic with respect to other placers
struct Backlog {
	next_id: TransactionId,
	next_nonce: Option<u64>,
	pending: VecDeque<PendingTransaction>,
	in_flight: Option<TransactionId>,
}

enum Signal {
	Available,
	Shutdown,
}

struct Shared {
	backlog: Mutex<Backlog>,
	signals: Sender<Signal>,
	state: AtomicU8,
	observer: Arc<dyn SubmissionObserver>,
}

impl Shared {
	fn state(&self) -> ManagerState {
		ManagerState::from_u8(self.state.load(Ordering::Acquire))
	}

	fn place(
		&self,
		executor: Arc<dyn TransactionExecutor>,
		transaction: Transaction,
	) -> Result<TransactionId, SubmissionError> {
		let (id, backlog_len) = {
			let mut backlog = self.backlog.lock();
			if self.state() == ManagerState::Stopped {
				return Err(SubmissionError::Stopped);
			}

			let id = backlog.next_id;
			backlog.next_id += 1;
			backlog.pending.push_back(PendingTransaction {
				id,
				transaction,
				executor,
			});
			(id, backlog.pending.len())
		};

		// The manager keeps the receiving end alive, so this cannot fail
		let _ = self.signals.send(Signal::Available);
		self.observer.on_placed(id, backlog_len);

		Ok(id)
	}

	fn backlog_len(&self) -> usize {
		let backlog = self.backlog.lock();
		backlog.pending.len() + usize::from(backlog.in_flight.is_some())
	}

	fn in_flight(&self) -> Option<TransactionId> {
		self.backlog.lock().in_flight
	}
}

/// Serialized pipeline for outgoing transactions
///
/// `place_transaction` assigns the next identifier, appends the
/// transaction to the backlog and returns immediately. A dedicated
/// thread executes the backlog strictly one entry at a time, so
/// submission order is preserved and a transaction's result is always
/// delivered before the next executor starts.
///
/// Failure handling:
/// - Executor errors and panics become `FailedToSubmit` results
/// - A failure never stalls the transactions queued behind it
///   (unless `FailurePolicy::AbandonBacklog` is configured)
/// - Nothing is retried
///
/// Stopping lets the in-flight transaction finish and abandons
/// everything still queued. Abandoned identifiers are logged and
/// reported to the observer, but produce no results.
pub struct TransactionManager {
	shared: Arc<Shared>,
	signals: Receiver<Signal>,
	sink: Arc<dyn ResultSink>,
	failure_policy: FailurePolicy,
	thread_handle: Option<JoinHandle<()>>,
}

impl TransactionManager {
	/// Create a manager delivering results to `sink`
	pub fn new(sink: Arc<dyn ResultSink>, config: SettlementConfig) -> Self {
		Self::with_observer(sink, config, Arc::new(NoopSubmissionObserver))
	}

	/// Create a manager with an observability hook
	pub fn with_observer(
		sink: Arc<dyn ResultSink>,
		config: SettlementConfig,
		observer: Arc<dyn SubmissionObserver>,
	) -> Self {
		let (signal_tx, signal_rx) = unbounded();

		let shared = Arc::new(Shared {
			backlog: Mutex::new(Backlog {
				next_id: FIRST_TRANSACTION_ID,
				next_nonce: config.starting_nonce,
				pending: VecDeque::new(),
				in_flight: None,
			}),
			signals: signal_tx,
			state: AtomicU8::new(ManagerState::Created as u8),
			observer,
		});

		Self {
			shared,
			signals: signal_rx,
			sink,
			failure_policy: config.failure_policy,
			thread_handle: None,
		}
	}

	/// Cloneable placement handle for strategies and other threads
	pub fn submitter(&self) -> TransactionSubmitter {
		TransactionSubmitter {
			shared: self.shared.clone(),
		}
	}

	/// Place a transaction and return its identifier without waiting
	pub fn place_transaction(
		&self,
		executor: Arc<dyn TransactionExecutor>,
		transaction: Transaction,
	) -> Result<TransactionId, SubmissionError> {
		self.shared.place(executor, transaction)
	}

	/// Start the drain thread
	pub fn start(&mut self) -> Result<(), SubmissionError> {
		match self.shared.state.compare_exchange(
			ManagerState::Created as u8,
			ManagerState::Running as u8,
			Ordering::AcqRel,
			Ordering::Acquire,
		) {
			Ok(_) => {}
			Err(state) if ManagerState::from_u8(state) == ManagerState::Running => {
				return Err(SubmissionError::AlreadyStarted);
			}
			Err(_) => return Err(SubmissionError::Stopped),
		}

		let shared = self.shared.clone();
		let signals = self.signals.clone();
		let sink = self.sink.clone();
		let failure_policy = self.failure_policy;

		let spawned = thread::Builder::new()
			.name("transaction-manager".to_string())
			.spawn(move || {
				info!(target: "settlement", ?failure_policy, "Transaction manager started");
				Self::run_drain_loop(&shared, &signals, sink.as_ref(), failure_policy);
				info!(target: "settlement", "Transaction manager stopped");
			});

		match spawned {
			Ok(handle) => {
				self.thread_handle = Some(handle);
				Ok(())
			}
			Err(e) => {
				self.shared
					.state
					.store(ManagerState::Stopped as u8, Ordering::Release);
				Err(SubmissionError::Spawn(e))
			}
		}
	}

	/// Main drain loop
	///
	/// This loop:
	/// 1. Waits for an availability signal (or the shutdown sentinel)
	/// 2. Pops the oldest pending transaction into the in-flight slot
	/// 3. Runs its executor to completion
	/// 4. Delivers the result before looking at the backlog again
	fn run_drain_loop(
		shared: &Shared,
		signals: &Receiver<Signal>,
		sink: &dyn ResultSink,
		failure_policy: FailurePolicy,
	) {
		loop {
			match signals.recv() {
				Ok(Signal::Available) => {}
				Ok(Signal::Shutdown) | Err(_) => break,
			}

			if shared.state() != ManagerState::Running {
				break;
			}

			let next = {
				let mut backlog = shared.backlog.lock();
				let next = backlog.pending.pop_front();
				if let Some(pending) = &next {
					backlog.in_flight = Some(pending.id);
				}
				next.map(|pending| (pending, backlog.next_nonce))
			};

			// Signals for abandoned entries find an empty backlog
			let Some((mut pending, nonce)) = next else {
				continue;
			};

			if nonce.is_some() {
				pending.transaction.nonce = nonce;
			}

			let started = Instant::now();
			let result = Self::execute(shared, pending);

			let abandoned = {
				let mut backlog = shared.backlog.lock();
				backlog.in_flight = None;

				// A mined transaction consumed its nonce, a failed submission did not
				if result.receipt.is_some()
					&& let Some(nonce) = nonce
				{
					backlog.next_nonce = Some(nonce + 1);
				}

				if failure_policy == FailurePolicy::AbandonBacklog
					&& result.status == TransactionStatus::FailedToSubmit
				{
					backlog.pending.drain(..).collect()
				} else {
					Vec::new()
				}
			};

			let failed_id = result.id;
			let elapsed = started.elapsed();
			Self::deliver(sink, result.clone());
			shared.observer.on_completed(&result, elapsed);

			if !abandoned.is_empty() {
				let ids: Vec<TransactionId> = abandoned.iter().map(|p| p.id).collect();
				warn!(
					target: "settlement",
					after = failed_id,
					count = ids.len(),
					"Abandoning queued transactions after failure"
				);

				for pending in abandoned {
					Self::deliver(
						sink,
						TransactionResult::failed(
							pending.id,
							pending.transaction,
							ExecutionError::Abandoned { after: failed_id },
						),
					);
				}
				shared.observer.on_abandoned(&ids);
			}
		}
	}

	/// Run one executor, converting errors and panics into results
	fn execute(shared: &Shared, pending: PendingTransaction) -> TransactionResult {
		let PendingTransaction {
			id,
			transaction,
			executor,
		} = pending;

		shared.observer.on_executing(id);

		let outcome = panic::catch_unwind(AssertUnwindSafe(|| executor.execute(&transaction)));

		match outcome {
			Ok(Ok(receipt)) => {
				let result = TransactionResult::from_receipt(id, transaction, receipt);
				if !result.is_success() {
					warn!(target: "settlement", tx_id = id, "Transaction reverted");
				}
				result
			}
			Ok(Err(cause)) => {
				warn!(target: "settlement", tx_id = id, error = %cause, "Transaction failed");
				TransactionResult::failed(id, transaction, cause)
			}
			Err(payload) => {
				let message = panic_message(payload.as_ref());
				error!(target: "settlement", tx_id = id, panic = %message, "Transaction executor panicked");
				TransactionResult::failed(
					id,
					transaction,
					ExecutionError::Other(format!("executor panicked: {}", message)),
				)
			}
		}
	}

	fn deliver(sink: &dyn ResultSink, result: TransactionResult) {
		let id = result.id;
		if let Err(e) = sink.deliver(result) {
			warn!(target: "settlement", tx_id = id, error = %e, "Dropping transaction result");
		}
	}

	/// Stop executing. The in-flight transaction (if any) runs to
	/// completion; queued transactions are abandoned.
	pub fn stop(&self) {
		let abandoned: Vec<TransactionId> = {
			let mut backlog = self.shared.backlog.lock();
			let previous = self
				.shared
				.state
				.swap(ManagerState::Stopped as u8, Ordering::AcqRel);
			if ManagerState::from_u8(previous) == ManagerState::Stopped {
				return;
			}
			backlog.pending.drain(..).map(|p| p.id).collect()
		};

		let _ = self.shared.signals.send(Signal::Shutdown);

		if !abandoned.is_empty() {
			warn!(
				target: "settlement",
				count = abandoned.len(),
				ids = ?abandoned,
				"Abandoning queued transactions on stop"
			);
			self.shared.observer.on_abandoned(&abandoned);
		}
	}

	/// Stop and wait for the in-flight transaction to finish
	pub fn shutdown(mut self) {
		info!(target: "settlement", "Shutting down transaction manager");
		self.stop();

		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "settlement", error = ?e, "Transaction manager thread panicked");
		}
	}

	pub fn state(&self) -> ManagerState {
		self.shared.state()
	}

	/// Transactions placed but not yet completed (queued plus in flight)
	pub fn backlog_len(&self) -> usize {
		self.shared.backlog_len()
	}

	pub fn in_flight(&self) -> Option<TransactionId> {
		self.shared.in_flight()
	}

	/// True once the drain thread has exited (or was never started)
	///
	/// After `stop`, the drain thread may still be delivering the result of
	/// its last transaction. Callers that own the consuming end of the sink
	/// poll this while they keep draining it.
	pub fn is_finished(&self) -> bool {
		self.thread_handle
			.as_ref()
			.is_none_or(|handle| handle.is_finished())
	}
}

impl Drop for TransactionManager {
	fn drop(&mut self) {
		self.stop();
		if let Some(handle) = self.thread_handle.take() {
			let _ = handle.join();
		}
	}
}

/// Cloneable handle for placing transactions from any thread
#[derive(Clone)]
pub struct TransactionSubmitter {
	shared: Arc<Shared>,
}

impl TransactionSubmitter {
	/// Place a transaction and return its identifier without waiting
	pub fn place_transaction(
		&self,
		executor: Arc<dyn TransactionExecutor>,
		transaction: Transaction,
	) -> Result<TransactionId, SubmissionError> {
		self.shared.place(executor, transaction)
	}

	pub fn state(&self) -> ManagerState {
		self.shared.state()
	}

	pub fn backlog_len(&self) -> usize {
		self.shared.backlog_len()
	}

	pub fn in_flight(&self) -> Option<TransactionId> {
		self.shared.in_flight()
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

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use crossbeam::channel::{Receiver, bounded, unbounded};
	use meridian_sdk::TransactionReceipt;

	use super::*;
	use crate::executor::ExecutionResult;

	const WAIT: Duration = Duration::from_secs(5);

	fn receipt(block_number: u64) -> TransactionReceipt {
		TransactionReceipt {
			transaction_hash: format!("0x{:04x}", block_number),
			block_number,
			gas_used: 21_000,
			status: 1,
			effective_gas_price: None,
		}
	}

	/// Executor driven by the first payload byte: 0 confirms, 1 times out,
	/// 2 reverts, 3 panics
	fn scripted_executor() -> Arc<dyn TransactionExecutor> {
		Arc::new(|tx: &Transaction| -> ExecutionResult {
			match tx.data.first().copied().unwrap_or(0) {
				1 => Err(ExecutionError::Timeout(Duration::from_secs(30))),
				2 => Ok(TransactionReceipt {
					status: 0,
					..receipt(7)
				}),
				3 => panic!("node client crashed"),
				_ => Ok(receipt(7)),
			}
		})
	}

	fn manager(config: SettlementConfig) -> (TransactionManager, Receiver<TransactionResult>) {
		let (tx, rx) = unbounded();
		(TransactionManager::new(Arc::new(tx), config), rx)
	}

	#[test]
	fn test_identifiers_are_monotonic_from_one() {
		let (manager, _results) = manager(SettlementConfig::default());
		let executor = scripted_executor();

		let ids: Vec<_> = (0..3)
			.map(|_| {
				manager
					.place_transaction(executor.clone(), Transaction::new(vec![0]))
					.unwrap()
			})
			.collect();

		assert_eq!(ids, vec![1, 2, 3]);
		assert_eq!(manager.backlog_len(), 3);
		assert_eq!(manager.state(), ManagerState::Created);
	}

	#[test]
	fn test_results_follow_placement_order() {
		let (mut manager, results) = manager(SettlementConfig::default());
		let executor = scripted_executor();

		for _ in 0..5 {
			manager
				.place_transaction(executor.clone(), Transaction::new(vec![0]))
				.unwrap();
		}
		manager.start().unwrap();

		let ids: Vec<_> = (0..5)
			.map(|_| results.recv_timeout(WAIT).unwrap().id)
			.collect();
		assert_eq!(ids, vec![1, 2, 3, 4, 5]);
	}

	#[test]
	fn test_result_delivered_before_next_executor_starts() {
		struct LoggingSink(Arc<Mutex<Vec<String>>>);

		impl ResultSink for LoggingSink {
			fn deliver(&self, result: TransactionResult) -> Result<(), crate::sink::SinkError> {
				self.0.lock().push(format!("result {}", result.id));
				Ok(())
			}
		}

		let log = Arc::new(Mutex::new(Vec::new()));
		let mut manager = TransactionManager::new(
			Arc::new(LoggingSink(log.clone())),
			SettlementConfig::default(),
		);

		let executor_log = log.clone();
		let executor: Arc<dyn TransactionExecutor> =
			Arc::new(move |tx: &Transaction| -> ExecutionResult {
				executor_log.lock().push(format!("execute {}", tx.data[0]));
				thread::sleep(Duration::from_millis(5));
				Ok(receipt(1))
			});

		manager.start().unwrap();
		for marker in 1..=3u8 {
			manager
				.place_transaction(executor.clone(), Transaction::new(vec![marker]))
				.unwrap();
		}

		let deadline = Instant::now() + WAIT;
		while log.lock().len() < 6 && Instant::now() < deadline {
			thread::sleep(Duration::from_millis(5));
		}

		assert_eq!(
			*log.lock(),
			vec![
				"execute 1", "result 1", "execute 2", "result 2", "execute 3", "result 3"
			]
		);
	}

	#[test]
	fn test_failure_does_not_stall_pipeline() {
		let (mut manager, results) = manager(SettlementConfig::default());
		let executor = scripted_executor();
		manager.start().unwrap();

		for marker in [0u8, 1, 0] {
			manager
				.place_transaction(executor.clone(), Transaction::new(vec![marker]))
				.unwrap();
		}

		let first = results.recv_timeout(WAIT).unwrap();
		let second = results.recv_timeout(WAIT).unwrap();
		let third = results.recv_timeout(WAIT).unwrap();

		assert_eq!(first.status, TransactionStatus::Confirmed);
		assert_eq!(second.id, 2);
		assert_eq!(second.status, TransactionStatus::FailedToSubmit);
		assert_eq!(
			second.cause,
			Some(ExecutionError::Timeout(Duration::from_secs(30)))
		);
		assert_eq!(third.id, 3);
		assert_eq!(third.status, TransactionStatus::Confirmed);
	}

	#[test]
	fn test_reverted_receipt_reported_with_receipt() {
		let (mut manager, results) = manager(SettlementConfig::default());
		manager.start().unwrap();
		manager
			.place_transaction(scripted_executor(), Transaction::new(vec![2]))
			.unwrap();

		let result = results.recv_timeout(WAIT).unwrap();
		assert_eq!(result.status, TransactionStatus::Reverted);
		assert!(result.receipt.is_some());
		assert!(result.cause.is_none());
	}

	#[test]
	fn test_executor_panic_becomes_failure() {
		let (mut manager, results) = manager(SettlementConfig::default());
		let executor = scripted_executor();
		manager.start().unwrap();

		manager
			.place_transaction(executor.clone(), Transaction::new(vec![3]))
			.unwrap();
		manager
			.place_transaction(executor, Transaction::new(vec![0]))
			.unwrap();

		let panicked = results.recv_timeout(WAIT).unwrap();
		assert_eq!(panicked.status, TransactionStatus::FailedToSubmit);
		assert!(matches!(
			panicked.cause,
			Some(ExecutionError::Other(ref message)) if message.contains("node client crashed")
		));

		let next = results.recv_timeout(WAIT).unwrap();
		assert_eq!(next.status, TransactionStatus::Confirmed);
	}

	#[test]
	fn test_backlog_shrinks_by_one_per_completion() {
		let (gate_tx, gate_rx) = bounded::<()>(0);
		let (mut manager, results) = manager(SettlementConfig::default());
		let executor: Arc<dyn TransactionExecutor> =
			Arc::new(move |_tx: &Transaction| -> ExecutionResult {
				gate_rx.recv().map_err(|_| ExecutionError::Other("gate closed".to_string()))?;
				Ok(receipt(1))
			});

		for _ in 0..3 {
			manager
				.place_transaction(executor.clone(), Transaction::new(vec![]))
				.unwrap();
		}
		manager.start().unwrap();
		assert_eq!(manager.backlog_len(), 3);

		for expected_left in [2usize, 1, 0] {
			gate_tx.send(()).unwrap();
			results.recv_timeout(WAIT).unwrap();
			assert_eq!(manager.backlog_len(), expected_left);
		}
	}

	#[test]
	fn test_abandon_backlog_policy_fails_queued_transactions() {
		let (gate_tx, gate_rx) = bounded::<()>(0);
		let (mut manager, results) = manager(SettlementConfig {
			failure_policy: FailurePolicy::AbandonBacklog,
			..Default::default()
		});
		let executor: Arc<dyn TransactionExecutor> =
			Arc::new(move |_tx: &Transaction| -> ExecutionResult {
				let _ = gate_rx.recv();
				Err(ExecutionError::Rejected("nonce too low".to_string()))
			});

		manager.start().unwrap();
		for _ in 0..3 {
			manager
				.place_transaction(executor.clone(), Transaction::new(vec![]))
				.unwrap();
		}
		gate_tx.send(()).unwrap();

		let failed = results.recv_timeout(WAIT).unwrap();
		assert_eq!(failed.id, 1);
		assert_eq!(
			failed.cause,
			Some(ExecutionError::Rejected("nonce too low".to_string()))
		);

		for id in [2, 3] {
			let abandoned = results.recv_timeout(WAIT).unwrap();
			assert_eq!(abandoned.id, id);
			assert_eq!(abandoned.cause, Some(ExecutionError::Abandoned { after: 1 }));
		}
		assert_eq!(manager.backlog_len(), 0);
	}

	#[test]
	fn test_nonce_only_advances_for_mined_transactions() {
		let (mut manager, results) = manager(SettlementConfig {
			starting_nonce: Some(40),
			..Default::default()
		});
		let executor = scripted_executor();

		for marker in [0u8, 1, 2, 0] {
			manager
				.place_transaction(executor.clone(), Transaction::new(vec![marker]))
				.unwrap();
		}
		manager.start().unwrap();

		let nonces: Vec<_> = (0..4)
			.map(|_| results.recv_timeout(WAIT).unwrap().transaction.nonce)
			.collect();
		// The timed-out submission leaves 41 unused; the revert still consumes it
		assert_eq!(nonces, vec![Some(40), Some(41), Some(41), Some(42)]);
	}

	#[test]
	fn test_stop_abandons_queue_and_rejects_placements() {
		let (gate_tx, gate_rx) = bounded::<()>(0);
		let (started_tx, started_rx) = unbounded::<()>();
		let (mut manager, results) = manager(SettlementConfig::default());
		let executor: Arc<dyn TransactionExecutor> =
			Arc::new(move |_tx: &Transaction| -> ExecutionResult {
				let _ = started_tx.send(());
				let _ = gate_rx.recv();
				Ok(receipt(1))
			});

		manager.start().unwrap();
		for _ in 0..3 {
			manager
				.place_transaction(executor.clone(), Transaction::new(vec![]))
				.unwrap();
		}
		started_rx.recv_timeout(WAIT).unwrap();
		assert_eq!(manager.in_flight(), Some(1));

		manager.stop();
		assert!(matches!(
			manager.place_transaction(executor.clone(), Transaction::new(vec![])),
			Err(SubmissionError::Stopped)
		));

		// In-flight transaction still completes
		gate_tx.send(()).unwrap();
		assert_eq!(results.recv_timeout(WAIT).unwrap().id, 1);

		manager.shutdown();
		assert!(results.try_recv().is_err());
	}

	#[test]
	fn test_drain_thread_finishes_only_after_last_delivery() {
		let (gate_tx, gate_rx) = bounded::<()>(0);
		let (started_tx, started_rx) = unbounded::<()>();
		let (results_tx, results) = bounded(0);
		let mut manager = TransactionManager::new(Arc::new(results_tx), SettlementConfig::default());
		assert!(manager.is_finished());

		let executor: Arc<dyn TransactionExecutor> =
			Arc::new(move |_tx: &Transaction| -> ExecutionResult {
				let _ = started_tx.send(());
				let _ = gate_rx.recv();
				Ok(receipt(1))
			});
		manager.start().unwrap();
		manager
			.place_transaction(executor, Transaction::new(vec![]))
			.unwrap();
		started_rx.recv_timeout(WAIT).unwrap();

		manager.stop();
		gate_tx.send(()).unwrap();
		// Nobody receives yet, so delivery holds the thread open
		thread::sleep(Duration::from_millis(50));
		assert!(!manager.is_finished());

		let result: TransactionResult = results.recv_timeout(WAIT).unwrap();
		assert_eq!(result.id, 1);
		let deadline = Instant::now() + WAIT;
		while !manager.is_finished() {
			assert!(Instant::now() < deadline, "drain thread did not exit");
			thread::sleep(Duration::from_millis(2));
		}
		manager.shutdown();
	}

	#[test]
	fn test_start_twice_is_rejected() {
		let (mut manager, _results) = manager(SettlementConfig::default());
		manager.start().unwrap();
		assert!(matches!(manager.start(), Err(SubmissionError::AlreadyStarted)));
	}
}
