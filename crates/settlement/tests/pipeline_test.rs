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

use std::{sync::Arc, thread, time::Duration};

use crossbeam::channel::unbounded;
use meridian_sdk::{Transaction, TransactionReceipt, TransactionResult, TransactionStatus};
use meridian_settlement::{
	ExecutionResult, SettlementConfig, TransactionExecutor, TransactionManager,
};
use parking_lot::Mutex;

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_concurrent_placement_executes_in_identifier_order() {
	let (result_tx, result_rx) = unbounded::<TransactionResult>();
	let mut manager = TransactionManager::new(Arc::new(result_tx), SettlementConfig::default());

	let executed = Arc::new(Mutex::new(Vec::new()));
	let executor: Arc<dyn TransactionExecutor> = {
		let executed = executed.clone();
		Arc::new(move |tx: &Transaction| -> ExecutionResult {
			executed.lock().push(tx.data.clone());
			Ok(TransactionReceipt {
				transaction_hash: "0x01".to_string(),
				block_number: 1,
				gas_used: 21_000,
				status: 1,
				effective_gas_price: None,
			})
		})
	};

	manager.start().unwrap();

	let placers: Vec<_> = (0..4u8)
		.map(|placer| {
			let submitter = manager.submitter();
			let executor = executor.clone();
			thread::spawn(move || {
				(0..50u8)
					.map(|seq| {
						let id = submitter
							.place_transaction(executor.clone(), Transaction::new(vec![placer, seq]))
							.unwrap();
						(id, vec![placer, seq])
					})
					.collect::<Vec<_>>()
			})
		})
		.collect();

	let mut placed: Vec<(u64, Vec<u8>)> = placers
		.into_iter()
		.flat_map(|placer| placer.join().unwrap())
		.collect();
	placed.sort_by_key(|(id, _)| *id);

	let ids: Vec<_> = placed.iter().map(|(id, _)| *id).collect();
	assert_eq!(ids, (1..=200).collect::<Vec<_>>());

	let results: Vec<_> = (0..200).map(|_| result_rx.recv_timeout(WAIT).unwrap()).collect();
	assert!(results.iter().all(|r| r.status == TransactionStatus::Confirmed));
	assert_eq!(results.iter().map(|r| r.id).collect::<Vec<_>>(), ids);

	// Execution order follows identifier order, not placer interleaving
	let expected: Vec<_> = placed.into_iter().map(|(_, data)| data).collect();
	assert_eq!(*executed.lock(), expected);

	manager.shutdown();
}

#[test]
fn test_dropping_manager_joins_drain_thread() {
	let (result_tx, result_rx) = unbounded::<TransactionResult>();
	let mut manager = TransactionManager::new(Arc::new(result_tx), SettlementConfig::default());
	manager.start().unwrap();

	let slow: Arc<dyn TransactionExecutor> = Arc::new(|_tx: &Transaction| -> ExecutionResult {
		thread::sleep(Duration::from_millis(50));
		Ok(TransactionReceipt {
			transaction_hash: "0x02".to_string(),
			block_number: 2,
			gas_used: 21_000,
			status: 1,
			effective_gas_price: None,
		})
	});
	manager.place_transaction(slow, Transaction::new(vec![])).unwrap();

	// Wait for the transaction to be picked up, then drop mid-flight
	while manager.in_flight().is_none() && manager.backlog_len() > 0 {
		thread::yield_now();
	}
	drop(manager);

	// The in-flight transaction finished before the drop returned
	assert_eq!(result_rx.recv_timeout(WAIT).unwrap().id, 1);
}
