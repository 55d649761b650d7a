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

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier assigned by the transaction manager at submission time
///
/// Identifiers start at 1, increase monotonically and are never reused.
pub type TransactionId = u64;

/// Default gas limit for a transaction
pub const DEFAULT_GAS_LIMIT: u64 = 350_000;

/// Transaction payload handed to an executor
///
/// The framework treats the payload as opaque: contract bindings and
/// ABI encoding happen before a transaction is built, signing and
/// submission happen inside the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Account nonce, stamped at execution time when the manager tracks nonces
	pub nonce: Option<u64>,
	/// Gas limit
	pub gas: u64,
	pub max_fee_per_gas: Option<u128>,
	pub max_priority_fee_per_gas: Option<u128>,
	/// Destination contract address
	pub to: Option<String>,
	/// Encoded call data
	pub data: Vec<u8>,
	/// Pairs whose orders this transaction touches
	pub pair_names: Vec<String>,
}

impl Transaction {
	pub fn new(data: Vec<u8>) -> Self {
		Self {
			nonce: None,
			gas: DEFAULT_GAS_LIMIT,
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
			to: None,
			data,
			pair_names: Vec::new(),
		}
	}

	pub fn to(mut self, address: impl Into<String>) -> Self {
		self.to = Some(address.into());
		self
	}

	pub fn with_gas(mut self, gas: u64) -> Self {
		self.gas = gas;
		self
	}

	pub fn with_fees(mut self, max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
		self.max_fee_per_gas = Some(max_fee_per_gas);
		self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
		self
	}

	pub fn for_pair(mut self, pair_name: impl Into<String>) -> Self {
		self.pair_names.push(pair_name.into());
		self
	}
}

/// Node confirmation record for a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub transaction_hash: String,
	pub block_number: u64,
	pub gas_used: u64,
	/// EVM receipt status: 1 = success, 0 = reverted
	pub status: u8,
	pub effective_gas_price: Option<u128>,
}

impl TransactionReceipt {
	pub fn is_success(&self) -> bool {
		self.status != 0
	}
}

/// Outcome of a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
	/// Mined with a successful receipt
	Confirmed,
	/// Mined, but the receipt reports a revert
	Reverted,
	/// Never made it on chain (signing, rejection, timeout, abandonment)
	FailedToSubmit,
}

/// Definitive failure reported by an executor
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExecutionError {
	#[error("Signing failed: {0}")]
	Signing(String),
	#[error("Transaction rejected by node: {0}")]
	Rejected(String),
	#[error("Timed out after {0:?} waiting for receipt")]
	Timeout(Duration),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Abandoned after failure of transaction {after}")]
	Abandoned { after: TransactionId },
	#[error("Executor error: {0}")]
	Other(String),
}

/// Completion record for a submitted transaction
///
/// Successes and failures travel the same path: both are re-injected
/// into the ingress stream and delivered to the strategy as ordinary
/// events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
	pub id: TransactionId,
	pub status: TransactionStatus,
	pub transaction: Transaction,
	/// Present whenever the transaction was mined (confirmed or reverted)
	pub receipt: Option<TransactionReceipt>,
	/// Present whenever the transaction failed to submit
	pub cause: Option<ExecutionError>,
}

impl TransactionResult {
	/// Build a result from a receipt; status follows the receipt status
	pub fn from_receipt(
		id: TransactionId,
		transaction: Transaction,
		receipt: TransactionReceipt,
	) -> Self {
		let status = if receipt.is_success() {
			TransactionStatus::Confirmed
		} else {
			TransactionStatus::Reverted
		};

		Self {
			id,
			status,
			transaction,
			receipt: Some(receipt),
			cause: None,
		}
	}

	pub fn failed(id: TransactionId, transaction: Transaction, cause: ExecutionError) -> Self {
		Self {
			id,
			status: TransactionStatus::FailedToSubmit,
			transaction,
			receipt: None,
			cause: Some(cause),
		}
	}

	pub fn is_success(&self) -> bool {
		self.status == TransactionStatus::Confirmed
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn receipt(status: u8) -> TransactionReceipt {
		TransactionReceipt {
			transaction_hash: "0x01".to_string(),
			block_number: 10,
			gas_used: 21_000,
			status,
			effective_gas_price: None,
		}
	}

	#[test]
	fn test_receipt_status_maps_to_result_status() {
		let tx = Transaction::new(vec![1, 2, 3]);

		let confirmed = TransactionResult::from_receipt(1, tx.clone(), receipt(1));
		assert_eq!(confirmed.status, TransactionStatus::Confirmed);
		assert!(confirmed.is_success());

		let reverted = TransactionResult::from_receipt(2, tx, receipt(0));
		assert_eq!(reverted.status, TransactionStatus::Reverted);
		assert!(reverted.receipt.is_some());
		assert!(!reverted.is_success());
	}

	#[test]
	fn test_failed_result_carries_cause() {
		let result = TransactionResult::failed(
			3,
			Transaction::new(vec![]),
			ExecutionError::Timeout(Duration::from_secs(30)),
		);
		assert_eq!(result.status, TransactionStatus::FailedToSubmit);
		assert!(result.receipt.is_none());
		assert_eq!(result.cause, Some(ExecutionError::Timeout(Duration::from_secs(30))));
	}

	#[test]
	fn test_builder_defaults() {
		let tx = Transaction::new(vec![0xaa])
			.to("0xmarket")
			.with_fees(100, 2)
			.for_pair("WETH/USDC");
		assert_eq!(tx.gas, DEFAULT_GAS_LIMIT);
		assert_eq!(tx.nonce, None);
		assert_eq!(tx.max_fee_per_gas, Some(100));
		assert_eq!(tx.pair_names, vec!["WETH/USDC".to_string()]);
	}
}
