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

use meridian_sdk::{ExecutionError, Transaction, TransactionReceipt};

/// Result of executing a single transaction
pub type ExecutionResult = Result<TransactionReceipt, ExecutionError>;

/// Performs signing and submission of one transaction
///
/// `execute` blocks until the node has produced a receipt or a
/// definitive failure is known. Timeouts and retries against the node
/// are the executor's responsibility; the manager only distinguishes
/// success from failure.
///
/// Any `Fn(&Transaction) -> ExecutionResult` closure is an executor.
pub trait TransactionExecutor: Send + Sync {
	fn execute(&self, transaction: &Transaction) -> ExecutionResult;
}

impl<F> TransactionExecutor for F
where
	F: Fn(&Transaction) -> ExecutionResult + Send + Sync,
{
	fn execute(&self, transaction: &Transaction) -> ExecutionResult {
		self(transaction)
	}
}
