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

use anyhow::Result;
use meridian_sdk::{OrderBookSnapshot, OrderEvent, TransactionResult};

/// Callbacks a trading strategy implements
///
/// Each event callback is invoked by the worker of its delivery queue,
/// so the three callbacks may run concurrently with each other (but a
/// single callback is never re-entered). Implementations keep their
/// state behind interior mutability.
///
/// Returning an error from any callback is fatal: the worker stops and
/// the framework shuts down, returning the error from `Framework::start`.
pub trait Strategy: Send + Sync + 'static {
	/// Called once before the transaction manager and queues start
	fn on_startup(&self) -> Result<()> {
		Ok(())
	}

	/// Called once while the framework stops
	fn on_shutdown(&self) -> Result<()> {
		Ok(())
	}

	/// Latest order-book snapshot; intermediate snapshots may be skipped
	fn on_orderbook(&self, snapshot: OrderBookSnapshot) -> Result<()>;

	/// Every order event, in arrival order
	fn on_order(&self, event: OrderEvent) -> Result<()>;

	/// Every transaction result, in submission order
	fn on_transaction_result(&self, result: TransactionResult) -> Result<()>;
}
