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

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{book::OrderBookSnapshot, order::OrderEvent, transaction::TransactionResult};

/// Everything that can arrive on the ingress stream
///
/// The variant determines the delivery queue one-to-one, so routing is
/// an exhaustive match rather than a runtime type check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
	/// Latest order-book state for one market
	OrderBook(OrderBookSnapshot),
	/// Lifecycle event for one of the strategy's orders
	Order(OrderEvent),
	/// Completion of a previously placed transaction
	TransactionResult(TransactionResult),
}

impl Event {
	pub fn kind(&self) -> EventKind {
		match self {
			Event::OrderBook(_) => EventKind::OrderBook,
			Event::Order(_) => EventKind::Order,
			Event::TransactionResult(_) => EventKind::TransactionResult,
		}
	}
}

impl From<OrderBookSnapshot> for Event {
	fn from(snapshot: OrderBookSnapshot) -> Self {
		Event::OrderBook(snapshot)
	}
}

impl From<OrderEvent> for Event {
	fn from(event: OrderEvent) -> Self {
		Event::Order(event)
	}
}

impl From<TransactionResult> for Event {
	fn from(result: TransactionResult) -> Self {
		Event::TransactionResult(result)
	}
}

/// Payload-free tag of an [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	OrderBook,
	Order,
	TransactionResult,
}

impl EventKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			EventKind::OrderBook => "orderbook",
			EventKind::Order => "order",
			EventKind::TransactionResult => "transaction_result",
		}
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
