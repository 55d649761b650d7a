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

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Side;

/// On-chain identifier of a resting limit order
pub type OrderId = u64;

/// What happened to the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
	/// A new limit order was placed on the book
	Limit,
	/// Part (or all) of a resting limit order was taken
	LimitTaken,
	/// The market removed a limit order (e.g. dust cleanup)
	LimitDeleted,
	/// The owner cancelled a limit order
	Cancel,
	/// A market order was executed
	Market,
}

/// Lifecycle event for a single order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
	pub limit_order_id: OrderId,
	/// Owner (maker) of the limit order
	pub limit_order_owner: String,
	/// Taker address, only present on take events
	pub market_order_owner: Option<String>,
	pub pair_name: String,
	pub side: Side,
	pub kind: OrderEventKind,
	pub price: Decimal,
	/// Size of this event: original size for `Limit`, filled size for `LimitTaken`
	pub size: Decimal,
	pub block_number: u64,
}

impl OrderEvent {
	/// A new limit order event
	pub fn limit(
		limit_order_id: OrderId,
		owner: impl Into<String>,
		pair_name: impl Into<String>,
		side: Side,
		price: Decimal,
		size: Decimal,
	) -> Self {
		Self {
			limit_order_id,
			limit_order_owner: owner.into(),
			market_order_owner: None,
			pair_name: pair_name.into(),
			side,
			kind: OrderEventKind::Limit,
			price,
			size,
			block_number: 0,
		}
	}

	/// Derive an event of another kind for the same order
	pub fn with_kind(mut self, kind: OrderEventKind, size: Decimal) -> Self {
		self.kind = kind;
		self.size = size;
		self
	}

	pub fn at_block(mut self, block_number: u64) -> Self {
		self.block_number = block_number;
		self
	}

	pub fn is_new_limit(&self) -> bool {
		self.kind == OrderEventKind::Limit
	}

	pub fn is_take(&self) -> bool {
		self.kind == OrderEventKind::LimitTaken
	}

	/// Cancellations and market-side deletions both end the order
	pub fn is_removal(&self) -> bool {
		matches!(self.kind, OrderEventKind::Cancel | OrderEventKind::LimitDeleted)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn test_event_kind_predicates() {
		let placed = OrderEvent::limit(7, "0xabc", "WETH/USDC", Side::Sell, dec!(2000), dec!(1));
		assert!(placed.is_new_limit());

		let taken = placed.clone().with_kind(OrderEventKind::LimitTaken, dec!(0.5));
		assert!(taken.is_take());
		assert_eq!(taken.size, dec!(0.5));

		let deleted = placed.with_kind(OrderEventKind::LimitDeleted, Decimal::ZERO);
		assert!(deleted.is_removal());
	}

	#[test]
	fn test_kind_serializes_snake_case() {
		let json = serde_json::to_string(&OrderEventKind::LimitTaken).unwrap();
		assert_eq!(json, "\"limit_taken\"");
	}
}
