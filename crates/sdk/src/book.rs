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

/// A single aggregated price level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
	pub price: Decimal,
	pub size: Decimal,
}

impl BookLevel {
	pub fn new(price: Decimal, size: Decimal) -> Self {
		Self { price, size }
	}
}

/// One side of an order book, best level first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSide {
	pub side: Side,
	pub levels: Vec<BookLevel>,
}

impl BookSide {
	/// Build a book side from raw levels, merging adjacent levels that
	/// share a price (feeds report one entry per resting order).
	pub fn from_levels(side: Side, raw: impl IntoIterator<Item = BookLevel>) -> Self {
		let mut levels: Vec<BookLevel> = Vec::new();
		for level in raw {
			match levels.last_mut() {
				Some(last) if last.price == level.price => last.size += level.size,
				_ => levels.push(level),
			}
		}
		Self { side, levels }
	}

	pub fn best_price(&self) -> Option<Decimal> {
		self.levels.first().map(|level| level.price)
	}

	/// Total size resting on this side
	pub fn depth(&self) -> Decimal {
		self.levels.iter().map(|level| level.size).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.levels.is_empty()
	}
}

/// Full state of one market's order book at a point in time
///
/// Snapshots are delivered through a latest-value queue, so a strategy
/// only ever needs the most recent one; older snapshots carry no
/// information that a newer snapshot does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
	/// Pair name (e.g., "WETH/USDC")
	pub pair_name: String,
	/// Bids, best (highest) first
	pub bids: BookSide,
	/// Asks, best (lowest) first
	pub asks: BookSide,
	/// Block the snapshot was read at
	pub block_number: u64,
}

impl OrderBookSnapshot {
	pub fn new(
		pair_name: impl Into<String>,
		bids: impl IntoIterator<Item = BookLevel>,
		asks: impl IntoIterator<Item = BookLevel>,
		block_number: u64,
	) -> Self {
		Self {
			pair_name: pair_name.into(),
			bids: BookSide::from_levels(Side::Buy, bids),
			asks: BookSide::from_levels(Side::Sell, asks),
			block_number,
		}
	}

	pub fn best_bid(&self) -> Option<Decimal> {
		self.bids.best_price()
	}

	pub fn best_ask(&self) -> Option<Decimal> {
		self.asks.best_price()
	}

	/// Midpoint between best bid and best ask, if both sides are quoted
	pub fn mid_price(&self) -> Option<Decimal> {
		Some((self.best_bid()? + self.best_ask()?) / Decimal::TWO)
	}

	pub fn spread(&self) -> Option<Decimal> {
		Some(self.best_ask()? - self.best_bid()?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	fn snapshot() -> OrderBookSnapshot {
		OrderBookSnapshot::new(
			"WETH/USDC",
			vec![
				BookLevel::new(dec!(1999), dec!(1)),
				BookLevel::new(dec!(1999), dec!(2)),
				BookLevel::new(dec!(1998), dec!(5)),
			],
			vec![BookLevel::new(dec!(2001), dec!(3))],
			42,
		)
	}

	#[test]
	fn test_adjacent_levels_are_merged() {
		let book = snapshot();
		assert_eq!(book.bids.levels.len(), 2);
		assert_eq!(book.bids.levels[0].size, dec!(3));
		assert_eq!(book.bids.depth(), dec!(8));
	}

	#[test]
	fn test_best_prices_and_mid() {
		let book = snapshot();
		assert_eq!(book.best_bid(), Some(dec!(1999)));
		assert_eq!(book.best_ask(), Some(dec!(2001)));
		assert_eq!(book.mid_price(), Some(dec!(2000)));
		assert_eq!(book.spread(), Some(dec!(2)));
	}

	#[test]
	fn test_one_sided_book_has_no_mid() {
		let book = OrderBookSnapshot::new("WETH/USDC", vec![], vec![BookLevel::new(dec!(1), dec!(1))], 1);
		assert!(book.bids.is_empty());
		assert_eq!(book.mid_price(), None);
		assert_eq!(book.spread(), None);
	}
}
