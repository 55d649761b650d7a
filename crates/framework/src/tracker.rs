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

//! Order state tracking
//!
//! Keeps the remaining unfilled size of every open limit order owned by
//! the strategy, driven by the order events the framework delivers.

use std::collections::HashMap;

use dashmap::{DashMap, mapref::entry::Entry};
use meridian_sdk::{OrderEvent, OrderEventKind, OrderId, OrderType, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::FrameworkConfig;

/// One unit of the smallest increment of an asset with `decimals` places
pub fn tolerance_from_decimals(decimals: u32) -> Decimal {
	Decimal::new(1, decimals)
}

/// Errors raised when an order event contradicts the tracked state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
	#[error("Order {0} is already tracked")]
	DuplicateOrder(OrderId),
	#[error("Fill for unknown order {0}")]
	UnknownOrder(OrderId),
	#[error("Tolerance must be strictly positive, got {tolerance} for {scope}")]
	InvalidTolerance { scope: String, tolerance: Decimal },
	#[error("Order {id} carries non-positive size {size}")]
	InvalidSize { id: OrderId, size: Decimal },
	#[error("Order {id} has filled size {filled_size} outside [0, {size}]")]
	InvalidFilledSize {
		id: OrderId,
		size: Decimal,
		filled_size: Decimal,
	},
}

/// A resting limit order owned by the strategy
///
/// Invariant: `0 <= filled_size <= size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveLimitOrder {
	pub id: OrderId,
	pub owner: String,
	pub pair_name: String,
	pub side: Side,
	pub order_type: OrderType,
	pub price: Decimal,
	pub size: Decimal,
	pub filled_size: Decimal,
}

impl ActiveLimitOrder {
	/// Build a record from a new-limit event
	pub fn from_order_event(event: &OrderEvent) -> Self {
		Self {
			id: event.limit_order_id,
			owner: event.limit_order_owner.clone(),
			pair_name: event.pair_name.clone(),
			side: event.side,
			order_type: OrderType::Limit,
			price: event.price,
			size: event.size,
			filled_size: Decimal::ZERO,
		}
	}

	pub fn remaining_size(&self) -> Decimal {
		self.size - self.filled_size
	}
}

/// Outcome of applying one order event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerUpdate {
	/// Not an event for an order this tracker owns, or a market order
	Ignored,
	/// A new order is now tracked
	Opened(OrderId),
	/// A fill left part of the order resting
	PartiallyFilled { id: OrderId, remaining: Decimal },
	/// A fill extinguished the order; the final record is returned
	FullyFilled(ActiveLimitOrder),
	/// A cancellation removed the order (`None` if it was not tracked)
	Cancelled(Option<ActiveLimitOrder>),
}

/// Remaining size of every open limit order owned by one address
///
/// Safe to share between the order and transaction-result callbacks.
/// Readers always receive copies; records are only mutated through
/// [`OrderStateTracker::apply`] and [`OrderStateTracker::seed`].
pub struct OrderStateTracker {
	owner: String,
	orders: DashMap<OrderId, ActiveLimitOrder>,
	default_tolerance: Decimal,
	pair_tolerances: HashMap<String, Decimal>,
}

impl OrderStateTracker {
	pub fn new(owner: impl Into<String>, default_tolerance: Decimal) -> Result<Self, TrackerError> {
		check_tolerance("default", default_tolerance)?;

		Ok(Self {
			owner: owner.into(),
			orders: DashMap::new(),
			default_tolerance,
			pair_tolerances: HashMap::new(),
		})
	}

	/// Tracker for `config.owner` with the configured tolerances
	pub fn from_config(config: &FrameworkConfig) -> Result<Self, TrackerError> {
		let mut tracker = Self::new(config.owner.clone(), config.default_tolerance)?;
		for (pair, tolerance) in &config.pair_tolerances {
			tracker = tracker.with_pair_tolerance(pair.clone(), *tolerance)?;
		}
		Ok(tracker)
	}

	/// Override the tolerance for one pair
	pub fn with_pair_tolerance(
		mut self,
		pair_name: impl Into<String>,
		tolerance: Decimal,
	) -> Result<Self, TrackerError> {
		let pair_name = pair_name.into();
		check_tolerance(&pair_name, tolerance)?;
		self.pair_tolerances.insert(pair_name, tolerance);
		Ok(self)
	}

	pub fn owner(&self) -> &str {
		&self.owner
	}

	pub fn tolerance_for(&self, pair_name: &str) -> Decimal {
		self.pair_tolerances
			.get(pair_name)
			.copied()
			.unwrap_or(self.default_tolerance)
	}

	/// Apply one order event
	///
	/// - New limit for an owned order: start tracking (duplicate is an error)
	/// - Take: add to the filled size; remove once the remaining size
	///   minus the fill is within the pair's tolerance
	/// - Cancel or deletion: stop tracking (absent order is a no-op)
	/// - Market events and orders owned by someone else: ignored
	///
	/// New-limit and take sizes must be strictly positive.
	pub fn apply(&self, event: &OrderEvent) -> Result<TrackerUpdate, TrackerError> {
		if event.kind == OrderEventKind::Market
			|| !event.limit_order_owner.eq_ignore_ascii_case(&self.owner)
		{
			return Ok(TrackerUpdate::Ignored);
		}

		let id = event.limit_order_id;
		if event.is_removal() {
			let removed = self.orders.remove(&id).map(|(_, order)| order);
			debug!(target: "tracker", order_id = id, tracked = removed.is_some(), "Order cancelled");
			return Ok(TrackerUpdate::Cancelled(removed));
		}

		check_size(id, event.size)?;
		if event.is_new_limit() {
			self.insert(ActiveLimitOrder::from_order_event(event))?;
			debug!(target: "tracker", order_id = id, pair = %event.pair_name, size = %event.size, "Order opened");
			Ok(TrackerUpdate::Opened(id))
		} else if event.is_take() {
			self.apply_take(id, event.size)
		} else {
			Ok(TrackerUpdate::Ignored)
		}
	}

	fn apply_take(&self, id: OrderId, fill: Decimal) -> Result<TrackerUpdate, TrackerError> {
		let Entry::Occupied(mut entry) = self.orders.entry(id) else {
			return Err(TrackerError::UnknownOrder(id));
		};

		let tolerance = self.tolerance_for(&entry.get().pair_name);
		let remaining = entry.get().remaining_size();

		if remaining - fill <= tolerance {
			let mut order = entry.remove();
			order.filled_size = order.size;
			debug!(target: "tracker", order_id = id, "Order fully filled");
			return Ok(TrackerUpdate::FullyFilled(order));
		}

		let order = entry.get_mut();
		order.filled_size += fill;
		let remaining = order.remaining_size();
		debug!(target: "tracker", order_id = id, remaining = %remaining, "Order partially filled");

		Ok(TrackerUpdate::PartiallyFilled { id, remaining })
	}

	/// Track an order that was already open, e.g. one found at startup
	///
	/// The record must satisfy `0 <= filled_size <= size` with a positive size.
	pub fn seed(&self, order: ActiveLimitOrder) -> Result<(), TrackerError> {
		check_size(order.id, order.size)?;
		if order.filled_size < Decimal::ZERO || order.filled_size > order.size {
			return Err(TrackerError::InvalidFilledSize {
				id: order.id,
				size: order.size,
				filled_size: order.filled_size,
			});
		}
		self.insert(order)
	}

	fn insert(&self, order: ActiveLimitOrder) -> Result<(), TrackerError> {
		match self.orders.entry(order.id) {
			Entry::Occupied(_) => Err(TrackerError::DuplicateOrder(order.id)),
			Entry::Vacant(slot) => {
				slot.insert(order);
				Ok(())
			}
		}
	}

	pub fn get(&self, id: OrderId) -> Option<ActiveLimitOrder> {
		self.orders.get(&id).map(|order| order.clone())
	}

	pub fn remaining_size(&self, id: OrderId) -> Option<Decimal> {
		self.orders.get(&id).map(|order| order.remaining_size())
	}

	/// Copies of the open orders, optionally for one pair, sorted by id
	pub fn open_orders(&self, pair_name: Option<&str>) -> Vec<ActiveLimitOrder> {
		let mut orders: Vec<_> = self
			.orders
			.iter()
			.filter(|order| pair_name.is_none_or(|pair| order.pair_name == pair))
			.map(|order| order.clone())
			.collect();
		orders.sort_by_key(|order| order.id);
		orders
	}

	pub fn len(&self) -> usize {
		self.orders.len()
	}

	pub fn is_empty(&self) -> bool {
		self.orders.is_empty()
	}
}

fn check_size(id: OrderId, size: Decimal) -> Result<(), TrackerError> {
	if size <= Decimal::ZERO {
		return Err(TrackerError::InvalidSize { id, size });
	}
	Ok(())
}

fn check_tolerance(scope: &str, tolerance: Decimal) -> Result<(), TrackerError> {
	if tolerance <= Decimal::ZERO {
		return Err(TrackerError::InvalidTolerance {
			scope: scope.to_string(),
			tolerance,
		});
	}
	Ok(())
}
