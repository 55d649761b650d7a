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

//! Meridian SDK - shared types for the event trading framework
//!
//! This crate holds the decoded event payloads that flow through the
//! framework (order-book snapshots, order lifecycle events and
//! transaction results) together with the transaction types handed to
//! executors.
//!
//! The SDK is designed to be lightweight and embeddable:
//! - No background threads
//! - No runtime initialization
//! - No environment or configuration loading

pub mod book;
pub mod event;
pub mod order;
pub mod transaction;
pub mod types;

pub use book::{BookLevel, BookSide, OrderBookSnapshot};
pub use event::{Event, EventKind};
pub use order::{OrderEvent, OrderEventKind, OrderId};
pub use transaction::{
	ExecutionError, Transaction, TransactionId, TransactionReceipt, TransactionResult,
	TransactionStatus,
};
pub use types::*;
