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

//! Meridian Framework
//!
//! Event-driven runtime for on-chain trading strategies. Market data,
//! order events and transaction results enter through one ingress
//! stream; a router classifies each event and hands it to a delivery
//! queue whose worker calls the matching strategy callback.
//!
//! Architecture:
//! - MPSC event stream, single router loop
//! - Latest-value queue for order books (stale snapshots are dropped)
//! - FIFO queues for order events and transaction results
//! - One worker thread per queue, handlers invoked without locks held
//! - Serialized transaction pipeline whose results re-enter the stream

pub mod config;
pub mod logging;
pub mod observer;
pub mod paper;
pub mod queue;
pub mod router;
pub mod strategy;
pub mod stream;
pub mod tracker;

pub use config::{FrameworkConfig, PaperConfig};
pub use observer::{
	CounterSnapshot, FrameworkObserver, NoopObserver, ObserverCounters, TracingObserver,
};
pub use paper::{
	MAX_CONSECUTIVE_FAILURES, PaperExecutor, PaperOrder, PaperStrategy, SimulatedBookFeed,
};
pub use queue::{DeliveryQueue, FifoQueue, Handler, LatestValueQueue, QueueError, WorkerFailure};
pub use router::{Framework, FrameworkError, FrameworkHandle, FrameworkState};
pub use strategy::Strategy;
pub use stream::{EventReceiver, EventSender, EventStream, StreamError};
pub use tracker::{
	ActiveLimitOrder, OrderStateTracker, TrackerError, TrackerUpdate, tolerance_from_decimals,
};
