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

//! Meridian Settlement - serialized transaction pipeline
//!
//! This crate owns the single outgoing-transaction pipeline of a
//! strategy process. Callers place transactions and immediately get an
//! identifier back; a dedicated thread executes them strictly one at a
//! time in placement order and hands each outcome to a [`ResultSink`].
//!
//! Architecture:
//! - MPSC placement (any thread may place)
//! - One drain thread, at most one transaction in flight
//! - Failures are converted into results, never propagated as crashes
//! - No retries: retry policy belongs to the strategy

pub mod config;
pub mod executor;
pub mod manager;
pub mod observer;
pub mod sink;

pub use config::{FailurePolicy, SettlementConfig};
pub use executor::{ExecutionResult, TransactionExecutor};
pub use manager::{ManagerState, SubmissionError, TransactionManager, TransactionSubmitter};
pub use observer::{NoopSubmissionObserver, SubmissionObserver};
pub use sink::{ResultSink, SinkError};
