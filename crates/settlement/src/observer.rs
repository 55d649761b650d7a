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

use meridian_sdk::{TransactionId, TransactionResult};

/// Observability hook for the transaction pipeline
///
/// Every method has an empty default so observers only implement the
/// notifications they care about. Hooks run on the placing thread
/// (`on_placed`) or the drain thread (everything else) and must return
/// promptly.
pub trait SubmissionObserver: Send + Sync {
	/// A transaction joined the backlog
	fn on_placed(&self, _id: TransactionId, _backlog_len: usize) {}

	/// The drain thread handed a transaction to its executor
	fn on_executing(&self, _id: TransactionId) {}

	/// A result was produced
	fn on_completed(&self, _result: &TransactionResult, _elapsed: Duration) {}

	/// Queued transactions were dropped without executing
	fn on_abandoned(&self, _ids: &[TransactionId]) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSubmissionObserver;

impl SubmissionObserver for NoopSubmissionObserver {}
