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

use crossbeam::channel::Sender;
use meridian_sdk::TransactionResult;
use thiserror::Error;

/// Error returned when a result cannot be delivered
#[derive(Debug, Error)]
pub enum SinkError {
	#[error("Result sink disconnected")]
	Disconnected,
}

/// Destination for completed transaction results
///
/// In a running framework this is the ingress event stream, so results
/// re-enter the router like any other event.
pub trait ResultSink: Send + Sync {
	fn deliver(&self, result: TransactionResult) -> Result<(), SinkError>;
}

impl ResultSink for Sender<TransactionResult> {
	fn deliver(&self, result: TransactionResult) -> Result<(), SinkError> {
		self.send(result).map_err(|_| SinkError::Disconnected)
	}
}
