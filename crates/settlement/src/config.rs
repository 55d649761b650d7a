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

use serde::{Deserialize, Serialize};

/// What the manager does with the backlog when a transaction fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
	/// Keep draining; every placed transaction gets its own attempt
	#[default]
	Continue,
	/// Fail every queued transaction as well. Useful when later
	/// transactions were built against state the failed one was meant
	/// to create.
	AbandonBacklog,
}

/// Transaction pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
	/// First account nonce to stamp into transactions. When unset the
	/// manager leaves `Transaction::nonce` untouched and the executor
	/// is expected to manage nonces itself.
	pub starting_nonce: Option<u64>,
	/// Backlog behaviour after a failed transaction
	pub failure_policy: FailurePolicy,
	/// Whether the tracing observer logs per-transaction records at
	/// `debug` instead of `trace`
	pub verbose_logging: bool,
}

impl SettlementConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("SETTLEMENT"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("SETTLEMENT"))
			.build()?;

		cfg.try_deserialize()
	}
}
