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

use std::collections::HashMap;

use meridian_settlement::SettlementConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Component name for log files
pub const LOG_COMPONENT_NAME: &str = "framework";

/// Default console output setting
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

/// Environment prefix for framework settings
pub const ENV_PREFIX: &str = "MERIDIAN";

/// Default fill tolerance: one unit at four decimal places
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Default pair traded by the paper harness
pub const DEFAULT_PAPER_PAIR: &str = "WETH/USDC";

/// Default interval between simulated order-book snapshots
pub const DEFAULT_BOOK_INTERVAL_MS: u64 = 500;

/// Default simulated confirmation latency
pub const DEFAULT_EXECUTOR_LATENCY_MS: u64 = 200;

/// Framework configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
	/// Address whose orders the tracker follows
	pub owner: String,
	/// Fill tolerance for pairs without an override
	pub default_tolerance: Decimal,
	/// Per-pair fill tolerance overrides
	pub pair_tolerances: HashMap<String, Decimal>,
	/// Log every routed event and completed transaction at debug level
	pub verbose_logging: bool,
	/// Transaction pipeline settings
	pub settlement: SettlementConfig,
	/// Paper trading harness settings
	pub paper: PaperConfig,
}

impl Default for FrameworkConfig {
	fn default() -> Self {
		Self {
			owner: "0x0000000000000000000000000000000000000000".to_string(),
			default_tolerance: DEFAULT_TOLERANCE,
			pair_tolerances: HashMap::new(),
			verbose_logging: false,
			settlement: SettlementConfig::default(),
			paper: PaperConfig::default(),
		}
	}
}

impl FrameworkConfig {
	/// Load configuration from environment variables
	///
	/// Keys use the `MERIDIAN_` prefix and `__` for nesting, e.g.
	/// `MERIDIAN_SETTLEMENT__FAILURE_POLICY=abandon_backlog`.
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(Self::environment())
			.build()?;

		let config: Self = cfg.try_deserialize()?;
		config.validate()?;
		Ok(config)
	}

	/// Load configuration from file, with environment overrides on top
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(Self::environment())
			.build()?;

		let config: Self = cfg.try_deserialize()?;
		config.validate()?;
		Ok(config)
	}

	fn environment() -> config::Environment {
		config::Environment::with_prefix(ENV_PREFIX)
			.prefix_separator("_")
			.separator("__")
	}

	/// Check values serde cannot express
	pub fn validate(&self) -> Result<(), config::ConfigError> {
		if self.default_tolerance <= Decimal::ZERO {
			return Err(config::ConfigError::Message(format!(
				"default_tolerance must be strictly positive, got {}",
				self.default_tolerance
			)));
		}
		if let Some((pair, tolerance)) = self
			.pair_tolerances
			.iter()
			.find(|(_, tolerance)| **tolerance <= Decimal::ZERO)
		{
			return Err(config::ConfigError::Message(format!(
				"tolerance for {} must be strictly positive, got {}",
				pair, tolerance
			)));
		}
		if self.paper.book_interval_ms == 0 {
			return Err(config::ConfigError::Message(
				"paper.book_interval_ms must be greater than zero".to_string(),
			));
		}
		Ok(())
	}
}

/// Paper trading harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
	/// Pair the simulated book is quoted in
	pub pair_name: String,
	/// Mid price the simulated book starts at
	pub start_price: Decimal,
	/// Size of each simulated order
	pub order_size: Decimal,
	/// Interval between simulated snapshots
	pub book_interval_ms: u64,
	/// Simulated time until a transaction is mined
	pub executor_latency_ms: u64,
	/// Every n-th simulated transaction times out (0 disables failures)
	pub fail_every: u64,
}

impl Default for PaperConfig {
	fn default() -> Self {
		Self {
			pair_name: DEFAULT_PAPER_PAIR.to_string(),
			start_price: Decimal::from(2000),
			order_size: Decimal::ONE,
			book_interval_ms: DEFAULT_BOOK_INTERVAL_MS,
			executor_latency_ms: DEFAULT_EXECUTOR_LATENCY_MS,
			fail_every: 0,
		}
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use meridian_settlement::FailurePolicy;
	use rust_decimal_macros::dec;

	use super::*;

	#[test]
	fn test_defaults_are_valid() {
		let config = FrameworkConfig::default();
		assert_eq!(config.default_tolerance, dec!(0.0001));
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_rejects_non_positive_tolerance() {
		let mut config = FrameworkConfig::default();
		config
			.pair_tolerances
			.insert("WBTC/USDC".to_string(), dec!(0));
		assert!(config.validate().is_err());

		config.pair_tolerances.clear();
		config.default_tolerance = dec!(-1);
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_from_file_with_nested_sections() {
		let path = std::env::temp_dir().join(format!("meridian-config-{}.toml", uuid::Uuid::new_v4()));
		fs::write(
			&path,
			r#"
owner = "0xA11CE"
default_tolerance = "0.0005"
verbose_logging = true

[settlement]
starting_nonce = 12
failure_policy = "abandon_backlog"

[paper]
book_interval_ms = 50
"#,
		)
		.unwrap();

		let config = FrameworkConfig::from_file(path.to_str().unwrap()).unwrap();
		fs::remove_file(&path).ok();

		assert_eq!(config.owner, "0xA11CE");
		assert_eq!(config.default_tolerance, dec!(0.0005));
		assert!(config.verbose_logging);
		assert_eq!(config.settlement.starting_nonce, Some(12));
		assert_eq!(config.settlement.failure_policy, FailurePolicy::AbandonBacklog);
		assert_eq!(config.paper.book_interval_ms, 50);
		assert_eq!(config.paper.pair_name, DEFAULT_PAPER_PAIR);
	}

	#[test]
	fn test_from_file_rejects_invalid_values_instead_of_defaulting() {
		let path = std::env::temp_dir().join(format!("meridian-config-{}.toml", uuid::Uuid::new_v4()));
		fs::write(&path, "default_tolerance = \"-0.5\"\n").unwrap();

		let result = FrameworkConfig::from_file(path.to_str().unwrap());
		fs::remove_file(&path).ok();

		match result {
			Err(config::ConfigError::Message(message)) => {
				assert!(message.contains("default_tolerance"));
			}
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn test_from_file_fills_missing_keys_with_defaults() {
		let path = std::env::temp_dir().join(format!("meridian-config-{}.toml", uuid::Uuid::new_v4()));
		fs::write(&path, "owner = \"0xB0B\"\n").unwrap();

		let config = FrameworkConfig::from_file(path.to_str().unwrap()).unwrap();
		fs::remove_file(&path).ok();

		assert_eq!(config.owner, "0xB0B");
		assert_eq!(config.default_tolerance, DEFAULT_TOLERANCE);
		assert_eq!(config.paper.book_interval_ms, DEFAULT_BOOK_INTERVAL_MS);
	}
}
