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

//! Paper trading entry point
//!
//! This binary wires up a complete strategy process against a simulated
//! node:
//! - Event Stream (MPSC ingress for feeds and transaction results)
//! - Framework (router, delivery queues, transaction manager)
//! - Order State Tracker (owned order bookkeeping)
//! - Paper Executor (simulated confirmations and fills)
//! - Simulated Book Feed (periodic order-book snapshots)

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

use meridian_framework::{
	EventStream, Framework, FrameworkConfig, OrderStateTracker, PaperExecutor, PaperStrategy,
	SimulatedBookFeed,
};

#[tokio::main]
async fn main() -> Result<()> {
	// Initialize logging first
	meridian_framework::logging::init_logging()?;

	// Load configuration; unset keys fall back to their defaults
	let config = FrameworkConfig::from_env().context("Invalid MERIDIAN_* configuration")?;

	info!(target: "server", "Starting Meridian paper trading");
	info!(target: "server", "Owner: {}", config.owner);
	info!(target: "server", "Pair: {}", config.paper.pair_name);
	info!(target: "server", "Failure policy: {:?}", config.settlement.failure_policy);

	// Phase 1: Framework on a fresh ingress stream
	let framework = Framework::new(config.clone(), EventStream::unbounded());
	let handle = framework.handle();

	// Phase 2: Strategy with its order tracker and simulated node
	let tracker =
		Arc::new(OrderStateTracker::from_config(&config).context("Invalid tolerance configuration")?);
	let executor = Arc::new(
		PaperExecutor::new(config.owner.clone(), &config.paper)
			.with_event_sender(handle.event_sender()),
	);
	let strategy = Arc::new(PaperStrategy::new(
		handle.clone(),
		executor,
		tracker,
		config.paper.order_size,
	));

	// Phase 3: Market data
	info!(target: "server", "Starting book feed...");
	let feed = SimulatedBookFeed::start(handle.event_sender(), &config.paper)
		.context("Failed to start book feed")?;

	// Phase 4: Router loop on a blocking thread
	info!(target: "server", "Starting framework...");
	let mut runner = tokio::task::spawn_blocking(move || framework.start(strategy));

	// Wait for the framework to stop on its own or for a shutdown signal
	let outcome = tokio::select! {
		result = &mut runner => result,
		_ = signal::ctrl_c() => {
			info!(target: "server", "Shutting down...");
			handle.stop();
			runner.await
		}
	};

	feed.shutdown();

	outcome
		.context("Framework thread panicked")?
		.context("Framework terminated with error")?;

	info!(target: "server", "Shutdown complete");
	Ok(())
}
