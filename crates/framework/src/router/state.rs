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

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a framework
///
/// `Created -> Started -> Running -> Stopped`. `Started` covers the
/// window where the startup hook, the transaction manager and the
/// queue workers are being brought up. A framework stopped before it
/// started goes straight from `Created` to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameworkState {
	Created = 0,
	Started = 1,
	Running = 2,
	Stopped = 3,
}

impl FrameworkState {
	fn from_u8(value: u8) -> Self {
		match value {
			0 => FrameworkState::Created,
			1 => FrameworkState::Started,
			2 => FrameworkState::Running,
			_ => FrameworkState::Stopped,
		}
	}
}

/// Lock-free cell holding a [`FrameworkState`]
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
	pub(crate) fn new(state: FrameworkState) -> Self {
		Self(AtomicU8::new(state as u8))
	}

	pub(crate) fn load(&self) -> FrameworkState {
		FrameworkState::from_u8(self.0.load(Ordering::Acquire))
	}

	/// Move from `from` to `to`; on failure returns the current state
	pub(crate) fn transition(
		&self,
		from: FrameworkState,
		to: FrameworkState,
	) -> Result<(), FrameworkState> {
		self.0
			.compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
			.map(|_| ())
			.map_err(FrameworkState::from_u8)
	}

	/// Mark stopped, returning the previous state
	pub(crate) fn stop(&self) -> FrameworkState {
		FrameworkState::from_u8(self.0.swap(FrameworkState::Stopped as u8, Ordering::AcqRel))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transitions() {
		let state = AtomicState::new(FrameworkState::Created);

		assert!(state.transition(FrameworkState::Created, FrameworkState::Started).is_ok());
		assert_eq!(
			state.transition(FrameworkState::Created, FrameworkState::Started),
			Err(FrameworkState::Started)
		);

		assert!(state.transition(FrameworkState::Started, FrameworkState::Running).is_ok());
		assert_eq!(state.stop(), FrameworkState::Running);
		assert_eq!(state.load(), FrameworkState::Stopped);
	}
}
