//! Worker lifecycle state.
//!
//! ## Lifecycle
//! 1. **Install**: flush every cache, pre-warm static icons
//! 2. **Waiting**: skipped, the worker always asks to skip waiting
//! 3. **Activate**: claim every open page
//!
//! A worker whose install fails becomes redundant.

use color_eyre::{eyre::eyre, Result};
use std::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
  Parsed,
  Installing,
  /// Installed, waiting for the previous worker's pages to close
  Waiting,
  Activating,
  Active,
  Redundant,
}

fn is_valid_transition(from: LifecycleState, to: LifecycleState) -> bool {
  use LifecycleState::*;

  matches!(
    (from, to),
    (Parsed, Installing)
      | (Installing, Waiting)
      | (Installing, Activating)
      | (Waiting, Activating)
      | (Activating, Active)
      | (Parsed | Installing | Waiting | Activating | Active, Redundant)
  )
}

/// Tracks where the worker is in its install/activate sequence.
pub struct Lifecycle {
  state: Mutex<LifecycleState>,
  skip_waiting: Mutex<bool>,
}

impl Default for Lifecycle {
  fn default() -> Self {
    Self::new()
  }
}

impl Lifecycle {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(LifecycleState::Parsed),
      skip_waiting: Mutex::new(false),
    }
  }

  pub fn state(&self) -> LifecycleState {
    self
      .state
      .lock()
      .map(|s| *s)
      .unwrap_or(LifecycleState::Redundant)
  }

  /// Ask to activate as soon as install finishes, without waiting for pages
  /// controlled by a previous worker to close.
  pub fn skip_waiting(&self) {
    if let Ok(mut skip) = self.skip_waiting.lock() {
      *skip = true;
    }
  }

  pub fn skips_waiting(&self) -> bool {
    self.skip_waiting.lock().map(|s| *s).unwrap_or(false)
  }

  pub fn transition(&self, to: LifecycleState) -> Result<()> {
    let mut state = self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    if !is_valid_transition(*state, to) {
      return Err(eyre!("Invalid lifecycle transition {:?} -> {:?}", *state, to));
    }

    info!(from = ?*state, to = ?to, "lifecycle transition");
    *state = to;
    Ok(())
  }

  /// State after a successful install.
  pub fn installed(&self) -> Result<()> {
    if self.skips_waiting() {
      self.transition(LifecycleState::Activating)
    } else {
      self.transition(LifecycleState::Waiting)
    }
  }

  /// Move to `Activating` unless already there.
  pub fn begin_activation(&self) -> Result<()> {
    if self.state() == LifecycleState::Activating {
      return Ok(());
    }
    self.transition(LifecycleState::Activating)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_skip_waiting_bypasses_waiting() {
    let lifecycle = Lifecycle::new();
    lifecycle.transition(LifecycleState::Installing).unwrap();
    lifecycle.skip_waiting();
    lifecycle.installed().unwrap();
    assert_eq!(lifecycle.state(), LifecycleState::Activating);
  }

  #[test]
  fn test_without_skip_waiting_parks_in_waiting() {
    let lifecycle = Lifecycle::new();
    lifecycle.transition(LifecycleState::Installing).unwrap();
    lifecycle.installed().unwrap();
    assert_eq!(lifecycle.state(), LifecycleState::Waiting);

    lifecycle.begin_activation().unwrap();
    lifecycle.transition(LifecycleState::Active).unwrap();
    assert_eq!(lifecycle.state(), LifecycleState::Active);
  }

  #[test]
  fn test_invalid_transitions_rejected() {
    let lifecycle = Lifecycle::new();
    assert!(lifecycle.transition(LifecycleState::Active).is_err());
    assert_eq!(lifecycle.state(), LifecycleState::Parsed);

    lifecycle.transition(LifecycleState::Redundant).unwrap();
    assert!(lifecycle.transition(LifecycleState::Installing).is_err());
  }
}
