//! Block lifecycle states and input exclusivity modes.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a block.
///
/// The scheme never drives `configure`; blocks arrive either `Unconfigured`
/// or `Stopped` and the scheme moves them between `Stopped` and `Running`
/// through their `start`/`stop` hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    /// Created but not yet configured; cannot be enabled.
    Unconfigured,
    /// Configured and idle.
    Stopped,
    /// Executing its per-cycle hooks.
    Running,
}

impl BlockState {
    /// Whether the block has passed configuration.
    pub fn is_configured(self) -> bool {
        !matches!(self, BlockState::Unconfigured)
    }

    /// Whether the block is currently running.
    pub fn is_running(self) -> bool {
        matches!(self, BlockState::Running)
    }
}

/// Exclusivity mode of an input port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusivity {
    /// Any number of upstream producers may feed this input.
    #[default]
    Unrestricted,
    /// At most one upstream producer at a time, enforced structurally at
    /// graph rebuild and dynamically at enable time.
    Exclusive,
}
