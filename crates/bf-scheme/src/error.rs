//! Error types for scheme operations.

use bf_core::BlockId;
use bf_graph::GraphError;
use thiserror::Error;

/// Result type for scheme operations.
pub type SchemeResult<T> = Result<T, SchemeError>;

/// Errors that can occur during block registration and runtime control.
///
/// These never cross the public operation boundary: every operation returns
/// `bool` and logs the error it swallowed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemeError {
    /// The name is not present in the host's peer directory.
    #[error("block '{name}' is not a known peer")]
    UnknownBlock { name: BlockId },

    /// The peer exists but does not implement the block hook contract.
    #[error("peer '{name}' does not implement the block hook contract")]
    BlockLacksHook { name: BlockId },

    /// A block with this name is already registered.
    #[error("block '{name}' is already registered")]
    DuplicateBlock { name: BlockId },

    /// Graph rebuild failed (cycle or exclusivity violation).
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Enable refused: a conflicting block is running and `force` is off.
    #[error("cannot enable '{block}': conflicting block '{conflict}' is running")]
    ConflictingBlockRunning { block: BlockId, conflict: BlockId },

    /// Enable refused: the block has not been configured.
    #[error("cannot enable '{name}': it has not been configured")]
    BlockNotConfigured { name: BlockId },

    /// The block's own start hook reported failure.
    #[error("block '{name}' failed to start")]
    StartFailure { name: BlockId },

    /// The block's own stop hook reported failure.
    #[error("block '{name}' failed to stop")]
    StopFailure { name: BlockId },
}
