//! Error types for causal graph operations.

use bf_core::{BlockId, Layer, PortName};
use thiserror::Error;

/// Result type for causal graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while mutating or serializing a causal graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A vertex with this name already exists on the layer.
    #[error("block '{name}' is already a vertex of the {layer} layer")]
    DuplicateBlock { layer: Layer, name: BlockId },

    /// An edge endpoint is not a vertex of the layer.
    #[error("block '{name}' is not a vertex of the {layer} layer")]
    UnknownVertex { layer: Layer, name: BlockId },

    /// An exclusive input port would have more than one live source.
    #[error("exclusive input '{block}.{port}' has {count} non-latched sources")]
    ExclusivityViolation {
        block: BlockId,
        port: PortName,
        count: usize,
    },

    /// The non-latched subgraph contains a cycle.
    #[error("the {layer} layer is cyclic; unsortable blocks: {unsorted:?}")]
    Cyclic {
        layer: Layer,
        unsorted: Vec<BlockId>,
    },
}
