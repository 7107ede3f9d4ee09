//! bf-graph: causal graph layer for blockflow.
//!
//! Provides:
//! - `CausalGraph`: a labelled directed multigraph of blocks, one per layer
//! - Deterministic topological ordering of the non-latched subgraph
//! - `OrderIndex`: position lookup and forward/reverse sorting of name sets
//! - `ConflictIndex`: symmetric exclusive-input conflict tracking
//!
//! Edges represent live port-to-port connections. An edge marked *latched*
//! still exists (it documents the data flow) but is ignored by the
//! topological sort and by conflict tracking, which is how intentional
//! feedback loops are broken.
//!
//! # Example
//!
//! ```
//! use bf_core::{BlockId, Layer, PortName};
//! use bf_graph::CausalGraph;
//!
//! let mut graph = CausalGraph::new(Layer::Control);
//! graph.add_vertex(&BlockId::new("source")).unwrap();
//! graph.add_vertex(&BlockId::new("sink")).unwrap();
//! graph
//!     .add_edge(
//!         &BlockId::new("source"),
//!         &BlockId::new("sink"),
//!         PortName::new("out"),
//!         PortName::new("in"),
//!         false,
//!     )
//!     .unwrap();
//!
//! let order = graph.topological_order().unwrap();
//! assert_eq!(order, vec![BlockId::new("source"), BlockId::new("sink")]);
//! ```

pub mod conflict;
pub mod error;
pub mod graph;
pub mod ordering;

// Re-exports for ergonomics
pub use conflict::ConflictIndex;
pub use error::{GraphError, GraphResult};
pub use graph::{CausalGraph, Edge};
pub use ordering::OrderIndex;
