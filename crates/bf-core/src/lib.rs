//! bf-core: stable foundation for blockflow.
//!
//! Contains:
//! - name (string newtypes identifying blocks and ports)
//! - layer (the estimation/control layer pair and per-layer storage)
//! - state (block lifecycle states and input exclusivity modes)

pub mod layer;
pub mod name;
pub mod state;

// Re-exports: nice ergonomics for downstream crates
pub use layer::{Layer, PerLayer};
pub use name::{BlockId, PortName};
pub use state::{BlockState, Exclusivity};
