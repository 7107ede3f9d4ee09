//! bf-scheme: composes real-time control blocks into one periodic controller.
//!
//! A [`Scheme`] owns two causal graph layers (estimation, control). Blocks
//! are registered by name through an injected [`PeerDirectory`] or directly
//! by handle; their port connections are discovered from the [`Wiring`]
//! substrate, serialized into a deterministic causal execution order, and
//! executed once per host cycle by [`Scheme::update`]. Subsets of blocks can
//! be enabled and disabled at runtime; enabling walks the forward order,
//! disabling the reverse order, and exclusive-input conflicts are either
//! refused or force-resolved.
//!
//! # Architecture
//!
//! - Blocks implement the [`Block`] hook contract and are owned by the host;
//!   the scheme holds shared handles and never destroys a block.
//! - All operations run on the host's periodic thread; nothing here is
//!   thread-safe and nothing needs to be.
//! - Every public operation returns `bool` and logs its failure reason;
//!   errors never propagate past the operation boundary.

pub mod block;
pub mod error;
pub mod plan;
pub mod registry;
pub mod scheme;
pub mod wiring;

mod runtime;

#[cfg(test)]
pub(crate) mod testblock;

// Re-exports for public API
pub use block::{Block, BlockRef};
pub use error::{SchemeError, SchemeResult};
pub use plan::{PlanConnection, PlanLatch, WiringPlan};
pub use registry::{PeerDirectory, StaticDirectory};
pub use scheme::Scheme;
pub use wiring::{Channel, Endpoint, Wiring};
