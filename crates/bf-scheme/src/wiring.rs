//! The port connection substrate.
//!
//! The scheme does not move data itself; it only needs to know which output
//! ports feed which input ports. `Wiring` is that record: a flat list of
//! channels, each resolving to a source endpoint and a sink endpoint. The
//! causal graphs are re-derived from it on every rebuild.

use bf_core::{BlockId, PortName};
use serde::{Deserialize, Serialize};

/// One end of a channel: a port on a named block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub block: BlockId,
    pub port: PortName,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(block: impl Into<BlockId>, port: impl Into<PortName>) -> Self {
        Self {
            block: block.into(),
            port: port.into(),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.block, self.port)
    }
}

/// A live connection from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub source: Endpoint,
    pub sink: Endpoint,
}

/// The connection table. Parallel channels between the same pair of blocks
/// are permitted; an identical duplicate channel is rejected.
#[derive(Debug, Clone, Default)]
pub struct Wiring {
    channels: Vec<Channel>,
}

impl Wiring {
    /// Create an empty wiring table.
    pub fn new() -> Self {
        Self::default()
    }

    /// All channels.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Record a channel. Returns `false` if an identical channel already
    /// exists.
    pub fn connect(&mut self, source: Endpoint, sink: Endpoint) -> bool {
        let channel = Channel { source, sink };
        if self.channels.contains(&channel) {
            return false;
        }
        self.channels.push(channel);
        true
    }

    /// Remove the most recently added channel matching the endpoints.
    /// Returns `false` if none matched.
    pub fn disconnect(&mut self, source: &Endpoint, sink: &Endpoint) -> bool {
        if let Some(pos) = self
            .channels
            .iter()
            .rposition(|c| &c.source == source && &c.sink == sink)
        {
            self.channels.remove(pos);
            true
        } else {
            false
        }
    }

    /// Channels whose source is the given port.
    pub fn channels_from<'a>(
        &'a self,
        block: &'a BlockId,
        port: &'a PortName,
    ) -> impl Iterator<Item = &'a Channel> {
        self.channels
            .iter()
            .filter(move |c| &c.source.block == block && &c.source.port == port)
    }
}
