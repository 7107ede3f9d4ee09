//! Peer lookup for name-based registration.
//!
//! `add_block(name)` needs to resolve a name to a block handle. That lookup
//! belongs to the host, so it is injected as a [`PeerDirectory`] rather
//! than read from process-global state. [`StaticDirectory`] is the obvious
//! implementation for hosts (and tests) that know their peers up front.

use crate::block::BlockRef;

/// Host-supplied view of the peer components a scheme may register.
pub trait PeerDirectory {
    /// Names of every known peer, in a stable order.
    fn peer_names(&self) -> Vec<String>;

    /// Whether a peer with this name exists at all.
    fn has_peer(&self, name: &str) -> bool;

    /// Resolve a peer to its block handle. Returns `None` when the peer
    /// exists but does not implement the block hook contract.
    fn resolve(&self, name: &str) -> Option<BlockRef>;
}

/// A fixed peer directory populated up front.
#[derive(Default)]
pub struct StaticDirectory {
    entries: Vec<(String, Option<BlockRef>)>,
}

impl StaticDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scheme-capable block under its own name.
    pub fn add_block(&mut self, block: BlockRef) {
        let name = block.borrow().name().to_string();
        self.entries.push((name, Some(block)));
    }

    /// Register a peer that exists but lacks the block hook contract.
    pub fn add_plain_peer(&mut self, name: impl Into<String>) {
        self.entries.push((name.into(), None));
    }
}

impl PeerDirectory for StaticDirectory {
    fn peer_names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    fn has_peer(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    fn resolve(&self, name: &str) -> Option<BlockRef> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, block)| block.clone())
    }
}
