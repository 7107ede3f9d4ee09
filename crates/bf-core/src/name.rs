//! String newtypes identifying blocks and ports.
//!
//! Blocks are identified by name within a scheme; ports are identified by
//! name within their owning block. Both are plain strings at the boundary,
//! wrapped so the two namespaces cannot be mixed up.

use serde::{Deserialize, Serialize};

/// Unique identifier for a block within a scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub String);

impl BlockId {
    /// Create a new block ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a port on a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortName(pub String);

impl PortName {
    /// Create a new port name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PortName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for PortName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl std::fmt::Display for PortName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_id_round_trip() {
        let id = BlockId::new("pid_loop");
        assert_eq!(id.as_str(), "pid_loop");
        assert_eq!(BlockId::from("pid_loop"), id);
    }

    #[test]
    fn port_name_display() {
        let port = PortName::new("out1");
        assert_eq!(port.to_string(), "out1");
    }
}
