//! Declarative wiring plans.
//!
//! A `WiringPlan` is the serializable description of a scheme's connection
//! topology: which output ports feed which input ports, and which block
//! pairs are latched. Hosts can keep the plan in a config file and apply it
//! after registering their blocks.

use serde::{Deserialize, Serialize};

use crate::scheme::Scheme;

/// One planned channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConnection {
    pub source_block: String,
    pub source_port: String,
    pub sink_block: String,
    pub sink_port: String,
}

/// One planned latch mark between two blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLatch {
    pub source: String,
    pub sink: String,
}

/// Declarative connection and latch list for a scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringPlan {
    #[serde(default)]
    pub connections: Vec<PlanConnection>,
    #[serde(default)]
    pub latches: Vec<PlanLatch>,
}

impl WiringPlan {
    /// Apply every connection, then every latch. All steps are attempted;
    /// the result is the conjunction of the individual outcomes.
    pub fn apply(&self, scheme: &mut Scheme) -> bool {
        let mut success = true;
        for c in &self.connections {
            success &= scheme.connect(
                &c.source_block,
                &c.source_port,
                &c.sink_block,
                &c.sink_port,
            );
        }
        for l in &self.latches {
            success &= scheme.latch_connections(&l.source, &l.sink, true);
        }
        success
    }
}
