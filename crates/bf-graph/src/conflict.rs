//! Exclusive-input conflict tracking.
//!
//! The two endpoint blocks of any non-latched edge into an `Exclusive`
//! input conflict with each other: at most one of them may be running. The
//! index is recomputed from the layer graphs after every successful rebuild
//! and is symmetric by construction.

use std::collections::{HashMap, HashSet};

use bf_core::BlockId;

use crate::graph::CausalGraph;

/// Per-block sets of conflicting blocks.
#[derive(Debug, Clone, Default)]
pub struct ConflictIndex {
    map: HashMap<BlockId, HashSet<BlockId>>,
}

impl ConflictIndex {
    /// Build the index from every layer graph of a scheme.
    pub fn from_graphs<'a>(graphs: impl IntoIterator<Item = &'a CausalGraph>) -> Self {
        let mut map: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();
        for graph in graphs {
            for edge in graph.edges() {
                if edge.latched || !edge.exclusive_sink {
                    continue;
                }
                map.entry(edge.source.clone())
                    .or_default()
                    .insert(edge.sink.clone());
                map.entry(edge.sink.clone())
                    .or_default()
                    .insert(edge.source.clone());
            }
        }
        Self { map }
    }

    /// Blocks conflicting with `name`, sorted for stable iteration.
    pub fn conflicts_of(&self, name: &BlockId) -> Vec<BlockId> {
        let mut conflicts: Vec<BlockId> = self
            .map
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        conflicts.sort();
        conflicts
    }

    /// Constant-time conflict membership test.
    pub fn are_conflicting(&self, a: &BlockId, b: &BlockId) -> bool {
        self.map.get(a).is_some_and(|set| set.contains(b))
    }

    /// Whether any conflicts are recorded.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_core::{Layer, PortName};

    fn exclusive_pair() -> CausalGraph {
        let mut graph = CausalGraph::new(Layer::Control);
        for name in ["writer", "owner"] {
            graph.add_vertex(&BlockId::new(name)).unwrap();
        }
        graph
            .add_edge(
                &BlockId::new("writer"),
                &BlockId::new("owner"),
                PortName::new("out"),
                PortName::new("in_ex"),
                true,
            )
            .unwrap();
        graph
    }

    #[test]
    fn exclusive_edge_conflicts_both_ways() {
        let graph = exclusive_pair();
        let index = ConflictIndex::from_graphs([&graph]);

        assert!(index.are_conflicting(&BlockId::new("writer"), &BlockId::new("owner")));
        assert!(index.are_conflicting(&BlockId::new("owner"), &BlockId::new("writer")));
        assert_eq!(
            index.conflicts_of(&BlockId::new("writer")),
            vec![BlockId::new("owner")]
        );
    }

    #[test]
    fn unrestricted_edge_has_no_conflict() {
        let mut graph = CausalGraph::new(Layer::Control);
        for name in ["a", "b"] {
            graph.add_vertex(&BlockId::new(name)).unwrap();
        }
        graph
            .add_edge(
                &BlockId::new("a"),
                &BlockId::new("b"),
                PortName::new("out"),
                PortName::new("in"),
                false,
            )
            .unwrap();

        let index = ConflictIndex::from_graphs([&graph]);
        assert!(index.is_empty());
    }

    #[test]
    fn latched_exclusive_edge_ignored() {
        let mut graph = exclusive_pair();
        graph.set_latched(&BlockId::new("writer"), &BlockId::new("owner"), true);

        let index = ConflictIndex::from_graphs([&graph]);
        assert!(index.is_empty());
    }
}
