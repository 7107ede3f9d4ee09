//! Topological serialization of the non-latched subgraph.
//!
//! Kahn's algorithm with a deterministic tie-break: whenever more than one
//! vertex is ready, the one with the smallest insertion sequence number is
//! emitted first. The order is therefore reproducible for a given
//! construction sequence, which callers rely on when comparing enable
//! traces against expected orderings.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use bf_core::BlockId;

use crate::error::{GraphError, GraphResult};
use crate::graph::CausalGraph;

/// Compute the topological order of `graph`'s non-latched subgraph.
pub(crate) fn sort(graph: &CausalGraph) -> GraphResult<Vec<BlockId>> {
    let mut in_degree: HashMap<&BlockId, usize> = HashMap::new();
    let mut successors: HashMap<&BlockId, Vec<&BlockId>> = HashMap::new();

    for name in graph.vertex_names() {
        in_degree.insert(name, 0);
    }
    for edge in graph.edges() {
        if edge.latched {
            continue;
        }
        successors.entry(&edge.source).or_default().push(&edge.sink);
        *in_degree.get_mut(&edge.sink).expect("edge endpoints are vertices") += 1;
    }

    // Ready vertices, smallest insertion sequence first.
    let mut ready: BinaryHeap<Reverse<(u64, &BlockId)>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| {
            let seq = graph.sequence(name).expect("vertex has a sequence");
            Reverse((seq, *name))
        })
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(Reverse((_, name))) = ready.pop() {
        order.push(name.clone());

        if let Some(next) = successors.get(name) {
            for &sink in next {
                let degree = in_degree.get_mut(sink).expect("edge endpoints are vertices");
                *degree -= 1;
                if *degree == 0 {
                    let seq = graph.sequence(sink).expect("vertex has a sequence");
                    ready.push(Reverse((seq, sink)));
                }
            }
        }
    }

    if order.len() != graph.len() {
        let unsorted = graph
            .vertex_names()
            .iter()
            .filter(|name| !order.contains(*name))
            .cloned()
            .collect();
        return Err(GraphError::Cyclic {
            layer: graph.layer(),
            unsorted,
        });
    }

    Ok(order)
}

/// Position lookup over a published ordering.
///
/// Used by the runtime controller to traverse arbitrary name sets in the
/// scheme's forward or reverse execution order.
#[derive(Debug, Clone, Default)]
pub struct OrderIndex {
    positions: HashMap<BlockId, usize>,
}

impl OrderIndex {
    /// Build an index over an ordering.
    pub fn new(order: &[BlockId]) -> Self {
        let positions = order
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { positions }
    }

    /// Position of `name` in the ordering, if present.
    pub fn position(&self, name: &BlockId) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Sort `names` into forward execution order. Names absent from the
    /// ordering go last, keeping their input order.
    pub fn sort_forward(&self, names: &[BlockId]) -> Vec<BlockId> {
        self.sorted(names, false)
    }

    /// Sort `names` into reverse execution order. Names absent from the
    /// ordering go last, keeping their input order.
    pub fn sort_reverse(&self, names: &[BlockId]) -> Vec<BlockId> {
        self.sorted(names, true)
    }

    fn sorted(&self, names: &[BlockId], reverse: bool) -> Vec<BlockId> {
        let (mut known, unknown): (Vec<BlockId>, Vec<BlockId>) = names
            .iter()
            .cloned()
            .partition(|name| self.positions.contains_key(name));

        known.sort_by_key(|name| self.positions[name]);
        if reverse {
            known.reverse();
        }
        known.extend(unknown);
        known
    }
}
