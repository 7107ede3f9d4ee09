//! The per-layer causal graph structure.
//!
//! Vertices are blocks, identified by name and stamped with an insertion
//! sequence number (the topological tie-break). Edges are live port-to-port
//! connections; parallel edges between the same pair of blocks are allowed
//! as long as they use different ports.
//!
//! Latch marks are kept per `(source, sink)` block pair and survive edge
//! rebuilds: the scheme clears and re-derives all edges from the port
//! substrate whenever topology changes, and every re-added edge picks its
//! latch flag back up from the pair mark.

use std::collections::{HashMap, HashSet};

use bf_core::{BlockId, Layer, PortName};

use crate::error::{GraphError, GraphResult};
use crate::ordering;

/// A live connection from one block's output port to another block's input
/// port on a single layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Producing block.
    pub source: BlockId,
    /// Consuming block.
    pub sink: BlockId,
    /// Output port on the producing block.
    pub source_port: PortName,
    /// Input port on the consuming block.
    pub sink_port: PortName,
    /// Latched edges are ignored by the topological sort and by conflict
    /// tracking; the downstream block sees previous-cycle values.
    pub latched: bool,
    /// Whether the sink port is declared `Exclusivity::Exclusive`.
    pub exclusive_sink: bool,
}

/// Causal graph of one layer: blocks and the connections between them.
#[derive(Debug, Clone)]
pub struct CausalGraph {
    layer: Layer,
    /// Vertex name -> insertion sequence number.
    vertices: HashMap<BlockId, u64>,
    /// Vertex names in insertion order.
    insertion: Vec<BlockId>,
    next_seq: u64,
    edges: Vec<Edge>,
    /// Block pairs whose connections are latched. Kept by name so the mark
    /// survives edge rebuilds.
    latched_pairs: HashSet<(BlockId, BlockId)>,
}

impl CausalGraph {
    /// Create an empty graph for `layer`.
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            vertices: HashMap::new(),
            insertion: Vec::new(),
            next_seq: 0,
            edges: Vec::new(),
            latched_pairs: HashSet::new(),
        }
    }

    /// The layer this graph belongs to.
    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether `name` is a vertex of this graph.
    pub fn contains(&self, name: &BlockId) -> bool {
        self.vertices.contains_key(name)
    }

    /// Vertex names in insertion order.
    pub fn vertex_names(&self) -> &[BlockId] {
        &self.insertion
    }

    /// Insertion sequence number of a vertex.
    pub(crate) fn sequence(&self, name: &BlockId) -> Option<u64> {
        self.vertices.get(name).copied()
    }

    /// All edges currently in the graph.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Add a vertex for `name`.
    pub fn add_vertex(&mut self, name: &BlockId) -> GraphResult<()> {
        if self.vertices.contains_key(name) {
            return Err(GraphError::DuplicateBlock {
                layer: self.layer,
                name: name.clone(),
            });
        }
        self.vertices.insert(name.clone(), self.next_seq);
        self.next_seq += 1;
        self.insertion.push(name.clone());
        Ok(())
    }

    /// Remove a vertex and all its incident edges. Removing an absent vertex
    /// is a no-op. Latch marks naming the vertex are kept, so a re-added
    /// block keeps its latches.
    pub fn remove_vertex(&mut self, name: &BlockId) {
        if self.vertices.remove(name).is_none() {
            return;
        }
        self.insertion.retain(|v| v != name);
        self.edges.retain(|e| &e.source != name && &e.sink != name);
    }

    /// Drop every edge, keeping vertices and latch marks. The first step of
    /// a rebuild.
    pub fn clear_edges(&mut self) {
        self.edges.clear();
    }

    /// Add an edge for a live channel. The latch flag is derived from the
    /// pair marks set through [`CausalGraph::set_latched`].
    pub fn add_edge(
        &mut self,
        source: &BlockId,
        sink: &BlockId,
        source_port: PortName,
        sink_port: PortName,
        exclusive_sink: bool,
    ) -> GraphResult<()> {
        for endpoint in [source, sink] {
            if !self.vertices.contains_key(endpoint) {
                return Err(GraphError::UnknownVertex {
                    layer: self.layer,
                    name: endpoint.clone(),
                });
            }
        }
        let latched = self.is_latched(source, sink);
        self.edges.push(Edge {
            source: source.clone(),
            sink: sink.clone(),
            source_port,
            sink_port,
            latched,
            exclusive_sink,
        });
        Ok(())
    }

    /// All edges between a pair of blocks.
    pub fn edges_between(&self, source: &BlockId, sink: &BlockId) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| &e.source == source && &e.sink == sink)
            .collect()
    }

    /// Mark or unmark every connection between `source` and `sink` as
    /// latched. Marking a pair with no current edges is not an error; the
    /// mark applies to edges added later.
    pub fn set_latched(&mut self, source: &BlockId, sink: &BlockId, latched: bool) {
        let pair = (source.clone(), sink.clone());
        if latched {
            self.latched_pairs.insert(pair);
        } else {
            self.latched_pairs.remove(&pair);
        }
        for edge in &mut self.edges {
            if &edge.source == source && &edge.sink == sink {
                edge.latched = latched;
            }
        }
    }

    /// Whether connections from `source` to `sink` are latched.
    pub fn is_latched(&self, source: &BlockId, sink: &BlockId) -> bool {
        self.latched_pairs
            .contains(&(source.clone(), sink.clone()))
    }

    /// Check that no exclusive input port has more than one non-latched
    /// incoming edge.
    pub fn validate_exclusivity(&self) -> GraphResult<()> {
        let mut sources: HashMap<(&BlockId, &PortName), usize> = HashMap::new();
        for edge in &self.edges {
            if edge.latched || !edge.exclusive_sink {
                continue;
            }
            *sources.entry((&edge.sink, &edge.sink_port)).or_default() += 1;
        }
        for ((block, port), count) in sources {
            if count > 1 {
                return Err(GraphError::ExclusivityViolation {
                    block: block.clone(),
                    port: port.clone(),
                    count,
                });
            }
        }
        Ok(())
    }

    /// Topological order of the non-latched subgraph, tie-broken by vertex
    /// insertion sequence.
    pub fn topological_order(&self) -> GraphResult<Vec<BlockId>> {
        ordering::sort(self)
    }
}
