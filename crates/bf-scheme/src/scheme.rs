//! Scheme construction and causal graph maintenance.
//!
//! The scheme keeps one causal graph per layer. Graphs are not edited
//! incrementally: whenever the vertex set, the wiring, or the latch marks
//! change, the affected layers are rebuilt from scratch: edges cleared,
//! re-derived from the wiring table, exclusivity validated, and a fresh
//! topological ordering published. A failed rebuild leaves the previous
//! ordering in place and the triggering mutation is rolled back, so readers
//! always observe a consistent scheme.

use std::collections::HashMap;
use std::time::Duration;

use bf_core::{BlockId, Exclusivity, Layer, PerLayer, PortName};
use bf_graph::{CausalGraph, ConflictIndex, OrderIndex};
use tracing::{debug, error, warn};

use crate::block::BlockRef;
use crate::error::{SchemeError, SchemeResult};
use crate::registry::PeerDirectory;
use crate::wiring::{Endpoint, Wiring};

/// Per-block record: the handle plus the tick driver's bookkeeping.
pub(crate) struct BlockEntry {
    pub(crate) handle: BlockRef,
    /// Last execution time per layer, measured on the host's monotonic
    /// clock. Zero until the block first runs.
    pub(crate) last_exec: PerLayer<Duration>,
}

/// One layer's graph and its published serialization.
pub(crate) struct LayerState {
    pub(crate) graph: CausalGraph,
    pub(crate) ordering: Vec<BlockId>,
    pub(crate) index: OrderIndex,
}

impl LayerState {
    fn new(layer: Layer) -> Self {
        Self {
            graph: CausalGraph::new(layer),
            ordering: Vec::new(),
            index: OrderIndex::default(),
        }
    }
}

/// A composed controller: registered blocks, two causal layers, and the
/// runtime operations that enable, disable, and execute them.
pub struct Scheme {
    directory: Box<dyn PeerDirectory>,
    wiring: Wiring,
    pub(crate) blocks: HashMap<BlockId, BlockEntry>,
    /// Registration order, reported by `get_blocks` and used as the
    /// disable set of `set_blocks`.
    block_names: Vec<BlockId>,
    pub(crate) layers: PerLayer<LayerState>,
    pub(crate) conflicts: ConflictIndex,
}

impl Scheme {
    /// Create a scheme over the host's peer directory.
    pub fn new(directory: Box<dyn PeerDirectory>) -> Self {
        Self {
            directory,
            wiring: Wiring::new(),
            blocks: HashMap::new(),
            block_names: Vec::new(),
            layers: PerLayer::from_fn(LayerState::new),
            conflicts: ConflictIndex::default(),
        }
    }

    /// The connection table.
    pub fn wiring(&self) -> &Wiring {
        &self.wiring
    }

    /// Registered block names, in registration order.
    pub fn get_blocks(&self) -> Vec<String> {
        self.block_names
            .iter()
            .map(|name| name.as_str().to_string())
            .collect()
    }

    /// Block group names. No grouping extension is implemented; always
    /// empty.
    pub fn get_groups(&self) -> Vec<String> {
        Vec::new()
    }

    /// The current control-layer execution order.
    pub fn get_execution_order(&self) -> Vec<String> {
        self.layer_order(Layer::Control)
    }

    /// The current execution order of `layer`.
    pub fn layer_order(&self, layer: Layer) -> Vec<String> {
        self.layers
            .get(layer)
            .ordering
            .iter()
            .map(|name| name.as_str().to_string())
            .collect()
    }

    /// Whether `name` is registered.
    pub fn has_block(&self, name: &str) -> bool {
        self.blocks.contains_key(&BlockId::from(name))
    }

    /// Whether a registered block is currently running. Unregistered names
    /// report `false`.
    pub fn is_block_running(&self, name: &str) -> bool {
        self.blocks
            .get(&BlockId::from(name))
            .map(|entry| entry.handle.borrow().state().is_running())
            .unwrap_or(false)
    }

    /// Register a block by peer name. Returns `false` and logs if the name
    /// is unknown, the peer lacks the hook contract, the name is already
    /// registered, or its connections would break a layer.
    pub fn add_block(&mut self, name: &str) -> bool {
        let id = BlockId::from(name);
        match self.try_add_block(&id) {
            Ok(()) => true,
            Err(err) => {
                error!(block = %id, %err, "addBlock failed");
                false
            }
        }
    }

    /// Register an already-resolved block handle.
    pub fn insert_block(&mut self, handle: BlockRef) -> bool {
        let id = BlockId::new(handle.borrow().name());
        match self.register(&id, handle) {
            Ok(()) => true,
            Err(err) => {
                error!(block = %id, %err, "addBlock failed");
                false
            }
        }
    }

    /// Unregister a block, removing its vertices and incident edges from
    /// every layer. The block itself is untouched; the host still owns it.
    pub fn remove_block(&mut self, name: &str) -> bool {
        let id = BlockId::from(name);
        if self.blocks.remove(&id).is_none() {
            error!(block = %id, "removeBlock: block is not registered");
            return false;
        }
        self.block_names.retain(|n| n != &id);
        for layer in Layer::ALL {
            if self.layers.get(layer).graph.contains(&id) {
                self.layers.get_mut(layer).graph.remove_vertex(&id);
                if let Err(err) = self.rebuild_layer(layer) {
                    error!(%layer, %err, "rebuild failed after removing block");
                }
            }
        }
        self.rebuild_conflicts();
        true
    }

    /// Record a channel from an output port to an input port and rebuild.
    /// On rejection (cycle or exclusivity violation) the channel is removed
    /// again and earlier connections survive.
    pub fn connect(
        &mut self,
        source_block: &str,
        source_port: &str,
        sink_block: &str,
        sink_port: &str,
    ) -> bool {
        let source = Endpoint::new(source_block, source_port);
        let sink = Endpoint::new(sink_block, sink_port);
        if !self.wiring.connect(source.clone(), sink.clone()) {
            warn!(%source, %sink, "channel already exists");
            return false;
        }
        if let Err(err) = self.rebuild_all() {
            error!(%source, %sink, %err, "connection rejected; restoring previous wiring");
            self.wiring.disconnect(&source, &sink);
            if let Err(recovery) = self.rebuild_all() {
                error!(%recovery, "rebuild failed after removing rejected channel");
            }
            return false;
        }
        true
    }

    /// Remove a channel and rebuild.
    pub fn disconnect(
        &mut self,
        source_block: &str,
        source_port: &str,
        sink_block: &str,
        sink_port: &str,
    ) -> bool {
        let source = Endpoint::new(source_block, source_port);
        let sink = Endpoint::new(sink_block, sink_port);
        if !self.wiring.disconnect(&source, &sink) {
            warn!(%source, %sink, "no such channel");
            return false;
        }
        if let Err(err) = self.rebuild_all() {
            error!(%err, "rebuild failed after disconnect");
            return false;
        }
        true
    }

    /// Mark or unmark every connection between two blocks as latched, then
    /// rebuild. Latching a pair with no current edges is a no-op, not an
    /// error. Unlatching is rolled back if it would reintroduce a cycle.
    pub fn latch_connections(&mut self, source: &str, sink: &str, latched: bool) -> bool {
        let source = BlockId::from(source);
        let sink = BlockId::from(sink);
        let previous =
            PerLayer::from_fn(|layer| self.layers.get(layer).graph.is_latched(&source, &sink));
        for layer in Layer::ALL {
            self.layers
                .get_mut(layer)
                .graph
                .set_latched(&source, &sink, latched);
        }
        if let Err(err) = self.rebuild_all() {
            error!(%source, %sink, latched, %err, "latch change rejected; restoring");
            for layer in Layer::ALL {
                let prev = *previous.get(layer);
                self.layers
                    .get_mut(layer)
                    .graph
                    .set_latched(&source, &sink, prev);
            }
            if let Err(recovery) = self.rebuild_all() {
                error!(%recovery, "rebuild failed after restoring latch marks");
            }
            return false;
        }
        true
    }

    fn try_add_block(&mut self, name: &BlockId) -> SchemeResult<()> {
        if self.blocks.contains_key(name) {
            return Err(SchemeError::DuplicateBlock { name: name.clone() });
        }
        if !self.directory.has_peer(name.as_str()) {
            error!(
                block = %name,
                available = ?self.directory.peer_names(),
                "requested block was not found among peers"
            );
            return Err(SchemeError::UnknownBlock { name: name.clone() });
        }
        let handle =
            self.directory
                .resolve(name.as_str())
                .ok_or_else(|| SchemeError::BlockLacksHook {
                    name: name.clone(),
                })?;
        self.register(name, handle)
    }

    /// Insert the block into every layer it participates in, rebuilding
    /// each. A rebuild failure rolls the block back out of every layer it
    /// had been added to.
    fn register(&mut self, name: &BlockId, handle: BlockRef) -> SchemeResult<()> {
        if self.blocks.contains_key(name) {
            return Err(SchemeError::DuplicateBlock { name: name.clone() });
        }
        self.blocks.insert(
            name.clone(),
            BlockEntry {
                handle,
                last_exec: PerLayer::default(),
            },
        );

        let mut added = Vec::new();
        for layer in Layer::ALL {
            if !self.blocks[name].handle.borrow().participates(layer) {
                continue;
            }
            if let Err(err) = self.layers.get_mut(layer).graph.add_vertex(name) {
                self.unregister_partial(name, &added);
                return Err(err.into());
            }
            added.push(layer);
            if let Err(err) = self.rebuild_layer(layer) {
                error!(block = %name, %layer, %err, "cannot connect block into layer");
                self.unregister_partial(name, &added);
                return Err(err);
            }
        }
        self.block_names.push(name.clone());
        self.rebuild_conflicts();
        debug!(ordering = ?self.get_execution_order(), "new control ordering");
        Ok(())
    }

    fn unregister_partial(&mut self, name: &BlockId, added: &[Layer]) {
        self.blocks.remove(name);
        for &layer in added {
            self.layers.get_mut(layer).graph.remove_vertex(name);
            if let Err(err) = self.rebuild_layer(layer) {
                error!(%layer, %err, "rebuild failed after rolling back vertex");
            }
        }
    }

    /// Rebuild one layer: clear edges, re-derive them from the wiring,
    /// validate exclusivity, recompute and publish the ordering. On failure
    /// the previous ordering stays published.
    pub(crate) fn rebuild_layer(&mut self, layer: Layer) -> SchemeResult<()> {
        struct PendingEdge {
            source: BlockId,
            sink: BlockId,
            source_port: PortName,
            sink_port: PortName,
            exclusive: bool,
        }

        let mut pending = Vec::new();
        {
            let graph = &self.layers.get(layer).graph;
            for name in graph.vertex_names() {
                let Some(entry) = self.blocks.get(name) else {
                    continue;
                };
                let ports = entry.handle.borrow().output_ports(layer);
                for port in ports {
                    for channel in self.wiring.channels_from(name, &port) {
                        let sink = &channel.sink;
                        if !graph.contains(&sink.block) {
                            continue;
                        }
                        let exclusive = self
                            .blocks
                            .get(&sink.block)
                            .map(|e| {
                                e.handle.borrow().input_exclusivity(&sink.port)
                                    == Exclusivity::Exclusive
                            })
                            .unwrap_or(false);
                        pending.push(PendingEdge {
                            source: name.clone(),
                            sink: sink.block.clone(),
                            source_port: channel.source.port.clone(),
                            sink_port: sink.port.clone(),
                            exclusive,
                        });
                    }
                }
            }
        }

        let state = self.layers.get_mut(layer);
        state.graph.clear_edges();
        for edge in pending {
            state.graph.add_edge(
                &edge.source,
                &edge.sink,
                edge.source_port,
                edge.sink_port,
                edge.exclusive,
            )?;
        }
        if let Err(err) = state.graph.validate_exclusivity() {
            state.graph.clear_edges();
            return Err(err.into());
        }
        let order = state.graph.topological_order()?;
        state.index = OrderIndex::new(&order);
        state.ordering = order;
        Ok(())
    }

    pub(crate) fn rebuild_all(&mut self) -> SchemeResult<()> {
        for layer in Layer::ALL {
            self.rebuild_layer(layer)?;
        }
        self.rebuild_conflicts();
        Ok(())
    }

    pub(crate) fn rebuild_conflicts(&mut self) {
        let index = ConflictIndex::from_graphs([
            &self.layers.estimation.graph,
            &self.layers.control.graph,
        ]);
        self.conflicts = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticDirectory;
    use crate::testblock::TestBlock;
    use bf_core::BlockId;

    fn scheme_with(names: &[&str]) -> Scheme {
        let mut directory = StaticDirectory::new();
        for name in names {
            directory.add_block(TestBlock::new(name).shared());
        }
        let mut scheme = Scheme::new(Box::new(directory));
        for name in names {
            assert!(scheme.add_block(name));
        }
        scheme
    }

    fn chain(scheme: &mut Scheme, names: &[&str]) {
        for pair in names.windows(2) {
            assert!(scheme.connect(pair[0], "out1", pair[1], "in"));
        }
    }

    #[test]
    fn unknown_peer_rejected() {
        let mut scheme = Scheme::new(Box::new(StaticDirectory::new()));
        assert!(!scheme.add_block("ghost"));
        assert!(scheme.get_blocks().is_empty());
    }

    #[test]
    fn hookless_peer_rejected() {
        let mut directory = StaticDirectory::new();
        directory.add_plain_peer("bare");
        let mut scheme = Scheme::new(Box::new(directory));
        assert!(!scheme.add_block("bare"));
        assert!(!scheme.has_block("bare"));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut directory = StaticDirectory::new();
        directory.add_block(TestBlock::new("solo").shared());
        let mut scheme = Scheme::new(Box::new(directory));
        assert!(scheme.add_block("solo"));
        assert!(!scheme.add_block("solo"));
        assert_eq!(scheme.get_blocks(), vec!["solo"]);
    }

    #[test]
    fn insert_block_registers_by_handle() {
        let mut scheme = Scheme::new(Box::new(StaticDirectory::new()));
        assert!(scheme.insert_block(TestBlock::new("direct").shared()));
        assert!(scheme.has_block("direct"));
    }

    #[test]
    fn execution_order_follows_connections() {
        let mut scheme = scheme_with(&["sink", "mid", "root"]);
        chain(&mut scheme, &["root", "mid", "sink"]);
        assert_eq!(scheme.get_execution_order(), vec!["root", "mid", "sink"]);
    }

    #[test]
    fn cycle_closing_connection_rejected() {
        let mut scheme = scheme_with(&["a", "b"]);
        chain(&mut scheme, &["a", "b"]);
        assert!(!scheme.connect("b", "out1", "a", "in"));
        // The rejected channel is gone; the earlier one survives.
        assert_eq!(scheme.wiring().channels().len(), 1);
        assert_eq!(scheme.get_execution_order(), vec!["a", "b"]);
    }

    #[test]
    fn cycle_closing_add_block_rejected() {
        let mut directory = StaticDirectory::new();
        for name in ["a", "b", "c"] {
            directory.add_block(TestBlock::new(name).shared());
        }
        let mut scheme = Scheme::new(Box::new(directory));
        assert!(scheme.add_block("a"));
        assert!(scheme.add_block("b"));
        // Wire the full cycle; edges to "c" stay dormant until it joins.
        assert!(scheme.connect("a", "out1", "b", "in"));
        assert!(scheme.connect("b", "out1", "c", "in"));
        assert!(scheme.connect("c", "out1", "a", "in"));

        assert!(!scheme.add_block("c"));
        assert!(!scheme.has_block("c"));
        assert_eq!(scheme.get_execution_order(), vec!["a", "b"]);
    }

    #[test]
    fn exclusive_input_admits_one_connection() {
        let mut scheme = scheme_with(&["a", "b", "c"]);
        assert!(scheme.connect("a", "out1", "c", "in_ex"));
        assert!(!scheme.connect("b", "out1", "c", "in_ex"));
        // The earlier connection survives and still drives the conflicts.
        assert_eq!(scheme.wiring().channels().len(), 1);
        assert!(scheme
            .conflicts
            .are_conflicting(&BlockId::new("a"), &BlockId::new("c")));
    }

    #[test]
    fn latch_breaks_feedback_cycle() {
        let mut scheme = scheme_with(&["a", "b"]);
        chain(&mut scheme, &["a", "b"]);
        assert!(scheme.latch_connections("b", "a", true));
        assert!(scheme.connect("b", "out1", "a", "in"));
        assert_eq!(scheme.get_execution_order(), vec!["a", "b"]);
    }

    #[test]
    fn unlatch_reintroducing_cycle_rolled_back() {
        let mut scheme = scheme_with(&["a", "b"]);
        chain(&mut scheme, &["a", "b"]);
        assert!(scheme.latch_connections("b", "a", true));
        assert!(scheme.connect("b", "out1", "a", "in"));

        assert!(!scheme.latch_connections("b", "a", false));
        // The latch mark was restored; the scheme stays serializable.
        assert_eq!(scheme.get_execution_order(), vec!["a", "b"]);
    }

    #[test]
    fn latching_nonexistent_edge_is_noop() {
        let mut scheme = scheme_with(&["a", "b"]);
        assert!(scheme.latch_connections("a", "b", true));
        assert_eq!(scheme.get_execution_order().len(), 2);
    }

    #[test]
    fn remove_block_updates_order() {
        let mut scheme = scheme_with(&["a", "b", "c"]);
        chain(&mut scheme, &["a", "b", "c"]);
        assert!(scheme.remove_block("b"));
        assert_eq!(scheme.get_execution_order(), vec!["a", "c"]);
        assert!(!scheme.remove_block("b"));
    }

    #[test]
    fn portless_block_joins_both_layers() {
        let mut block = TestBlock::new("solo");
        block.outputs.clear();
        block.inputs.clear();
        let mut scheme = Scheme::new(Box::new(StaticDirectory::new()));
        assert!(scheme.insert_block(block.shared()));

        assert_eq!(scheme.layer_order(Layer::Estimation), vec!["solo"]);
        assert_eq!(scheme.layer_order(Layer::Control), vec!["solo"]);
    }

    #[test]
    fn estimation_layer_orders_independently() {
        let mut sensor = TestBlock::new("sensor");
        sensor.est_outputs = vec![PortName::new("raw")];
        let mut filter = TestBlock::new("filter");
        filter.est_inputs = vec![PortName::new("raw_in")];

        let mut scheme = Scheme::new(Box::new(StaticDirectory::new()));
        assert!(scheme.insert_block(filter.shared()));
        assert!(scheme.insert_block(sensor.shared()));
        assert!(scheme.connect("sensor", "raw", "filter", "raw_in"));

        assert_eq!(
            scheme.layer_order(Layer::Estimation),
            vec!["sensor", "filter"]
        );
        // No control-layer edge exists between the two.
        assert!(scheme
            .layers
            .get(Layer::Control)
            .graph
            .edges_between(&BlockId::new("sensor"), &BlockId::new("filter"))
            .is_empty());
    }
}
