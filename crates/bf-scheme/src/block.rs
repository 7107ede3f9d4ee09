//! The block hook contract.
//!
//! A block is an externally authored periodic computation unit. The scheme
//! is independent of any component framework: everything it needs from a
//! block is expressed by the [`Block`] trait, a capability record supplied
//! at registration. Blocks are owned by the host; the scheme holds shared
//! handles and releases them at removal.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bf_core::{BlockState, Exclusivity, Layer, PortName};

/// Shared handle to a block. The scheme is single-threaded, so plain
/// reference counting with interior mutability is all that is needed.
pub type BlockRef = Rc<RefCell<dyn Block>>;

/// Contract every schedulable block must implement.
///
/// The four per-cycle entry points default to no-ops so a block only has to
/// implement the hooks of the layers it participates in.
pub trait Block {
    /// Stable identifier within a scheme.
    fn name(&self) -> &str;

    /// Output ports this block declares on `layer`.
    fn output_ports(&self, layer: Layer) -> Vec<PortName>;

    /// Input ports this block declares on `layer`.
    fn input_ports(&self, layer: Layer) -> Vec<PortName>;

    /// Exclusivity mode of an input port.
    fn input_exclusivity(&self, port: &PortName) -> Exclusivity;

    /// Current lifecycle state.
    fn state(&self) -> BlockState;

    /// Whether the block has passed configuration.
    fn is_configured(&self) -> bool {
        self.state().is_configured()
    }

    /// Minimum interval between executions on `layer`; zero means every
    /// cycle.
    fn period(&self, _layer: Layer) -> Duration {
        Duration::ZERO
    }

    /// Transition to `Running`. Returns `false` (state unchanged) on
    /// failure.
    fn start(&mut self) -> bool;

    /// Transition to `Stopped`. Returns `false` (state unchanged) on
    /// failure.
    fn stop(&mut self) -> bool;

    /// Estimation layer, first: sample sensors.
    fn read_hardware(&mut self, _time: f64, _period: f64) {}

    /// Estimation layer, second: update state estimates.
    fn compute_estimation(&mut self, _time: f64, _period: f64) {}

    /// Control layer, first: synthesize commands.
    fn compute_control(&mut self, _time: f64, _period: f64) {}

    /// Control layer, second: write actuators.
    fn write_hardware(&mut self, _time: f64, _period: f64) {}

    /// Whether the block takes part in `layer`. A block declaring no ports
    /// at all still participates everywhere so its hooks keep running.
    fn participates(&self, layer: Layer) -> bool {
        let declares = |l: Layer| !self.output_ports(l).is_empty() || !self.input_ports(l).is_empty();
        declares(layer) || Layer::ALL.iter().all(|l| !declares(*l))
    }
}
