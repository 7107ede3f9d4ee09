//! The two parallel causal layers and per-layer storage.
//!
//! Every scheme keeps two structurally identical causal graphs: the
//! *estimation* layer (sensing, state estimation) and the *control* layer
//! (command synthesis). Each tick executes the estimation layer in full
//! before the control layer.

use serde::{Deserialize, Serialize};

/// One of the two causal graph layers of a scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Sensing / state estimation. Executed first each cycle.
    Estimation,
    /// Command synthesis. Executed second each cycle.
    Control,
}

impl Layer {
    /// Both layers, in per-cycle execution order.
    pub const ALL: [Layer; 2] = [Layer::Estimation, Layer::Control];
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layer::Estimation => f.write_str("estimation"),
            Layer::Control => f.write_str("control"),
        }
    }
}

/// A pair of values, one per layer.
///
/// Used for anything the scheme keeps per layer: graphs, orderings,
/// periods, last-execution timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerLayer<T> {
    pub estimation: T,
    pub control: T,
}

impl<T> PerLayer<T> {
    /// Build from one value per layer.
    pub fn new(estimation: T, control: T) -> Self {
        Self {
            estimation,
            control,
        }
    }

    /// Build by calling `f` once per layer.
    pub fn from_fn(mut f: impl FnMut(Layer) -> T) -> Self {
        Self {
            estimation: f(Layer::Estimation),
            control: f(Layer::Control),
        }
    }

    /// Borrow the value for `layer`.
    pub fn get(&self, layer: Layer) -> &T {
        match layer {
            Layer::Estimation => &self.estimation,
            Layer::Control => &self.control,
        }
    }

    /// Mutably borrow the value for `layer`.
    pub fn get_mut(&mut self, layer: Layer) -> &mut T {
        match layer {
            Layer::Estimation => &mut self.estimation,
            Layer::Control => &mut self.control,
        }
    }
}
