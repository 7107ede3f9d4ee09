//! bf-rpc: controller-manager style bridge onto a blockflow scheme.
//!
//! Translates the classic controller-manager request vocabulary
//! (switch/list controllers, best-effort vs strict) into scheme
//! operations. The bridge is transport-agnostic: requests and responses
//! are plain serde types, and hosts wire them to whatever RPC layer they
//! use. Controller loading and unloading are lifecycle concerns of the
//! host, not the scheme, so those requests report unsupported.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use bf_scheme::Scheme;

/// Batch semantics of a switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Keep going after individual failures.
    BestEffort,
    /// Abort the batch at the first failure.
    Strict,
}

/// Request to stop one set of controllers and start another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchRequest {
    /// Controllers to stop, by block name.
    #[serde(default)]
    pub stop: Vec<String>,
    /// Controllers to start, by block name.
    #[serde(default)]
    pub start: Vec<String>,
    pub strictness: Strictness,
}

/// Outcome of a switch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchResponse {
    pub ok: bool,
}

/// One controller in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInfo {
    pub name: String,
    /// Fixed type tag; the scheme does not distinguish block types.
    pub kind: String,
    /// `"running"` or `"stopped"`.
    pub state: String,
}

/// Listing of every registered controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    pub controllers: Vec<ControllerInfo>,
}

/// Errors for the requests this bridge does not support.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The operation is out of scope for the scheme.
    #[error("operation '{operation}' is not supported")]
    Unsupported { operation: &'static str },
}

const BLOCK_KIND: &str = "blockflow block";

/// Stop `req.stop`, then start `req.start`. Strict requests abort each
/// half at its first failure; force is never implied by a switch request.
pub fn switch_controllers(scheme: &mut Scheme, req: &SwitchRequest) -> SwitchResponse {
    debug!(stop = ?req.stop, start = ?req.start, strictness = ?req.strictness, "handling switch request");
    let strict = req.strictness == Strictness::Strict;
    let ok = scheme.switch_blocks(&req.stop, &req.start, strict, false);
    SwitchResponse { ok }
}

/// List every registered block with its run state. Groups would be listed
/// too, but no grouping extension exists, so the group section is empty.
pub fn list_controllers(scheme: &Scheme) -> ListResponse {
    let mut controllers: Vec<ControllerInfo> = scheme
        .get_blocks()
        .into_iter()
        .map(|name| {
            let state = if scheme.is_block_running(&name) {
                "running"
            } else {
                "stopped"
            };
            ControllerInfo {
                name,
                kind: BLOCK_KIND.to_string(),
                state: state.to_string(),
            }
        })
        .collect();
    controllers.extend(scheme.get_groups().into_iter().map(|name| ControllerInfo {
        name,
        kind: "block group".to_string(),
        state: String::new(),
    }));
    ListResponse { controllers }
}

/// Controller types are a host concern; unsupported.
pub fn list_controller_types() -> Result<(), RpcError> {
    Err(RpcError::Unsupported {
        operation: "list_controller_types",
    })
}

/// Loading is a host concern; unsupported.
pub fn load_controller(_name: &str) -> Result<(), RpcError> {
    Err(RpcError::Unsupported {
        operation: "load_controller",
    })
}

/// Unloading is a host concern; unsupported.
pub fn unload_controller(_name: &str) -> Result<(), RpcError> {
    Err(RpcError::Unsupported {
        operation: "unload_controller",
    })
}

/// Library reloads are a host concern; unsupported.
pub fn reload_controller_libraries() -> Result<(), RpcError> {
    Err(RpcError::Unsupported {
        operation: "reload_controller_libraries",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_core::{BlockState, Exclusivity, Layer, PortName};
    use bf_scheme::{Block, StaticDirectory};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Plain {
        name: String,
        state: BlockState,
    }

    impl Plain {
        fn new(name: &str) -> Self {
            Self {
                name: name.into(),
                state: BlockState::Stopped,
            }
        }
    }

    impl Block for Plain {
        fn name(&self) -> &str {
            &self.name
        }
        fn output_ports(&self, layer: Layer) -> Vec<PortName> {
            match layer {
                Layer::Control => vec![PortName::new("out")],
                Layer::Estimation => vec![],
            }
        }
        fn input_ports(&self, layer: Layer) -> Vec<PortName> {
            match layer {
                Layer::Control => vec![PortName::new("in")],
                Layer::Estimation => vec![],
            }
        }
        fn input_exclusivity(&self, _port: &PortName) -> Exclusivity {
            Exclusivity::Unrestricted
        }
        fn state(&self) -> BlockState {
            self.state
        }
        fn start(&mut self) -> bool {
            self.state = BlockState::Running;
            true
        }
        fn stop(&mut self) -> bool {
            self.state = BlockState::Stopped;
            true
        }
    }

    fn scheme_with(names: &[&str]) -> Scheme {
        let mut directory = StaticDirectory::new();
        for name in names {
            directory.add_block(Rc::new(RefCell::new(Plain::new(name))));
        }
        let mut scheme = Scheme::new(Box::new(directory));
        for name in names {
            assert!(scheme.add_block(name));
        }
        scheme
    }

    #[test]
    fn switch_request_round_trips_states() {
        let mut scheme = scheme_with(&["lift", "sway"]);
        let up = switch_controllers(
            &mut scheme,
            &SwitchRequest {
                stop: vec![],
                start: vec!["lift".into(), "sway".into()],
                strictness: Strictness::Strict,
            },
        );
        assert!(up.ok);

        let over = switch_controllers(
            &mut scheme,
            &SwitchRequest {
                stop: vec!["lift".into()],
                start: vec![],
                strictness: Strictness::BestEffort,
            },
        );
        assert!(over.ok);

        let listing = list_controllers(&scheme);
        let states: Vec<(&str, &str)> = listing
            .controllers
            .iter()
            .map(|c| (c.name.as_str(), c.state.as_str()))
            .collect();
        assert_eq!(states, vec![("lift", "stopped"), ("sway", "running")]);
    }

    #[test]
    fn strict_switch_fails_on_unknown_controller() {
        let mut scheme = scheme_with(&["lift"]);
        let resp = switch_controllers(
            &mut scheme,
            &SwitchRequest {
                stop: vec![],
                start: vec!["ghost".into()],
                strictness: Strictness::Strict,
            },
        );
        assert!(!resp.ok);
    }

    #[test]
    fn unsupported_operations_report_as_such() {
        assert!(matches!(
            list_controller_types(),
            Err(RpcError::Unsupported { .. })
        ));
        assert!(load_controller("x").is_err());
        assert!(unload_controller("x").is_err());
        assert!(reload_controller_libraries().is_err());
    }

    #[test]
    fn switch_request_parses_with_defaults() {
        let req: SwitchRequest =
            serde_json::from_str(r#"{ "start": ["lift"], "strictness": "strict" }"#).unwrap();
        assert_eq!(req.start, vec!["lift"]);
        assert!(req.stop.is_empty());
        assert_eq!(req.strictness, Strictness::Strict);
    }
}
