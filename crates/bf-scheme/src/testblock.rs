//! Block fixture shared by the unit tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use bf_core::{BlockState, Exclusivity, Layer, PortName};

use crate::block::Block;

/// Shared event trace; blocks append `name:event` entries.
pub(crate) type Trace = Rc<RefCell<Vec<String>>>;

pub(crate) fn new_trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

/// Configurable block: declares `out1`/`out2` outputs and `in`/`in_ex`
/// inputs on the control layer (`in_ex` exclusive), optionally ports on the
/// estimation layer, and records lifecycle and hook calls into a trace.
pub(crate) struct TestBlock {
    pub name: String,
    pub state: BlockState,
    pub outputs: Vec<PortName>,
    pub inputs: Vec<PortName>,
    pub est_outputs: Vec<PortName>,
    pub est_inputs: Vec<PortName>,
    pub exclusive: Vec<PortName>,
    pub period: Duration,
    pub start_ok: bool,
    pub stop_ok: bool,
    pub panic_in_control: bool,
    pub trace: Option<Trace>,
}

impl TestBlock {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            state: BlockState::Stopped,
            outputs: vec![PortName::new("out1"), PortName::new("out2")],
            inputs: vec![PortName::new("in"), PortName::new("in_ex")],
            est_outputs: Vec::new(),
            est_inputs: Vec::new(),
            exclusive: vec![PortName::new("in_ex")],
            period: Duration::ZERO,
            start_ok: true,
            stop_ok: true,
            panic_in_control: false,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: &Trace) -> Self {
        self.trace = Some(Rc::clone(trace));
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.state = BlockState::Unconfigured;
        self
    }

    pub fn shared(self) -> Rc<RefCell<TestBlock>> {
        Rc::new(RefCell::new(self))
    }

    fn record(&self, event: &str) {
        if let Some(trace) = &self.trace {
            trace.borrow_mut().push(format!("{}:{}", self.name, event));
        }
    }
}

impl Block for TestBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_ports(&self, layer: Layer) -> Vec<PortName> {
        match layer {
            Layer::Estimation => self.est_outputs.clone(),
            Layer::Control => self.outputs.clone(),
        }
    }

    fn input_ports(&self, layer: Layer) -> Vec<PortName> {
        match layer {
            Layer::Estimation => self.est_inputs.clone(),
            Layer::Control => self.inputs.clone(),
        }
    }

    fn input_exclusivity(&self, port: &PortName) -> Exclusivity {
        if self.exclusive.contains(port) {
            Exclusivity::Exclusive
        } else {
            Exclusivity::Unrestricted
        }
    }

    fn state(&self) -> BlockState {
        self.state
    }

    fn period(&self, _layer: Layer) -> Duration {
        self.period
    }

    fn start(&mut self) -> bool {
        if self.start_ok {
            self.state = BlockState::Running;
            self.record("start");
        }
        self.start_ok
    }

    fn stop(&mut self) -> bool {
        if self.stop_ok {
            self.state = BlockState::Stopped;
            self.record("stop");
        }
        self.stop_ok
    }

    fn read_hardware(&mut self, _time: f64, _period: f64) {
        self.record("read");
    }

    fn compute_estimation(&mut self, _time: f64, _period: f64) {
        self.record("estimate");
    }

    fn compute_control(&mut self, _time: f64, _period: f64) {
        if self.panic_in_control {
            panic!("control hook panic");
        }
        self.record("control");
    }

    fn write_hardware(&mut self, _time: f64, _period: f64) {
        self.record("write");
    }
}
