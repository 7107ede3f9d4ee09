use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use bf_core::{BlockState, Exclusivity, Layer, PortName};
use bf_scheme::{Block, Scheme, StaticDirectory, WiringPlan};

#[derive(Parser)]
#[command(name = "bf-cli")]
#[command(about = "Blockflow CLI - compose and drive a demo block scheme", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the demo scheme's per-layer execution orders
    Order {
        /// Wiring plan JSON applied on top of the built-in demo wiring
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Enable every block and run the scheme for a number of cycles
    Run {
        /// Wiring plan JSON applied on top of the built-in demo wiring
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Number of cycles to execute
        #[arg(long, default_value_t = 10)]
        ticks: u64,
        /// Cycle period in milliseconds
        #[arg(long, default_value_t = 10)]
        period_ms: u64,
    },
}

/// Demo block: declares fixed ports per layer and logs its hook calls.
struct DemoBlock {
    name: String,
    state: BlockState,
    est_outputs: Vec<PortName>,
    est_inputs: Vec<PortName>,
    ctl_outputs: Vec<PortName>,
    ctl_inputs: Vec<PortName>,
}

impl DemoBlock {
    fn new(
        name: &str,
        est_outputs: &[&str],
        est_inputs: &[&str],
        ctl_outputs: &[&str],
        ctl_inputs: &[&str],
    ) -> Rc<RefCell<Self>> {
        let ports = |names: &[&str]| -> Vec<PortName> {
            names.iter().map(|name| PortName::new(*name)).collect()
        };
        Rc::new(RefCell::new(Self {
            name: name.into(),
            state: BlockState::Stopped,
            est_outputs: ports(est_outputs),
            est_inputs: ports(est_inputs),
            ctl_outputs: ports(ctl_outputs),
            ctl_inputs: ports(ctl_inputs),
        }))
    }
}

impl Block for DemoBlock {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_ports(&self, layer: Layer) -> Vec<PortName> {
        match layer {
            Layer::Estimation => self.est_outputs.clone(),
            Layer::Control => self.ctl_outputs.clone(),
        }
    }

    fn input_ports(&self, layer: Layer) -> Vec<PortName> {
        match layer {
            Layer::Estimation => self.est_inputs.clone(),
            Layer::Control => self.ctl_inputs.clone(),
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

    fn read_hardware(&mut self, time: f64, _period: f64) {
        tracing::debug!(block = %self.name, time, "read_hardware");
    }

    fn compute_estimation(&mut self, time: f64, _period: f64) {
        tracing::debug!(block = %self.name, time, "compute_estimation");
    }

    fn compute_control(&mut self, time: f64, _period: f64) {
        tracing::debug!(block = %self.name, time, "compute_control");
    }

    fn write_hardware(&mut self, time: f64, _period: f64) {
        tracing::debug!(block = %self.name, time, "write_hardware");
    }
}

/// Demo layout: an IMU feeds an observer on the estimation layer; the
/// observer, a setpoint source, a controller, and a servo form the control
/// pipeline, with the servo's telemetry latched back into the observer.
fn build_demo_scheme() -> Result<Scheme, Box<dyn Error>> {
    let mut directory = StaticDirectory::new();
    directory.add_block(DemoBlock::new("imu", &["raw"], &[], &[], &[]));
    directory.add_block(DemoBlock::new(
        "observer",
        &[],
        &["raw_in"],
        &["state"],
        &["telemetry_in"],
    ));
    directory.add_block(DemoBlock::new("setpoint", &[], &[], &["target"], &[]));
    directory.add_block(DemoBlock::new(
        "controller",
        &[],
        &[],
        &["effort"],
        &["state_in", "target_in"],
    ));
    directory.add_block(DemoBlock::new(
        "servo",
        &[],
        &[],
        &["telemetry"],
        &["effort_in"],
    ));

    let mut scheme = Scheme::new(Box::new(directory));
    for name in ["imu", "observer", "setpoint", "controller", "servo"] {
        if !scheme.add_block(name) {
            return Err(format!("could not register demo block '{name}'").into());
        }
    }

    let connections = [
        ("imu", "raw", "observer", "raw_in"),
        ("observer", "state", "controller", "state_in"),
        ("setpoint", "target", "controller", "target_in"),
        ("controller", "effort", "servo", "effort_in"),
    ];
    for (src, src_port, sink, sink_port) in connections {
        if !scheme.connect(src, src_port, sink, sink_port) {
            return Err(format!("could not connect {src}.{src_port} -> {sink}.{sink_port}").into());
        }
    }
    if !scheme.latch_connections("servo", "observer", true)
        || !scheme.connect("servo", "telemetry", "observer", "telemetry_in")
    {
        return Err("could not wire latched telemetry feedback".into());
    }

    Ok(scheme)
}

fn apply_plan(scheme: &mut Scheme, path: &Path) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let plan: WiringPlan = serde_json::from_str(&text)?;
    if !plan.apply(scheme) {
        return Err(format!("wiring plan '{}' was not fully applied", path.display()).into());
    }
    Ok(())
}

fn cmd_order(plan: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    let mut scheme = build_demo_scheme()?;
    if let Some(path) = plan {
        apply_plan(&mut scheme, path)?;
    }
    println!("estimation: {:?}", scheme.layer_order(Layer::Estimation));
    println!("control:    {:?}", scheme.layer_order(Layer::Control));
    Ok(())
}

fn cmd_run(plan: Option<&PathBuf>, ticks: u64, period_ms: u64) -> Result<(), Box<dyn Error>> {
    let mut scheme = build_demo_scheme()?;
    if let Some(path) = plan {
        apply_plan(&mut scheme, path)?;
    }

    let all = scheme.get_blocks();
    if !scheme.enable_blocks(&all, true, false) {
        return Err("could not enable the demo blocks".into());
    }
    println!("running {:?}", scheme.get_execution_order());

    for tick in 1..=ticks {
        scheme.update(Duration::from_millis(tick * period_ms));
    }
    println!("executed {ticks} cycles at {period_ms} ms");

    if !scheme.disable_blocks(&all, true) {
        return Err("could not disable the demo blocks".into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Order { plan } => cmd_order(plan.as_ref()),
        Commands::Run {
            plan,
            ticks,
            period_ms,
        } => cmd_run(plan.as_ref(), ticks, period_ms),
    }
}
