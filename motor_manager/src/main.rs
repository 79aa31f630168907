//! # Motor Manager
//!
//! Loads the manager configuration, binds every configured drive to its
//! fieldbus slave and runs the fixed-period cycle until SIGINT/SIGTERM.
//! SIGTSTP toggles a pause: drives are disabled and re-enabled on the next
//! SIGTSTP while the link keeps cycling.

use clap::Parser;
use motor_common::config::LogLevel;
use motor_common::consts::DEFAULT_CONFIG_PATH;
use motor_common::error::ProtocolError;
use motor_common::motor::cia402::StatusWord;
use motor_common::motor::config::ManagerConfig;
use motor_common::motor::types::{CommandRecord, FeedbackRecord};
use motor_manager::{CommandSource, CycleRunner, MotorManager, Registry, ShutdownSignals, rt_setup};
use std::f64::consts::TAU;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Motor Manager - fixed-period servo drive control over a cyclic fieldbus
#[derive(Parser, Debug)]
#[command(name = "motor_manager")]
#[command(version)]
#[command(about = "Enable, command and disable a fleet of CiA-402 servo drives")]
struct Args {
    /// Path to the manager configuration TOML.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// CPU core to pin the RT thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (at least DEBUG, regardless of `[shared] log_level`).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Demo: sine amplitude around the enable position [rad]. 0 holds position.
    #[arg(long, default_value_t = 0.0)]
    sine_amplitude: f64,

    /// Demo: sine period [s].
    #[arg(long, default_value_t = 4.0)]
    sine_period: f64,
}

fn main() {
    let args = Args::parse();

    // Tracing is not up yet, so a bad config file goes to stderr.
    let config = match ManagerConfig::load_from(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {}: {e}", args.config.display());
            process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    info!("Motor Manager v{} starting...", env!("CARGO_PKG_VERSION"));
    info!(
        "Service '{}' using {}",
        config.shared.service_name,
        args.config.display()
    );

    if let Err(e) = run(&args, &config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Motor Manager shutdown complete");
}

fn run(args: &Args, config: &ManagerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::with_builtin();
    let manager = MotorManager::new(config, &registry)?;
    info!(
        "Config OK: period={}ns, bindings={}",
        manager.period_ns(),
        manager.binding_count()
    );

    let signals = ShutdownSignals::new();
    signals.install()?;

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let mut source = SineSource::new(
        manager.binding_count(),
        manager.period_ns(),
        args.sine_amplitude,
        args.sine_period,
    );
    let mut runner = CycleRunner::new(manager, signals);
    runner.run(&mut source)?;
    Ok(())
}

/// Position source: sine around the position each axis had when the fleet
/// came up.
struct SineSource {
    origins: Vec<Option<f64>>,
    start_cycle: Option<u64>,
    period_s: f64,
    amplitude: f64,
    sine_period: f64,
}

impl SineSource {
    fn new(bindings: usize, period_ns: u32, amplitude: f64, sine_period: f64) -> Self {
        Self {
            origins: vec![None; bindings],
            start_cycle: None,
            period_s: f64::from(period_ns) * 1e-9,
            amplitude,
            sine_period: sine_period.max(f64::EPSILON),
        }
    }
}

impl CommandSource for SineSource {
    fn fill(
        &mut self,
        cycle: u64,
        feedback: &[FeedbackRecord],
        commands: &mut [CommandRecord],
    ) -> Result<(), ProtocolError> {
        // Feedback is only fresh once every drive reports operation enabled.
        if !feedback
            .iter()
            .all(|f| StatusWord::from_raw(f.status_word).is_operation_enabled())
        {
            self.start_cycle = None;
            self.origins.fill(None);
            return Ok(());
        }

        let start = *self.start_cycle.get_or_insert(cycle);
        let t = (cycle - start) as f64 * self.period_s;
        let offset = self.amplitude * (TAU * t / self.sine_period).sin();

        for ((state, command), origin) in feedback
            .iter()
            .zip(commands.iter_mut())
            .zip(self.origins.iter_mut())
        {
            let origin = *origin.get_or_insert(state.position);
            command.set_position(origin + offset)?;
        }
        Ok(())
    }
}

/// Default filter directive: `--verbose` raises the configured level to
/// at least DEBUG.
fn log_directive(verbose: bool, configured: LogLevel) -> &'static str {
    if verbose && configured != LogLevel::Trace {
        LogLevel::Debug.as_directive()
    } else {
        configured.as_directive()
    }
}

/// Setup tracing subscriber based on CLI arguments and `[shared] log_level`.
///
/// `RUST_LOG` takes precedence when set.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(args.verbose, configured)));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
