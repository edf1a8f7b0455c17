//! Logicwave - Tri-state Logic Simulator
//!
//! Runs a JSON netlist headlessly and prints the recorded waveforms.
//!
//! # Usage
//!
//! ```bash
//! logicwave latch.json --set s.o=1 --set s.o=0 --monitor q.i --frames 120 > waves.json
//! ```

use std::io;
use std::path::PathBuf;

use clap::Parser;
use logicwave_core::{
    error::Result,
    host::{parse_assignment, run_headless, write_snapshot, RunOptions},
    netlist, CircuitConfig, OscillatorConfig, SimulationConfig, DEFAULT_IDLE_THRESHOLD_MS,
    DEFAULT_MAX_PASSES, DEFAULT_REFRESH_PERIOD_MS, DEFAULT_VIEWPORT_WIDTH,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Tri-state logic simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the netlist file (.json)
    #[arg(value_name = "NETLIST_FILE")]
    netlist_file: PathBuf,

    /// Number of host frames to run
    #[arg(short, long, default_value_t = 60)]
    frames: usize,

    /// Wall-clock milliseconds between frames
    #[arg(long, default_value_t = DEFAULT_REFRESH_PERIOD_MS)]
    frame_ms: f64,

    /// Virtual milliseconds per oscillator period
    #[arg(long, default_value_t = DEFAULT_REFRESH_PERIOD_MS)]
    refresh_ms: f64,

    /// Wall-clock gap after which the oscillator restarts (ms)
    #[arg(long, default_value_t = DEFAULT_IDLE_THRESHOLD_MS)]
    idle_ms: f64,

    /// Waveform viewport width
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH)]
    viewport_width: f64,

    /// Propagation pass cap
    #[arg(long, default_value_t = DEFAULT_MAX_PASSES)]
    max_passes: usize,

    /// Port write applied before the first frame (repeatable)
    #[arg(short, long = "set", value_name = "PORT=LEVEL")]
    set: Vec<String>,

    /// Port to record a waveform for (repeatable)
    #[arg(short, long, value_name = "PORT")]
    monitor: Vec<String>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Parse the netlist; building the simulation validates it and the
    // oscillator lengths
    let netlist = netlist::parse_file(&args.netlist_file)?;

    let config = SimulationConfig::new()
        .with_circuit(CircuitConfig::new().with_max_passes(args.max_passes))
        .with_oscillator(
            OscillatorConfig::new()
                .with_refresh_period(args.refresh_ms)
                .with_idle_threshold(args.idle_ms)
                .with_viewport_width(args.viewport_width),
        );

    let writes = args
        .set
        .iter()
        .map(|text| parse_assignment(text))
        .collect::<Result<Vec<_>>>()?;
    let options = RunOptions {
        frames: args.frames,
        frame_ms: args.frame_ms,
        writes,
        monitors: args.monitor,
    };
    info!(file = %args.netlist_file.display(), frames = options.frames, "running netlist");

    // Run and print the final waveforms
    let snapshot = run_headless(&netlist, config, &options)?;
    write_snapshot(&snapshot, io::stdout().lock())?;

    Ok(())
}
