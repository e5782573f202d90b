use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use mlfq_sim::sim::MAX_SLOTS;
use mlfq_sim::{Mlfq, Sim, SimConfig};

/// mlfq_sim: multi-level feedback queue scheduling simulation
///
/// Worker threads compete for a single simulated CPU. Each level of the
/// queue hierarchy grants twice the quantum of the level above it. Workers
/// that use their whole quantum sink one level, workers interrupted by
/// simulated I/O return to the top level once the I/O completes.
///
/// Every clock value is synthetic: bursts, overheads and I/O waits are drawn
/// from configured ranges and never correspond to real CPU time.
#[derive(Debug, Parser)]
struct Opts {
    /// Number of worker slots (simultaneous workers), at most 18.
    #[clap(short = 's', long)]
    slots: Option<usize>,

    /// Real-time budget in seconds.
    #[clap(short = 't', long)]
    real_seconds: Option<u64>,

    /// File the event log is written to.
    #[clap(short = 'l', long)]
    log: Option<PathBuf>,

    /// Preference file: description and value lines alternating.
    #[clap(short = 'p', long)]
    prefs: Option<PathBuf>,

    /// Number of priority levels.
    #[clap(long)]
    levels: Option<usize>,

    /// Quantum of the top level in simulated nanoseconds.
    #[clap(long)]
    quantum: Option<u64>,

    /// Simulated-time budget in seconds.
    #[clap(long)]
    sim_seconds: Option<u64>,

    /// Stop after this many workers have been admitted in total.
    #[clap(long)]
    max_total: Option<u64>,

    /// Seed the scheduler RNG for a reproducible run.
    #[clap(long)]
    seed: Option<u64>,

    /// Print the process table and queues after every cycle.
    #[clap(long)]
    status: bool,

    /// Enable verbose output. Specify multiple times to increase verbosity.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn build_config(opts: &Opts) -> Result<SimConfig> {
    let mut config = match &opts.prefs {
        Some(path) => SimConfig::from_pref_file(path)
            .with_context(|| format!("Failed to load preferences from {}", path.display()))?,
        None => SimConfig::default(),
    };

    if let Some(slots) = opts.slots {
        if slots > MAX_SLOTS {
            bail!("Max number of simultaneous workers is {MAX_SLOTS}");
        }
        config.slots = slots;
    }
    if let Some(secs) = opts.real_seconds {
        config.real_seconds = secs;
    }
    if let Some(path) = &opts.log {
        config.log_path = Some(path.clone());
    }
    if let Some(levels) = opts.levels {
        config.levels = levels;
    }
    if let Some(quantum) = opts.quantum {
        config.quantum_factor = quantum;
    }
    if let Some(secs) = opts.sim_seconds {
        config.sim_seconds = secs;
    }
    if let Some(max) = opts.max_total {
        config.max_total_workers = max;
    }
    if opts.seed.is_some() {
        config.seed = opts.seed;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(opts: &Opts, shutdown: Arc<AtomicBool>) -> Result<()> {
    let config = build_config(opts)?;
    info!(
        "{} slots, {} levels, quantum {}ns",
        config.slots, config.levels, config.quantum_factor
    );

    let mut sim = Sim::<Mlfq>::new(config).context("Failed to set up simulation")?;
    let report = sim
        .run(&shutdown, |sim| {
            if opts.status {
                // Clear the terminal so the view refreshes in place
                print!("\x1b[2J\x1b[H");
                println!("{}", sim.snapshot());
            }
        })
        .context("Simulation aborted")?;

    println!("{report}");
    Ok(())
}

fn main() -> ExitCode {
    let opts = Opts::parse();

    let llv = match opts.verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Off)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    if let Err(e) = simplelog::TermLogger::init(
        llv,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logger: {e}");
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::Relaxed);
    })
    .context("Error setting Ctrl-C handler")
    {
        error!("{e:#}");
        return ExitCode::FAILURE;
    }

    match run(&opts, shutdown) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
