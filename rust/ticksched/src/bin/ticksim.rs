//! ticksim - Run a JSON workload through a scheduling policy.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::filter::EnvFilter;

use ticksched::{load_workload, PolicyKind, SimFormat, Simulator, Tick};

/// Run a JSON workload through a scheduling policy, one tick at a time.
///
/// Prints the process that ran on every tick ("<tick>: <pid>" or
/// "<tick>: idle"), followed by per-process statistics.
#[derive(Debug, Parser)]
#[command(name = "ticksim")]
struct Cli {
    /// Path to a JSON workload file.
    #[arg(required_unless_present = "list_policies")]
    workload: Option<PathBuf>,

    /// Scheduling policy.
    #[arg(short, long, env = "TICKSIM_POLICY", default_value = "fcfs")]
    policy: String,

    /// Do not print the per-tick schedule.
    #[arg(short, long)]
    quiet: bool,

    /// Stop after this many ticks (overrides the workload).
    #[arg(long, env = "TICKSIM_MAX_TICKS")]
    max_ticks: Option<Tick>,

    /// Print trace events to stderr.
    #[arg(long)]
    dump_trace: bool,

    /// List available policies and exit.
    #[arg(long)]
    list_policies: bool,

    /// Enable verbose output. Specify multiple times to increase
    /// verbosity. Ignored when RUST_LOG is set.
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // clap leaves the workload empty only alongside --list-policies.
    let path = match &cli.workload {
        Some(path) if !cli.list_policies => path,
        _ => {
            list_policies();
            return Ok(());
        }
    };
    let kind: PolicyKind = cli.policy.parse()?;

    let mut scenario = load_workload(path)
        .with_context(|| format!("failed to load workload {}", path.display()))?;
    if let Some(max_ticks) = cli.max_ticks {
        scenario.max_ticks = max_ticks;
    }

    let mut sim = Simulator::new(kind.build());
    let trace = sim
        .run(scenario)
        .with_context(|| format!("failed to run {kind}"))?;

    if cli.dump_trace {
        trace.dump();
    }

    if !cli.quiet {
        for (tick, pid) in trace.run_sequence().into_iter().enumerate() {
            match pid {
                Some(pid) => println!("{tick}: {pid}"),
                None => println!("{tick}: idle"),
            }
        }
        println!();
    }
    println!("{}", sim.policy().name());
    println!("{}", trace.summary());

    Ok(())
}

fn list_policies() {
    for kind in PolicyKind::ALL {
        println!("{:<6} {}", kind.key(), kind.build().name());
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .event_format(SimFormat)
        .try_init()
    {
        eprintln!("failed to init logger: {e}");
    }
}
