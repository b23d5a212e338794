use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use statecache::TrackerConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckConfigArgs, Cli, Command, ReplayArgs};
use crate::replay::{replay, ReplaySummary};
use crate::trace::Trace;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Replay(args) => run_replay(args),
        Command::CheckConfig(args) => run_check_config(args),
    }
}

fn load_config(path: &Path) -> Result<TrackerConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    TrackerConfig::from_toml_str(&contents)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn run_replay(args: ReplayArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TrackerConfig::default(),
    };
    if args.count_only {
        config.elide = false;
    }

    let trace = Trace::load(&args.trace)?;
    tracing::info!(
        trace = %args.trace.display(),
        frames = trace.frames.len(),
        elide = config.elide,
        "replaying trace"
    );
    let summary = replay(&trace, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary)?;
    }
    Ok(())
}

fn print_summary(summary: &ReplaySummary) -> Result<()> {
    for frame in &summary.frames {
        println!(
            "rc: {} {}",
            frame.redundant.resource_total(),
            serde_json::to_string(&frame.redundant)?
        );
    }

    let label = if summary.elide { "elided" } else { "redundant (forwarded)" };
    println!(
        "frames: {}  forwarded: {}  {label}: {} (resources: {})",
        summary.frames.len(),
        summary.forwarded,
        summary.redundant.total(),
        summary.redundant.resource_total()
    );
    println!(
        "pool: {} idle, {} allocated",
        summary.pool.idle, summary.pool.allocated
    );
    Ok(())
}

fn run_check_config(args: CheckConfigArgs) -> Result<()> {
    let config = load_config(&args.path)?;
    println!(
        "{}: ok (elide = {}, pool = {}/{}, report every {:?})",
        args.path.display(),
        config.elide,
        config.pool.preallocate,
        config.pool.max_idle,
        config.report.interval
    );
    Ok(())
}
