use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "rcheck",
    author,
    version,
    about = "Replay GPU pass traces and report redundant state-setting calls"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON pass trace through the state tracker.
    Replay(ReplayArgs),
    /// Validate a tracker configuration file.
    CheckConfig(CheckConfigArgs),
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Trace file describing resources and the frames to record.
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Tracker configuration (TOML).
    #[arg(long, value_name = "FILE", env = "RCHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print a JSON summary instead of per-frame lines.
    #[arg(long)]
    pub json: bool,

    /// Count redundant calls but forward them anyway.
    #[arg(long)]
    pub count_only: bool,
}

#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

pub fn parse() -> Cli {
    Cli::parse()
}
