use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Settings file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Starting tempo before any taps
    #[arg(short, long, global = true)]
    pub bpm: Option<u32>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive session: Enter taps, `a` advances, `+`/`-` nudge, `q` quits
    Run,
    /// Replay a recorded trace in virtual time
    Replay {
        trace: PathBuf,
        /// Keep running timers until this time (ms)
        #[arg(long)]
        until: Option<u64>,
        /// Maximum random callback latency injected per firing (ms)
        #[arg(long, default_value_t = 0)]
        latency_ms: u64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
}

impl Args {
    /// The chosen subcommand; no subcommand means `run`.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
