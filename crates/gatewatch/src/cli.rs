//! Argument definitions for the `gatewatch` binary.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Live monitor and command console for badge/door access-control streams.
#[derive(Debug, Parser)]
#[command(name = "gatewatch", version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Stream endpoint (ws:// or wss://).
    #[arg(long, short = 'u', global = true, env = "GATEWATCH_STREAM_URL")]
    pub url: Option<String>,

    /// Orchestrator base URL.
    #[arg(long, global = true, env = "GATEWATCH_ORCHESTRATOR_URL")]
    pub orchestrator: Option<String>,

    /// Seconds to wait for connection or readiness.
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout: u64,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream the live event feed until interrupted.
    Watch(WatchArgs),

    /// Simulate a badge swipe at a badge-reader device.
    Badge(BadgeArgs),

    /// Drive a door directly.
    Door(DoorArgs),

    /// List devices known to the orchestrator.
    Devices(DevicesArgs),

    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Override the retained-event capacity.
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Also print raw frame text under each event.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Debug, Args)]
pub struct BadgeArgs {
    /// Target badge-reader device (e.g. badgeuse-001).
    pub device_id: String,

    /// Badge identifier to present (e.g. BADGE-1234).
    pub badge_id: String,

    /// Door the badge should open, when the reader serves several.
    #[arg(long)]
    pub door: Option<String>,
}

#[derive(Debug, Args)]
pub struct DoorArgs {
    /// Target door device (e.g. porte-001).
    pub door_id: String,

    /// What to do with it.
    #[arg(value_enum)]
    pub action: DoorActionArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DoorActionArg {
    Open,
    Close,
    Toggle,
}

impl From<DoorActionArg> for gatewatch_core::DoorAction {
    fn from(action: DoorActionArg) -> Self {
        match action {
            DoorActionArg::Open => Self::Open,
            DoorActionArg::Close => Self::Close,
            DoorActionArg::Toggle => Self::Toggle,
        }
    }
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Block until this device id reports ready (bounded by --timeout).
    #[arg(long)]
    pub wait: Option<String>,

    /// Device kind used with --wait.
    #[arg(long, default_value = "porte")]
    pub kind: String,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
