//! Clap derive structures for the `netpulse` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// netpulse -- appliance throughput from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "netpulse",
    version,
    about = "Watch network appliance throughput from the command line",
    long_about = "Polls a network appliance for inbound, outbound and total throughput.\n\n\
        `watch` follows the live series or shows a historical range, `snapshot`\n\
        prints the newest measurement, and `history` dumps a range once.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Appliance profile to use
    #[arg(long, short = 'p', env = "NETPULSE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Appliance URL (overrides profile)
    #[arg(long, short = 'a', env = "NETPULSE_APPLIANCE", global = true)]
    pub appliance: Option<String>,

    /// Device whose metrics are shown (default: all)
    #[arg(long, short = 'd', env = "NETPULSE_DEVICE", global = true)]
    pub device: Option<String>,

    /// Anti-forgery token for mutating requests
    #[arg(long, env = "NETPULSE_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NETPULSE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "NETPULSE_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds (overrides profile)
    #[arg(long, env = "NETPULSE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON, one object per line when streaming
    JsonCompact,
    /// YAML
    Yaml,
    /// Tab-separated values (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// A dashboard range selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangeArg {
    /// Follow the newest snapshots
    Live,
    #[value(name = "15m")]
    Minutes15,
    #[value(name = "30m")]
    Minutes30,
    #[value(name = "1h")]
    Hour1,
    #[value(name = "6h")]
    Hours6,
    #[value(name = "12h")]
    Hours12,
    #[value(name = "24h")]
    Hours24,
    #[value(name = "7d")]
    Days7,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow live throughput, or show a historical range
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Print the newest snapshot
    #[command(alias = "snap")]
    Snapshot,

    /// Print a historical range once
    #[command(alias = "hist")]
    History(HistoryArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Range to show; remembered for the next run (default: last used)
    #[arg(long, short = 'r')]
    pub range: Option<RangeArg>,

    /// Live polling period, e.g. "15s" or "1m" (overrides profile)
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Exit after this many live snapshots
    #[arg(long, short = 'n')]
    pub count: Option<u64>,

    /// Do not seed the live window from history
    #[arg(long)]
    pub no_backfill: bool,
}

// ── History ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Range to fetch
    #[arg(long, short = 'r', default_value = "1h")]
    pub range: RangeArg,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or extend the config file with guided setup
    Init,

    /// Display the current resolved configuration (tokens redacted)
    Show,

    /// Print the config and preference file locations
    Path,

    /// Show or change the remembered dashboard range
    Range {
        /// New range to remember
        value: Option<RangeArg>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
