//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default control API address of a locally running daemon.
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// xdpwall -- XDP firewall control client.
///
/// Use `xdpwall <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "xdpwall", version, about, long_about = None)]
pub struct Cli {
    /// Control API address of the xdpwall daemon.
    #[arg(short, long, global = true, default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Log level for client diagnostics (written to stderr).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Attach the XDP program to network interfaces.
    Load(LoadArgs),

    /// Detach the XDP program from network interfaces.
    Unload(UnloadArgs),

    /// Block an IPv4 CIDR, optionally for a limited time.
    Block(BlockArgs),

    /// Remove an IPv4 CIDR from the blocklist.
    Allow(AllowArgs),

    /// Show attached interfaces, blocklist, timeouts and drop counters.
    Status,

    /// Remove every blocklist entry.
    FlushBlocked,

    /// Reset every drop counter.
    FlushStats,
}

// ---- load / unload ----

/// XDP attach mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum XdpMode {
    /// Offload to the NIC.
    Hw,
    /// Generic (kernel network stack) mode.
    Skb,
    /// Native driver mode.
    Nv,
}

impl XdpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hw => "hw",
            Self::Skb => "skb",
            Self::Nv => "nv",
        }
    }
}

/// Attach the XDP program.
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Comma-separated interface names (e.g. `eth0,eth1`).
    #[arg(short, long)]
    pub interfaces: String,

    /// Attach mode.
    #[arg(short, long, default_value = "skb")]
    pub mode: XdpMode,
}

/// Detach the XDP program.
#[derive(Args, Debug)]
pub struct UnloadArgs {
    /// Comma-separated interface names, or `all`.
    #[arg(short, long)]
    pub interfaces: String,
}

// ---- block / allow ----

/// Block a CIDR.
#[derive(Args, Debug)]
pub struct BlockArgs {
    /// IPv4 CIDR (e.g. `10.0.0.0/24`, `192.168.1.7/32`).
    pub target: String,

    /// Seconds until the block is revoked (0 = permanent).
    #[arg(short, long, default_value_t = 0)]
    pub timeout: u64,
}

/// Allow a previously blocked CIDR.
#[derive(Args, Debug)]
pub struct AllowArgs {
    /// IPv4 CIDR exactly as it was blocked.
    pub target: String,
}
