//! CLI argument definitions for xdpwall-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use xdpwall_core::config::XdpwallConfig;

/// xdpwall XDP firewall control-plane daemon.
///
/// Loads the compiled XDP object, serves the HTTP control API and
/// revokes expired temporary blocks.
#[derive(Parser, Debug)]
#[command(name = "xdpwall-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to xdpwall.toml configuration file.
    #[arg(short, long, default_value = "/etc/xdpwall/xdpwall.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply the log overrides given on the command line.
    pub fn apply_overrides(&self, config: &mut XdpwallConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
    }

    /// Load the config file, apply environment then CLI overrides, and
    /// validate the result once.
    pub async fn load_config(&self) -> Result<XdpwallConfig> {
        let mut config = XdpwallConfig::load(&self.config)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        self.apply_overrides(&mut config);
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        Ok(config)
    }
}
