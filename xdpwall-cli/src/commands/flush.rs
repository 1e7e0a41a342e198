//! `xdpwall flush-blocked` / `xdpwall flush-stats` command handlers

use crate::client::ApiClient;
use crate::error::CliError;
use crate::output::{Outcome, OutputWriter};

pub async fn execute_flush_blocked(
    client: &ApiClient,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    client.flush_blocked().await?;
    writer.render(&Outcome::new("Flushed successfully"))
}

pub async fn execute_flush_stats(
    client: &ApiClient,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    client.flush_stats().await?;
    writer.render(&Outcome::new("Flushed successfully"))
}
