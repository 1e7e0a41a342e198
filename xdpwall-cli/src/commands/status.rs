//! `xdpwall status` command handler

use tracing::debug;

use crate::client::ApiClient;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `status` command.
pub async fn execute(client: &ApiClient, writer: &OutputWriter) -> Result<(), CliError> {
    let report = client.status().await?;
    debug!(
        interfaces = report.interfaces.len(),
        blocked = report.blocked.len(),
        "status received"
    );
    writer.render(&report)
}
