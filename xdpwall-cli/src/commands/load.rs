//! `xdpwall load` / `xdpwall unload` command handlers

use crate::cli::{LoadArgs, UnloadArgs};
use crate::client::ApiClient;
use crate::error::CliError;
use crate::output::{Outcome, OutputWriter};

/// Execute the `load` command.
pub async fn execute_load(
    args: LoadArgs,
    client: &ApiClient,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    client.load(&args.interfaces, args.mode.as_str()).await?;
    writer.render(&Outcome::new("XDP program loaded successfully"))
}

/// Execute the `unload` command.
pub async fn execute_unload(
    args: UnloadArgs,
    client: &ApiClient,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let not_loaded = client.unload(&args.interfaces).await?;
    let outcome = Outcome::new(format!(
        "XDP program unloaded successfully from {}",
        args.interfaces
    ))
    .with_notes(not_loaded);
    writer.render(&outcome)
}
