//! `xdpwall block` / `xdpwall allow` command handlers

use crate::cli::{AllowArgs, BlockArgs};
use crate::client::ApiClient;
use crate::error::CliError;
use crate::output::{Outcome, OutputWriter};

/// Execute the `block` command.
pub async fn execute_block(
    args: BlockArgs,
    client: &ApiClient,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    client.set_action(&args.target, "block", args.timeout).await?;
    let message = if args.timeout > 0 {
        format!(
            "target is blocked successfully (expires in {}s)",
            args.timeout
        )
    } else {
        "target is blocked successfully".to_owned()
    };
    writer.render(&Outcome::new(message))
}

/// Execute the `allow` command.
pub async fn execute_allow(
    args: AllowArgs,
    client: &ApiClient,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    client.set_action(&args.target, "allow", 0).await?;
    writer.render(&Outcome::new("target is allowed successfully"))
}
