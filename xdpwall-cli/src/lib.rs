//! xdpwall CLI library.
//!
//! Exposes the client, command handlers and output rendering for
//! integration testing. The `xdpwall` binary (main.rs) is a thin wrapper.

pub mod cli;
pub mod client;
pub mod commands;
pub mod error;
pub mod output;
