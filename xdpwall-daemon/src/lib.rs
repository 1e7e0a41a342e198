//! xdpwall daemon library.
//!
//! Exposes the daemon modules for integration testing.
//! In production, `xdpwall-daemon` is used as a binary (main.rs).

pub mod api;
pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod server;
