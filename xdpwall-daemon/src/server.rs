//! Daemon lifecycle -- control plane assembly, API server, graceful shutdown.
//!
//! # Startup
//!
//! 1. Install the Prometheus recorder (if enabled)
//! 2. Load the XDP object and build the [`ControlPlane`]
//! 3. Bind the HTTP control API
//! 4. Spawn the expiry reaper (if enabled)
//!
//! # Shutdown (SIGTERM / SIGINT)
//!
//! 1. Stop accepting requests, finish in-flight ones
//! 2. Broadcast shutdown to background tasks
//! 3. Detach the XDP program from every tracked interface

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use xdpwall_core::config::XdpwallConfig;
use xdpwall_ebpf_engine::{ControlPlane, EngineConfig, spawn_reaper};

use crate::api::{self, AppState};
use crate::metrics_server;

/// Load the XDP object and build the control plane.
#[cfg(target_os = "linux")]
pub fn build_control_plane(config: &EngineConfig) -> Result<ControlPlane> {
    xdpwall_ebpf_engine::loader::load(config)
        .map_err(|e| anyhow::anyhow!("failed to load XDP object: {}", e))
}

/// XDP is only available on Linux.
#[cfg(not(target_os = "linux"))]
pub fn build_control_plane(_config: &EngineConfig) -> Result<ControlPlane> {
    Err(anyhow::anyhow!("XDP is only supported on Linux"))
}

/// Parse the API listen address from configuration.
pub fn api_addr(config: &XdpwallConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.api.listen_addr, config.api.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid api listen address: {}", e))
}

/// Run the daemon until a shutdown signal arrives.
///
/// `config` must already be validated.
pub async fn run(config: XdpwallConfig) -> Result<()> {
    if config.metrics.enabled {
        metrics_server::install_metrics_recorder(&config.metrics)?;
    }

    let engine_config = EngineConfig::from_core(&config);
    let control = Arc::new(build_control_plane(&engine_config)?);
    serve(config, engine_config, control, wait_for_shutdown_signal()?).await
}

/// Serve the API with an already-built control plane.
///
/// Returns once `shutdown` resolves and every background task has stopped.
pub async fn serve<F>(
    config: XdpwallConfig,
    engine_config: EngineConfig,
    control: Arc<ControlPlane>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = &'static str> + Send + 'static,
{
    let addr = api_addr(&config)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind control API on {}: {}", addr, e))?;
    let local_addr = listener.local_addr().unwrap_or(addr);
    tracing::info!(listen_addr = %local_addr, "control API listening");

    let (shutdown_tx, _) = broadcast::channel(4);

    let reaper = engine_config.reap_interval.map(|interval| {
        spawn_reaper(Arc::clone(&control), interval, shutdown_tx.subscribe())
    });
    if reaper.is_none() {
        tracing::warn!("expiry reaper disabled, timed blocks will not be revoked");
    }

    let app = api::router(AppState {
        control: Arc::clone(&control),
    });
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let signal = shutdown.await;
            tracing::info!(signal = signal, "shutdown signal received");
        })
        .await
        .map_err(|e| anyhow::anyhow!("control API server failed: {}", e))?;

    tracing::info!("broadcasting shutdown signal to all tasks");
    let _ = shutdown_tx.send(());
    if let Some(task) = reaper {
        let _ = task.await;
    }

    let detached = control.detach_all().await;
    tracing::info!(interfaces = ?detached, "xdpwall-daemon shut down");
    Ok(())
}

/// Install SIGTERM / SIGINT handlers.
///
/// Returns a future resolving to the name of the signal received.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
fn wait_for_shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_addr_combines_host_and_port() {
        let mut config = XdpwallConfig::default();
        config.api.listen_addr = "0.0.0.0".to_owned();
        config.api.port = 9000;
        assert_eq!(api_addr(&config).unwrap().to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn api_addr_rejects_hostnames() {
        let mut config = XdpwallConfig::default();
        config.api.listen_addr = "localhost".to_owned();
        assert!(api_addr(&config).is_err());
    }
}
