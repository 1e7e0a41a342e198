//! Serve / shutdown lifecycle tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use xdpwall_core::config::XdpwallConfig;
use xdpwall_daemon::server;
use xdpwall_ebpf_engine::{
    ControlPlane, EngineConfig, MemoryAttacher, MemoryBlocklist, MemoryCounters,
};

fn ephemeral_config() -> XdpwallConfig {
    let mut config = XdpwallConfig::default();
    config.api.listen_addr = "127.0.0.1".to_owned();
    config.api.port = 0;
    config
}

fn control_plane() -> Arc<ControlPlane> {
    Arc::new(ControlPlane::new(
        Box::new(MemoryAttacher::new(["eth0", "eth1"])),
        Box::new(MemoryBlocklist::new()),
        Box::new(MemoryCounters::new(1)),
    ))
}

#[tokio::test]
async fn shutdown_detaches_every_interface() {
    let control = control_plane();
    control.load("eth0,eth1", "skb").await.unwrap();

    let engine_config = EngineConfig {
        reap_interval: Some(Duration::from_millis(10)),
        ..EngineConfig::default()
    };
    let (tx, rx) = oneshot::channel::<()>();
    let shutdown = async move {
        let _ = rx.await;
        "test"
    };

    let task = tokio::spawn(server::serve(
        ephemeral_config(),
        engine_config,
        Arc::clone(&control),
        shutdown,
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("serve should return after shutdown")
        .expect("serve task should not panic");
    assert!(result.is_ok());
    assert!(control.attached().await.is_empty());
}

#[tokio::test]
async fn timed_blocks_survive_shutdown_with_reaper_disabled() {
    let control = control_plane();
    control
        .set_action("10.0.0.0/24", "block", 3600)
        .await
        .unwrap();

    let engine_config = EngineConfig {
        reap_interval: None,
        ..EngineConfig::default()
    };

    server::serve(ephemeral_config(), engine_config, Arc::clone(&control), async {
        "immediate"
    })
    .await
    .unwrap();

    let report = control.status().await;
    assert_eq!(report.blocked, ["10.0.0.0/24"]);
    assert_eq!(report.timeout.len(), 1);
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let mut config = ephemeral_config();
    config.api.listen_addr = "203.0.113.1".to_owned();

    let result = server::serve(
        config,
        EngineConfig {
            reap_interval: None,
            ..EngineConfig::default()
        },
        control_plane(),
        async { "unused" },
    )
    .await;

    let err = result.expect_err("binding a foreign address must fail");
    assert!(err.to_string().contains("failed to bind"));
}
