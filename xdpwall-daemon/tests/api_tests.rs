//! HTTP control API tests.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot` against a
//! control plane backed by in-memory tables and a manual clock.

use std::net::Ipv4Addr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::TimeDelta;
use tower::ServiceExt;

use xdpwall_core::api::{ErrorBody, StatusReport};
use xdpwall_daemon::api::{AppState, router};
use xdpwall_ebpf_engine::{
    BlockKey, ControlPlane, ManualClock, MemoryAttacher, MemoryBlocklist, MemoryCounters,
    TargetCounters,
};

struct Harness {
    control: Arc<ControlPlane>,
    clock: ManualClock,
}

impl Harness {
    fn new() -> Self {
        Self::with_tables(MemoryBlocklist::new(), MemoryCounters::new(2))
    }

    fn with_tables(blocklist: MemoryBlocklist, counters: MemoryCounters) -> Self {
        Self::with_parts(MemoryAttacher::new(["eth0", "eth1"]), blocklist, counters)
    }

    fn with_parts(
        attacher: MemoryAttacher,
        blocklist: MemoryBlocklist,
        counters: MemoryCounters,
    ) -> Self {
        let clock = ManualClock::starting_now();
        let control = Arc::new(ControlPlane::with_clock(
            Box::new(attacher),
            Box::new(blocklist),
            Box::new(counters),
            Arc::new(clock.clone()),
        ));
        Self { control, clock }
    }

    fn app(&self) -> Router {
        router(AppState {
            control: Arc::clone(&self.control),
        })
    }

    async fn post(&self, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .expect("request should build");
        send(self.app(), request).await
    }

    async fn post_empty(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        send(self.app(), request).await
    }

    async fn status(&self) -> StatusReport {
        let request = Request::builder()
            .uri("/status")
            .body(Body::empty())
            .expect("request should build");
        let (status, body) = send(self.app(), request).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).expect("status body should be a StatusReport")
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    (status, body.to_vec())
}

fn error_body(body: &[u8]) -> ErrorBody {
    serde_json::from_slice(body).expect("error body should be JSON")
}

fn counters(packets: u64, bytes: u64) -> TargetCounters {
    TargetCounters {
        src_packets: packets,
        src_bytes: bytes,
        dst_packets: 0,
        dst_bytes: 0,
    }
}

// --- /load, /unload ---

#[tokio::test]
async fn load_attaches_and_status_lists_interfaces() {
    let h = Harness::new();

    let (status, body) = h
        .post("/load", r#"{"interfaces":"eth1,eth0","mode":"skb"}"#)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    assert_eq!(h.status().await.interfaces, ["eth0", "eth1"]);
}

#[tokio::test]
async fn load_rejects_unknown_mode() {
    let h = Harness::new();

    let (status, body) = h
        .post("/load", r#"{"interfaces":"eth0","mode":"turbo"}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err = error_body(&body);
    assert_eq!(err.status, 400);
    assert!(err.message.contains("turbo"));
    assert!(h.status().await.interfaces.is_empty());
}

#[tokio::test]
async fn load_requires_interfaces_and_mode() {
    let h = Harness::new();

    let (status, _) = h.post("/load", r#"{"mode":"skb"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.post("/load", r#"{"interfaces":"eth0"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn load_reports_interfaces_completed_before_unknown_one() {
    let h = Harness::new();

    let (status, body) = h
        .post("/load", r#"{"interfaces":"eth0,wlan9,eth1","mode":"nv"}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err = error_body(&body);
    assert!(err.message.contains("wlan9"));
    assert_eq!(err.completed, ["eth0"]);
    assert_eq!(h.status().await.interfaces, ["eth0"]);
}

#[tokio::test]
async fn unload_without_any_link_is_rejected() {
    let h = Harness::new();

    let (status, body) = h.post("/unload", r#"{"interfaces":"all"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_body(&body).message.contains("not loaded"));
}

#[tokio::test]
async fn unload_lists_interfaces_that_had_nothing_loaded() {
    let h = Harness::new();
    h.post("/load", r#"{"interfaces":"eth0","mode":"skb"}"#).await;

    let (status, body) = h.post("/unload", r#"{"interfaces":"eth0,eth1"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(body).expect("utf-8 body"),
        "no XDP code loaded to the interface: eth1\n"
    );
    assert!(h.status().await.interfaces.is_empty());
}

#[tokio::test]
async fn unload_all_detaches_everything() {
    let h = Harness::new();
    h.post("/load", r#"{"interfaces":"eth0,eth1","mode":"hw"}"#)
        .await;

    let (status, body) = h.post("/unload", r#"{"interfaces":"all"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert!(h.status().await.interfaces.is_empty());
}

#[tokio::test]
async fn unload_failure_keeps_failed_link_and_reports_progress() {
    let h = Harness::with_parts(
        MemoryAttacher::new(["eth0", "eth1"]).stuck("eth1"),
        MemoryBlocklist::new(),
        MemoryCounters::new(1),
    );
    h.post("/load", r#"{"interfaces":"eth0,eth1","mode":"skb"}"#)
        .await;

    let (status, body) = h.post("/unload", r#"{"interfaces":"eth0,eth1"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_body(&body).completed, ["eth0"]);
    assert_eq!(h.status().await.interfaces, ["eth1"]);
}

// --- /block ---

#[tokio::test]
async fn block_then_allow_round_trip() {
    let h = Harness::new();

    let (status, _) = h
        .post(
            "/block",
            r#"{"target":"10.0.0.0/24","action":"block","timeout":0}"#,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let report = h.status().await;
    assert_eq!(report.blocked, ["10.0.0.0/24"]);
    assert!(report.timeout.is_empty());

    let (status, _) = h
        .post(
            "/block",
            r#"{"target":"10.0.0.0/24","action":"allow","timeout":0}"#,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.status().await.blocked.is_empty());
}

#[tokio::test]
async fn timed_block_reports_remaining_time() {
    let h = Harness::new();

    h.post(
        "/block",
        r#"{"target":"192.168.1.7/32","action":"block","timeout":120}"#,
    )
    .await;
    h.clock.advance(TimeDelta::seconds(20));

    let report = h.status().await;
    assert_eq!(report.timeout.len(), 1);
    let entry = &report.timeout[0];
    assert_eq!(entry.target, "192.168.1.7/32");
    assert_eq!(entry.remaining_time, 100);
    assert_eq!(entry.timeout.len(), "YYYY-MM-DD HH:MM:SS".len());
}

#[tokio::test]
async fn allow_of_unblocked_target_is_not_found() {
    let h = Harness::new();

    let (status, body) = h
        .post(
            "/block",
            r#"{"target":"10.9.9.0/24","action":"allow","timeout":0}"#,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let err = error_body(&body);
    assert_eq!(err.status, 404);
    assert!(err.message.contains("10.9.9.0/24"));
}

#[tokio::test]
async fn block_rejects_bad_input() {
    let h = Harness::new();

    let cases = [
        r#"{"target":"10.0.0.1/24","action":"block","timeout":0}"#,
        r#"{"target":"10.0.0.0","action":"block","timeout":0}"#,
        r#"{"target":"10.0.0.0/24","action":"drop","timeout":0}"#,
        r#"{"target":"10.0.0.0/24","action":"block"}"#,
        r#"{"target":"10.0.0.0/24","action":"block","timeout":-1}"#,
    ];
    for case in cases {
        let (status, body) = h.post("/block", case).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case: {case}");
        assert_eq!(error_body(&body).status, 400, "case: {case}");
    }
    assert!(h.status().await.blocked.is_empty());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let h = Harness::new();

    let (status, body) = h.post("/block", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_body(&body).message.starts_with("bad request body"));
}

#[tokio::test]
async fn table_insert_failure_is_server_error() {
    let h = Harness::with_tables(MemoryBlocklist::new().failing_inserts(), MemoryCounters::new(1));

    let (status, body) = h
        .post(
            "/block",
            r#"{"target":"10.0.0.0/8","action":"block","timeout":0}"#,
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_body(&body).status, 500);
}

// --- /status ---

#[tokio::test]
async fn status_sums_counters_across_cpus() {
    let target = Ipv4Addr::new(10, 0, 0, 5);
    let mut table = MemoryCounters::new(2);
    table.record(target, 0, counters(3, 300));
    table.record(target, 1, counters(2, 200));
    let h = Harness::with_tables(MemoryBlocklist::new(), table);

    let report = h.status().await;
    assert_eq!(report.stats.len(), 1);
    let row = &report.stats[0];
    assert_eq!(row.target, "10.0.0.5");
    assert_eq!(row.src_count, 5);
    assert_eq!(row.src_bytes_dropped, 500);
    assert_eq!(row.dst_count, 0);
}

#[tokio::test]
async fn status_json_uses_wire_field_names() {
    let h = Harness::new();
    let request = Request::builder()
        .uri("/status")
        .body(Body::empty())
        .expect("request should build");

    let (status, body) = send(h.app(), request).await;
    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).expect("JSON body");
    for field in ["interfaces", "blocked", "timeout", "stats"] {
        assert!(value[field].is_array(), "missing field {field}");
    }
}

#[tokio::test]
async fn status_survives_unreadable_tables() {
    let h = Harness::with_tables(
        MemoryBlocklist::new().failing_iteration(),
        MemoryCounters::new(1).failing_iteration(),
    );
    h.post("/load", r#"{"interfaces":"eth0","mode":"skb"}"#).await;

    let report = h.status().await;
    assert_eq!(report.interfaces, ["eth0"]);
    assert!(report.blocked.is_empty());
    assert!(report.stats.is_empty());
}

// --- flushes ---

#[tokio::test]
async fn flush_blocked_clears_blocklist_and_timeouts() {
    let h = Harness::new();
    h.post(
        "/block",
        r#"{"target":"10.0.0.0/24","action":"block","timeout":60}"#,
    )
    .await;
    h.post(
        "/block",
        r#"{"target":"172.16.0.0/12","action":"block","timeout":0}"#,
    )
    .await;

    let (status, _) = h.post_empty("/flushblocked").await;
    assert_eq!(status, StatusCode::OK);
    let report = h.status().await;
    assert!(report.blocked.is_empty());
    assert!(report.timeout.is_empty());
}

#[tokio::test]
async fn flush_blocked_failure_reports_completed_deletes() {
    let stuck: BlockKey = "10.2.0.0/16".parse().expect("valid CIDR");
    let h = Harness::with_tables(
        MemoryBlocklist::with_entries([
            "10.1.0.0/16".parse().expect("valid CIDR"),
            stuck,
        ])
        .failing_remove(stuck),
        MemoryCounters::new(1),
    );

    let (status, body) = h.post_empty("/flushblocked").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let err = error_body(&body);
    assert_eq!(err.completed, ["10.1.0.0/16"]);
    assert!(err.message.contains("10.2.0.0/16"));
    assert_eq!(h.status().await.blocked, ["10.2.0.0/16"]);
}

#[tokio::test]
async fn flush_status_clears_counters() {
    let mut table = MemoryCounters::new(1);
    table.record(Ipv4Addr::new(10, 0, 0, 1), 0, counters(1, 64));
    table.record(Ipv4Addr::new(10, 0, 0, 2), 0, counters(1, 64));
    let h = Harness::with_tables(MemoryBlocklist::new(), table);

    let (status, _) = h.post_empty("/flushstatus").await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.status().await.stats.is_empty());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let h = Harness::new();
    let (status, _) = h.post_empty("/reload").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
