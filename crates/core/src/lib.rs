//! xdpwall 공통 크레이트
//!
//! XDP 방화벽 컨트롤 플레인의 모든 크레이트가 공유하는 설정, 에러 타입,
//! 메트릭 이름을 정의합니다. 커널 I/O는 수행하지 않습니다.
//!
//! # 모듈 구성
//! - [`api`]: HTTP 컨트롤 API 요청/응답 본문
//! - [`config`]: `xdpwall.toml` 파싱, 환경변수 오버라이드, 검증
//! - [`error`]: 도메인별 에러와 HTTP 상태 분류
//! - [`metrics`]: Prometheus 메트릭 이름 상수

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ControlError, ErrorClass, XdpwallError};

// 설정
pub use config::XdpwallConfig;

// API
pub use api::{BlockRequest, ErrorBody, LoadRequest, StatusReport, UnloadRequest};
