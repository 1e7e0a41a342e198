//! HTTP 컨트롤 API 와이어 타입
//!
//! 데몬과 CLI가 공유하는 요청/응답 JSON 본문을 정의합니다.
//! 필드 이름은 기존 클라이언트와의 호환을 위해 그대로 유지합니다.

use serde::{Deserialize, Serialize};

/// `POST /load` 요청 본문
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// 쉼표로 구분된 인터페이스 이름 (`"eth0,eth1"`)
    #[serde(default)]
    pub interfaces: String,
    /// 어태치 모드 (`hw`, `skb`, `nv`)
    #[serde(default)]
    pub mode: String,
}

/// `POST /unload` 요청 본문
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnloadRequest {
    /// 쉼표로 구분된 인터페이스 이름 또는 `"all"`
    #[serde(default)]
    pub interfaces: String,
}

/// `POST /block` 요청 본문
///
/// 세 필드 모두 필수입니다. `timeout`이 0이면 만료 없이 차단합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRequest {
    /// IPv4 CIDR (`"10.0.0.0/24"`)
    pub target: String,
    /// `block` 또는 `allow`
    pub action: String,
    /// 만료까지 남은 초
    pub timeout: u64,
}

/// 에러 응답 본문
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP 상태 코드
    pub status: u16,
    /// 사람이 읽을 수 있는 원인
    pub message: String,
    /// 배치 작업에서 실패 이전에 완료된 항목
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completed: Vec<String>,
}

/// `GET /status` 응답 본문
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// 프로그램이 어태치된 인터페이스
    pub interfaces: Vec<String>,
    /// 차단 중인 CIDR
    pub blocked: Vec<String>,
    /// 만료 예정인 차단
    pub timeout: Vec<TimeoutEntry>,
    /// 대상별 드롭 카운터 (모든 CPU 합산)
    pub stats: Vec<TargetStatsRow>,
}

/// 만료 예정 차단 한 건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutEntry {
    /// CIDR
    pub target: String,
    /// 만료 시각 (`YYYY-MM-DD HH:MM:SS`, 로컬 시간)
    pub timeout: String,
    /// 만료까지 남은 초 (이미 지났으면 음수)
    pub remaining_time: i64,
}

/// 대상 주소 한 개의 합산 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetStatsRow {
    /// IPv4 주소
    pub target: String,
    pub src_count: u64,
    pub src_bytes_dropped: u64,
    pub dst_count: u64,
    pub dst_bytes_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_omits_empty_completed() {
        let body = ErrorBody {
            status: 400,
            message: "XDP program is not loaded to any of the interfaces".to_owned(),
            completed: vec![],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("completed"));
    }

    #[test]
    fn error_body_keeps_completed_items() {
        let body = ErrorBody {
            status: 400,
            message: "interface does not exist: eth9".to_owned(),
            completed: vec!["eth0".to_owned()],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["completed"][0], "eth0");
    }

    #[test]
    fn block_request_requires_every_field() {
        let missing_timeout = r#"{"target":"10.0.0.0/24","action":"block"}"#;
        assert!(serde_json::from_str::<BlockRequest>(missing_timeout).is_err());

        let ok = r#"{"target":"10.0.0.0/24","action":"block","timeout":0}"#;
        let req: BlockRequest = serde_json::from_str(ok).unwrap();
        assert_eq!(req.timeout, 0);
    }

    #[test]
    fn status_report_uses_wire_field_names() {
        let report = StatusReport {
            interfaces: vec!["eth0".to_owned()],
            blocked: vec!["10.0.0.0/24".to_owned()],
            timeout: vec![TimeoutEntry {
                target: "10.0.0.0/24".to_owned(),
                timeout: "2026-01-01 00:00:05".to_owned(),
                remaining_time: -1,
            }],
            stats: vec![TargetStatsRow {
                target: "10.0.0.7".to_owned(),
                src_count: 2,
                ..Default::default()
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["timeout"][0]["remaining_time"], -1);
        assert_eq!(json["stats"][0]["src_count"], 2);
        assert_eq!(json["stats"][0]["dst_bytes_dropped"], 0);
    }
}
