//! 에러 타입 — 도메인별 에러 정의
//!
//! 컨트롤 플레인 에러는 [`ErrorClass`]로 분류되며, 데몬은 이 분류를
//! HTTP 상태 코드로 변환합니다.

/// xdpwall 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum XdpwallError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 컨트롤 플레인 요청 처리 에러
    #[error("control error: {0}")]
    Control(#[from] ControlError),

    /// XDP 오브젝트 로드/맵 획득 실패
    #[error("ebpf error: {0}")]
    Ebpf(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 에러 분류
///
/// - `Input`: 잘못된 요청 본문, 모드, 액션, 주소
/// - `Resource`: 호출자가 고칠 수 있는 자원 문제 (인터페이스 없음, 어태치 실패)
/// - `NotFound`: 차단되지 않은 대상에 대한 allow
/// - `Environment`: 커널 테이블이 호출을 거부한 경우
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Input,
    Resource,
    NotFound,
    Environment,
}

/// 컨트롤 플레인 에러
///
/// 배치 작업(load, unload, flush)의 실패 변형은 실패 이전에 완료된
/// 항목 목록(`completed`)을 함께 보관합니다. 롤백은 하지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// 요청 본문 누락/형식 오류
    #[error("{0}")]
    InvalidInput(String),

    /// 알 수 없는 어태치 모드
    #[error("invalid mode '{0}', expected one of: hw, skb, nv")]
    InvalidMode(String),

    /// IPv4 CIDR 형식 오류
    #[error("invalid IPv4 CIDR '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },

    /// 알 수 없는 블록 액션
    #[error("bad input action '{0}', expected 'block' or 'allow'")]
    InvalidAction(String),

    /// 인터페이스가 존재하지 않음
    #[error("interface does not exist: {interface}")]
    InterfaceNotFound {
        interface: String,
        completed: Vec<String>,
    },

    /// XDP 어태치 실패 (대개 다른 에이전트가 이미 어태치한 경우)
    #[error(
        "cannot attach XDP to {interface}, XDP might be already loaded to the interface -> {reason}"
    )]
    AttachFailure {
        interface: String,
        reason: String,
        completed: Vec<String>,
    },

    /// XDP 디태치 실패
    #[error("cannot remove XDP from the interface {interface} -> {reason}")]
    DetachFailure {
        interface: String,
        reason: String,
        completed: Vec<String>,
    },

    /// 어태치된 인터페이스가 하나도 없음
    #[error("XDP program is not loaded to any of the interfaces")]
    NothingLoaded,

    /// 차단 목록에 없는 대상
    #[error("IP address or subnet is not blocked: {target}")]
    NotBlocked { target: String },

    /// 커널 테이블 갱신 실패
    #[error("unable to update {table} map -> {reason}")]
    TableUpdate { table: String, reason: String },

    /// 커널 테이블 삭제 실패 (flush 중단)
    #[error("unable to delete {target} from {table} map -> {reason}")]
    DeleteFailure {
        table: String,
        target: String,
        reason: String,
        completed: Vec<String>,
    },
}

impl ControlError {
    /// 에러 분류를 반환합니다.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput(_)
            | Self::InvalidMode(_)
            | Self::InvalidAddress { .. }
            | Self::InvalidAction(_) => ErrorClass::Input,
            Self::InterfaceNotFound { .. }
            | Self::AttachFailure { .. }
            | Self::DetachFailure { .. }
            | Self::NothingLoaded => ErrorClass::Resource,
            Self::NotBlocked { .. } => ErrorClass::NotFound,
            Self::TableUpdate { .. } | Self::DeleteFailure { .. } => ErrorClass::Environment,
        }
    }

    /// 배치 실패 이전에 완료된 항목을 반환합니다.
    pub fn completed(&self) -> &[String] {
        match self {
            Self::InterfaceNotFound { completed, .. }
            | Self::AttachFailure { completed, .. }
            | Self::DetachFailure { completed, .. }
            | Self::DeleteFailure { completed, .. } => completed,
            _ => &[],
        }
    }
}
