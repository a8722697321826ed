//! 에러 타입 — 하네스 단계별 에러 정의
//!
//! [`HarnessError`]의 variant는 실패 분류 체계를 그대로 따릅니다.
//!
//! | 분류 | 시점 | 처리 |
//! |---|---|---|
//! | `MissingConfiguration` | 설정 해석 | 리소스를 건드리기 전에 중단 |
//! | `Bootstrap` | 클라이언트 생성 / 노드 확인 | setup 중단 |
//! | `ValidationMismatch` | 암호화 능력 / 키 프로바이더 검증 | setup 중단 |
//! | `ScenarioAssertion` | 키 / 암호화 클래스 / 클레임 생성 | 정리 스택 역순 실행 후 teardown |
//! | `Teardown` | 리소스 삭제 | 추가 실패로 보고, 나머지 teardown 계속 |
//!
//! 어떤 에러도 재시도되거나 경고로 격하되지 않습니다.

use serde::{Deserialize, Serialize};

/// 하네스 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// 필수 설정값 누락
    #[error("missing configuration: {key} is not set")]
    MissingConfiguration { key: String },

    /// 설정 파일/값 에러
    #[error("config error: {0}")]
    Config(ConfigError),

    /// 클라이언트 생성 또는 노드 준비 상태 확인 실패
    #[error("bootstrap failed at {stage}: {reason}")]
    Bootstrap { stage: String, reason: String },

    /// 기대값과 실제값 불일치 (암호화 능력, 키 프로바이더 상태)
    #[error("validation mismatch for {subject}: expected {expected}, got {actual}")]
    ValidationMismatch {
        subject: String,
        expected: String,
        actual: String,
    },

    /// 시나리오 본문 실패
    #[error("scenario assertion failed at {step}: {reason}")]
    ScenarioAssertion { step: String, reason: String },

    /// teardown 중 리소스 삭제 실패 ("이미 없음"은 제외)
    #[error("teardown failed for {resource}: {reason}")]
    Teardown { resource: String, reason: String },

    /// 단계의 취소 컨텍스트가 취소됨
    #[error("{phase} cancelled during {step}")]
    Cancelled { phase: String, step: String },

    /// 단계 제한 시간 초과
    #[error("{phase} timed out after {secs}s during {step}")]
    Timeout {
        phase: String,
        step: String,
        secs: u64,
    },
}

impl HarnessError {
    /// 보고서용 실패 분류를 반환합니다.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingConfiguration { .. } | Self::Config(_) => {
                FailureKind::MissingConfiguration
            }
            Self::Bootstrap { .. } => FailureKind::BootstrapFailure,
            Self::ValidationMismatch { .. } => FailureKind::ValidationMismatch,
            Self::ScenarioAssertion { .. } => FailureKind::ScenarioAssertionFailure,
            Self::Teardown { .. } => FailureKind::TeardownFailure,
            Self::Cancelled { .. } | Self::Timeout { .. } => FailureKind::Interrupted,
        }
    }

    /// 부트스트랩 단계 에러를 생성합니다.
    pub fn bootstrap(stage: &str, reason: impl std::fmt::Display) -> Self {
        Self::Bootstrap {
            stage: stage.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// 시나리오 단계 에러를 생성합니다.
    pub fn scenario(step: &str, reason: impl std::fmt::Display) -> Self {
        Self::ScenarioAssertion {
            step: step.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// teardown 단계 에러를 생성합니다.
    pub fn teardown(resource: &str, reason: impl std::fmt::Display) -> Self {
        Self::Teardown {
            resource: resource.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// 실패 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingConfiguration,
    BootstrapFailure,
    ValidationMismatch,
    ScenarioAssertionFailure,
    TeardownFailure,
    /// 취소 또는 제한 시간 초과
    Interrupted,
}

impl FailureKind {
    /// 메트릭 레이블 / 직렬화 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingConfiguration => "missing_configuration",
            Self::BootstrapFailure => "bootstrap_failure",
            Self::ValidationMismatch => "validation_mismatch",
            Self::ScenarioAssertionFailure => "scenario_assertion_failure",
            Self::TeardownFailure => "teardown_failure",
            Self::Interrupted => "interrupted",
        }
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 필수 환경변수/설정값 누락
    #[error("required setting {key} is not set")]
    Missing { key: String },

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

impl From<ConfigError> for HarnessError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing { key } => HarnessError::MissingConfiguration { key },
            other => HarnessError::Config(other),
        }
    }
}

/// 클러스터 API 에러
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// 대상 객체가 없음 (404)
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// 동일 이름 객체가 이미 존재 (409)
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },

    /// 권한 거부 (403)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// 그 외 API 호출 실패
    #[error("cluster api error: {0}")]
    Api(String),

    /// kubeconfig 로딩 또는 연결 실패
    #[error("cluster connection error: {0}")]
    Connection(String),

    /// 클러스터 호출 중 스토리지 백엔드 조회 실패
    #[error("storage backend error: {0}")]
    Backend(BackendError),
}

impl ClusterError {
    /// "이미 없음" 여부. teardown에서 허용되는 유일한 삭제 실패입니다.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// 스토리지 백엔드 (vCenter) 에러
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// 세션 생성 / 연결 실패
    #[error("backend connection error: {0}")]
    Connection(String),

    /// 스토리지 정책을 찾을 수 없음
    #[error("storage policy '{0}' not found")]
    PolicyNotFound(String),

    /// 키 프로바이더를 찾을 수 없음
    #[error("key provider '{0}' not found")]
    KeyProviderNotFound(String),

    /// 그 외 API 호출 실패
    #[error("backend api error: {0}")]
    Api(String),
}

impl From<BackendError> for ClusterError {
    fn from(err: BackendError) -> Self {
        ClusterError::Backend(err)
    }
}
