//! 설정 관리 — 하네스 설정 파싱 및 환경변수 해석
//!
//! [`HarnessConfig`]는 시나리오 실행에 필요한 모든 입력을 담는 최상위 구조체입니다.
//! 실행 흐름 곳곳에서 환경변수를 직접 읽지 않고, 프로세스 시작 시 한 번 해석/검증합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 러너에서 적용)
//! 2. 환경변수 (`STORAGE_POLICY_WITH_ENCRYPTION=...` 형식, 이름은 호환성 표면)
//! 3. 설정 파일 (`devops-e2e.toml`, 선택)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), devops_e2e_core::error::HarnessError> {
//! use devops_e2e_core::config::{HarnessConfig, ProcessEnv};
//!
//! // 파일 없이 환경변수만으로 로드
//! let config = HarnessConfig::from_env(&ProcessEnv)?;
//!
//! // 파일 + 환경변수 오버라이드
//! let config = HarnessConfig::load(Some("devops-e2e.toml".as_ref())).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HarnessError};
use crate::types::ClusterTarget;

// ─── 환경변수 이름 (호환성 표면) ─────────────────────────────────────

/// 일반 스토리지 정책 이름
pub const ENV_STANDARD_POLICY: &str = "STORAGE_POLICY_FOR_SHARED_DATASTORES";
/// 암호화 스토리지 정책 이름
pub const ENV_ENCRYPTED_POLICY: &str = "STORAGE_POLICY_WITH_ENCRYPTION";
/// 키 프로바이더 ID
pub const ENV_KEY_PROVIDER: &str = "KEY_PROVIDER_ID";
/// VM 클래스 (선택)
pub const ENV_VM_CLASS: &str = "VM_CLASS";
/// VM 이미지 이름
pub const ENV_VM_IMAGE_NAME: &str = "VMSVC_IMAGE_NAME";
/// devops 사용자 kubeconfig 경로 (선택)
pub const ENV_DEVOPS_KUBECONFIG: &str = "DEV_OPS_USER_KUBECONFIG";
/// 클러스터 토폴로지
pub const ENV_CLUSTER_FLAVOR: &str = "CLUSTER_FLAVOR";
/// 관리자 kubeconfig 경로
pub const ENV_KUBECONFIG: &str = "KUBECONFIG";
/// 테스트 네임스페이스 (VANILLA/GC)
pub const ENV_TEST_NAMESPACE: &str = "E2E_TEST_NAMESPACE";
/// 서비스(supervisor) 네임스페이스
pub const ENV_SVC_NAMESPACE: &str = "SVC_NAMESPACE";
/// 서비스(supervisor) 클러스터 kubeconfig
pub const ENV_SVC_KUBECONFIG: &str = "SUPERVISOR_CLUSTER_KUBE_CONFIG";
/// vCenter 주소
pub const ENV_VCENTER_URL: &str = "VSPHERE_VCENTER_URL";
/// vCenter 사용자
pub const ENV_VCENTER_USER: &str = "VSPHERE_USER";
/// vCenter 비밀번호
pub const ENV_VCENTER_PASSWORD: &str = "VSPHERE_PASSWORD";
/// vCenter 인증서 검증 생략 여부
pub const ENV_VCENTER_INSECURE: &str = "VSPHERE_INSECURE";
/// 로그 레벨
pub const ENV_LOG_LEVEL: &str = "DEVOPS_E2E_LOG_LEVEL";
/// 로그 형식
pub const ENV_LOG_FORMAT: &str = "DEVOPS_E2E_LOG_FORMAT";

/// `VM_CLASS` 미설정 시 기본값
pub const DEFAULT_VM_CLASS: &str = "best-effort-small";
/// 기본 CSI 프로비저너
pub const DEFAULT_PROVISIONER: &str = "csi.vsphere.vmware.com";

// ─── 환경변수 해석기 ─────────────────────────────────────────────────

/// 이름으로 설정값을 조회하는 소스
///
/// 기본 구현은 프로세스 환경변수([`ProcessEnv`])이며,
/// 테스트에서는 `HashMap<String, String>`을 그대로 사용할 수 있습니다.
pub trait EnvSource {
    /// 값을 조회합니다. 빈 문자열은 미설정으로 취급합니다.
    fn var(&self, key: &str) -> Option<String>;
}

/// 프로세스 환경변수 소스
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}

/// 필수 값을 해석합니다. 없으면 [`ConfigError::Missing`]을 반환합니다.
pub fn resolve(source: &impl EnvSource, key: &str) -> Result<String, ConfigError> {
    source.var(key).ok_or_else(|| ConfigError::Missing {
        key: key.to_owned(),
    })
}

/// 선택 값을 해석합니다. 없으면 문서화된 기본값을 사용합니다.
pub fn resolve_or(source: &impl EnvSource, key: &str, default: &str) -> String {
    source.var(key).unwrap_or_else(|| default.to_owned())
}

// ─── 클러스터 토폴로지 ───────────────────────────────────────────────

/// 배포 토폴로지
///
/// teardown의 스토리지 클래스 삭제는 `Vanilla`에서만 수행됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterFlavor {
    /// 일반 Kubernetes 클러스터 (하네스가 스토리지 클래스를 소유)
    #[serde(rename = "VANILLA")]
    Vanilla,
    /// supervisor 클러스터
    #[serde(rename = "WORKLOAD")]
    Workload,
    /// supervisor 위의 게스트 클러스터
    #[serde(rename = "GC")]
    Guest,
}

impl ClusterFlavor {
    /// 하네스가 스토리지 클래스 수명주기를 소유하는지 여부
    pub fn owns_storage_classes(self) -> bool {
        matches!(self, Self::Vanilla)
    }
}

impl fmt::Display for ClusterFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vanilla => write!(f, "VANILLA"),
            Self::Workload => write!(f, "WORKLOAD"),
            Self::Guest => write!(f, "GC"),
        }
    }
}

impl FromStr for ClusterFlavor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VANILLA" => Ok(Self::Vanilla),
            "WORKLOAD" | "SUPERVISOR" => Ok(Self::Workload),
            "GC" | "GUEST" => Ok(Self::Guest),
            other => Err(ConfigError::InvalidValue {
                field: "cluster.flavor".to_owned(),
                reason: format!("unknown flavor '{other}', expected VANILLA, WORKLOAD or GC"),
            }),
        }
    }
}

// ─── 설정 구조체 ─────────────────────────────────────────────────────

/// 하네스 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 관리자 클러스터 설정
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// 서비스(supervisor) 클러스터 설정
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    /// devops 사용자 설정
    #[serde(default)]
    pub devops: DevopsConfig,
    /// 스토리지 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 암호화 설정
    #[serde(default)]
    pub crypto: CryptoConfig,
    /// VM 설정
    #[serde(default)]
    pub vm: VmConfig,
    /// vCenter 연결 설정
    #[serde(default)]
    pub vcenter: VcenterConfig,
    /// 단계별 제한 시간
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl HarnessConfig {
    /// TOML 파일(선택)에서 설정을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: Option<&Path>) -> Result<Self, HarnessError> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 환경변수만으로 설정을 구성하고 검증합니다.
    pub fn from_env(source: &impl EnvSource) -> Result<Self, HarnessError> {
        let mut config = Self::default();
        config.apply_env_overrides_from(source)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 읽습니다 (환경변수 오버라이드/검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::ParseFailed {
                    reason: format!("failed to read {}: {e}", path.display()),
                }
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HarnessError> {
        toml::from_str(toml_str).map_err(|e| {
            HarnessError::from(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 프로세스 환경변수로 설정값을 오버라이드합니다.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides_from(&ProcessEnv)
    }

    /// 주어진 소스의 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 토폴로지처럼 잘못된 값이 실행 경로를 바꾸는 항목은 무시하지 않고 에러를 반환합니다.
    pub fn apply_env_overrides_from(&mut self, source: &impl EnvSource) -> Result<(), ConfigError> {
        // General
        override_string(source, &mut self.general.log_level, ENV_LOG_LEVEL);
        override_string(source, &mut self.general.log_format, ENV_LOG_FORMAT);

        // Cluster
        if let Some(raw) = source.var(ENV_CLUSTER_FLAVOR) {
            self.cluster.flavor = raw.parse()?;
        }
        override_path(source, &mut self.cluster.kubeconfig, ENV_KUBECONFIG);
        override_string(source, &mut self.cluster.namespace, ENV_TEST_NAMESPACE);

        // Supervisor
        override_string(source, &mut self.supervisor.namespace, ENV_SVC_NAMESPACE);
        override_path(source, &mut self.supervisor.kubeconfig, ENV_SVC_KUBECONFIG);

        // Devops
        override_path(source, &mut self.devops.kubeconfig, ENV_DEVOPS_KUBECONFIG);

        // Storage
        override_string(source, &mut self.storage.standard_policy, ENV_STANDARD_POLICY);
        override_string(
            source,
            &mut self.storage.encrypted_policy,
            ENV_ENCRYPTED_POLICY,
        );

        // Crypto
        override_string(source, &mut self.crypto.key_provider_id, ENV_KEY_PROVIDER);

        // VM
        self.vm.class = resolve_or(source, ENV_VM_CLASS, &self.vm.class);
        override_string(source, &mut self.vm.image_name, ENV_VM_IMAGE_NAME);

        // vCenter
        override_string(source, &mut self.vcenter.url, ENV_VCENTER_URL);
        override_string(source, &mut self.vcenter.username, ENV_VCENTER_USER);
        override_string(source, &mut self.vcenter.password, ENV_VCENTER_PASSWORD);
        override_bool(source, &mut self.vcenter.insecure, ENV_VCENTER_INSECURE);

        Ok(())
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 필수 값 누락은 해당 환경변수 이름을 담은 `MissingConfiguration`으로 보고합니다.
    pub fn validate(&self) -> Result<(), HarnessError> {
        for key in REQUIRED_KEYS {
            resolve(self, key)?;
        }
        let flavor_keys: &[&str] = match self.cluster.flavor {
            ClusterFlavor::Vanilla => &[ENV_TEST_NAMESPACE],
            ClusterFlavor::Workload => &[ENV_SVC_NAMESPACE],
            ClusterFlavor::Guest => &[ENV_TEST_NAMESPACE, ENV_SVC_NAMESPACE, ENV_SVC_KUBECONFIG],
        };
        for key in flavor_keys {
            resolve(self, key)?;
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.vm.class.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "vm.class".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        if self.storage.claim_size.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.claim_size".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        let t = &self.timeouts;
        for (field, value) in [
            ("timeouts.setup_secs", t.setup_secs),
            ("timeouts.scenario_secs", t.scenario_secs),
            ("timeouts.teardown_secs", t.teardown_secs),
            ("timeouts.vm_image_wait_secs", t.vm_image_wait_secs),
            ("timeouts.vm_image_poll_secs", t.vm_image_poll_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// 시나리오가 실행될 네임스페이스
    ///
    /// supervisor 토폴로지에서는 서비스 네임스페이스에서 실행됩니다.
    pub fn scenario_namespace(&self) -> &str {
        match self.cluster.flavor {
            ClusterFlavor::Workload => &self.supervisor.namespace,
            ClusterFlavor::Vanilla | ClusterFlavor::Guest => &self.cluster.namespace,
        }
    }

    /// 관리자 신원 클러스터 대상
    pub fn admin_target(&self) -> ClusterTarget {
        ClusterTarget::new(
            "admin",
            self.cluster.kubeconfig.clone(),
            self.scenario_namespace(),
        )
    }

    /// devops 신원 클러스터 대상 (설정된 경우에만)
    pub fn devops_target(&self) -> Option<ClusterTarget> {
        self.devops.kubeconfig.as_ref().map(|path| {
            ClusterTarget::new("devops", Some(path.clone()), self.scenario_namespace())
        })
    }

    /// 진단용 서비스 클러스터 대상
    ///
    /// - `VANILLA`: 없음
    /// - `WORKLOAD`: 관리자 자격 증명 + 서비스 네임스페이스
    /// - `GC`: supervisor kubeconfig + 서비스 네임스페이스
    pub fn service_target(&self) -> Option<ClusterTarget> {
        match self.cluster.flavor {
            ClusterFlavor::Vanilla => None,
            ClusterFlavor::Workload => Some(ClusterTarget::new(
                "service",
                self.cluster.kubeconfig.clone(),
                &self.supervisor.namespace,
            )),
            ClusterFlavor::Guest => Some(ClusterTarget::new(
                "service",
                self.supervisor.kubeconfig.clone(),
                &self.supervisor.namespace,
            )),
        }
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 관리자 클러스터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// 배포 토폴로지
    pub flavor: ClusterFlavor,
    /// kubeconfig 경로 (없으면 기본 추론)
    pub kubeconfig: Option<PathBuf>,
    /// 테스트 네임스페이스 (VANILLA/GC)
    pub namespace: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            flavor: ClusterFlavor::Workload,
            kubeconfig: None,
            namespace: "devops-e2e".to_owned(),
        }
    }
}

/// 서비스(supervisor) 클러스터 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// 서비스 네임스페이스
    pub namespace: String,
    /// supervisor kubeconfig (GC 전용)
    pub kubeconfig: Option<PathBuf>,
}

/// devops 사용자 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DevopsConfig {
    /// devops 사용자 kubeconfig. 없으면 클레임 생성 단계를 명시적으로 건너뜁니다.
    pub kubeconfig: Option<PathBuf>,
}

/// 스토리지 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 일반 스토리지 정책 이름
    pub standard_policy: String,
    /// 암호화 스토리지 정책 이름
    pub encrypted_policy: String,
    /// 스토리지 클래스 프로비저너
    pub provisioner: String,
    /// 클레임 요청 크기
    pub claim_size: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            standard_policy: String::new(),
            encrypted_policy: String::new(),
            provisioner: DEFAULT_PROVISIONER.to_owned(),
            claim_size: "1Gi".to_owned(),
        }
    }
}

/// 암호화 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// 키 프로바이더 ID
    pub key_provider_id: String,
}

/// VM 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// VM 클래스
    pub class: String,
    /// VM 이미지 표시 이름
    pub image_name: String,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            class: DEFAULT_VM_CLASS.to_owned(),
            image_name: String::new(),
        }
    }
}

/// vCenter 연결 설정
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VcenterConfig {
    /// vCenter 주소 (예: `https://vc.example.com`)
    pub url: String,
    /// 사용자
    pub username: String,
    /// 비밀번호
    pub password: String,
    /// TLS 인증서 검증 생략
    pub insecure: bool,
}

// 비밀번호가 로그에 남지 않도록 Debug를 직접 구현
impl fmt::Debug for VcenterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcenterConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure", &self.insecure)
            .finish()
    }
}

/// 단계별 제한 시간 및 진단 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// setup 단계 전체 제한 (초)
    pub setup_secs: u64,
    /// 시나리오 본문 제한 (초)
    pub scenario_secs: u64,
    /// teardown 단계 제한 (초)
    pub teardown_secs: u64,
    /// VM 이미지 대기 제한 (초)
    pub vm_image_wait_secs: u64,
    /// VM 이미지 폴링 간격 (초)
    pub vm_image_poll_secs: u64,
    /// 실패 시 덤프할 최근 이벤트 수
    pub event_dump_limit: usize,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            setup_secs: 900,
            scenario_secs: 600,
            teardown_secs: 300,
            vm_image_wait_secs: 600,
            vm_image_poll_secs: 10,
            event_dump_limit: 50,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

/// 모든 토폴로지에서 필수인 키
const REQUIRED_KEYS: [&str; 7] = [
    ENV_STANDARD_POLICY,
    ENV_ENCRYPTED_POLICY,
    ENV_KEY_PROVIDER,
    ENV_VM_IMAGE_NAME,
    ENV_VCENTER_URL,
    ENV_VCENTER_USER,
    ENV_VCENTER_PASSWORD,
];

/// 병합이 끝난 설정을 환경변수 이름으로 조회합니다.
///
/// 검증이 파일/환경변수 어느 쪽에서 온 값이든 같은 이름으로 누락을 보고하게 합니다.
impl EnvSource for HarnessConfig {
    fn var(&self, key: &str) -> Option<String> {
        let value = match key {
            ENV_STANDARD_POLICY => self.storage.standard_policy.clone(),
            ENV_ENCRYPTED_POLICY => self.storage.encrypted_policy.clone(),
            ENV_KEY_PROVIDER => self.crypto.key_provider_id.clone(),
            ENV_VM_CLASS => self.vm.class.clone(),
            ENV_VM_IMAGE_NAME => self.vm.image_name.clone(),
            ENV_TEST_NAMESPACE => self.cluster.namespace.clone(),
            ENV_SVC_NAMESPACE => self.supervisor.namespace.clone(),
            ENV_VCENTER_URL => self.vcenter.url.clone(),
            ENV_VCENTER_USER => self.vcenter.username.clone(),
            ENV_VCENTER_PASSWORD => self.vcenter.password.clone(),
            ENV_KUBECONFIG => path_value(&self.cluster.kubeconfig)?,
            ENV_SVC_KUBECONFIG => path_value(&self.supervisor.kubeconfig)?,
            ENV_DEVOPS_KUBECONFIG => path_value(&self.devops.kubeconfig)?,
            _ => return None,
        };
        Some(value).filter(|v| !v.trim().is_empty())
    }
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.display().to_string())
}

fn override_string(source: &impl EnvSource, target: &mut String, env_key: &str) {
    if let Ok(val) = resolve(source, env_key) {
        *target = val;
    }
}

fn override_path(source: &impl EnvSource, target: &mut Option<PathBuf>, env_key: &str) {
    if let Ok(val) = resolve(source, env_key) {
        *target = Some(PathBuf::from(val));
    }
}

fn override_bool(source: &impl EnvSource, target: &mut bool, env_key: &str) {
    if let Some(val) = source.var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}
