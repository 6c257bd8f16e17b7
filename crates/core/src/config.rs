//! 설정 관리 -- dockwall.toml 파싱 및 런타임 설정
//!
//! [`DockwallConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`DOCKWALL_DOCKER_DEBOUNCE_MS=2000` 형식)
//! 3. 설정 파일 (`dockwall.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), dockwall_core::error::DockwallError> {
//! use dockwall_core::config::DockwallConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = DockwallConfig::load("dockwall.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = DockwallConfig::parse("[docker]\ndebounce_ms = 2000")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DockwallError};

/// 디바운스 윈도우 최대값 (10분)
pub const MAX_DEBOUNCE_MS: u64 = 600_000;

/// 재연결 대기 시간 최대값 (10분)
pub const MAX_RETRY_DELAY_MS: u64 = 600_000;

/// 동적 체인 이름으로 쓸 수 없는 이름
///
/// 호스트 내장 체인과 규칙 저장소의 내부 버킷(`init`, `end`)입니다.
pub const RESERVED_CHAIN_NAMES: &[&str] = &[
    "init",
    "end",
    "INPUT",
    "OUTPUT",
    "FORWARD",
    "PREROUTING",
    "POSTROUTING",
];

/// iptables 체인 이름 최대 길이
const MAX_CHAIN_NAME_LEN: usize = 28;

/// dockwall 통합 설정
///
/// `dockwall.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockwallConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Docker 연결 및 모니터 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// 생성 규칙 설정
    #[serde(default)]
    pub firewall: FirewallConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl DockwallConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DockwallError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일 없이 기본값 + 환경변수로 설정을 구성합니다.
    pub fn from_env() -> Result<Self, DockwallError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DockwallError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DockwallError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DockwallError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DockwallError> {
        toml::from_str(toml_str).map_err(|e| {
            DockwallError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `DOCKWALL_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "DOCKWALL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DOCKWALL_GENERAL_LOG_FORMAT");

        // Docker
        override_string(&mut self.docker.socket, "DOCKWALL_DOCKER_SOCKET");
        override_u64(&mut self.docker.debounce_ms, "DOCKWALL_DOCKER_DEBOUNCE_MS");
        override_u64(
            &mut self.docker.retry_delay_ms,
            "DOCKWALL_DOCKER_RETRY_DELAY_MS",
        );

        // Firewall
        override_string(
            &mut self.firewall.iptables_command,
            "DOCKWALL_FIREWALL_IPTABLES_COMMAND",
        );
        override_string(&mut self.firewall.comment, "DOCKWALL_FIREWALL_COMMENT");
        override_string(
            &mut self.firewall.chains.dnat,
            "DOCKWALL_FIREWALL_CHAINS_DNAT",
        );
        override_string(
            &mut self.firewall.chains.snat,
            "DOCKWALL_FIREWALL_CHAINS_SNAT",
        );
        override_string(
            &mut self.firewall.chains.forward,
            "DOCKWALL_FIREWALL_CHAINS_FORWARD",
        );
        override_string(
            &mut self.firewall.chains.isolation,
            "DOCKWALL_FIREWALL_CHAINS_ISOLATION",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "DOCKWALL_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "DOCKWALL_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "DOCKWALL_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DockwallError> {
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

        validate_interval("docker.debounce_ms", self.docker.debounce_ms, MAX_DEBOUNCE_MS)?;
        validate_interval(
            "docker.retry_delay_ms",
            self.docker.retry_delay_ms,
            MAX_RETRY_DELAY_MS,
        )?;

        if self.firewall.iptables_command.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "firewall.iptables_command".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        // 주석은 작은따옴표로 감싸서 출력되므로 따옴표를 포함할 수 없음
        if self.firewall.comment.contains('\'') {
            return Err(ConfigError::InvalidValue {
                field: "firewall.comment".to_owned(),
                reason: "must not contain single quotes".to_owned(),
            }
            .into());
        }

        self.firewall.chains.validate()?;

        if self.metrics.enabled && self.metrics.listen_addr.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "metrics.listen_addr".to_owned(),
                reason: "must not be empty when metrics are enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

fn validate_interval(field: &str, value: u64, max: u64) -> Result<(), DockwallError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into());
    }
    if value > max {
        return Err(ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: format!("must be at most {max}"),
        }
        .into());
    }
    Ok(())
}

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

/// Docker 연결 및 이벤트 모니터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로 (비어 있으면 로컬 기본값 사용)
    pub socket: String,
    /// 이벤트 디바운스 윈도우 (밀리초)
    pub debounce_ms: u64,
    /// 연결 실패 후 재시도 대기 시간 (밀리초)
    pub retry_delay_ms: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: String::new(),
            debounce_ms: 5_000,
            retry_delay_ms: 1_000,
        }
    }
}

/// 생성 규칙 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// 규칙 앞에 붙는 명령 (예: `iptables`, `/usr/sbin/iptables-legacy`)
    pub iptables_command: String,
    /// 규칙 식별 주석 태그 (빈 문자열이면 주석 없음)
    pub comment: String,
    /// 동적 체인 이름
    #[serde(default)]
    pub chains: ChainNames,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            iptables_command: "iptables".to_owned(),
            comment: "[DOCKWALL]".to_owned(),
            chains: ChainNames::default(),
        }
    }
}

/// 동적 체인 이름 묶음
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainNames {
    /// nat 테이블 DNAT 체인
    pub dnat: String,
    /// nat 테이블 SNAT 체인
    pub snat: String,
    /// filter 테이블 포워딩 체인
    pub forward: String,
    /// filter 테이블 네트워크 격리 체인
    pub isolation: String,
}

impl Default for ChainNames {
    fn default() -> Self {
        Self {
            dnat: "DOCKER_DNAT".to_owned(),
            snat: "DOCKER_SNAT".to_owned(),
            forward: "DOCKER_FORWARD".to_owned(),
            isolation: "DOCKER_ISOLATION".to_owned(),
        }
    }
}

impl ChainNames {
    /// `(필드 이름, 체인 이름)` 쌍
    fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("firewall.chains.dnat", self.dnat.as_str()),
            ("firewall.chains.snat", self.snat.as_str()),
            ("firewall.chains.forward", self.forward.as_str()),
            ("firewall.chains.isolation", self.isolation.as_str()),
        ]
    }

    /// 체인 이름을 검증합니다.
    ///
    /// 비어 있거나, 공백을 포함하거나, 너무 길거나, 예약된 이름과 겹치거나,
    /// 서로 중복되면 거부합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();

        for (field, name) in self.entries() {
            if name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "chain name must not be empty".to_owned(),
                });
            }
            if name.chars().any(|c| c.is_whitespace() || c == '\'') {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "chain name must not contain whitespace or quotes".to_owned(),
                });
            }
            if name.len() > MAX_CHAIN_NAME_LEN {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: format!("chain name must be at most {MAX_CHAIN_NAME_LEN} characters"),
                });
            }
            if RESERVED_CHAIN_NAMES.contains(&name) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: format!("'{name}' is a reserved chain name"),
                });
            }
            if !seen.insert(name) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: format!("duplicate chain name '{name}'"),
                });
            }
        }

        Ok(())
    }
}

/// Prometheus 메트릭 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9187,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
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

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
