//! Docker 어댑터 설정
//!
//! [`MonitorConfig`]는 core의 [`DockerConfig`](dockwall_core::config::DockerConfig)를
//! 기반으로 이벤트 모니터 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use dockwall_core::config::DockwallConfig;
//! use dockwall_docker::config::MonitorConfig;
//!
//! let core_config = DockwallConfig::default();
//! let config = MonitorConfig::from_core(&core_config.docker);
//! ```

use std::time::Duration;

use dockwall_core::config::{DockerConfig, MAX_DEBOUNCE_MS, MAX_RETRY_DELAY_MS};
use serde::{Deserialize, Serialize};

use crate::error::DockerSourceError;

/// 이벤트 모니터 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Docker 소켓 경로 (비어 있으면 로컬 기본값)
    pub socket: String,
    /// 디바운스 윈도우 (밀리초)
    pub debounce_ms: u64,
    /// 재연결 대기 시간 (밀리초)
    pub retry_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from_core(&DockerConfig::default())
    }
}

impl MonitorConfig {
    /// core의 `DockerConfig`에서 모니터 설정을 생성합니다.
    pub fn from_core(core: &DockerConfig) -> Self {
        Self {
            socket: core.socket.clone(),
            debounce_ms: core.debounce_ms,
            retry_delay_ms: core.retry_delay_ms,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DockerSourceError> {
        if self.debounce_ms == 0 || self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(DockerSourceError::Config {
                field: "debounce_ms".to_owned(),
                reason: format!("must be 1-{MAX_DEBOUNCE_MS}"),
            });
        }

        if self.retry_delay_ms == 0 || self.retry_delay_ms > MAX_RETRY_DELAY_MS {
            return Err(DockerSourceError::Config {
                field: "retry_delay_ms".to_owned(),
                reason: format!("must be 1-{MAX_RETRY_DELAY_MS}"),
            });
        }

        Ok(())
    }
}

/// 모니터 설정 빌더
#[derive(Default)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// Docker 소켓 경로를 설정합니다.
    pub fn socket(mut self, socket: impl Into<String>) -> Self {
        self.config.socket = socket.into();
        self
    }

    /// 디바운스 윈도우를 설정합니다.
    pub fn debounce(mut self, window: Duration) -> Self {
        self.config.debounce_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 재연결 대기 시간을 설정합니다.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 설정을 검증하고 반환합니다.
    pub fn build(self) -> Result<MonitorConfig, DockerSourceError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
