//! Docker 어댑터 에러 타입
//!
//! [`DockerSourceError`]는 Docker 데몬과의 통신, 이벤트 스트림, 설정 에러를 표현합니다.
//! `From<DockerSourceError> for DockwallError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use dockwall_core::error::{ConfigError, DockerError, DockwallError};

/// Docker 어댑터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum DockerSourceError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// 이벤트 스트림 에러
    #[error("event stream error: {0}")]
    EventStream(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),
}

impl From<DockerSourceError> for DockwallError {
    fn from(err: DockerSourceError) -> Self {
        match err {
            DockerSourceError::DockerApi(msg) => DockwallError::Docker(DockerError::Api(msg)),
            DockerSourceError::DockerConnection(msg) => {
                DockwallError::Docker(DockerError::Unreachable(msg))
            }
            DockerSourceError::EventStream(msg) => {
                DockwallError::Docker(DockerError::EventStream(msg))
            }
            DockerSourceError::Config { field, reason } => {
                DockwallError::Config(ConfigError::InvalidValue { field, reason })
            }
            DockerSourceError::Channel(msg) => {
                DockwallError::Docker(DockerError::EventStream(format!("channel: {msg}")))
            }
        }
    }
}
