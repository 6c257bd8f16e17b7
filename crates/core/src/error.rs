//! 에러 타입 -- 도메인별 에러 정의

/// dockwall 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum DockwallError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Docker 데몬 관련 에러
    #[error("docker error: {0}")]
    Docker(#[from] DockerError),

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

    /// 서로 함께 쓸 수 없는 옵션 조합
    #[error("conflicting options: {0}")]
    Conflict(String),
}

/// Docker 데몬 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    Api(String),

    /// 데몬에 연결할 수 없음
    #[error("docker daemon unreachable: {0}")]
    Unreachable(String),

    /// 이벤트 스트림 에러
    #[error("docker event stream error: {0}")]
    EventStream(String),
}
