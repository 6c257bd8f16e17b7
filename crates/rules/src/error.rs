//! 규칙 엔진 에러 타입

/// 테이블/섹션 이름 해석 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    /// 지원하지 않는 테이블 이름
    #[error("unknown table '{0}' (expected one of: nat, filter)")]
    UnknownTable(String),

    /// 지원하지 않는 섹션 이름
    #[error("unknown section '{0}' (expected one of: init, docker, root, end)")]
    UnknownSection(String),
}
