//! 테이블과 출력 섹션

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RulesError;

/// iptables 테이블
///
/// 선언 순서가 기본 출력 순서입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Nat,
    Filter,
}

impl Table {
    /// 기본 출력 순서의 모든 테이블
    pub const ALL: [Table; 2] = [Table::Nat, Table::Filter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nat => "nat",
            Self::Filter => "filter",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "nat" => Ok(Self::Nat),
            "filter" => Ok(Self::Filter),
            other => Err(RulesError::UnknownTable(other.to_owned())),
        }
    }
}

/// 출력 섹션
///
/// 각 섹션은 정해진 체인 묶음을 렌더링합니다.
/// - `init`: 체인 생성 문장
/// - `docker`: 동적 체인 (DNAT, SNAT, FORWARD, ISOLATION)
/// - `root`: 내장 체인의 점프 규칙 (OUTPUT, PREROUTING, POSTROUTING, FORWARD)
/// - `end`: 체인 삭제 문장
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Init,
    Docker,
    Root,
    End,
}

impl Section {
    /// 기본 출력 순서의 모든 섹션
    pub const ALL: [Section; 4] = [Section::Init, Section::Docker, Section::Root, Section::End];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Docker => "docker",
            Self::Root => "root",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "init" => Ok(Self::Init),
            "docker" => Ok(Self::Docker),
            "root" => Ok(Self::Root),
            "end" => Ok(Self::End),
            other => Err(RulesError::UnknownSection(other.to_owned())),
        }
    }
}
