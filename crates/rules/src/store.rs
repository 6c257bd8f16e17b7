//! 규칙 저장소 -- 테이블 → 체인 → 규칙 문장 목록
//!
//! [`RuleStore`]는 한 번의 생성 패스가 소유하는 값입니다.
//! 패스마다 [`RuleStore::reset`]으로 골격을 다시 만든 뒤 규칙을 채웁니다.
//!
//! 모든 테이블은 내부 버킷 `init`/`end`와 내장 체인
//! `FORWARD`/`OUTPUT`/`PREROUTING`/`POSTROUTING`을 가집니다.
//! 동적 체인(`nat`: DNAT/SNAT, `filter`: FORWARD/ISOLATION)은 flush 패스가 아닐 때만 만들어집니다.

use std::collections::BTreeMap;

use dockwall_core::config::{ChainNames, FirewallConfig};

use crate::table::Table;

/// 체인 생성 문장이 쌓이는 내부 버킷
pub const INIT_BUCKET: &str = "init";
/// 체인 정리 문장이 쌓이는 내부 버킷
pub const END_BUCKET: &str = "end";

pub const CHAIN_FORWARD: &str = "FORWARD";
pub const CHAIN_OUTPUT: &str = "OUTPUT";
pub const CHAIN_PREROUTING: &str = "PREROUTING";
pub const CHAIN_POSTROUTING: &str = "POSTROUTING";

/// 모든 테이블에 존재하는 호스트 내장 체인
pub const BUILTIN_CHAINS: [&str; 4] = [
    CHAIN_FORWARD,
    CHAIN_OUTPUT,
    CHAIN_PREROUTING,
    CHAIN_POSTROUTING,
];

const SUPPRESS_ERRORS: &str = " 2>/dev/null || true";

/// 규칙 문장의 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleAction {
    /// 체인 끝에 추가 (`-A`)
    #[default]
    Append,
    /// 체인 앞에 삽입 (`-I`)
    Insert,
    /// 삭제 (`-D`), 이미 없으면 무시
    Delete,
}

impl RuleAction {
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Append => "-A",
            Self::Insert => "-I",
            Self::Delete => "-D",
        }
    }
}

/// 규칙 하나를 추가할 때의 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuleOptions {
    /// 동작
    pub action: RuleAction,
    /// 이미 존재하면 건너뛰도록 `-C` 검사로 감쌀지 여부
    pub test: bool,
    /// 식별 주석을 생략할지 여부
    pub no_comment: bool,
}

impl RuleOptions {
    /// 존재 검사 후 앞에 삽입
    pub fn insert_if_missing() -> Self {
        Self {
            action: RuleAction::Insert,
            test: true,
            no_comment: false,
        }
    }

    /// 삭제 (없으면 무시)
    pub fn delete() -> Self {
        Self {
            action: RuleAction::Delete,
            test: false,
            no_comment: false,
        }
    }
}

/// 패스의 출력 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SynthesisMode {
    /// 동적 체인 내용만 갱신 (점프 규칙과 체인 삭제 없음)
    pub update: bool,
    /// 모든 규칙과 체인을 제거
    pub flush: bool,
    /// `iptables-restore` 입력 형식
    pub restore: bool,
}

/// 규칙 문장 형식에 필요한 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSettings {
    /// 명령 접두어에 쓰이는 iptables 실행 파일
    pub iptables_command: String,
    /// 식별 주석 태그 (`None`이면 주석 없음)
    pub comment: Option<String>,
    /// 동적 체인 이름
    pub chains: ChainNames,
    /// 출력 모드
    pub mode: SynthesisMode,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self::from_config(&FirewallConfig::default(), SynthesisMode::default())
    }
}

impl RuleSettings {
    /// `[firewall]` 설정 섹션과 출력 모드로부터 설정을 만듭니다.
    pub fn from_config(config: &FirewallConfig, mode: SynthesisMode) -> Self {
        let comment = if config.comment.is_empty() {
            None
        } else {
            Some(config.comment.clone())
        };
        Self {
            iptables_command: config.iptables_command.clone(),
            comment,
            chains: config.chains.clone(),
            mode,
        }
    }

    /// 테이블에 속한 동적 체인 이름
    pub fn dynamic_chains(&self, table: Table) -> [&str; 2] {
        match table {
            Table::Nat => [self.chains.dnat.as_str(), self.chains.snat.as_str()],
            Table::Filter => [self.chains.forward.as_str(), self.chains.isolation.as_str()],
        }
    }
}

/// 테이블 → 체인 → 규칙 문장 저장소
#[derive(Debug, Clone)]
pub struct RuleStore {
    settings: RuleSettings,
    tables: BTreeMap<Table, BTreeMap<String, Vec<String>>>,
}

impl RuleStore {
    /// 빈 저장소를 만듭니다. 사용 전에 [`reset`](Self::reset)을 호출해야 합니다.
    pub fn new(settings: RuleSettings) -> Self {
        Self {
            settings,
            tables: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    /// 주어진 테이블들의 체인 골격을 다시 만듭니다. 기존 내용은 버립니다.
    pub fn reset(&mut self, tables: &[Table]) {
        self.tables.clear();

        for &table in tables {
            let mut chains = BTreeMap::new();
            chains.insert(INIT_BUCKET.to_owned(), Vec::new());
            chains.insert(END_BUCKET.to_owned(), Vec::new());
            for builtin in BUILTIN_CHAINS {
                chains.insert(builtin.to_owned(), Vec::new());
            }
            if !self.settings.mode.flush {
                for dynamic in self.settings.dynamic_chains(table) {
                    chains.insert(dynamic.to_owned(), Vec::new());
                }
            }
            self.tables.insert(table, chains);
        }
    }

    /// 규칙 문장을 체인에 추가합니다.
    ///
    /// 테이블이나 체인이 없으면 아무 일도 하지 않습니다.
    pub fn append_rule(&mut self, table: Table, chain: &str, body: &str, options: RuleOptions) {
        let statement = self.format_rule(table, chain, body, options);
        self.push(table, chain, statement);
    }

    /// 체인 생성 문장을 `init` 버킷에 추가합니다.
    ///
    /// restore 형식은 체인 선언만 추가하며, update 모드에서는 선언도 생략합니다.
    pub fn create_chain(&mut self, table: Table, chain: &str) {
        if self.settings.mode.restore {
            if !self.settings.mode.update {
                self.push(table, INIT_BUCKET, format!(":{chain} - [0:0]"));
            }
            return;
        }

        let prefix = self.prefix(table);
        self.push(
            table,
            INIT_BUCKET,
            format!("{prefix}-N {chain}{SUPPRESS_ERRORS}"),
        );
        self.push(table, INIT_BUCKET, format!("{prefix}-F {chain}"));
    }

    /// 체인 정리 문장을 `end` 버킷에 추가합니다.
    ///
    /// update 모드에서는 비우기만 하고 삭제하지 않습니다.
    /// restore 형식은 삭제를 표현할 수 없으므로 아무것도 추가하지 않습니다.
    pub fn remove_chain(&mut self, table: Table, chain: &str) {
        if self.settings.mode.restore {
            return;
        }

        let prefix = self.prefix(table);
        self.push(
            table,
            END_BUCKET,
            format!("{prefix}-F {chain}{SUPPRESS_ERRORS}"),
        );
        if !self.settings.mode.update {
            self.push(
                table,
                END_BUCKET,
                format!("{prefix}-X {chain}{SUPPRESS_ERRORS}"),
            );
        }
    }

    /// 체인의 규칙 문장 (없으면 `None`)
    pub fn chain(&self, table: Table, chain: &str) -> Option<&[String]> {
        self.tables
            .get(&table)
            .and_then(|chains| chains.get(chain))
            .map(Vec::as_slice)
    }

    /// 테이블에 쌓인 전체 문장 수
    pub fn statement_count(&self, table: Table) -> usize {
        self.tables
            .get(&table)
            .map(|chains| chains.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    fn push(&mut self, table: Table, chain: &str, statement: String) {
        if let Some(rules) = self
            .tables
            .get_mut(&table)
            .and_then(|chains| chains.get_mut(chain))
        {
            rules.push(statement);
        }
    }

    fn prefix(&self, table: Table) -> String {
        if self.settings.mode.restore {
            String::new()
        } else {
            format!("{} -t {} ", self.settings.iptables_command, table)
        }
    }

    fn format_rule(&self, table: Table, chain: &str, body: &str, options: RuleOptions) -> String {
        let prefix = self.prefix(table);
        let action = options.action.flag();

        let comment = match (&self.settings.comment, options.no_comment) {
            (Some(tag), false) => format!(" -m comment --comment '{tag}'"),
            _ => String::new(),
        };
        let command = format!(" {chain} {body}{comment}");

        let mut statement = if options.test && !self.settings.mode.restore {
            format!(
                "if ( ! {prefix}-C{command} 2>/dev/null ); then {prefix}{action}{command}; fi"
            )
        } else {
            format!("{prefix}{action}{command}")
        };

        if options.action == RuleAction::Delete {
            statement.push_str(SUPPRESS_ERRORS);
        }
        statement
    }
}
