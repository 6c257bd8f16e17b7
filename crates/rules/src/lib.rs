//! # dockwall-rules
//!
//! 인벤토리로부터 iptables 규칙 스크립트를 만드는 순수 엔진입니다.
//!
//! # 구성
//!
//! - [`store`]: 테이블 → 체인 → 규칙 목록 저장소와 체인 생성/삭제 문장
//! - [`synth`]: 인벤토리를 읽어 저장소를 채우는 규칙 생성기
//! - [`output`]: 선택한 (테이블, 섹션) 조합을 스크립트 텍스트로 조립
//! - [`change`]: 조립된 출력의 SHA-256을 이전 결과와 비교
//!
//! # 흐름
//!
//! ```text
//! Inventory ──▶ synthesize() ──▶ RuleStore ──▶ assemble() ──▶ ChangeDetector
//! ```
//!
//! `store`, `synth`, `output`은 I/O를 하지 않습니다.
//! `change`만 이전 산출물 파일을 읽습니다.

pub mod change;
pub mod error;
pub mod output;
pub mod store;
pub mod synth;
pub mod table;

pub use change::{ChangeDetector, ChangeReason, ChangeStatus, Evaluation, OutputDigest};
pub use error::RulesError;
pub use output::{assemble, render_section};
pub use store::{RuleAction, RuleOptions, RuleSettings, RuleStore, SynthesisMode};
pub use synth::synthesize;
pub use table::{Section, Table};
