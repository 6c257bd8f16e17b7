//! Output assembly: renders (table, section) pairs of a [`RuleStore`] as script text.

use crate::store::{
    CHAIN_FORWARD, CHAIN_OUTPUT, CHAIN_POSTROUTING, CHAIN_PREROUTING, END_BUCKET, INIT_BUCKET,
    RuleStore,
};
use crate::table::{Section, Table};

/// Header tag written before every rendered block.
pub const HEADER_TAG: &str = "[DOCKWALL]";

/// Chains rendered for a section, in output order.
fn section_chains(store: &RuleStore, section: Section) -> Vec<&str> {
    let chains = &store.settings().chains;
    match section {
        Section::Init => vec![INIT_BUCKET],
        Section::Docker => vec![
            chains.dnat.as_str(),
            chains.snat.as_str(),
            chains.forward.as_str(),
            chains.isolation.as_str(),
        ],
        Section::Root => vec![
            CHAIN_OUTPUT,
            CHAIN_PREROUTING,
            CHAIN_POSTROUTING,
            CHAIN_FORWARD,
        ],
        Section::End => vec![END_BUCKET],
    }
}

/// Renders one (table, section) block.
///
/// The header line is always present. Missing tables and chains render as
/// nothing, each non-empty chain renders its statements one per line.
pub fn render_section(store: &RuleStore, table: Table, section: Section) -> String {
    let mut out = format!("## {HEADER_TAG} Table: {table} Section: {section}\n");

    for chain in section_chains(store, section) {
        match store.chain(table, chain) {
            Some(rules) if !rules.is_empty() => {
                out.push_str(&rules.join("\n"));
                out.push('\n');
            }
            _ => {}
        }
    }

    out
}

/// Renders every requested table × section pair in caller order.
///
/// Each block is followed by a blank line.
pub fn assemble(store: &RuleStore, tables: &[Table], sections: &[Section]) -> String {
    let mut out = String::new();
    for &table in tables {
        for &section in sections {
            out.push_str(&render_section(store, table, section));
            out.push('\n');
        }
    }
    out
}
