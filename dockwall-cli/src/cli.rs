//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dockwall_rules::{Section, Table};

/// dockwall -- generate iptables rules for the Docker networks on this host.
///
/// By default the generated statements are printed to stdout.
#[derive(Parser, Debug)]
#[command(name = "dockwall", version, about, long_about = None)]
pub struct Cli {
    /// Path to a dockwall.toml configuration file (defaults + environment when omitted).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print debug messages (also traces executed statements).
    #[arg(short, long)]
    pub verbose: bool,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Dump the networks and containers, then exit.
    #[arg(long, conflicts_with = "monitor")]
    pub inspect: bool,

    /// Format used by --inspect.
    #[arg(long, value_enum, default_value = "text", requires = "inspect")]
    pub inspect_format: OutputFormat,

    /// Write the generated statements to the specified file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Execute the generated statements instead of just printing them.
    #[arg(short, long)]
    pub execute: bool,

    /// Execute the specified executable after generating.
    ///
    /// It receives the output file path in DOCKWALL_RULES, or the statements
    /// on stdin when no output file is set.
    #[arg(short, long)]
    pub invoke: Option<PathBuf>,

    /// Monitor docker network events continuously and regenerate on change (implies --update).
    #[arg(short, long)]
    pub monitor: bool,

    /// Write/execute only if the output has changed.
    #[arg(short, long)]
    pub change_only: bool,

    /// Update the dynamic chains only; leave the built-in chain jumps and chain deletion out.
    #[arg(short, long)]
    pub update: bool,

    /// Generate statements that remove the dockwall rules instead.
    #[arg(short, long)]
    pub flush: bool,

    /// Generate iptables-restore input (no command prefix, no existence tests).
    #[arg(short, long)]
    pub restore: bool,

    /// The iptables command (overrides the configuration).
    #[arg(long)]
    pub iptables: Option<String>,

    /// Tables to generate (nat, filter). Repeatable or comma separated; default all.
    #[arg(short, long = "table", value_delimiter = ',')]
    pub tables: Vec<Table>,

    /// Sections to generate (init, docker, root, end). Repeatable or comma separated; default all.
    #[arg(short, long = "section", value_delimiter = ',')]
    pub sections: Vec<Section>,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}
