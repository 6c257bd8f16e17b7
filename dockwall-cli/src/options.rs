//! Resolution of CLI flags and configuration into the options of one run.
//!
//! Precedence for overlapping settings: CLI > environment > config file > defaults.

use std::path::PathBuf;

use dockwall_core::config::DockwallConfig;
use dockwall_core::error::ConfigError;
use dockwall_rules::{Section, SynthesisMode, Table};

use crate::artifact::ArtifactFormat;
use crate::cli::Cli;
use crate::error::CliError;

/// What each pass produces and what it does with the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub output: Option<PathBuf>,
    pub execute: bool,
    pub invoke: Option<PathBuf>,
    pub change_only: bool,
    pub monitor: bool,
    pub verbose: bool,
    pub mode: SynthesisMode,
    pub tables: Vec<Table>,
    pub sections: Vec<Section>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output: None,
            execute: false,
            invoke: None,
            change_only: false,
            monitor: false,
            verbose: false,
            mode: SynthesisMode::default(),
            tables: Table::ALL.to_vec(),
            sections: Section::ALL.to_vec(),
        }
    }
}

impl RunOptions {
    /// Builds run options from parsed flags.
    ///
    /// Monitoring forces update-only output. Empty table/section lists select everything.
    ///
    /// # Errors
    ///
    /// `ConfigError::Conflict` when restore format is combined with execute or flush.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if cli.restore && cli.execute {
            return Err(ConfigError::Conflict(
                "--restore cannot be combined with --execute: iptables-restore input is not a shell script"
                    .to_owned(),
            ));
        }
        if cli.restore && cli.flush {
            return Err(ConfigError::Conflict(
                "--restore cannot be combined with --flush: iptables-restore input cannot remove chains"
                    .to_owned(),
            ));
        }

        let tables = if cli.tables.is_empty() {
            Table::ALL.to_vec()
        } else {
            cli.tables.clone()
        };
        let sections = if cli.sections.is_empty() {
            Section::ALL.to_vec()
        } else {
            cli.sections.clone()
        };

        Ok(Self {
            output: cli.output.clone(),
            execute: cli.execute,
            invoke: cli.invoke.clone(),
            change_only: cli.change_only,
            monitor: cli.monitor,
            verbose: cli.verbose,
            mode: SynthesisMode {
                update: cli.update || cli.monitor,
                flush: cli.flush,
                restore: cli.restore,
            },
            tables,
            sections,
        })
    }

    pub fn artifact_format(&self) -> ArtifactFormat {
        if self.mode.restore {
            ArtifactFormat::Restore
        } else {
            ArtifactFormat::Script
        }
    }

    /// True when no output file, execution or invocation was requested.
    pub fn prints_to_stdout(&self) -> bool {
        self.output.is_none() && !self.execute && self.invoke.is_none()
    }
}

/// Applies the CLI flags that override configuration values.
pub fn apply_cli_overrides(config: &mut DockwallConfig, cli: &Cli) {
    if cli.verbose {
        config.general.log_level = "debug".to_owned();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    if let Some(command) = &cli.iptables {
        config.firewall.iptables_command = command.clone();
    }
}

/// Loads the configuration file (or defaults), then layers environment and CLI overrides.
///
/// Validation runs once on the merged result, so a CLI flag can replace an
/// invalid environment or file value.
///
/// # Errors
///
/// Returns `CliError::Config` for missing/invalid files or values that fail validation.
pub async fn load_config(cli: &Cli) -> Result<DockwallConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => DockwallConfig::from_file(path).await?,
        None => DockwallConfig::default(),
    };
    config.apply_env_overrides();
    apply_cli_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}
