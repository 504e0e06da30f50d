//! CLI command implementations.

pub(crate) mod draft;
pub(crate) mod fragments;
pub(crate) mod lock;
pub(crate) mod outdated;
pub(crate) mod render;

use std::path::PathBuf;

use clap::Args;
use rw_towncrier::{CliSettings, Settings};

use crate::error::CliError;

pub(crate) use draft::DraftArgs;
pub(crate) use fragments::FragmentsArgs;
pub(crate) use lock::LockCommand;
pub(crate) use outdated::OutdatedArgs;
pub(crate) use render::RenderArgs;

/// Settings arguments shared by the project commands.
#[derive(Args)]
pub(crate) struct ProjectArgs {
    /// Path to configuration file (default: auto-discover rw.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory towncrier runs in (overrides config).
    #[arg(short = 'C', long)]
    working_directory: Option<PathBuf>,

    /// Towncrier config file relative to the working directory (overrides config).
    #[arg(long)]
    towncrier_config: Option<String>,

    /// Version fallback: draft, release-label or dev-label (overrides config).
    #[arg(long)]
    autoversion_mode: Option<String>,

    /// Render drafts without significant changes (default: enabled).
    #[arg(long)]
    include_empty: Option<bool>,

    /// Do not render drafts without significant changes.
    #[arg(long, conflicts_with = "include_empty")]
    no_include_empty: bool,

    /// Project release label (overrides config).
    #[arg(long, env = "RW_PROJECT_RELEASE")]
    release: Option<String>,

    /// Project version label (overrides config).
    #[arg(long, env = "RW_PROJECT_VERSION")]
    project_version: Option<String>,
}

impl ProjectArgs {
    /// Load settings with these arguments applied.
    pub(crate) fn load(self) -> Result<Settings, CliError> {
        let include_empty = self.no_include_empty.then_some(false).or(self.include_empty);
        let cli_settings = CliSettings {
            config_path: self.towncrier_config,
            autoversion_mode: self.autoversion_mode,
            include_empty,
            working_directory: self.working_directory,
            release: self.release,
            version: self.project_version,
        };
        Ok(Settings::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}
