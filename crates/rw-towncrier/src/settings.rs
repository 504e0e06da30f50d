//! Build settings for the towncrier directive.
//!
//! Settings are read from the `[towncrier]` and `[project]` tables of
//! `rw.toml`:
//!
//! ```toml
//! [project]
//! release = "2.1.0rc1"
//! version = "2.1"
//!
//! [towncrier]
//! config_path = "towncrier.toml"
//! autoversion_mode = "draft"
//! include_empty = true
//! working_directory = ".."
//! ```
//!
//! `working_directory` is resolved against the directory containing
//! `rw.toml`. String values support `${VAR}` and `${VAR:-default}`
//! environment expansion.
//!
//! `autoversion_mode` is kept as written. It is checked only when a
//! directive without an explicit version needs the fallback.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::env;

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "rw.toml";

/// Default `autoversion_mode`.
pub const DEFAULT_AUTOVERSION_MODE: &str = "draft";

/// CLI settings that override configuration file values.
///
/// Only `Some` fields override the loaded settings.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override towncrier config file name.
    pub config_path: Option<String>,
    /// Override version fallback mode.
    pub autoversion_mode: Option<String>,
    /// Override whether empty drafts are rendered.
    pub include_empty: Option<bool>,
    /// Override towncrier working directory.
    pub working_directory: Option<PathBuf>,
    /// Override project release label.
    pub release: Option<String>,
    /// Override project version label.
    pub version: Option<String>,
}

/// Settings loaded from `rw.toml`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Project labels used for version fallback.
    pub project: ProjectConfig,
    /// Towncrier settings as written in the file.
    towncrier: TowncrierConfigRaw,

    /// Resolved towncrier settings (set after loading).
    #[serde(skip)]
    pub towncrier_resolved: TowncrierSettings,
    /// Directory holding RW data (`.rw/`).
    #[serde(skip)]
    pub project_dir: PathBuf,
    /// Path to the loaded `rw.toml` (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Release and version labels of the documented project.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Full release label, e.g. `2.1.0rc1`.
    pub release: String,
    /// Short version label, e.g. `2.1`.
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TowncrierConfigRaw {
    config_path: Option<String>,
    autoversion_mode: Option<String>,
    include_empty: Option<bool>,
    working_directory: Option<String>,
}

/// Resolved towncrier settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TowncrierSettings {
    /// Towncrier config file name relative to the working directory.
    ///
    /// `None` probes `towncrier.toml` then `pyproject.toml`.
    pub config_path: Option<String>,
    /// Version fallback mode, unvalidated.
    pub autoversion_mode: String,
    /// Render the draft even when towncrier reports no significant changes.
    pub include_empty: bool,
    /// Directory towncrier runs in. `None` means the process directory.
    pub working_directory: Option<PathBuf>,
}

impl Default for TowncrierSettings {
    fn default() -> Self {
        Self {
            config_path: None,
            autoversion_mode: DEFAULT_AUTOVERSION_MODE.to_owned(),
            include_empty: true,
            working_directory: None,
        }
    }
}

/// Settings error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Setting path, e.g. `towncrier.working_directory`.
        field: String,
        /// What went wrong, e.g. `${PROJECT_ROOT} not set`.
        message: String,
    },
}

impl Settings {
    /// Load settings with optional CLI overrides.
    ///
    /// With `config_path`, that file must exist. Otherwise `rw.toml` is
    /// searched for in the current directory and its parents, falling back to
    /// defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if the explicit file is missing, or if reading, parsing,
    /// expansion or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut settings = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            tracing::debug!(path = %discovered.display(), "Discovered settings file");
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(overrides) = cli_settings {
            settings.apply_cli_settings(overrides);
            settings.validate()?;
        }

        Ok(settings)
    }

    /// Cache directory path (`.rw/cache/`).
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.project_dir.join("cache")
    }

    /// Validate resolved values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if `config_path` is set but empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .towncrier_resolved
            .config_path
            .as_deref()
            .is_some_and(str::is_empty)
        {
            return Err(ConfigError::Validation(
                "towncrier.config_path cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    fn apply_cli_settings(&mut self, overrides: &CliSettings) {
        let towncrier = &mut self.towncrier_resolved;
        if let Some(config_path) = &overrides.config_path {
            towncrier.config_path = Some(config_path.clone());
        }
        if let Some(mode) = &overrides.autoversion_mode {
            towncrier.autoversion_mode.clone_from(mode);
        }
        if let Some(include_empty) = overrides.include_empty {
            towncrier.include_empty = include_empty;
        }
        if let Some(working_directory) = &overrides.working_directory {
            towncrier.working_directory = Some(working_directory.clone());
        }
        if let Some(release) = &overrides.release {
            self.project.release.clone_from(release);
        }
        if let Some(version) = &overrides.version {
            self.project.version.clone_from(version);
        }
    }

    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            project: ProjectConfig::default(),
            towncrier: TowncrierConfigRaw::default(),
            towncrier_resolved: TowncrierSettings::default(),
            project_dir: base.join(".rw"),
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut settings: Self = toml::from_str(&content)?;

        settings.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        settings.resolve(config_dir);
        settings.config_path = Some(path.to_path_buf());

        settings.validate()?;
        Ok(settings)
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.project.release = env::expand_field(&self.project.release, "project.release")?;
        self.project.version = env::expand_field(&self.project.version, "project.version")?;

        let raw = &mut self.towncrier;
        env::expand_optional(&mut raw.config_path, "towncrier.config_path")?;
        env::expand_optional(&mut raw.autoversion_mode, "towncrier.autoversion_mode")?;
        env::expand_optional(&mut raw.working_directory, "towncrier.working_directory")?;
        Ok(())
    }

    /// Resolve raw towncrier values against the settings file directory.
    fn resolve(&mut self, config_dir: &Path) {
        let raw = &self.towncrier;
        self.towncrier_resolved = TowncrierSettings {
            config_path: raw.config_path.clone(),
            autoversion_mode: raw
                .autoversion_mode
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTOVERSION_MODE.to_owned()),
            include_empty: raw.include_empty.unwrap_or(true),
            working_directory: raw.working_directory.as_deref().map(|d| config_dir.join(d)),
        };
        self.project_dir = config_dir.join(".rw");
    }
}
