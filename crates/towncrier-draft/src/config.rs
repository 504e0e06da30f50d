//! Towncrier configuration lookup.
//!
//! Towncrier reads its settings from the `[tool.towncrier]` table of either
//! `towncrier.toml` or `pyproject.toml` in the project root. This module finds
//! the right file, parses it, and normalizes the configuration shapes
//! towncrier has accepted over time into one [`ResolvedConfig`].
//!
//! Every way the lookup can go wrong is reported as a single
//! [`ConfigLookupFailure`] so callers can treat "no usable configuration" as
//! one condition.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Dedicated towncrier configuration file name.
pub const TOWNCRIER_TOML: &str = "towncrier.toml";

/// Python project metadata file that may carry towncrier settings.
pub const PYPROJECT_TOML: &str = "pyproject.toml";

/// Fragment types towncrier uses when none are configured.
const DEFAULT_TYPES: [&str; 5] = ["feature", "bugfix", "doc", "removal", "misc"];

/// A changelog section: fragments for it live in `path` under the fragment
/// base directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    /// Section title (empty for the unnamed default section).
    pub name: String,
    /// Subdirectory of the fragment base directory (empty for the base itself).
    pub path: String,
}

/// Canonical towncrier settings for one project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Fragment directory relative to the project root, if configured.
    pub directory: Option<String>,
    /// Configured sections, in declaration order.
    pub sections: Vec<Section>,
    /// Recognized fragment type identifiers.
    pub types: BTreeSet<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            directory: None,
            sections: vec![Section {
                name: String::new(),
                path: String::new(),
            }],
            types: DEFAULT_TYPES.iter().map(|&t| t.to_owned()).collect(),
        }
    }
}

impl ResolvedConfig {
    /// Names of all configured sections.
    #[must_use]
    pub fn section_names(&self) -> BTreeSet<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    /// Names of all recognized fragment types.
    #[must_use]
    pub fn type_names(&self) -> BTreeSet<&str> {
        self.types.iter().map(String::as_str).collect()
    }

    /// Parse the `[tool.towncrier]` table out of a TOML document.
    ///
    /// Returns `Ok(None)` when the document has no towncrier table.
    ///
    /// Fragment types may be declared as `[[tool.towncrier.type]]` entries
    /// (keyed by `directory`) or as `[tool.towncrier.fragment.<id>]` tables.
    /// Both forms are merged; when neither is present the towncrier defaults
    /// apply. Sections come from `[[tool.towncrier.section]]`, defaulting to a
    /// single unnamed section at the base directory.
    pub fn from_toml_str(content: &str) -> Result<Option<Self>, toml::de::Error> {
        let document: ConfigDocument = toml::from_str(content)?;
        Ok(document.tool.towncrier.map(Self::from_raw))
    }

    fn from_raw(raw: RawSettings) -> Self {
        let defaults = Self::default();

        let sections = if raw.sections.is_empty() {
            defaults.sections
        } else {
            raw.sections
                .into_iter()
                .map(|s| Section {
                    name: s.name,
                    path: s.path,
                })
                .collect()
        };

        let types: BTreeSet<String> = raw
            .types
            .into_iter()
            .map(|t| t.directory)
            .chain(raw.fragment.into_iter().map(|(id, _)| id))
            .collect();

        Self {
            directory: raw.directory,
            sections,
            types: if types.is_empty() {
                defaults.types
            } else {
                types
            },
        }
    }
}

/// Why a configuration lookup failed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLookupKind {
    /// The configuration file does not exist.
    #[error("No such file or directory")]
    Missing,
    /// The configuration file exists but could not be read.
    #[error("{0}")]
    Io(#[from] io::Error),
    /// The file has no `[tool.towncrier]` table.
    #[error("No [tool.towncrier] section.")]
    NoSection,
    /// The file is not valid TOML or the table has an unexpected shape.
    #[error("{0}")]
    Invalid(#[from] toml::de::Error),
}

/// The towncrier configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
#[error("Towncrier was unable to load the configuration from file `{}`: {kind}", .path.display())]
pub struct ConfigLookupFailure {
    /// File the lookup attempted to read.
    pub path: PathBuf,
    /// Underlying cause, for diagnostics only.
    pub kind: ConfigLookupKind,
}

impl ConfigLookupFailure {
    fn new(path: &Path, kind: impl Into<ConfigLookupKind>) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: kind.into(),
        }
    }
}

/// Pick the configuration file for a project without an explicit choice.
///
/// `towncrier.toml` wins over `pyproject.toml`. When neither exists the
/// `pyproject.toml` path is returned so that loading it reports a missing file.
#[must_use]
pub fn find_config_file(base: &Path) -> PathBuf {
    let towncrier = base.join(TOWNCRIER_TOML);
    if towncrier.is_file() {
        return towncrier;
    }
    base.join(PYPROJECT_TOML)
}

/// Configuration file path for a project, honoring an explicit file name.
#[must_use]
pub fn config_file_path(project_path: &Path, explicit: Option<&str>) -> PathBuf {
    match explicit {
        Some(name) => project_path.join(name),
        None => find_config_file(project_path),
    }
}

/// Load and normalize the towncrier configuration from `path`.
///
/// # Errors
///
/// Returns [`ConfigLookupFailure`] if the file is missing or unreadable, is not
/// valid TOML, or has no `[tool.towncrier]` table.
pub fn load(path: &Path) -> Result<ResolvedConfig, ConfigLookupFailure> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigLookupFailure::new(path, ConfigLookupKind::Missing));
        }
        Err(e) => return Err(ConfigLookupFailure::new(path, e)),
    };

    ResolvedConfig::from_toml_str(&content)
        .map_err(|e| ConfigLookupFailure::new(path, e))?
        .ok_or_else(|| ConfigLookupFailure::new(path, ConfigLookupKind::NoSection))
}

/// Locate and load the towncrier configuration of a project.
///
/// # Errors
///
/// See [`load`].
pub fn resolve(
    project_path: &Path,
    explicit: Option<&str>,
) -> Result<ResolvedConfig, ConfigLookupFailure> {
    load(&config_file_path(project_path, explicit))
}

/// Top-level shape of a TOML file that may carry towncrier settings.
#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    tool: ToolTable,
}

#[derive(Debug, Default, Deserialize)]
struct ToolTable {
    towncrier: Option<RawSettings>,
}

/// The `[tool.towncrier]` table as written on disk.
#[derive(Debug, Deserialize)]
struct RawSettings {
    directory: Option<String>,
    #[serde(default, rename = "section")]
    sections: Vec<RawSection>,
    #[serde(default, rename = "type")]
    types: Vec<RawType>,
    #[serde(default)]
    fragment: toml::Table,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
struct RawType {
    directory: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_find_config_file_none_present() {
        let temp_dir = tempfile::tempdir().unwrap();
        let found = find_config_file(temp_dir.path());
        assert_eq!(found, temp_dir.path().join(PYPROJECT_TOML));
    }

    #[test]
    fn test_find_config_file_pyproject_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), PYPROJECT_TOML, "");
        assert_eq!(
            find_config_file(temp_dir.path()),
            temp_dir.path().join(PYPROJECT_TOML)
        );
    }

    #[test]
    fn test_find_config_file_towncrier_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), TOWNCRIER_TOML, "");
        assert_eq!(
            find_config_file(temp_dir.path()),
            temp_dir.path().join(TOWNCRIER_TOML)
        );
    }

    #[test]
    fn test_find_config_file_towncrier_over_pyproject() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), PYPROJECT_TOML, "");
        write(temp_dir.path(), TOWNCRIER_TOML, "");
        assert_eq!(
            find_config_file(temp_dir.path()),
            temp_dir.path().join(TOWNCRIER_TOML)
        );
    }

    #[test]
    fn test_config_file_path_explicit() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), TOWNCRIER_TOML, "");
        assert_eq!(
            config_file_path(temp_dir.path(), Some("changes.toml")),
            temp_dir.path().join("changes.toml")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(PYPROJECT_TOML);

        let err = load(&path).unwrap_err();

        assert!(matches!(err.kind, ConfigLookupKind::Missing));
        assert_eq!(
            err.to_string(),
            format!(
                "Towncrier was unable to load the configuration from file `{}`: No such file or directory",
                path.display()
            )
        );
    }

    #[test]
    fn test_load_without_towncrier_section() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(
            temp_dir.path(),
            "arbitrary-config.toml",
            "[tool.black]\nline-length = 79\n",
        );
        let path = temp_dir.path().join("arbitrary-config.toml");

        let err = load(&path).unwrap_err();

        assert!(matches!(err.kind, ConfigLookupKind::NoSection));
        assert!(err.to_string().ends_with(": No [tool.towncrier] section."));
    }

    #[test]
    fn test_load_empty_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), TOWNCRIER_TOML, "");

        let err = load(&temp_dir.path().join(TOWNCRIER_TOML)).unwrap_err();
        assert!(matches!(err.kind, ConfigLookupKind::NoSection));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), TOWNCRIER_TOML, "[tool.towncrier\n");

        let err = load(&temp_dir.path().join(TOWNCRIER_TOML)).unwrap_err();
        assert!(matches!(err.kind, ConfigLookupKind::Invalid(_)));
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(temp_dir.path(), PYPROJECT_TOML, "[tool.towncrier]\n");

        let config = resolve(temp_dir.path(), None).unwrap();

        assert_eq!(config, ResolvedConfig::default());
        assert_eq!(config.section_names(), BTreeSet::from([""]));
        assert_eq!(
            config.type_names(),
            BTreeSet::from(["bugfix", "doc", "feature", "misc", "removal"])
        );
    }

    #[test]
    fn test_load_type_array_and_sections() {
        let toml = r#"
[project]
name = "example"

[tool.towncrier]
directory = "changes"

[[tool.towncrier.section]]
name = "Core"
path = "core"

[[tool.towncrier.section]]
name = "Plugins"
path = "plugins"

[[tool.towncrier.type]]
directory = "feature"
name = "Features"
showcontent = true

[[tool.towncrier.type]]
directory = "breaking"
name = "Breaking changes"
showcontent = true
"#;
        let config = ResolvedConfig::from_toml_str(toml).unwrap().unwrap();

        assert_eq!(config.directory.as_deref(), Some("changes"));
        assert_eq!(
            config.sections,
            vec![
                Section {
                    name: "Core".to_owned(),
                    path: "core".to_owned(),
                },
                Section {
                    name: "Plugins".to_owned(),
                    path: "plugins".to_owned(),
                },
            ]
        );
        assert_eq!(config.type_names(), BTreeSet::from(["breaking", "feature"]));
    }

    #[test]
    fn test_load_fragment_table_form() {
        let toml = r#"
[tool.towncrier.fragment.feature]
name = "Features"

[tool.towncrier.fragment.contrib]
name = "Contributor-facing changes"
showcontent = false
"#;
        let config = ResolvedConfig::from_toml_str(toml).unwrap().unwrap();

        assert_eq!(config.directory, None);
        assert_eq!(config.type_names(), BTreeSet::from(["contrib", "feature"]));
    }

    #[test]
    fn test_load_both_type_forms_merge() {
        let toml = r#"
[tool.towncrier]

[[tool.towncrier.type]]
directory = "bugfix"
name = "Bugfixes"

[tool.towncrier.fragment.doc]
"#;
        let config = ResolvedConfig::from_toml_str(toml).unwrap().unwrap();
        assert_eq!(config.type_names(), BTreeSet::from(["bugfix", "doc"]));
    }

    #[test]
    fn test_explicit_config_name_resolves_against_project() {
        let temp_dir = tempfile::tempdir().unwrap();
        write(
            temp_dir.path(),
            "changelog.toml",
            "[tool.towncrier]\ndirectory = \"changelog.d\"\n",
        );

        let config = resolve(temp_dir.path(), Some("changelog.toml")).unwrap();
        assert_eq!(config.directory.as_deref(), Some("changelog.d"));
    }
}
