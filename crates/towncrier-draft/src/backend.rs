//! Backend capability for towncrier config loading and fragment listing.
//!
//! [`FragmentLocator`](crate::FragmentLocator) talks to towncrier only through
//! [`TowncrierBackend`]. The locator has one canonical call site per
//! capability; the differences between listing shapes are absorbed by
//! [`FragmentListing`].

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{self, ConfigLookupFailure, ResolvedConfig};
use crate::fragments::FragmentPathSet;

/// Fragment files found by a backend.
///
/// Towncrier has returned fragment file names both as a flat collection and
/// as `(path, category)` pairs. Backends may produce either shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FragmentListing {
    /// Flat list of fragment paths.
    Paths(Vec<PathBuf>),
    /// Fragment paths paired with their type.
    Categorized(Vec<(PathBuf, String)>),
}

impl FragmentListing {
    /// Normalize either listing shape into a path set.
    #[must_use]
    pub fn into_path_set(self) -> FragmentPathSet {
        match self {
            Self::Paths(paths) => paths.into_iter().collect(),
            Self::Categorized(entries) => entries.into_iter().map(|(path, _)| path).collect(),
        }
    }
}

/// Fragment listing is impossible for the given configuration.
#[derive(Debug, thiserror::Error)]
pub enum FragmentLookupError {
    /// Two fragment files in one section share issue, type and counter.
    #[error("Multiple fragments for `{issue}.{category}` in {}: {} and {}", .dir.display(), .first.display(), .second.display())]
    Conflict {
        /// Section directory holding the fragments.
        dir: PathBuf,
        /// Issue part of the fragment names.
        issue: String,
        /// Fragment type of both files.
        category: String,
        /// First fragment seen.
        first: PathBuf,
        /// Conflicting fragment.
        second: PathBuf,
    },
    /// A section directory exists but cannot be listed.
    #[error("Failed to list fragment directory {}: {source}", .dir.display())]
    Unreadable {
        /// Section directory that failed.
        dir: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Towncrier capabilities needed for fragment discovery.
pub trait TowncrierBackend: Send + Sync {
    /// Load the towncrier configuration stored in `config_file`.
    ///
    /// `project_path` is the directory relative paths are resolved against.
    fn load_config(
        &self,
        project_path: &Path,
        config_file: &Path,
    ) -> Result<ResolvedConfig, ConfigLookupFailure>;

    /// List fragment files under `base_directory` for the configured sections
    /// and types.
    ///
    /// A missing base or section directory yields an empty listing.
    fn find_fragments(
        &self,
        base_directory: &Path,
        config: &ResolvedConfig,
    ) -> Result<FragmentListing, FragmentLookupError>;
}

/// Built-in backend reading towncrier's TOML config and fragment directories.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeBackend;

impl TowncrierBackend for NativeBackend {
    fn load_config(
        &self,
        _project_path: &Path,
        config_file: &Path,
    ) -> Result<ResolvedConfig, ConfigLookupFailure> {
        config::load(config_file)
    }

    fn find_fragments(
        &self,
        base_directory: &Path,
        config: &ResolvedConfig,
    ) -> Result<FragmentListing, FragmentLookupError> {
        let mut found = Vec::new();

        for section in &config.sections {
            let section_dir = if section.path.is_empty() {
                base_directory.to_path_buf()
            } else {
                base_directory.join(&section.path)
            };
            list_section(&section_dir, &config.types, &mut found)?;
        }

        Ok(FragmentListing::Categorized(found))
    }
}

/// Collect fragments from one section directory.
fn list_section(
    section_dir: &Path,
    types: &BTreeSet<String>,
    found: &mut Vec<(PathBuf, String)>,
) -> Result<(), FragmentLookupError> {
    let entries = match fs::read_dir(section_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(FragmentLookupError::Unreadable {
                dir: section_dir.to_path_buf(),
                source,
            });
        }
    };

    // Symlinks count by their target. Sorted so conflict reports are
    // deterministic.
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut seen: HashMap<(String, String, u64), PathBuf> = HashMap::new();

    for path in files {
        let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if basename.starts_with('.') {
            continue;
        }
        let Some(fragment) = parse_fragment_basename(basename, types) else {
            tracing::debug!(path = %path.display(), "Skipping file without a fragment type");
            continue;
        };

        let key = (
            fragment.issue.clone(),
            fragment.category.clone(),
            fragment.counter,
        );
        if let Some(first) = seen.get(&key) {
            return Err(FragmentLookupError::Conflict {
                dir: section_dir.to_path_buf(),
                issue: fragment.issue,
                category: fragment.category,
                first: first.clone(),
                second: path,
            });
        }
        seen.insert(key, path.clone());
        found.push((path, fragment.category));
    }

    Ok(())
}

/// Components of a fragment file name like `123.feature.1.md`.
#[derive(Debug, PartialEq, Eq)]
struct ParsedFragment {
    issue: String,
    category: String,
    counter: u64,
}

/// Split a fragment file name into issue, type and counter.
///
/// The type is the right-most dot-separated part (never the first) that is a
/// known type. Parts before it form the issue; an all-digit part right after
/// it is the counter.
fn parse_fragment_basename(basename: &str, types: &BTreeSet<String>) -> Option<ParsedFragment> {
    let parts: Vec<&str> = basename.split('.').collect();
    if parts.len() < 2 {
        return None;
    }

    let index = (1..parts.len()).rev().find(|&i| types.contains(parts[i]))?;
    let counter = parts
        .get(index + 1)
        .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);

    Some(ParsedFragment {
        issue: parts[..index].join(".").trim().to_owned(),
        category: parts[index].to_owned(),
        counter,
    })
}
