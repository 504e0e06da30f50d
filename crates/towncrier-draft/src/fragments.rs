//! Pending changelog fragment discovery.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{NativeBackend, TowncrierBackend};
use crate::config;
use crate::memo::Memo;

/// Fragment directory used when the configuration does not name one.
pub const DEFAULT_FRAGMENT_DIRECTORY: &str = "newsfragments";

/// Distinct `(working_dir, config_path)` pairs remembered by a locator.
const LOCATOR_CACHE_CAPACITY: usize = 16;

/// Set of fragment file paths representing unreleased changelog entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentPathSet(BTreeSet<PathBuf>);

impl FragmentPathSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fragments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no fragments are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `path` is one of the fragments.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    /// Add every path of `other` to this set.
    pub fn union_with(&mut self, other: &Self) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Whether the two sets have a non-empty symmetric difference.
    #[must_use]
    pub fn differs_from(&self, other: &Self) -> bool {
        self.0.symmetric_difference(&other.0).next().is_some()
    }
}

impl FromIterator<PathBuf> for FragmentPathSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FragmentPathSet {
    type Item = &'a PathBuf;
    type IntoIter = std::collections::btree_set::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Memoization key: the exact arguments of [`FragmentLocator::locate`].
type LocateKey = (Option<PathBuf>, Option<String>);

/// Finds pending fragments for a project, memoizing results per
/// `(working_dir, config_path)` pair.
///
/// Lookup problems never fail the caller: a missing or broken towncrier
/// configuration, or a fragment layout the backend rejects, is logged as a
/// warning and reported as an empty set.
pub struct FragmentLocator {
    backend: Arc<dyn TowncrierBackend>,
    cache: Memo<LocateKey, FragmentPathSet>,
}

impl FragmentLocator {
    /// Create a locator using the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn TowncrierBackend>) -> Self {
        Self {
            backend,
            cache: Memo::new(LOCATOR_CACHE_CAPACITY),
        }
    }

    /// Create a locator using [`NativeBackend`].
    #[must_use]
    pub fn native() -> Self {
        Self::new(Arc::new(NativeBackend))
    }

    /// Pending fragment paths for a project.
    ///
    /// * `working_dir` - Project root (current directory when `None`)
    /// * `config_path` - Towncrier config file relative to the project root
    ///   (auto-discovered when `None`)
    pub fn locate(&self, working_dir: Option<&Path>, config_path: Option<&str>) -> FragmentPathSet {
        let key = (
            working_dir.map(Path::to_path_buf),
            config_path.map(str::to_owned),
        );
        self.cache.get_or_insert_with(key, || self.lookup(working_dir, config_path))
    }

    /// Recompute fragments for a pair, replacing any cached result.
    pub fn refresh(&self, working_dir: Option<&Path>, config_path: Option<&str>) -> FragmentPathSet {
        self.cache.remove(&(
            working_dir.map(Path::to_path_buf),
            config_path.map(str::to_owned),
        ));
        self.locate(working_dir, config_path)
    }

    /// Forget all memoized lookups.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn lookup(&self, working_dir: Option<&Path>, config_path: Option<&str>) -> FragmentPathSet {
        let project_path = match working_dir {
            Some(dir) => dir.to_path_buf(),
            None => match std::env::current_dir() {
                Ok(dir) => dir,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to determine the current directory");
                    return FragmentPathSet::new();
                }
            },
        };

        let config_file = config::config_file_path(&project_path, config_path);
        let config = match self.backend.load_config(&project_path, &config_file) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %config_file.display(), error = %e, "Skipping changelog fragment lookup");
                return FragmentPathSet::new();
            }
        };

        let base_directory = project_path.join(
            config
                .directory
                .as_deref()
                .unwrap_or(DEFAULT_FRAGMENT_DIRECTORY),
        );

        match self.backend.find_fragments(&base_directory, &config) {
            Ok(listing) => {
                let fragments = listing.into_path_set();
                tracing::debug!(
                    dir = %base_directory.display(),
                    fragments = fragments.len(),
                    "Changelog fragments found"
                );
                fragments
            }
            Err(e) => {
                tracing::warn!(dir = %base_directory.display(), error = %e, "Changelog fragment lookup failed");
                FragmentPathSet::new()
            }
        }
    }
}
