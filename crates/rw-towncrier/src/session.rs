//! Per-build record of fragment-dependent pages.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use towncrier_draft::FragmentPathSet;

/// Pages containing the draft-entries directive and the fragment files they
/// were last rendered from.
///
/// A page is listed in [`fragment_pages`](Self::fragment_pages) exactly while
/// it contains the directive: [`record_page`](Self::record_page) adds it and
/// [`purge_page`](Self::purge_page) removes it before the page is re-read.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSession {
    fragment_pages: BTreeSet<String>,
    fragment_paths: FragmentPathSet,
}

impl BuildSession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages that depend on fragments.
    #[must_use]
    pub fn fragment_pages(&self) -> &BTreeSet<String> {
        &self.fragment_pages
    }

    /// Fragment files seen by the last directive run.
    #[must_use]
    pub fn fragment_paths(&self) -> &FragmentPathSet {
        &self.fragment_paths
    }

    /// Mark `page` as fragment-dependent and store the fragments it used.
    pub fn record_page(&mut self, page: &str, fragments: &FragmentPathSet) {
        self.fragment_pages.insert(page.to_owned());
        self.fragment_paths.clone_from(fragments);
    }

    /// Forget `page`. Returns whether it was recorded.
    pub fn purge_page(&mut self, page: &str) -> bool {
        self.fragment_pages.remove(page)
    }

    /// Fold the record of a parallel worker into this one.
    pub fn merge(&mut self, other: &Self) {
        self.fragment_pages
            .extend(other.fragment_pages.iter().cloned());
        self.fragment_paths.union_with(&other.fragment_paths);
    }

    /// Pages to rebuild given the `current` fragment files.
    ///
    /// When `current` differs from the recorded fragments, every recorded
    /// page not already in `changed` is returned, sorted. Otherwise nothing
    /// is outdated.
    #[must_use]
    pub fn outdated_pages(
        &self,
        current: &FragmentPathSet,
        changed: &BTreeSet<String>,
    ) -> Vec<String> {
        if !self.fragment_paths.differs_from(current) {
            return Vec::new();
        }
        self.fragment_pages.difference(changed).cloned().collect()
    }
}
