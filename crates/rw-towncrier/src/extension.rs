//! Extension object registered with the documentation engine.

use std::collections::BTreeSet;

use towncrier_draft::{DraftRenderer, FragmentLocator};

use crate::directive::{BuildEnvironment, DirectiveError, DraftEntriesDirective};
use crate::expand::expand_draft_entries;
use crate::session::BuildSession;
use crate::settings::TowncrierSettings;

/// Towncrier integration for one documentation project.
///
/// Owns the settings together with the memoized fragment locator and draft
/// renderer, and provides the directive plus the three build lifecycle hooks:
///
/// - [`purge_page`](Self::purge_page) before a page is re-read
/// - [`merge_session`](Self::merge_session) after a parallel worker finishes
/// - [`outdated_pages`](Self::outdated_pages) when the engine collects pages
///   to rebuild
pub struct TowncrierExtension {
    settings: TowncrierSettings,
    locator: FragmentLocator,
    renderer: DraftRenderer,
}

impl TowncrierExtension {
    /// Create an extension running the `towncrier` executable.
    #[must_use]
    pub fn new(settings: TowncrierSettings) -> Self {
        Self {
            settings,
            locator: FragmentLocator::native(),
            renderer: DraftRenderer::default(),
        }
    }

    /// Replace the fragment locator.
    #[must_use]
    pub fn with_locator(mut self, locator: FragmentLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Replace the draft renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: DraftRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &TowncrierSettings {
        &self.settings
    }

    #[must_use]
    pub fn locator(&self) -> &FragmentLocator {
        &self.locator
    }

    #[must_use]
    pub fn renderer(&self) -> &DraftRenderer {
        &self.renderer
    }

    /// Directive recording into `session`.
    pub fn directive<'a>(&'a self, session: &'a mut BuildSession) -> DraftEntriesDirective<'a> {
        DraftEntriesDirective::new(self, session)
    }

    /// Expand every draft-entries directive of one page.
    ///
    /// The page is purged from the session first, so a page that no longer
    /// contains the directive stops being tracked.
    ///
    /// # Errors
    ///
    /// Returns the first [`DirectiveError`] raised by a directive.
    pub fn expand_page(
        &self,
        source: &str,
        session: &mut BuildSession,
        env: &mut dyn BuildEnvironment,
    ) -> Result<String, DirectiveError> {
        self.purge_page(session, env.page());
        expand_draft_entries(source, &mut self.directive(session), env)
    }

    /// Forget a page before it is rebuilt or deleted.
    pub fn purge_page(&self, session: &mut BuildSession, page: &str) {
        if session.purge_page(page) {
            tracing::debug!(page, "Purged fragment-dependent page");
        }
    }

    /// Fold a parallel worker's session into the main one.
    pub fn merge_session(&self, session: &mut BuildSession, other: &BuildSession) {
        session.merge(other);
    }

    /// Fragment-dependent pages to rebuild because fragments were added or
    /// removed since `session` was recorded.
    ///
    /// Pages already in `changed` are left out. The fragment lookup bypasses
    /// the locator's memo.
    pub fn outdated_pages(
        &self,
        session: &BuildSession,
        changed: &BTreeSet<String>,
    ) -> Vec<String> {
        let current = self.locator.refresh(
            self.settings.working_directory.as_deref(),
            self.settings.config_path.as_deref(),
        );
        let outdated = session.outdated_pages(&current, changed);
        if !outdated.is_empty() {
            tracing::info!(pages = outdated.len(), "Fragments changed, rebuilding changelog pages");
        }
        outdated
    }

    /// Drop memoized fragment lookups and drafts.
    pub fn clear_caches(&self) {
        self.locator.clear_cache();
        self.renderer.clear_cache();
    }
}
