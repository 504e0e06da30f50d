//! The `::towncrier-draft-entries` leaf directive.
//!
//! ```markdown
//! ::towncrier-draft-entries
//! ::towncrier-draft-entries[v2.1.0]
//! ::towncrier-draft-entries[2.1 (unreleased)]
//! ```
//!
//! The trimmed bracket content is the version label passed to towncrier, taken
//! literally. Without one, the label comes from `autoversion_mode`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use towncrier_draft::{DraftError, DraftRequest};

use crate::autoversion::{AutoversionMode, UnknownAutoversionMode};
use crate::extension::TowncrierExtension;
use crate::session::BuildSession;

/// Directive name as written after `::`.
pub const DIRECTIVE_NAME: &str = "towncrier-draft-entries";

/// What the documentation engine exposes to the directive while a page is
/// built.
pub trait BuildEnvironment {
    /// Identifier of the page being built.
    fn page(&self) -> &str;

    /// Mark `path` as an input of the current page.
    fn note_dependency(&mut self, path: &Path);

    /// Full release label of the project.
    fn release(&self) -> &str;

    /// Short version label of the project.
    fn version(&self) -> &str;
}

/// Plain [`BuildEnvironment`] for a single page.
///
/// Collects noted dependencies so callers can inspect them after the page is
/// expanded.
#[derive(Clone, Debug, Default)]
pub struct PageEnvironment {
    page: String,
    release: String,
    version: String,
    dependencies: BTreeSet<PathBuf>,
}

impl PageEnvironment {
    /// Create an environment for `page` with empty project labels.
    #[must_use]
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            ..Self::default()
        }
    }

    /// Set the release and version labels.
    #[must_use]
    pub fn with_labels(mut self, release: impl Into<String>, version: impl Into<String>) -> Self {
        self.release = release.into();
        self.version = version.into();
        self
    }

    /// Paths noted as inputs of the page.
    #[must_use]
    pub fn dependencies(&self) -> &BTreeSet<PathBuf> {
        &self.dependencies
    }
}

impl BuildEnvironment for PageEnvironment {
    fn page(&self) -> &str {
        &self.page
    }

    fn note_dependency(&mut self, path: &Path) {
        self.dependencies.insert(path.to_path_buf());
    }

    fn release(&self) -> &str {
        &self.release
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Result of running the directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveOutput {
    /// Draft changelog to be parsed as Markdown in place of the directive.
    Markdown(String),
    /// Nothing to render: there are no unreleased entries.
    Empty,
}

/// Errors that abort the page containing the directive.
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    /// The content spans more than one line.
    #[error("Error in \"towncrier-draft-entries\" directive: only one argument permitted.")]
    TooManyArguments,
    /// `autoversion_mode` is not a known mode.
    #[error(transparent)]
    Config(#[from] UnknownAutoversionMode),
    /// Towncrier failed to produce a draft.
    #[error("{0}")]
    Render(#[source] DraftError),
}

/// Directive bound to one build session.
///
/// Created by [`TowncrierExtension::directive`].
pub struct DraftEntriesDirective<'a> {
    extension: &'a TowncrierExtension,
    session: &'a mut BuildSession,
}

impl<'a> DraftEntriesDirective<'a> {
    pub(crate) fn new(extension: &'a TowncrierExtension, session: &'a mut BuildSession) -> Self {
        Self { extension, session }
    }

    /// Run the directive for the page described by `env`.
    ///
    /// `content` is the text between the brackets. Fragment dependencies are
    /// recorded in the session before the draft is rendered, so they are kept
    /// even when rendering fails.
    ///
    /// # Errors
    ///
    /// Returns [`DirectiveError`] for malformed arguments, an unknown
    /// `autoversion_mode` when the fallback is needed, or a failed towncrier
    /// run.
    pub fn process(
        &mut self,
        content: &str,
        env: &mut dyn BuildEnvironment,
    ) -> Result<DirectiveOutput, DirectiveError> {
        let explicit_version = parse_version_argument(content)?;
        let settings = self.extension.settings();

        let fragments = self.extension.locator().locate(
            settings.working_directory.as_deref(),
            settings.config_path.as_deref(),
        );
        for path in &fragments {
            env.note_dependency(path);
        }
        self.session.record_page(env.page(), &fragments);

        let version = match explicit_version {
            Some(version) => version,
            None => {
                let mode: AutoversionMode = settings.autoversion_mode.parse()?;
                tracing::debug!(page = env.page(), %mode, "Using autoversion fallback");
                mode.fallback_version(env)
            }
        };

        let request = DraftRequest::new(version)
            .with_allow_empty(settings.include_empty)
            .with_working_dir(settings.working_directory.clone())
            .with_config_path(settings.config_path.clone());

        match self.extension.renderer().render(&request) {
            Ok(draft) => Ok(DirectiveOutput::Markdown(draft)),
            Err(e) if e.is_empty() => {
                tracing::debug!(page = env.page(), "No unreleased changelog entries");
                Ok(DirectiveOutput::Empty)
            }
            Err(e) => Err(DirectiveError::Render(e)),
        }
    }
}

/// Extract the optional version label from the bracket content.
///
/// Only a single line of content is accepted.
fn parse_version_argument(content: &str) -> Result<Option<String>, DirectiveError> {
    let label = content.trim();
    if label.contains(['\n', '\r']) {
        return Err(DirectiveError::TooManyArguments);
    }
    Ok((!label.is_empty()).then(|| label.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use towncrier_draft::{DraftCommand, DraftRenderer};

    use crate::settings::TowncrierSettings;

    fn project_with_fragments(names: &[&str]) -> tempfile::TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("towncrier.toml"),
            "[tool.towncrier]\n",
        )
        .unwrap();
        let fragments = temp_dir.path().join("newsfragments");
        fs::create_dir_all(&fragments).unwrap();
        for name in names {
            fs::write(fragments.join(name), "Change.\n").unwrap();
        }
        temp_dir
    }

    fn settings_for(dir: &Path, mode: &str) -> TowncrierSettings {
        TowncrierSettings {
            autoversion_mode: mode.to_owned(),
            working_directory: Some(dir.to_path_buf()),
            ..TowncrierSettings::default()
        }
    }

    /// Renderer whose "towncrier" prints the arguments it was given.
    fn echo_renderer() -> DraftRenderer {
        DraftRenderer::new(DraftCommand::new(
            "sh",
            [
                "-c".to_owned(),
                r#"printf '%s\n' "$@""#.to_owned(),
                "towncrier".to_owned(),
                "build".to_owned(),
                "--draft".to_owned(),
            ],
        ))
    }

    #[test]
    fn test_parse_version_argument() {
        assert_eq!(parse_version_argument("").unwrap(), None);
        assert_eq!(parse_version_argument("   ").unwrap(), None);
        assert_eq!(
            parse_version_argument("v2.1.0").unwrap(),
            Some("v2.1.0".to_owned())
        );
        assert_eq!(
            parse_version_argument(" 2.1 (unreleased) ").unwrap(),
            Some("2.1 (unreleased)".to_owned())
        );
        assert_eq!(
            parse_version_argument("|release|").unwrap(),
            Some("|release|".to_owned())
        );
    }

    #[test]
    fn test_parse_version_argument_is_literal() {
        assert_eq!(
            parse_version_argument("Bob's release").unwrap(),
            Some("Bob's release".to_owned())
        );
        assert_eq!(
            parse_version_argument(r#""quoted""#).unwrap(),
            Some(r#""quoted""#.to_owned())
        );

        let label = parse_version_argument(r"\ |release|").unwrap().unwrap();
        assert_eq!(label, r"\ |release|");
        assert_eq!(
            towncrier_draft::escape_version_substitution(&label),
            r"\ |release|"
        );
    }

    #[test]
    fn test_parse_version_argument_rejects_multiple_lines() {
        let err = parse_version_argument("1.0\n2.0").unwrap_err();
        assert!(matches!(err, DirectiveError::TooManyArguments));
        assert_eq!(
            err.to_string(),
            r#"Error in "towncrier-draft-entries" directive: only one argument permitted."#
        );
    }

    #[test]
    fn test_page_environment_collects_dependencies() {
        let mut env = PageEnvironment::new("changelog");
        env.note_dependency(Path::new("/p/newsfragments/1.feature"));
        env.note_dependency(Path::new("/p/newsfragments/1.feature"));

        assert_eq!(env.page(), "changelog");
        assert_eq!(env.dependencies().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_records_dependencies_and_renders() {
        let project = project_with_fragments(&["1.feature", "2.bugfix"]);
        let extension = TowncrierExtension::new(settings_for(project.path(), "draft"))
            .with_renderer(echo_renderer());
        let mut session = BuildSession::new();
        let mut env = PageEnvironment::new("changelog");

        let output = extension
            .directive(&mut session)
            .process("v3.0", &mut env)
            .unwrap();

        assert_eq!(
            output,
            DirectiveOutput::Markdown("build\n--draft\n--version\nv3.0".to_owned())
        );
        let expected: BTreeSet<PathBuf> = [
            project.path().join("newsfragments/1.feature"),
            project.path().join("newsfragments/2.bugfix"),
        ]
        .into_iter()
        .collect();
        assert_eq!(env.dependencies(), &expected);
        assert!(session.fragment_pages().contains("changelog"));
        assert_eq!(session.fragment_paths().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_uses_autoversion_fallback() {
        let project = project_with_fragments(&[]);
        let extension = TowncrierExtension::new(settings_for(project.path(), "dev-label"))
            .with_renderer(echo_renderer());
        let mut session = BuildSession::new();
        let mut env = PageEnvironment::new("changelog").with_labels("2.1.0rc1", "2.1");

        let output = extension
            .directive(&mut session)
            .process("", &mut env)
            .unwrap();

        assert_eq!(
            output,
            DirectiveOutput::Markdown("build\n--draft\n--version\n2.1".to_owned())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_process_unknown_mode_after_recording() {
        let project = project_with_fragments(&["1.feature"]);
        let extension = TowncrierExtension::new(settings_for(project.path(), "nightly"))
            .with_renderer(echo_renderer());
        let mut session = BuildSession::new();
        let mut env = PageEnvironment::new("changelog");

        let err = extension
            .directive(&mut session)
            .process("", &mut env)
            .unwrap_err();

        assert!(matches!(err, DirectiveError::Config(_)));
        assert!(err.to_string().contains(r#"but got "nightly""#));
        assert!(session.fragment_pages().contains("changelog"));
        assert_eq!(env.dependencies().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_unknown_mode_ignored_with_explicit_version() {
        let project = project_with_fragments(&[]);
        let extension = TowncrierExtension::new(settings_for(project.path(), "nightly"))
            .with_renderer(echo_renderer());
        let mut session = BuildSession::new();
        let mut env = PageEnvironment::new("changelog");

        let output = extension
            .directive(&mut session)
            .process("1.0", &mut env)
            .unwrap();

        assert!(matches!(output, DirectiveOutput::Markdown(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_empty_draft_renders_nothing() {
        let project = project_with_fragments(&[]);
        let settings = TowncrierSettings {
            include_empty: false,
            ..settings_for(project.path(), "draft")
        };
        let renderer = DraftRenderer::new(DraftCommand::new(
            "sh",
            ["-c".to_owned(), "echo 'No significant changes.'".to_owned()],
        ));
        let extension = TowncrierExtension::new(settings).with_renderer(renderer);
        let mut session = BuildSession::new();
        let mut env = PageEnvironment::new("changelog");

        let output = extension
            .directive(&mut session)
            .process("", &mut env)
            .unwrap();

        assert_eq!(output, DirectiveOutput::Empty);
        assert!(session.fragment_pages().contains("changelog"));
    }

    #[cfg(unix)]
    #[test]
    fn test_process_failed_render_is_error() {
        let project = project_with_fragments(&["1.feature"]);
        let renderer = DraftRenderer::new(DraftCommand::new(
            "sh",
            ["-c".to_owned(), "echo broken >&2; exit 2".to_owned()],
        ));
        let extension =
            TowncrierExtension::new(settings_for(project.path(), "draft")).with_renderer(renderer);
        let mut session = BuildSession::new();
        let mut env = PageEnvironment::new("changelog");

        let err = extension
            .directive(&mut session)
            .process("", &mut env)
            .unwrap_err();

        assert!(matches!(err, DirectiveError::Render(_)));
        let message = err.to_string();
        assert!(message.starts_with("Command exited unexpectedly."));
        assert!(message.contains("Return code: 2"));
        assert!(message.contains("broken"));
        assert_eq!(session.fragment_paths().len(), 1);
    }
}
