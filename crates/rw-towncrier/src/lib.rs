//! Towncrier draft changelog integration for RW.
//!
//! Adds the `::towncrier-draft-entries[version]` leaf directive, which renders
//! the unreleased changelog of a project with `towncrier build --draft` and
//! splices the result into the page as Markdown.
//!
//! # Quick Start
//!
//! ```ignore
//! use rw_towncrier::{BuildSession, PageEnvironment, Settings, TowncrierExtension};
//!
//! let settings = Settings::load(None, None)?;
//! let extension = TowncrierExtension::new(settings.towncrier_resolved);
//! let mut session = BuildSession::new();
//! let mut env = PageEnvironment::new("changelog")
//!     .with_labels(&settings.project.release, &settings.project.version);
//!
//! let markdown = extension.expand_page(source, &mut session, &mut env)?;
//! ```
//!
//! # Incremental Builds
//!
//! Every page containing the directive is recorded in a [`BuildSession`]
//! together with the fragment files it was rendered from. Between builds the
//! session is persisted through a [`SessionCache`], and
//! [`TowncrierExtension::outdated_pages`] reports the pages to rebuild when
//! fragments are added or removed.

mod autoversion;
mod directive;
mod env;
mod expand;
mod extension;
mod session;
mod session_cache;
pub mod settings;

pub use autoversion::{AutoversionMode, DRAFT_VERSION_PLACEHOLDER, UnknownAutoversionMode};
pub use directive::{
    BuildEnvironment, DIRECTIVE_NAME, DirectiveError, DirectiveOutput, DraftEntriesDirective,
    PageEnvironment,
};
pub use expand::expand_draft_entries;
pub use extension::TowncrierExtension;
pub use session::BuildSession;
pub use session_cache::{FileSessionCache, NullSessionCache, SessionCache};
pub use settings::{CliSettings, ConfigError, ProjectConfig, Settings, TowncrierSettings};
