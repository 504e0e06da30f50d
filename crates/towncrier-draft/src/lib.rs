//! Towncrier integration primitives.
//!
//! This crate wraps the parts of towncrier a documentation build needs:
//!
//! - [`config`]: locating and loading the towncrier configuration of a project
//! - [`TowncrierBackend`]: the capability seam for config loading and fragment
//!   listing, with [`NativeBackend`] as the built-in implementation
//! - [`FragmentLocator`]: memoized discovery of pending changelog fragments
//! - [`DraftRenderer`]: memoized `towncrier build --draft` invocations
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use towncrier_draft::{DraftRenderer, DraftRequest, FragmentLocator};
//!
//! let locator = FragmentLocator::native();
//! let fragments = locator.locate(Some(Path::new("/project")), None);
//! println!("{} pending fragments", fragments.len());
//!
//! let renderer = DraftRenderer::default();
//! let draft = renderer.render(&DraftRequest::new("1.2.0").with_allow_empty(true));
//! ```

mod backend;
pub mod config;
mod draft;
mod escape;
mod fragments;
mod memo;

pub use backend::{FragmentListing, FragmentLookupError, NativeBackend, TowncrierBackend};
pub use config::{ConfigLookupFailure, ConfigLookupKind, ResolvedConfig, Section};
pub use draft::{
    DraftCommand, DraftError, DraftRenderFailure, DraftRenderer, DraftRequest, NO_CHANGES_MARKER,
};
pub use escape::escape_version_substitution;
pub use fragments::{DEFAULT_FRAGMENT_DIRECTORY, FragmentLocator, FragmentPathSet};
pub use memo::Memo;
