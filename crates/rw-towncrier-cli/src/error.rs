//! CLI error types.

use rw_towncrier::{ConfigError, DirectiveError};
use towncrier_draft::DraftError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Directive(#[from] DirectiveError),

    #[error("{0}")]
    Draft(#[from] DraftError),

    #[error("Failed to inspect Python interpreter `{python}`: {message}")]
    Probe { python: String, message: String },

    #[error("Command `{command}` failed with {status}")]
    CommandFailed { command: String, status: String },
}
