//! Version label used when a directive names no version.

use std::fmt;
use std::str::FromStr;

use crate::directive::BuildEnvironment;

/// Label rendered when `autoversion_mode` is `draft`.
pub const DRAFT_VERSION_PLACEHOLDER: &str = "[UNRELEASED DRAFT]";

/// How to pick the draft version for `::towncrier-draft-entries` without
/// an argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoversionMode {
    /// Use [`DRAFT_VERSION_PLACEHOLDER`].
    Draft,
    /// Use the project's full release label.
    ReleaseLabel,
    /// Use the project's short version label.
    DevLabel,
}

impl AutoversionMode {
    /// Setting value for this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::ReleaseLabel => "release-label",
            Self::DevLabel => "dev-label",
        }
    }

    /// Version label for the page being built.
    pub fn fallback_version(self, env: &dyn BuildEnvironment) -> String {
        match self {
            Self::Draft => DRAFT_VERSION_PLACEHOLDER.to_owned(),
            Self::ReleaseLabel => env.release().to_owned(),
            Self::DevLabel => env.version().to_owned(),
        }
    }
}

impl fmt::Display for AutoversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `autoversion_mode` holds a value outside the known modes.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error(
    "Expected \"autoversion_mode\" to be one of [\"draft\", \"release-label\", \"dev-label\"] but got \"{0}\""
)]
pub struct UnknownAutoversionMode(pub String);

impl FromStr for AutoversionMode {
    type Err = UnknownAutoversionMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "release-label" => Ok(Self::ReleaseLabel),
            "dev-label" => Ok(Self::DevLabel),
            other => Err(UnknownAutoversionMode(other.to_owned())),
        }
    }
}
