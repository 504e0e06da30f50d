//! Version string escaping for draft titles.

use std::borrow::Cow;

/// Substitution delimiter used by the markup the draft is rendered into.
const SUBSTITUTION_DELIMITER: char = '|';

/// Prepend an escaped space before a leading substitution reference.
///
/// Towncrier title formats such as `v{version}` glue the version onto a
/// prefix. When the version itself is a substitution like `|release|`, the
/// result `v|release|` is no longer recognized as a substitution. An escaped
/// space renders as nothing but keeps the delimiter at a word boundary.
///
/// Versions that do not start with the delimiter, or that contain only one
/// delimiter, are returned unchanged. Applying the function twice yields the
/// same result as applying it once.
///
/// # Example
///
/// ```
/// use towncrier_draft::escape_version_substitution;
///
/// assert_eq!(escape_version_substitution("|release|"), r"\ |release|");
/// assert_eq!(escape_version_substitution("v|release|"), "v|release|");
/// ```
#[must_use]
pub fn escape_version_substitution(version: &str) -> Cow<'_, str> {
    if !version.starts_with(SUBSTITUTION_DELIMITER)
        || version.matches(SUBSTITUTION_DELIMITER).count() <= 1
    {
        return Cow::Borrowed(version);
    }

    Cow::Owned(format!(r"\ {version}"))
}
