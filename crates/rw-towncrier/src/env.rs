//! Environment variable expansion for `rw.toml` string values.
//!
//! Only the braced forms are recognized:
//! - `${VAR}` expands to the value of VAR and fails when it is unset
//! - `${VAR:-default}` falls back to `default` when VAR is unset

use crate::settings::ConfigError;

/// Variable referenced by a setting but missing from the environment.
struct UnsetVariable {
    name: String,
}

/// Expand `${...}` references in the value of `field`.
///
/// A `$` that does not open `${` is kept literally, including `$VAR`.
pub(crate) fn expand_field(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    let escaped = escape_bare_dollars(value);
    shellexpand::env_with_context(&escaped, |name| -> Result<Option<String>, UnsetVariable> {
        std::env::var(name).map(Some).map_err(|_| UnsetVariable {
            name: name.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.name),
    })
}

/// Double every `$` not followed by `{`; shellexpand reads `$$` as `$`.
fn escape_bare_dollars(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        escaped.push(c);
        if c == '$' && chars.peek() != Some(&'{') {
            escaped.push('$');
        }
    }
    escaped
}

/// Expand an optional setting in place.
pub(crate) fn expand_optional(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(raw) = value.as_deref() {
        *value = Some(expand_field(raw, field)?);
    }
    Ok(())
}
