//! Markdown pass replacing draft-entries directives with their output.
//!
//! A directive must stand on its own line, optionally indented:
//!
//! ```markdown
//! ## Unreleased
//!
//! ::towncrier-draft-entries[v2.1.0]
//! ```
//!
//! Lines inside fenced code blocks are never treated as directives.

use crate::directive::{
    BuildEnvironment, DIRECTIVE_NAME, DirectiveError, DirectiveOutput, DraftEntriesDirective,
};

/// Replace every draft-entries directive line in `source`.
///
/// Markdown output replaces the line (keeping its line ending); an empty
/// draft removes the line. Everything else is copied unchanged.
///
/// # Errors
///
/// Returns the first [`DirectiveError`]; the page should not be rendered.
pub fn expand_draft_entries(
    source: &str,
    directive: &mut DraftEntriesDirective<'_>,
    env: &mut dyn BuildEnvironment,
) -> Result<String, DirectiveError> {
    let mut output = String::with_capacity(source.len());
    let mut fence = FenceTracker::default();

    for line in source.split_inclusive('\n') {
        if fence.update(line) || fence.in_fence() {
            output.push_str(line);
            continue;
        }

        let Some(content) = directive_content(line) else {
            output.push_str(line);
            continue;
        };

        match directive.process(content, env)? {
            DirectiveOutput::Markdown(markdown) => {
                output.push_str(&markdown);
                if line.ends_with('\n') {
                    output.push('\n');
                }
            }
            DirectiveOutput::Empty => {}
        }
    }

    Ok(output)
}

/// Bracket content of a directive line, or `None` for any other line.
fn directive_content(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("::")?.strip_prefix(DIRECTIVE_NAME)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix('[')?.strip_suffix(']')
}

/// Fenced code block state for a line-by-line scan.
///
/// A fence opens with three or more backticks or tildes and closes with a
/// line of at least as many of the same character.
#[derive(Debug, Default)]
struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    fn in_fence(&self) -> bool {
        self.open.is_some()
    }

    /// Feed a line. Returns `true` if it opened or closed a fence.
    fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        match self.open {
            Some((ch, len)) => {
                let run = trimmed.chars().take_while(|&c| c == ch).count();
                let closes = run >= len && trimmed[run * ch.len_utf8()..].trim().is_empty();
                if closes {
                    self.open = None;
                }
                closes
            }
            None => {
                let first = trimmed.chars().next();
                let Some(ch) = first.filter(|c| matches!(c, '`' | '~')) else {
                    return false;
                };
                let run = trimmed.chars().take_while(|&c| c == ch).count();
                if run < 3 {
                    return false;
                }
                self.open = Some((ch, run));
                true
            }
        }
    }
}
