//! Podspec (Ruby DSL) value lookup.
//!
//! Attributes are assigned on the block variable of the
//! `Pod::Spec.new do |spec|` header, so a key path is a literal left-hand
//! side and there is no nesting to disambiguate.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::{FormatMatcher, MatchSpan, next_start};
use crate::error::{HandlerError, HandlerResult};
use crate::key_path::KeyPath;

static BLOCK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*[A-Za-z_][\w:]*\.new\b[^\n]*?\bdo\s*\|\s*(?<prefix>[A-Za-z_]\w*)\s*\|")
        .expect("block header pattern is valid")
});

/// Matcher for `.podspec` files, bound to the block variable it found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodspecMatcher {
    prefix: String,
}

impl PodspecMatcher {
    /// Scan `buffer` for the `do |var|` block header.
    pub fn discover(buffer: &str) -> HandlerResult<Self> {
        let prefix = BLOCK_HEADER
            .captures(buffer)
            .and_then(|caps| caps.name("prefix"))
            .ok_or_else(|| HandlerError::not_found("podspec `do |...|` block header"))?;
        debug!(prefix = prefix.as_str(), "found podspec block variable");
        Ok(Self::with_prefix(prefix.as_str()))
    }

    /// Use a known block variable.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The block variable, e.g. `spec` or `s`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The assignment target a key path addresses.
    ///
    /// A path already starting with the block variable is taken as
    /// qualified, so `version` and `spec.version` are the same key.
    fn left_hand_side(&self, path: &KeyPath) -> String {
        let segments = path.segments();
        if segments.len() > 1 && segments[0] == self.prefix {
            path.to_string()
        } else {
            format!("{}.{path}", self.prefix)
        }
    }
}

impl FormatMatcher for PodspecMatcher {
    fn resolve(&self, buffer: &str, path: &KeyPath) -> HandlerResult<MatchSpan> {
        let lhs = self.left_hand_side(path);
        let pattern = Regex::new(&format!(
            r#"(?m)(?:^|[^\w.])(?<lhs>{})\s*=\s*["'](?<value>[^"'\r\n]*)["']"#,
            regex::escape(&lhs)
        ))?;

        let mut start = 0;
        while start <= buffer.len() {
            let Some(caps) = pattern.captures_at(buffer, start) else {
                break;
            };
            let (Some(whole), Some(target), Some(value)) =
                (caps.get(0), caps.name("lhs"), caps.name("value"))
            else {
                break;
            };

            let line_start = buffer[..target.start()].rfind('\n').map_or(0, |i| i + 1);
            if starts_comment(&buffer[line_start..target.start()]) {
                trace!(offset = target.start(), "skipping commented assignment");
            } else {
                debug!(%lhs, offset = value.start(), "podspec assignment found");
                return Ok(MatchSpan {
                    full: whole.range(),
                    value: value.range(),
                });
            }

            start = next_start(buffer, whole.start());
        }

        Err(HandlerError::not_found(format_args!("key `{lhs}`")))
    }
}

/// Whether `line_prefix` opens a Ruby comment: a `#` outside any string
/// literal. `#` inside quotes (including `#{}` interpolation) is text.
fn starts_comment(line_prefix: &str) -> bool {
    let mut quote = None;
    let mut chars = line_prefix.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') => return true,
            (None, _) => {}
        }
    }
    false
}
