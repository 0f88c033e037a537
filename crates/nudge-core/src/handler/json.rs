//! JSON (and JSONC) value lookup.
//!
//! Each key path segment has its own pattern. A segment is searched only
//! inside the object its parent opened, and a [`StructureIndex`] built from
//! a single pass over the text checks that each key sits at the nesting
//! depth its position in the path demands. When a branch holds no match the
//! search moves on to the parent's next occurrence.

use std::ops::Range;

use regex::Regex;
use tracing::{debug, trace};

use super::{FormatMatcher, MatchSpan, next_start};
use crate::error::{HandlerError, HandlerResult};
use crate::key_path::KeyPath;

/// Either quote character may delimit a key.
const QUOTE: &str = r#"["']"#;

/// Matcher for `.json` files.
///
/// Same-depth siblings with an identical key are tried in document order;
/// the first one holding the rest of the path wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMatcher;

impl FormatMatcher for JsonMatcher {
    fn resolve(&self, buffer: &str, path: &KeyPath) -> HandlerResult<MatchSpan> {
        let search = Search::new(buffer, path)?;
        search
            .within(0..buffer.len(), 0)
            .ok_or_else(|| HandlerError::not_found(format_args!("key `{path}`")))
    }
}

/// One lookup: the buffer, its structure and a pattern per segment.
struct Search<'a> {
    buffer: &'a str,
    index: StructureIndex,
    /// Intermediate keys followed by the `{` they open.
    parents: Vec<Regex>,
    /// The leaf key followed by a scalar.
    leaf: Regex,
}

impl<'a> Search<'a> {
    fn new(buffer: &'a str, path: &KeyPath) -> HandlerResult<Self> {
        let parents = path
            .parents()
            .iter()
            .map(|segment| {
                let key = regex::escape(segment);
                Regex::new(&format!(r"{QUOTE}(?<key>{key}){QUOTE}\s*:\s*(?<open>\{{)"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let leaf = regex::escape(path.leaf());
        let leaf = Regex::new(&format!(
            r#"{QUOTE}(?<key>{leaf}){QUOTE}\s*:\s*(?:"(?<dq>[^"\n]*)"|'(?<sq>[^'\n]*)'|(?<bare>[^\s,\[\]\{{\}}"'/]+))"#
        ))?;

        Ok(Self {
            buffer,
            index: StructureIndex::scan(buffer),
            parents,
            leaf,
        })
    }

    /// Resolve segment `level` and everything below it inside `scope`.
    fn within(&self, scope: Range<usize>, level: usize) -> Option<MatchSpan> {
        let Some(pattern) = self.parents.get(level) else {
            return self.leaf_within(scope, level);
        };
        let haystack = &self.buffer[..scope.end];

        let mut start = scope.start;
        while start <= haystack.len() {
            let caps = pattern.captures_at(haystack, start)?;
            let key = caps.name("key")?;
            let open = caps.name("open")?.start();
            start = next_start(haystack, key.start());

            if !self.is_key(key.start(), level) || self.index.in_literal(open) {
                continue;
            }
            let close = self.index.closing_brace(open).unwrap_or(self.buffer.len());
            if let Some(span) = self.within(open + 1..close, level + 1) {
                return Some(span);
            }
            trace!(offset = key.start(), level, "json branch holds no match");
        }
        None
    }

    fn leaf_within(&self, scope: Range<usize>, level: usize) -> Option<MatchSpan> {
        let haystack = &self.buffer[..scope.end];

        let mut start = scope.start;
        while start <= haystack.len() {
            let caps = self.leaf.captures_at(haystack, start)?;
            let key = caps.name("key")?;
            if self.is_key(key.start(), level) {
                let value = caps
                    .name("dq")
                    .or_else(|| caps.name("sq"))
                    .or_else(|| caps.name("bare"))?;
                debug!(offset = value.start(), "json value found");
                return Some(MatchSpan {
                    full: caps.get(0)?.range(),
                    value: value.range(),
                });
            }
            trace!(offset = key.start(), "json candidate rejected");
            start = next_start(haystack, key.start());
        }
        None
    }

    /// A real key (not text in a string or comment) at the depth of `level`.
    fn is_key(&self, key_start: usize, level: usize) -> bool {
        key_start.checked_sub(1).is_some_and(|quote| {
            self.index.starts_literal(quote) && self.index.depth_at(quote) == level + 1
        })
    }
}

// ──────────────────────────────────────────────
// Structure index
// ──────────────────────────────────────────────

/// Offsets of structural braces and of every string or comment.
///
/// Braces inside strings and comments are not structural, and keys inside
/// comments must never match, so both are recorded in one pass.
#[derive(Debug, Default)]
struct StructureIndex {
    /// `(offset, depth after the brace)`, in document order.
    braces: Vec<(usize, usize)>,
    /// String literal and comment ranges, in document order.
    literals: Vec<Range<usize>>,
}

impl StructureIndex {
    fn scan(buffer: &str) -> Self {
        let bytes = buffer.as_bytes();
        let mut index = Self::default();
        let mut depth = 0usize;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                quote @ (b'"' | b'\'') => {
                    let start = i;
                    i += 1;
                    while i < bytes.len() {
                        match bytes[i] {
                            b'\\' => i += 2,
                            // unterminated string: stop at the line break
                            b'\n' => break,
                            c if c == quote => {
                                i += 1;
                                break;
                            }
                            _ => i += 1,
                        }
                    }
                    index.literals.push(start..i.min(bytes.len()));
                    continue;
                }
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    let start = i;
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    index.literals.push(start..i);
                    continue;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let start = i;
                    i = buffer[i + 2..]
                        .find("*/")
                        .map_or(bytes.len(), |end| i + 2 + end + 2);
                    index.literals.push(start..i);
                    continue;
                }
                b'{' => {
                    depth += 1;
                    index.braces.push((i, depth));
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    index.braces.push((i, depth));
                }
                _ => {}
            }
            i += 1;
        }

        index
    }

    /// Nesting depth in effect at `pos` (0 outside every object).
    fn depth_at(&self, pos: usize) -> usize {
        let idx = self.braces.partition_point(|&(offset, _)| offset < pos);
        if idx == 0 { 0 } else { self.braces[idx - 1].1 }
    }

    /// Offset of the `}` closing the object opened at `open`.
    fn closing_brace(&self, open: usize) -> Option<usize> {
        let idx = self.braces.partition_point(|&(offset, _)| offset < open);
        let &(_, inner) = self.braces.get(idx)?;
        self.braces[idx + 1..]
            .iter()
            .find(|&&(_, depth)| depth < inner)
            .map(|&(offset, _)| offset)
    }

    fn starts_literal(&self, pos: usize) -> bool {
        self.literals
            .binary_search_by_key(&pos, |range| range.start)
            .is_ok()
    }

    fn in_literal(&self, pos: usize) -> bool {
        let idx = self.literals.partition_point(|range| range.start <= pos);
        idx > 0 && self.literals[idx - 1].contains(&pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "name": "dummy",
  "token": "1.0.0",
  "private": true,
  "description": "Dummy template",
  "main": "lib/main.js",
  "double": {
    "nested": {
      "token": "2.0.0"
    },
  },
  "nested": {
    "token": "3.0.0"
  },
}"#;

    fn get(buffer: &str, key: &str) -> HandlerResult<String> {
        let path = KeyPath::parse(key)?;
        let span = JsonMatcher.resolve(buffer, &path)?;
        Ok(buffer[span.value].to_string())
    }

    fn set(buffer: &str, key: &str, value: &str) -> String {
        let path = KeyPath::parse(key).unwrap();
        let span = JsonMatcher.resolve(buffer, &path).unwrap();
        let mut out = buffer.to_string();
        JsonMatcher.splice_value(&mut out, &span, value);
        out
    }

    #[test]
    fn resolves_same_leaf_at_each_depth() {
        assert_eq!(get(SAMPLE, "token").unwrap(), "1.0.0");
        assert_eq!(get(SAMPLE, "double.nested.token").unwrap(), "2.0.0");
        assert_eq!(get(SAMPLE, "nested.token").unwrap(), "3.0.0");
    }

    #[test]
    fn set_root_token_preserves_the_rest() {
        let out = set(SAMPLE, "token", "1.0.1");
        assert_eq!(out, SAMPLE.replacen(r#""token": "1.0.0""#, r#""token": "1.0.1""#, 1));
    }

    #[test]
    fn set_nested_token_touches_only_that_occurrence() {
        let out = set(SAMPLE, "nested.token", "3.1.0");
        assert_eq!(out, SAMPLE.replacen("3.0.0", "3.1.0", 1));
        assert_eq!(get(&out, "token").unwrap(), "1.0.0");
        assert_eq!(get(&out, "double.nested.token").unwrap(), "2.0.0");
    }

    #[test]
    fn set_double_nested_token() {
        let out = set(SAMPLE, "double.nested.token", "2.0.1");
        assert_eq!(out, SAMPLE.replacen("2.0.0", "2.0.1", 1));
    }

    #[test]
    fn missing_key_is_not_found() {
        assert!(matches!(
            get(SAMPLE, "notFound"),
            Err(HandlerError::NotFound { .. })
        ));
        assert!(matches!(
            get(SAMPLE, "double.token"),
            Err(HandlerError::NotFound { .. })
        ));
    }

    #[test]
    fn object_values_are_not_scalars() {
        assert!(matches!(
            get(SAMPLE, "double"),
            Err(HandlerError::NotFound { .. })
        ));
    }

    #[test]
    fn bare_scalars_stay_bare() {
        assert_eq!(get(SAMPLE, "private").unwrap(), "true");
        let out = set(SAMPLE, "private", "false");
        assert!(out.contains(r#""private": false,"#));
    }

    #[test]
    fn single_quoted_keys_and_values() {
        let text = "{ 'version': '0.1.0' }";
        assert_eq!(get(text, "version").unwrap(), "0.1.0");
        assert_eq!(set(text, "version", "0.2.0"), "{ 'version': '0.2.0' }");
    }

    #[test]
    fn keys_inside_comments_and_strings_are_ignored() {
        let text = r#"{
  // "version": "0.0.0",
  /* "version": "0.0.1" { */
  "note": "\"version\": \"9.9.9\"",
  "version": "1.2.3"
}"#;
        assert_eq!(get(text, "version").unwrap(), "1.2.3");
    }

    #[test]
    fn braces_inside_strings_do_not_shift_depth() {
        let text = r#"{
  "pattern": "{{ not an object",
  "inner": {
    "version": "1.0.0"
  },
  "version": "2.0.0"
}"#;
        assert_eq!(get(text, "version").unwrap(), "2.0.0");
        assert_eq!(get(text, "inner.version").unwrap(), "1.0.0");
    }

    #[test]
    fn next_key_must_be_inside_the_parent_object() {
        let text = r#"{
  "a": {
    "x": "1"
  },
  "b": {
    "token": "2"
  }
}"#;
        assert!(matches!(get(text, "a.token"), Err(HandlerError::NotFound { .. })));
        assert_eq!(get(text, "b.token").unwrap(), "2");
    }

    #[test]
    fn deeper_leaf_in_an_earlier_branch_is_skipped() {
        let text = r#"{ "a": { "b": { "token": "0" }, "token": "1" } }"#;
        assert_eq!(get(text, "a.token").unwrap(), "1");
        assert_eq!(get(text, "a.b.token").unwrap(), "0");
        assert_eq!(set(text, "a.token", "2"), text.replacen(r#""1""#, r#""2""#, 1));
    }

    #[test]
    fn deeper_parent_in_an_earlier_branch_is_skipped() {
        let text = r#"{
  "app": {
    "sidecar": {
      "image": { "tag": "2" }
    },
    "image": { "tag": "3" }
  }
}"#;
        assert_eq!(get(text, "app.image.tag").unwrap(), "3");
        assert_eq!(get(text, "app.sidecar.image.tag").unwrap(), "2");
    }

    #[test]
    fn later_sibling_holding_the_path_is_used() {
        let text = r#"{ "a": { "x": "1" }, "a": { "token": "2" } }"#;
        assert_eq!(get(text, "a.token").unwrap(), "2");
    }

    #[test]
    fn keys_are_matched_literally() {
        let text = r#"{ "a.b": "dotted", "a+": "plus", "ab": "plain" }"#;
        assert_eq!(get(text, "a+").unwrap(), "plus");
        assert!(matches!(get(text, "a*"), Err(HandlerError::NotFound { .. })));
    }

    #[test]
    fn first_same_depth_sibling_wins() {
        let text = r#"{ "version": "1.0.0", "version": "2.0.0" }"#;
        assert_eq!(get(text, "version").unwrap(), "1.0.0");
    }

    #[test]
    fn empty_string_value() {
        let text = r#"{ "version": "" }"#;
        assert_eq!(get(text, "version").unwrap(), "");
        assert_eq!(set(text, "version", "1.0.0"), r#"{ "version": "1.0.0" }"#);
    }

    #[test]
    fn structure_index_tracks_depth() {
        let index = StructureIndex::scan(r#"{ "a": { "b": "}" } }"#);
        assert_eq!(index.depth_at(0), 0);
        assert_eq!(index.depth_at(2), 1);
        assert_eq!(index.depth_at(9), 2);
        assert_eq!(index.braces.len(), 4);
        assert_eq!(index.closing_brace(7), Some(18));
        assert_eq!(index.closing_brace(0), Some(20));
        assert!(index.starts_literal(2));
        assert!(index.in_literal(15));
        assert!(!index.in_literal(7));
    }
}
