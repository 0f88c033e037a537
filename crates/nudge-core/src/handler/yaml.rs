//! YAML value lookup for block-style mappings.
//!
//! Works line by line: every key is anchored at a line start, and
//! indentation plays the role braces play for JSON. A segment is searched
//! only inside the block its parent opened, at that block's indentation,
//! and the search backtracks to the parent's next occurrence when a block
//! holds no match.

use std::ops::Range;

use regex::Regex;
use tracing::{debug, trace};

use super::{FormatMatcher, MatchSpan};
use crate::error::{HandlerError, HandlerResult};
use crate::key_path::KeyPath;

const QUOTE: &str = r#"["']"#;

/// Matcher for `.yaml` / `.yml` files.
///
/// Block scalars, flow mappings and sequence items are not addressed, and a
/// leaf's value must sit on the same line as its key.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMatcher;

impl FormatMatcher for YamlMatcher {
    fn resolve(&self, buffer: &str, path: &KeyPath) -> HandlerResult<MatchSpan> {
        let search = Search::new(buffer, path)?;
        search
            .within(0..buffer.len(), 0)
            .ok_or_else(|| HandlerError::not_found(format_args!("key `{path}`")))
    }
}

/// One lookup: the buffer and a pattern per segment.
struct Search<'a> {
    buffer: &'a str,
    /// Intermediate keys with nothing but a comment after the colon.
    parents: Vec<Regex>,
    /// The leaf key followed by a scalar on the same line.
    leaf: Regex,
}

impl<'a> Search<'a> {
    fn new(buffer: &'a str, path: &KeyPath) -> HandlerResult<Self> {
        let parents = path
            .parents()
            .iter()
            .map(|segment| {
                let key = regex::escape(segment);
                Regex::new(&format!(
                    r"(?m)^(?<indent>[ \t]*){QUOTE}?(?<key>{key}){QUOTE}?[ \t]*:(?:[ \t][^\r\n]*)?\r?$"
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // A bare value starts with a visible character, so `key: ` followed
        // by an indented block is a container, not an empty scalar.
        let leaf = regex::escape(path.leaf());
        let leaf = Regex::new(&format!(
            r##"(?m)^(?<indent>[ \t]*){QUOTE}?(?<key>{leaf}){QUOTE}?[ \t]*:[ \t]+(?:"(?<dq>[^"\r\n]*)"|'(?<sq>[^'\r\n]*)'|(?<bare>[^\s'"#][^'"\r\n]*?))[ \t]*(?:[ \t]#[^\r\n]*)?\r?$"##
        ))?;

        Ok(Self {
            buffer,
            parents,
            leaf,
        })
    }

    /// Resolve segment `level` and everything below it inside `scope`,
    /// a run of whole lines.
    fn within(&self, scope: Range<usize>, level: usize) -> Option<MatchSpan> {
        let indent = self.buffer[scope.clone()]
            .lines()
            .find(|line| is_content(line))
            .map(indent_of)?;
        let pattern = self.parents.get(level).unwrap_or(&self.leaf);
        let haystack = &self.buffer[..scope.end];

        let mut start = scope.start;
        while start <= haystack.len() {
            let caps = pattern.captures_at(haystack, start)?;
            let lead = caps.name("indent")?;
            let key = caps.name("key")?;
            start = line_end(haystack, key.end());

            if lead.len() != indent {
                trace!(offset = key.start(), "yaml key at another indentation");
                continue;
            }

            if level == self.parents.len() {
                let value = caps
                    .name("dq")
                    .or_else(|| caps.name("sq"))
                    .or_else(|| caps.name("bare"))?;
                debug!(offset = value.start(), "yaml value found");
                return Some(MatchSpan {
                    full: caps.get(0)?.range(),
                    value: value.range(),
                });
            }

            if let Some(block) = self.child_block(start..scope.end, indent)
                && let Some(span) = self.within(block, level + 1)
            {
                return Some(span);
            }
            trace!(offset = key.start(), level, "yaml branch holds no match");
        }
        None
    }

    /// The lines of `range` indented deeper than `parent_indent`, up to the
    /// first content line shallower than the block's own indentation.
    fn child_block(&self, range: Range<usize>, parent_indent: usize) -> Option<Range<usize>> {
        let mut offset = range.start;
        let mut child_indent = None;

        for line in self.buffer[range.clone()].split_inclusive('\n') {
            if is_content(line) {
                let indent = indent_of(line);
                match child_indent {
                    None if indent > parent_indent => child_indent = Some(indent),
                    None => return None,
                    Some(child) if indent < child => return Some(range.start..offset),
                    Some(_) => {}
                }
            }
            offset += line.len();
        }

        child_indent.map(|_| range)
    }
}

/// Offset just past the `\n` ending the line containing `pos`.
fn line_end(buffer: &str, pos: usize) -> usize {
    buffer[pos..].find('\n').map_or(buffer.len(), |i| pos + i + 1)
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Non-blank and not a comment.
fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}
