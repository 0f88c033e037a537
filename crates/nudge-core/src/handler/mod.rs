//! Format-preserving reads and writes of a single scalar value.
//!
//! A [`FileHandler`] owns the raw text of one file and never builds a
//! document tree. Lookups go through a [`Matcher`], which locates the byte
//! range of the value for a [`KeyPath`]; writes splice that range and leave
//! every other byte (comments, trailing commas, quoting, key order) alone.
//!
//! # Example
//!
//! ```
//! use nudge_core::handler;
//!
//! let text = "{\n  \"name\": \"demo\", // app\n  \"version\": \"1.0.0\"\n}\n";
//! let mut file = handler::from_content("package.json", text.to_string()).unwrap();
//!
//! assert_eq!(file.get("version").unwrap(), "1.0.0");
//! file.set("version", "1.1.0").unwrap();
//! assert_eq!(
//!     file.content(),
//!     "{\n  \"name\": \"demo\", // app\n  \"version\": \"1.1.0\"\n}\n"
//! );
//! ```

mod factory;
mod json;
mod podspec;
mod yaml;

use std::fmt;
use std::ops::Range;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{HandlerError, HandlerResult};
use crate::key_path::KeyPath;

pub use factory::{from_content, from_path};
pub use json::JsonMatcher;
pub use podspec::PodspecMatcher;
pub use yaml::YamlMatcher;

/// The file formats a handler can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// JSON, including JSONC-style comments and trailing commas.
    Json,
    /// Block-style YAML mappings.
    Yaml,
    /// CocoaPods-style Ruby DSL manifests.
    Podspec,
}

impl FileFormat {
    /// Infer the format from a file name's extension (ASCII case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Utf8Path::new(name).extension()?;
        if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Some(Self::Yaml)
        } else if ext.eq_ignore_ascii_case("podspec") {
            Some(Self::Podspec)
        } else {
            None
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Podspec => write!(f, "podspec"),
        }
    }
}

/// Byte ranges of a resolved key path within the buffer.
///
/// Only valid for the buffer state it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    /// Everything the lookup pattern matched.
    pub full: Range<usize>,
    /// The value alone, without surrounding quotes.
    pub value: Range<usize>,
}

/// Locates values of one format inside raw text.
pub trait FormatMatcher {
    /// Find the occurrence `path` addresses in `buffer`.
    fn resolve(&self, buffer: &str, path: &KeyPath) -> HandlerResult<MatchSpan>;

    /// Replace the value range of `span` with `value`.
    fn splice_value(&self, buffer: &mut String, span: &MatchSpan, value: &str) {
        buffer.replace_range(span.value.clone(), value);
    }
}

/// Tagged dispatch over the three matcher variants.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// See [`JsonMatcher`].
    Json(JsonMatcher),
    /// See [`YamlMatcher`].
    Yaml(YamlMatcher),
    /// See [`PodspecMatcher`].
    Podspec(PodspecMatcher),
}

impl Matcher {
    /// Build the matcher for `format`, scanning `buffer` where the format
    /// needs construction-time state (the podspec block variable).
    pub fn for_format(format: FileFormat, buffer: &str) -> HandlerResult<Self> {
        Ok(match format {
            FileFormat::Json => Self::Json(JsonMatcher),
            FileFormat::Yaml => Self::Yaml(YamlMatcher),
            FileFormat::Podspec => Self::Podspec(PodspecMatcher::discover(buffer)?),
        })
    }

    /// The format this matcher handles.
    pub const fn format(&self) -> FileFormat {
        match self {
            Self::Json(_) => FileFormat::Json,
            Self::Yaml(_) => FileFormat::Yaml,
            Self::Podspec(_) => FileFormat::Podspec,
        }
    }
}

impl FormatMatcher for Matcher {
    fn resolve(&self, buffer: &str, path: &KeyPath) -> HandlerResult<MatchSpan> {
        match self {
            Self::Json(m) => m.resolve(buffer, path),
            Self::Yaml(m) => m.resolve(buffer, path),
            Self::Podspec(m) => m.resolve(buffer, path),
        }
    }

    fn splice_value(&self, buffer: &mut String, span: &MatchSpan, value: &str) {
        match self {
            Self::Json(m) => m.splice_value(buffer, span, value),
            Self::Yaml(m) => m.splice_value(buffer, span, value),
            Self::Podspec(m) => m.splice_value(buffer, span, value),
        }
    }
}

/// Raw file text plus the matcher for its format.
///
/// Not synchronised: `set` takes `&mut self`, so concurrent mutation has to
/// be serialised by the owner.
#[derive(Debug, Clone)]
pub struct FileHandler {
    content: String,
    matcher: Matcher,
}

impl FileHandler {
    /// Wrap `content` with the matcher for `format`.
    ///
    /// Podspec content without a `do |var|` block header is rejected with
    /// [`HandlerError::NotFound`].
    pub fn new(format: FileFormat, content: String) -> HandlerResult<Self> {
        let matcher = Matcher::for_format(format, &content)?;
        Ok(Self { content, matcher })
    }

    /// The format fixed at construction.
    pub const fn format(&self) -> FileFormat {
        self.matcher.format()
    }

    /// The current text, including every edit made so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consume the handler, returning its text.
    pub fn into_content(self) -> String {
        self.content
    }

    /// Read the value at a dotted key path.
    pub fn get(&self, key: &str) -> HandlerResult<String> {
        self.get_path(&KeyPath::parse(key)?)
    }

    /// Read the value at `path`, without surrounding quotes.
    #[instrument(skip(self), fields(format = %self.format(), %path))]
    pub fn get_path(&self, path: &KeyPath) -> HandlerResult<String> {
        let span = self.matcher.resolve(&self.content, path)?;
        let value = self.content[span.value].to_string();
        debug!(%value, "resolved value");
        Ok(value)
    }

    /// Replace the value at a dotted key path.
    pub fn set(&mut self, key: &str, value: &str) -> HandlerResult<()> {
        self.set_path(&KeyPath::parse(key)?, value)
    }

    /// Replace the value at `path`, keeping every other byte as it was.
    ///
    /// The buffer is untouched when this returns an error.
    #[instrument(skip(self), fields(format = %self.format(), %path))]
    pub fn set_path(&mut self, path: &KeyPath, value: &str) -> HandlerResult<()> {
        check_value(value)?;
        let span = self.matcher.resolve(&self.content, path)?;
        debug!(
            previous = &self.content[span.value.clone()],
            offset = span.value.start,
            "splicing value"
        );
        self.matcher.splice_value(&mut self.content, &span, value);
        Ok(())
    }

    /// Write the current text to `path`.
    pub fn save(&self, path: &Utf8Path) -> HandlerResult<()> {
        std::fs::write(path, &self.content).map_err(|source| HandlerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(%path, bytes = self.content.len(), "saved file");
        Ok(())
    }
}

/// Where to resume the candidate search after rejecting one that starts at
/// `at`: one character later, so candidates may overlap.
pub(super) fn next_start(buffer: &str, at: usize) -> usize {
    at + buffer[at..].chars().next().map_or(1, char::len_utf8)
}

/// Reject text that would terminate the scalar it is spliced into.
fn check_value(value: &str) -> HandlerResult<()> {
    let reason = if value.contains(['\n', '\r']) {
        "line breaks are not allowed"
    } else if value.contains(['"', '\'']) {
        "quote characters are not allowed"
    } else {
        return Ok(());
    };
    Err(HandlerError::InvalidValue {
        value: value.to_string(),
        reason,
    })
}
