//! Field paths into JSON documents
//!
//! A [`FieldPath`] locates a value inside a document using a sequence of
//! key and index segments. Two textual forms are supported:
//!
//! | Form | Used by | Example |
//! |------|---------|---------|
//! | Dotted | query predicates | `Address.City`, `Children[0].Grade`, `["first name"]` |
//! | Slash | partition key definitions | `/LastName`, `/address/state` |
//!
//! ```
//! use docstore_core::FieldPath;
//! use serde_json::json;
//!
//! let doc = json!({"Address": {"City": "Seattle"}});
//! let path: FieldPath = "Address.City".parse().unwrap();
//! assert_eq!(path.resolve(&doc), Some(&json!("Seattle")));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A segment in a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Object key: `.foo`
    Key(String),
    /// Array index: `[0]`
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) if is_plain_key(k) => write!(f, ".{}", k),
            PathSegment::Key(k) => write!(f, "[{:?}]", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A path into a JSON document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Create the root path (empty path)
    pub fn root() -> Self {
        FieldPath {
            segments: Vec::new(),
        }
    }

    /// Create a path from a vector of segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        FieldPath { segments }
    }

    /// Get the path segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments in the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if this is the root path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a key segment (builder pattern)
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(key.into()));
        self
    }

    /// Append an index segment (builder pattern)
    pub fn index(mut self, idx: usize) -> Self {
        self.segments.push(PathSegment::Index(idx));
        self
    }

    /// Parse a slash-separated partition key path such as `/address/state`
    ///
    /// Every segment is an object key; empty segments are rejected.
    pub fn parse_slash(s: &str) -> Result<Self, Error> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| Error::invalid_input(format!("path must start with '/': {}", s)))?;
        if rest.is_empty() {
            return Err(Error::invalid_input("path must name at least one field"));
        }
        let mut segments = Vec::new();
        for part in rest.split('/') {
            if part.is_empty() {
                return Err(Error::invalid_input(format!("empty segment in path: {}", s)));
            }
            segments.push(PathSegment::Key(part.to_string()));
        }
        Ok(FieldPath { segments })
    }

    /// Render in slash form (`/a/b`)
    pub fn to_slash_string(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                PathSegment::Key(k) => out.push_str(k),
                PathSegment::Index(i) => out.push_str(&i.to_string()),
            }
        }
        out
    }

    /// Look up the value at this path
    ///
    /// Returns `None` if any segment is missing or traverses the wrong type.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for segment in &self.segments {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(obj)) => obj.get(key)?,
                (PathSegment::Index(idx), Value::Array(arr)) => arr.get(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(is_key_char)
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

impl FromStr for FieldPath {
    type Err = Error;

    /// Parse a dotted path
    ///
    /// Supported syntax:
    /// - `foo` or `.foo` - object key
    /// - `[0]` - array index
    /// - `["foo bar"]` or `['foo bar']` - quoted object key
    /// - `foo.bar[0].baz` - mixed
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        if chars.first() == Some(&'.') {
            i += 1;
        }

        while i < chars.len() {
            if chars[i] == '.' {
                i += 1;
                if i >= chars.len() {
                    return Err(Error::invalid_input(format!("empty key at offset {} in {}", i, s)));
                }
            }

            if chars[i] == '[' {
                let start = i;
                i += 1;
                match chars.get(i) {
                    Some(&quote) if quote == '"' || quote == '\'' => {
                        i += 1;
                        let key_start = i;
                        while i < chars.len() && chars[i] != quote {
                            i += 1;
                        }
                        if i + 1 >= chars.len() || chars[i + 1] != ']' {
                            return Err(Error::invalid_input(format!(
                                "unclosed bracket at offset {} in {}",
                                start, s
                            )));
                        }
                        let key: String = chars[key_start..i].iter().collect();
                        segments.push(PathSegment::Key(key));
                        i += 2;
                    }
                    _ => {
                        let idx_start = i;
                        while i < chars.len() && chars[i] != ']' {
                            i += 1;
                        }
                        if i >= chars.len() {
                            return Err(Error::invalid_input(format!(
                                "unclosed bracket at offset {} in {}",
                                start, s
                            )));
                        }
                        let idx_str: String = chars[idx_start..i].iter().collect();
                        let idx = idx_str.trim().parse::<usize>().map_err(|_| {
                            Error::invalid_input(format!("invalid array index: {}", idx_str))
                        })?;
                        segments.push(PathSegment::Index(idx));
                        i += 1;
                    }
                }
            } else if is_key_char(chars[i]) {
                let key_start = i;
                while i < chars.len() && is_key_char(chars[i]) {
                    i += 1;
                }
                let key: String = chars[key_start..i].iter().collect();
                segments.push(PathSegment::Key(key));
            } else {
                return Err(Error::invalid_input(format!(
                    "unexpected character '{}' at offset {} in {}",
                    chars[i], i, s
                )));
            }
        }

        Ok(FieldPath { segments })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(k) if first && is_plain_key(k) => write!(f, "{}", k)?,
                other => write!(f, "{}", other)?,
            }
            first = false;
        }
        Ok(())
    }
}
