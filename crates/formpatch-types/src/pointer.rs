//! JSON Pointer (RFC 6901) paths.
//!
//! A pointer is kept as a list of unescaped segments. The string form joins
//! the segments with `/`, each one prefixed by `/`, escaping `~` as `~0` and
//! `/` as `~1`. The root pointer is the empty string.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The array segment that addresses the position after the last element.
pub const APPEND_SEGMENT: &str = "-";

/// A location inside a document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// The pointer to the whole document.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a pointer from unescaped segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the string form of a pointer.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let rest = s.strip_prefix('/').ok_or_else(|| TypeError::InvalidPointer {
            pointer: s.to_string(),
            reason: "must be empty or start with '/'".into(),
        })?;
        let segments = rest
            .split('/')
            .map(|raw| unescape(raw, s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// The unescaped segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns `true` for the root pointer.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the root pointer.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment, if any.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Descend in place.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// Ascend in place, returning the removed segment.
    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    /// A new pointer one level deeper.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.push(segment);
        child
    }

    /// A new pointer to an array element.
    pub fn index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    /// A new pointer to the append position of an array.
    pub fn append(&self) -> Self {
        self.child(APPEND_SEGMENT)
    }

    /// Split into the parent pointer and the final segment.
    ///
    /// Returns `None` for the root pointer.
    pub fn split_last(&self) -> Option<(JsonPointer, &str)> {
        let (last, parent) = self.segments.split_last()?;
        Some((
            JsonPointer {
                segments: parent.to_vec(),
            },
            last.as_str(),
        ))
    }

    /// Returns `true` if `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &JsonPointer) -> bool {
        other.segments.starts_with(&self.segments)
    }
}

fn escape(segment: &str) -> Cow<'_, str> {
    if segment.contains(['~', '/']) {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

fn unescape(raw: &str, pointer: &str) -> Result<String, TypeError> {
    if !raw.contains('~') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            other => {
                return Err(TypeError::InvalidPointer {
                    pointer: pointer.to_string(),
                    reason: match other {
                        Some(c) => format!("invalid escape '~{c}'"),
                        None => "dangling '~'".into(),
                    },
                })
            }
        }
    }
    Ok(out)
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", escape(segment))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for JsonPointer {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<JsonPointer> for String {
    fn from(pointer: JsonPointer) -> Self {
        pointer.to_string()
    }
}
