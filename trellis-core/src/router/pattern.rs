//! Route patterns.

use std::fmt;

use smallvec::SmallVec;

use crate::error::{Error, Result};

/// The pattern that matches every path when nothing else does.
pub const WILDCARD: &str = "*";

/// One `/`-separated piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the path segment exactly.
    Literal(String),
    /// Binds the path segment under this name.
    Param(String),
}

/// A parsed route pattern such as `/users/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: SmallVec<[Segment; 4]>,
    wildcard: bool,
}

impl RoutePattern {
    /// Parse a pattern.
    ///
    /// Patterns start with `/`; `:name` segments bind a parameter. The
    /// pattern `*` is the wildcard.
    ///
    /// ```rust
    /// use trellis_core::RoutePattern;
    ///
    /// let pattern = RoutePattern::parse("/users/:id").unwrap();
    /// let params = pattern.matches("/users/42").unwrap();
    /// assert_eq!(params.get("id"), Some("42"));
    /// assert!(pattern.matches("/users/42/edit").is_none());
    /// ```
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidRoute {
            pattern: pattern.to_owned(),
            reason: reason.to_owned(),
        };

        if pattern == WILDCARD {
            return Ok(Self::wildcard());
        }
        if !pattern.starts_with('/') {
            return Err(invalid("must start with `/`"));
        }

        let mut segments: SmallVec<[Segment; 4]> = SmallVec::new();
        for part in pattern.split('/') {
            let segment = match part.strip_prefix(':') {
                Some("") => return Err(invalid("parameter without a name")),
                Some(name) => {
                    let taken = segments
                        .iter()
                        .any(|segment| matches!(segment, Segment::Param(other) if other == name));
                    if taken {
                        return Err(invalid(&format!("parameter `{name}` appears twice")));
                    }
                    Segment::Param(name.to_owned())
                }
                None => Segment::Literal(part.to_owned()),
            };
            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_owned(),
            segments,
            wildcard: false,
        })
    }

    /// The `*` pattern.
    pub fn wildcard() -> Self {
        Self {
            source: WILDCARD.to_owned(),
            segments: SmallVec::new(),
            wildcard: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match a path, returning the bound parameters.
    ///
    /// Path and pattern must have the same number of segments. The wildcard
    /// never matches here; the router consults it only when no other route
    /// does.
    pub fn matches(&self, path: &str) -> Option<Params> {
        if self.wildcard {
            return None;
        }

        let mut params = Params::default();
        let mut parts = path.split('/');
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.0.push((name.clone(), part.to_owned())),
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parameters bound by a matched pattern, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(SmallVec<[(String, String); 4]>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
