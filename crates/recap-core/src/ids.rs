//! Subject identifier newtype.
//!
//! A [`SubjectId`] is the fixed-length video token carried in a page URL.
//! It is the unit of deduplication and the cache key for stored artifacts,
//! so construction validates the shape once and everything downstream can
//! compare identifiers by value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Length of every subject identifier.
pub const SUBJECT_ID_LEN: usize = 11;

/// Error returned when a string is not a well-formed subject identifier.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid subject id {value:?}: {reason}")]
pub struct InvalidSubjectId {
    /// The rejected input.
    pub value: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

/// Canonical identifier of the video addressed by a page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    /// Validate and wrap an identifier.
    pub fn parse(value: impl Into<String>) -> Result<Self, InvalidSubjectId> {
        let value = value.into();
        if value.chars().count() != SUBJECT_ID_LEN {
            return Err(InvalidSubjectId {
                value,
                reason: "must be exactly 11 characters",
            });
        }
        if value.chars().any(is_forbidden) {
            return Err(InvalidSubjectId {
                value,
                reason: "contains a URL delimiter or whitespace",
            });
        }
        Ok(Self(value))
    }

    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Characters that terminate an identifier inside a URL.
pub(crate) fn is_forbidden(c: char) -> bool {
    matches!(c, '"' | '&' | '?' | '/') || c.is_whitespace()
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SubjectId {
    type Err = InvalidSubjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = InvalidSubjectId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SubjectId> for String {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
