//! # Resource Name Newtype
//!
//! Resource names are identifiers: they key lookups inside a package and
//! become relative paths inside archives. A bare `String` is never
//! trusted as a name — the only constructor validates against the
//! accepted pattern.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::NameError;

/// Pattern a resource name must match in full.
pub const NAME_PATTERN: &str = "^[a-z0-9._-]+$";

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    // The pattern is a compile-time constant; an invalid literal here is a
    // programming error caught by the tests below.
    Regex::new(NAME_PATTERN).expect("NAME_PATTERN must compile")
});

/// A validated resource name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    /// Validate and wrap a name.
    ///
    /// # Errors
    ///
    /// [`NameError::InvalidName`] if the name does not match
    /// [`NAME_PATTERN`] in full.
    pub fn parse(name: &str) -> Result<Self, NameError> {
        if NAME_RE.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(NameError::InvalidName {
                name: name.to_string(),
                pattern: NAME_PATTERN,
            })
        }
    }

    /// Access the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ResourceName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ResourceName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
