//! # Package Error Types
//!
//! [`PackError`] is the top-level error for package construction and
//! mutation. Lower layers keep their own error types; this enum wraps
//! them via `#[from]` so every construction function can propagate with
//! `?` while callers still match on the concrete failure class.

use carton_core::{CloneError, NameError};
use carton_schema::{ConfigurationError, SchemaError, ValidationError};
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::fetch::FetchError;
use crate::path::PathError;

/// Result alias used throughout the crate.
pub type PackResult<T> = Result<T, PackError>;

/// Top-level error for package and resource construction.
#[derive(Error, Debug)]
pub enum PackError {
    /// Caller-supplied data could not be cloned into a descriptor.
    #[error(transparent)]
    Clone(#[from] CloneError),

    /// A resource name is missing or invalid.
    #[error(transparent)]
    Name(#[from] NameError),

    /// The schema registry could not serve the profile.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The descriptor does not conform to its profile.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A resource path is unsafe, mixed, or malformed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// A local or remote fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The archive layer failed or the archive has no descriptor.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A resource must carry exactly one of `path` or `data`.
    #[error("resource {name:?} must have exactly one of `path` or `data` ({found} present)")]
    SourceConflict {
        /// Name of the offending resource.
        name: String,
        /// Which of the two properties were found: `"both"` or `"neither"`.
        found: &'static str,
    },

    /// String-valued inline data carries no content-type hint.
    #[error("resource {name:?} has string data and needs `format` or `mediatype` to disambiguate it")]
    AmbiguousStringData {
        /// Name of the offending resource.
        name: String,
    },

    /// Inline data is not an object, array, or string.
    #[error("resource {name:?} data must be a JSON object, array, or string, got {found}")]
    InvalidData {
        /// Name of the offending resource.
        name: String,
        /// The value shape actually found.
        found: &'static str,
    },

    /// The descriptor is structurally unusable before validation.
    #[error("invalid descriptor: {reason}")]
    InvalidDescriptor {
        /// What was wrong.
        reason: String,
    },

    /// Serializing a descriptor for persistence failed.
    #[error("error serializing descriptor: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A write to the filesystem or an output stream failed.
    #[error("io error at {location}: {source}")]
    Io {
        /// Path or stream the write was attributed to.
        location: String,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },
}

impl From<SchemaError> for PackError {
    fn from(e: SchemaError) -> Self {
        match e {
            SchemaError::Configuration(c) => PackError::Configuration(c),
            SchemaError::Validation(v) => PackError::Validation(v),
        }
    }
}
