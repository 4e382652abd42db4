//! # Core Error Types
//!
//! Errors raised at the descriptor ingestion boundary. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// Error while deep-copying caller-supplied data into a descriptor tree.
///
/// The clone path is a conservative whitelist: only null, bool, number,
/// string, sequence, and string-keyed mapping shapes are representable.
/// Anything else is rejected rather than aliased or lossily converted.
#[derive(Error, Debug)]
pub enum CloneError {
    /// The root of a descriptor must be a JSON object.
    #[error("descriptor must be a JSON object, got {kind}")]
    NotAnObject {
        /// The value shape actually found at the root.
        kind: &'static str,
    },

    /// The value tree contains a shape outside the supported grammar
    /// (map keys with no string form, non-finite floats, opaque types).
    #[error("unsupported value shape in descriptor tree: {reason}")]
    UnsupportedShape {
        /// Serializer diagnostic naming the offending shape.
        reason: String,
    },
}

/// Error validating a resource name.
#[derive(Error, Debug)]
pub enum NameError {
    /// The `name` property is absent or not a string.
    #[error("resource descriptor is missing a string `name` property")]
    Missing,

    /// The name does not match the accepted pattern.
    #[error("invalid resource name {name:?}: must match {pattern}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// The pattern names must match.
        pattern: &'static str,
    },
}
