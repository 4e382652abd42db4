//! # Structured Violation Reporting
//!
//! Maps the `jsonschema` crate's validation errors into an ordered,
//! field-addressed violation list. A descriptor either conforms to its
//! profile or fails with every violation attributed to an instance path
//! and the schema path that triggered it.

use std::fmt;

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

/// A single validation violation with structured context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the descriptor.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Ordered collection of validation violations.
#[derive(Debug, Clone)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations, in schema-evaluation order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A descriptor did not conform to its profile's schema.
#[derive(Error, Debug)]
#[error("descriptor failed validation against profile '{profile}':\n{violations}")]
pub struct ValidationError {
    /// The profile the descriptor was validated against.
    pub profile: String,
    /// Structured list of individual violations.
    pub violations: ValidationViolations,
}

/// Run a compiled validator over a descriptor, collecting every violation.
///
/// Returns `None` when the descriptor conforms.
pub(crate) fn violations_for(validator: &Validator, instance: &Value) -> Option<ValidationViolations> {
    let violations: Vec<Violation> = validator
        .iter_errors(instance)
        .map(|e| Violation {
            instance_path: e.instance_path.to_string(),
            schema_path: e.schema_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        None
    } else {
        Some(ValidationViolations { violations })
    }
}
