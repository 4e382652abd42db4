//! # carton-core — Foundational Types for Carton
//!
//! This crate is the bedrock of the carton workspace. It defines the
//! descriptor value tree and the primitives every other crate builds on;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One descriptor representation.** A descriptor is a
//!    `serde_json::Map<String, Value>` with insertion order preserved and
//!    exact number texts retained. There is no parallel struct model that
//!    could drift from the document.
//!
//! 2. **Clone at the ingestion boundary.** Caller-supplied data enters the
//!    system only through [`descriptor::clone_descriptor`], which produces
//!    an owned tree sharing no mutable substructure with the input. A
//!    package can never alias caller state.
//!
//! 3. **Newtype for resource names.** [`ResourceName`] has a validated
//!    constructor; a bare `String` is never trusted as a name.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `carton-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod descriptor;
pub mod error;
pub mod name;

// Re-export primary types for ergonomic imports.
pub use descriptor::{clone_descriptor, clone_value, sort_keys, Descriptor};
pub use error::{CloneError, NameError};
pub use name::ResourceName;
