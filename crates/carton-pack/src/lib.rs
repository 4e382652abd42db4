//! # carton-pack — Data Package Construction and Persistence
//!
//! A data package is a descriptor document plus the resources it
//! describes. This crate owns the construction pipeline and everything
//! that keeps a built package trustworthy:
//!
//! ```text
//! raw descriptor
//!   └── clone (isolation boundary)
//!         └── default fill (profile, encoding)
//!               └── schema materialization (string refs → documents)
//!                     └── profile validation (carton-schema)
//!                           └── per-resource build (name, source, paths)
//!                                 └── Package { descriptor ∥ resources }
//! ```
//!
//! ## Consistency Invariant
//!
//! The stored descriptor's `resources` array and the built [`Resource`]
//! list never diverge: same count, same order. Every mutating operation
//! rebuilds against an updated descriptor copy and swaps both together,
//! or fails leaving the package exactly as it was.
//!
//! ## Crate Policy
//!
//! - All operations are synchronous and blocking; fetches carry no
//!   retries or timeouts of their own.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod archive;
pub mod error;
pub mod fetch;
pub mod load;
pub mod package;
pub mod path;
pub mod resource;

// Re-export primary types for ergonomic imports.
pub use archive::{ArchiveError, DESCRIPTOR_FILE_NAME, ZIP_EXTENSION};
pub use error::{PackError, PackResult};
pub use fetch::FetchError;
pub use load::{
    from_reader, from_reader_with_registry, from_string, from_string_with_registry, load,
    load_with_registry,
};
pub use package::{Package, DEFAULT_PACKAGE_PROFILE};
pub use path::{base_path_of, join_path, PathError, PathKind};
pub use resource::{Resource, Source, DEFAULT_RESOURCE_ENCODING, DEFAULT_RESOURCE_PROFILE};

// The collaborator types callers hold alongside a package.
pub use carton_core::{Descriptor, ResourceName};
pub use carton_schema::{default_registry, Registry};
