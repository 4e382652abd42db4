//! # Load Entry Points
//!
//! Construct packages from wherever a descriptor lives: a local file, a
//! URL, a `.zip` bundle, a byte stream, or a string. Every form has a
//! `_with_registry` variant for callers injecting their own registry;
//! the plain forms use the process-wide default.

use std::io::Read;
use std::sync::Arc;

use carton_core::Descriptor;
use carton_schema::{default_registry, Registry};

use crate::archive::{load_archive, ZIP_EXTENSION};
use crate::error::{PackError, PackResult};
use crate::fetch::read_bytes;
use crate::package::Package;
use crate::path::base_path_of;

/// Load a package from a local file path, URL, or `.zip` bundle.
///
/// The package's base path becomes the descriptor's directory (or the
/// archive's extraction directory), so relative resource paths resolve
/// next to the descriptor.
///
/// # Errors
///
/// [`PackError::Fetch`] with the attempted location on I/O failure;
/// [`PackError::Archive`] for a bundle without a descriptor entry; any
/// construction error otherwise.
pub fn load(path: &str) -> PackResult<Package> {
    load_with_registry(path, default_registry()?)
}

/// [`load`] with an injected registry.
pub fn load_with_registry(path: &str, registry: Arc<Registry>) -> PackResult<Package> {
    let contents = read_bytes(path)?;
    if path.ends_with(ZIP_EXTENSION) {
        return load_archive(path, &contents, registry);
    }
    from_bytes(&contents, Some(&base_path_of(path)), registry)
}

/// Load a package descriptor from a byte stream.
pub fn from_reader<R: Read>(reader: R, base_path: Option<&str>) -> PackResult<Package> {
    from_reader_with_registry(reader, base_path, default_registry()?)
}

/// [`from_reader`] with an injected registry.
pub fn from_reader_with_registry<R: Read>(
    mut reader: R,
    base_path: Option<&str>,
    registry: Arc<Registry>,
) -> PackResult<Package> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer).map_err(|e| PackError::Io {
        location: "descriptor stream".to_string(),
        source: e,
    })?;
    from_bytes(&buffer, base_path, registry)
}

/// Load a package descriptor from a JSON string.
pub fn from_string(text: &str, base_path: Option<&str>) -> PackResult<Package> {
    from_string_with_registry(text, base_path, default_registry()?)
}

/// [`from_string`] with an injected registry.
pub fn from_string_with_registry(
    text: &str,
    base_path: Option<&str>,
    registry: Arc<Registry>,
) -> PackResult<Package> {
    from_bytes(text.as_bytes(), base_path, registry)
}

pub(crate) fn from_bytes(
    bytes: &[u8],
    base_path: Option<&str>,
    registry: Arc<Registry>,
) -> PackResult<Package> {
    let descriptor: Descriptor =
        serde_json::from_slice(bytes).map_err(|e| PackError::InvalidDescriptor {
            reason: format!("descriptor is not a JSON object: {e}"),
        })?;
    Package::from_descriptor(&descriptor, base_path, registry)
}
