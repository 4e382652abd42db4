//! # Archive Packager
//!
//! Serializes a package to a zip bundle and loads packages back out of
//! one. The bundle layout is fixed: the descriptor is the first entry,
//! named `datapackage.json`; every other entry is a resource payload at
//! its declared relative path.
//!
//! Writing stages everything through a temporary directory that is
//! removed unconditionally — RAII drop runs on success and on every
//! error path. Loading extracts into a temporary directory that is
//! deliberately kept: the loaded package's base path points into it.

use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use zip::write::SimpleFileOptions;

use carton_schema::Registry;

use crate::error::PackResult;
use crate::fetch::read_bytes;
use crate::load::load_with_registry;
use crate::package::Package;
use crate::path::{classify, join_path, PathKind};

/// Canonical descriptor file name inside a bundle.
pub const DESCRIPTOR_FILE_NAME: &str = "datapackage.json";
/// Extension marking a load path as a bundle.
pub const ZIP_EXTENSION: &str = ".zip";

/// The archive layer failed, or a bundle is missing its descriptor.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The zip container could not be read or written.
    #[error("error processing archive {archive}: {source}")]
    Zip {
        /// The archive path the failure is attributed to.
        archive: String,
        /// Underlying zip-layer error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The bundle has no `datapackage.json` entry.
    #[error("archive {archive} does not contain a file called datapackage.json")]
    MissingDescriptor {
        /// The offending archive path.
        archive: String,
    },

    /// Staging or extraction I/O failed.
    #[error("archive io error at {path}: {source}")]
    Io {
        /// Path the failure is attributed to.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: impl AsRef<Path>, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: path.as_ref().display().to_string(),
        source,
    }
}

impl Package {
    /// Write this package as a zip bundle: the descriptor first, then
    /// every relative resource payload at its declared path.
    ///
    /// Relative entries are resolved against the package base path and
    /// fetched; fully-remote entries stay remote and are not embedded.
    /// The staging directory is removed whether or not writing succeeds.
    ///
    /// # Errors
    ///
    /// [`PackError::Fetch`] for unreadable resource payloads;
    /// [`PackError::Archive`] for staging or zip-layer failures.
    pub fn zip(&self, target: impl AsRef<Path>) -> PackResult<()> {
        let target = target.as_ref();
        let staging = tempfile::tempdir().map_err(|e| io_error("staging directory", e))?;

        let descriptor_path = staging.path().join(DESCRIPTOR_FILE_NAME);
        self.save_descriptor(&descriptor_path)?;
        let mut staged: Vec<(String, PathBuf)> =
            vec![(DESCRIPTOR_FILE_NAME.to_string(), descriptor_path)];

        for resource in self.resources() {
            for entry in resource.paths() {
                if classify(entry)? == PathKind::Remote {
                    tracing::debug!(entry = %entry, "skipping remote entry, stays fetchable by URL");
                    continue;
                }
                let location = join_path(self.base_path().unwrap_or(""), entry);
                let bytes = read_bytes(&location)?;
                let destination = staging.path().join(entry);
                if let Some(parent) = destination.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
                }
                std::fs::write(&destination, bytes).map_err(|e| io_error(&destination, e))?;
                staged.push((entry.clone(), destination));
            }
        }

        write_zip(target, &staged)
    }
}

fn write_zip(target: &Path, entries: &[(String, PathBuf)]) -> PackResult<()> {
    let file = File::create(target).map_err(|e| io_error(target, e))?;
    let mut writer = zip::ZipWriter::new(file);
    for (name, source) in entries {
        writer
            .start_file(name.clone(), SimpleFileOptions::default())
            .map_err(|e| ArchiveError::Zip {
                archive: target.display().to_string(),
                source: e,
            })?;
        let mut reader = File::open(source).map_err(|e| io_error(source, e))?;
        std::io::copy(&mut reader, &mut writer).map_err(|e| io_error(target, e))?;
    }
    writer.finish().map_err(|e| ArchiveError::Zip {
        archive: target.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// Load a package out of fetched bundle bytes: extract into a kept
/// temporary directory and recurse onto the extracted descriptor.
pub(crate) fn load_archive(
    archive_path: &str,
    contents: &[u8],
    registry: Arc<Registry>,
) -> PackResult<Package> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(contents)).map_err(|e| ArchiveError::Zip {
            archive: archive_path.to_string(),
            source: e,
        })?;
    if !archive.file_names().any(|n| n == DESCRIPTOR_FILE_NAME) {
        return Err(ArchiveError::MissingDescriptor {
            archive: archive_path.to_string(),
        }
        .into());
    }

    let extraction = tempfile::tempdir().map_err(|e| io_error("extraction directory", e))?;
    archive
        .extract(extraction.path())
        .map_err(|e| ArchiveError::Zip {
            archive: archive_path.to_string(),
            source: e,
        })?;
    // The package's base path points into the extracted tree, so it must
    // outlive this call.
    let extracted = extraction.keep();
    let descriptor_path = extracted.join(DESCRIPTOR_FILE_NAME);
    load_with_registry(&descriptor_path.display().to_string(), registry)
}
