//! # Raw Byte Fetch
//!
//! One helper reads descriptor and resource bytes from either origin:
//! http(s) URLs through a blocking client, everything else through the
//! filesystem. Failures always carry the attempted location.

use thiserror::Error;

/// A local read or remote fetch failed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP GET failed or returned a non-success status.
    #[error("error performing HTTP GET ({url}): {source}")]
    Http {
        /// The URL that was fetched.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Reading a local file failed.
    #[error("error reading local file contents ({path}): {source}")]
    File {
        /// The path that was read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Read the raw bytes at a location, local or remote.
///
/// # Errors
///
/// [`FetchError`] attributing the location and the underlying cause.
pub fn read_bytes(location: &str) -> Result<Vec<u8>, FetchError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        tracing::debug!(url = location, "fetching remote bytes");
        let response = reqwest::blocking::get(location)
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::Http {
                url: location.to_string(),
                source: e,
            })?;
        let bytes = response.bytes().map_err(|e| FetchError::Http {
            url: location.to_string(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    } else {
        std::fs::read(location).map_err(|e| FetchError::File {
            path: location.to_string(),
            source: e,
        })
    }
}
