//! # Path Classification and Base-Path Resolution
//!
//! Resource locations come in exactly two shapes: relative-safe paths
//! resolved against the package's base, and fully qualified http(s)
//! URLs. Everything else — absolute paths, parent-escaping paths, other
//! schemes — is rejected outright, and one resource never mixes the two
//! shapes.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use url::Url;

use carton_core::descriptor::value_kind;

/// Classification of a single path entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Relative to the package base; stays inside it.
    Relative,
    /// Fully qualified http(s) URL.
    Remote,
}

/// A resource path violates the path rules.
#[derive(Error, Debug)]
pub enum PathError {
    /// `path` must be a string or an array of strings.
    #[error("path must be a string or a non-empty array of strings, got {found}")]
    Malformed {
        /// The value shape actually found.
        found: String,
    },

    /// Absolute and parent-escaping paths are never allowed.
    #[error("absolute paths and parent-directory paths are not allowed: {path:?}")]
    UnsafePath {
        /// The rejected entry.
        path: String,
    },

    /// URLs must use the http or https scheme.
    #[error("URL paths must use the http or https scheme, got {scheme:?} in {path:?}")]
    UnsupportedScheme {
        /// The rejected entry.
        path: String,
        /// The scheme it carried.
        scheme: String,
    },

    /// One resource cannot mix URLs and relative paths.
    #[error("mixing fully qualified URLs and relative paths in a single resource is not allowed")]
    MixedPathTypes,
}

/// Classify one path entry.
///
/// # Errors
///
/// [`PathError::UnsafePath`] for absolute or parent-escaping entries;
/// [`PathError::UnsupportedScheme`] for non-http(s) URLs.
pub fn classify(entry: &str) -> Result<PathKind, PathError> {
    match Url::parse(entry) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(PathKind::Remote),
            scheme => Err(PathError::UnsupportedScheme {
                path: entry.to_string(),
                scheme: scheme.to_string(),
            }),
        },
        Err(_) => {
            if entry.starts_with('/') || escapes_parent(entry) {
                Err(PathError::UnsafePath {
                    path: entry.to_string(),
                })
            } else {
                Ok(PathKind::Relative)
            }
        }
    }
}

/// Whether a relative path walks above its base at any point.
fn escapes_parent(entry: &str) -> bool {
    let mut depth: i32 = 0;
    for segment in entry.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => depth += 1,
        }
    }
    false
}

/// Parse and validate a descriptor's `path` property.
///
/// Accepts a single string or a non-empty array of strings. Every entry
/// is classified and all entries must share one classification.
///
/// # Errors
///
/// [`PathError::Malformed`] for other value shapes;
/// [`PathError::MixedPathTypes`] when classifications differ; the
/// per-entry errors of [`classify`] otherwise.
pub fn parse_paths(value: &Value) -> Result<(Vec<String>, PathKind), PathError> {
    let entries: Vec<String> = match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => {
            if items.is_empty() {
                return Err(PathError::Malformed {
                    found: "empty array".to_string(),
                });
            }
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    other => {
                        return Err(PathError::Malformed {
                            found: format!("array containing {}", value_kind(other)),
                        })
                    }
                }
            }
            out
        }
        other => {
            return Err(PathError::Malformed {
                found: value_kind(other).to_string(),
            })
        }
    };

    let mut kind = None;
    for entry in &entries {
        let current = classify(entry)?;
        match kind {
            None => kind = Some(current),
            Some(k) if k != current => return Err(PathError::MixedPathTypes),
            Some(_) => {}
        }
    }
    // entries is non-empty here, so kind is always set.
    let kind = kind.unwrap_or(PathKind::Relative);
    Ok((entries, kind))
}

/// Parse a string as a remote URL (scheme plus host); `None` for
/// everything local.
fn parse_remote(s: &str) -> Option<Url> {
    let url = Url::parse(s).ok()?;
    if url.host_str().is_some_and(|h| !h.is_empty()) {
        Some(url)
    } else {
        None
    }
}

/// Derive a package base path from the location its descriptor was
/// loaded from: the URL's directory for remote origins (trailing slash
/// normalized), the containing directory for local ones.
pub fn base_path_of(origin: &str) -> String {
    if let Some(url) = parse_remote(origin) {
        // Joining "." against a URL resolves to its directory.
        match url.join(".") {
            Ok(dir) => dir.to_string(),
            Err(_) => origin.to_string(),
        }
    } else {
        match Path::new(origin).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.display().to_string(),
            _ => ".".to_string(),
        }
    }
}

/// Resolve a path entry against a base path. Remote entries pass through
/// untouched; relative entries join the base with URL semantics for
/// remote bases and filesystem semantics for local ones.
pub fn join_path(base: &str, entry: &str) -> String {
    if base.is_empty() || parse_remote(entry).is_some() {
        return entry.to_string();
    }
    if let Some(base_url) = parse_remote(base) {
        let mut normalized = base_url.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        match Url::parse(&normalized).and_then(|u| u.join(entry)) {
            Ok(joined) => joined.to_string(),
            Err(_) => format!("{normalized}{entry}"),
        }
    } else {
        Path::new(base).join(entry).display().to_string()
    }
}
