//! # Profile Registry and Loader Fallback Chain
//!
//! A registry maps profile identifiers to schema locations. Three loaders
//! produce registries:
//!
//! - [`BundledRegistryLoader`] — the compiled-in profile cache shipped
//!   with this crate.
//! - [`DirRegistryLoader`] — a filesystem directory holding a
//!   `registry.json` bundle plus its schema documents.
//! - [`RemoteRegistryLoader`] — a registry-bundle URL; referenced schemas
//!   are fetched on demand.
//!
//! [`load_registry`] tries loaders in priority order and keeps the first
//! success. Every failure is logged and carried into the final error, so
//! a dead registry source is never silently ignored.
//!
//! ## Validator Cache
//!
//! Compiling a schema is expensive; each `Registry` caches compiled
//! validators per profile behind a lock. The first caller for a profile
//! compiles while later callers block, then share the compiled result.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::validate::{violations_for, ValidationError};

/// Remote registry queried when the bundled cache is not usable.
pub const DEFAULT_REMOTE_REGISTRY_URL: &str = "https://frictionlessdata.io/schemas/registry.json";

/// File name of the registry bundle inside a registry directory.
pub const REGISTRY_FILE_NAME: &str = "registry.json";

const BUNDLED_REGISTRY: &str = include_str!("../profiles/registry.json");

/// Compiled-in profile documents, keyed by their `schema_path`.
const BUNDLED_PROFILES: &[(&str, &str)] = &[
    ("data-package.json", include_str!("../profiles/data-package.json")),
    ("data-resource.json", include_str!("../profiles/data-resource.json")),
    (
        "fiscal-data-package.json",
        include_str!("../profiles/fiscal-data-package.json"),
    ),
    ("table-schema.json", include_str!("../profiles/table-schema.json")),
    (
        "tabular-data-package.json",
        include_str!("../profiles/tabular-data-package.json"),
    ),
    (
        "tabular-data-resource.json",
        include_str!("../profiles/tabular-data-resource.json"),
    ),
];

/// One record of a registry bundle: a known profile and where its schema
/// lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSpec {
    /// Profile identifier (e.g. `data-package`).
    pub id: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Absolute URL of the schema document.
    #[serde(default)]
    pub schema: String,
    /// Bundled-local reference into the registry's document set.
    #[serde(default)]
    pub schema_path: String,
    /// URL of the prose specification.
    #[serde(default)]
    pub specification: String,
}

/// Configuration-class failure: the registry itself, or a profile's
/// schema, could not be made available.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// Every loader in the fallback chain failed.
    #[error("no registry loader succeeded: {summary}")]
    NoRegistryAvailable {
        /// One `loader: cause` clause per attempt, in chain order.
        summary: String,
    },

    /// The profile is not present in the loaded registry.
    #[error("unknown profile '{profile}'")]
    UnknownProfile {
        /// The identifier that failed to resolve.
        profile: String,
    },

    /// A registry bundle or schema document could not be fetched.
    #[error("error fetching {location}: {reason}")]
    Fetch {
        /// Path or URL that was attempted.
        location: String,
        /// Underlying cause.
        reason: String,
    },

    /// A registry payload was not a valid bundle.
    #[error("malformed registry from {source_name}: {reason}")]
    InvalidRegistry {
        /// The loader or location that produced the payload.
        source_name: String,
        /// Parse diagnostic.
        reason: String,
    },

    /// A schema document was fetched but does not compile.
    #[error("schema for profile '{profile}' does not compile: {reason}")]
    SchemaCompile {
        /// The profile whose schema failed.
        profile: String,
        /// Compiler diagnostic.
        reason: String,
    },
}

/// Any failure surfaced by [`Registry::validate`].
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema could not be resolved or compiled.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The descriptor does not conform to the schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A source of registries, tried in order by [`load_registry`].
pub trait RegistryLoader: Send + Sync {
    /// Short description used in logs and the all-loaders-failed error.
    fn describe(&self) -> String;

    /// Produce a registry, or explain why this source is unusable.
    fn load(&self) -> Result<Registry, ConfigurationError>;
}

/// Resolvable collection mapping profile identifiers to schemas.
pub struct Registry {
    /// Known profiles, in bundle order.
    specs: Vec<ProfileSpec>,
    /// Local schema documents, keyed by `schema_path`.
    documents: HashMap<String, Value>,
    /// Compiled validators, keyed by profile id or direct reference.
    validators: Mutex<HashMap<String, Arc<Validator>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("specs", &self.specs)
            .field("documents", &self.documents.keys())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Assemble a registry from parsed specs and local documents.
    pub fn new(specs: Vec<ProfileSpec>, documents: HashMap<String, Value>) -> Self {
        Self {
            specs,
            documents,
            validators: Mutex::new(HashMap::new()),
        }
    }

    /// Identifiers of every known profile, in bundle order.
    pub fn profile_ids(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.id.as_str()).collect()
    }

    /// Look up the record for a profile identifier.
    pub fn spec(&self, profile: &str) -> Option<&ProfileSpec> {
        self.specs.iter().find(|s| s.id == profile)
    }

    /// Resolve a profile to its compiled validator, caching the result.
    ///
    /// Direct references (`http://`, `https://`, `file://`) are fetched
    /// and compiled without consulting the registry table.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::UnknownProfile`] for identifiers absent from
    /// the registry; [`ConfigurationError::Fetch`] /
    /// [`ConfigurationError::SchemaCompile`] when the schema document
    /// cannot be obtained or compiled.
    pub fn validator(&self, profile: &str) -> Result<Arc<Validator>, ConfigurationError> {
        let mut cache = self
            .validators
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(v) = cache.get(profile) {
            return Ok(Arc::clone(v));
        }

        let document = self.resolve_document(profile)?;
        let validator = jsonschema::validator_for(&document).map_err(|e| {
            ConfigurationError::SchemaCompile {
                profile: profile.to_string(),
                reason: e.to_string(),
            }
        })?;
        let validator = Arc::new(validator);
        cache.insert(profile.to_string(), Arc::clone(&validator));
        Ok(validator)
    }

    /// Check a descriptor against a profile.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Configuration`] when the profile cannot be
    /// resolved; [`SchemaError::Validation`] with the ordered violation
    /// list when the descriptor does not conform.
    pub fn validate(&self, descriptor: &Value, profile: &str) -> Result<(), SchemaError> {
        let validator = self.validator(profile)?;
        match violations_for(&validator, descriptor) {
            None => Ok(()),
            Some(violations) => Err(ValidationError {
                profile: profile.to_string(),
                violations,
            }
            .into()),
        }
    }

    /// Obtain the raw schema document for a profile.
    fn resolve_document(&self, profile: &str) -> Result<Value, ConfigurationError> {
        if is_direct_reference(profile) {
            return fetch_schema_document(profile);
        }
        let spec = self
            .spec(profile)
            .ok_or_else(|| ConfigurationError::UnknownProfile {
                profile: profile.to_string(),
            })?;
        if !spec.schema_path.is_empty() {
            if let Some(doc) = self.documents.get(&spec.schema_path) {
                return Ok(doc.clone());
            }
        }
        if spec.schema.starts_with("http://") || spec.schema.starts_with("https://") {
            return fetch_schema_document(&spec.schema);
        }
        Err(ConfigurationError::Fetch {
            location: spec.schema.clone(),
            reason: "registry record carries no usable schema location".to_string(),
        })
    }
}

/// Whether a profile string is a direct schema reference rather than a
/// registry identifier.
fn is_direct_reference(profile: &str) -> bool {
    profile.starts_with("http://")
        || profile.starts_with("https://")
        || profile.starts_with("file://")
}

/// Fetch and parse a schema document from a URL or `file://` reference.
fn fetch_schema_document(location: &str) -> Result<Value, ConfigurationError> {
    tracing::debug!(location, "fetching schema document");
    let text = if let Some(path) = location.strip_prefix("file://") {
        std::fs::read_to_string(path).map_err(|e| ConfigurationError::Fetch {
            location: location.to_string(),
            reason: e.to_string(),
        })?
    } else {
        let response = reqwest::blocking::get(location)
            .and_then(|r| r.error_for_status())
            .map_err(|e| ConfigurationError::Fetch {
                location: location.to_string(),
                reason: e.to_string(),
            })?;
        response.text().map_err(|e| ConfigurationError::Fetch {
            location: location.to_string(),
            reason: e.to_string(),
        })?
    };
    serde_json::from_str(&text).map_err(|e| ConfigurationError::Fetch {
        location: location.to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Parse a registry bundle: a JSON array of [`ProfileSpec`] records.
fn parse_bundle(source_name: &str, text: &str) -> Result<Vec<ProfileSpec>, ConfigurationError> {
    serde_json::from_str(text).map_err(|e| ConfigurationError::InvalidRegistry {
        source_name: source_name.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Loader for the compiled-in profile cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledRegistryLoader;

impl RegistryLoader for BundledRegistryLoader {
    fn describe(&self) -> String {
        "bundled profile cache".to_string()
    }

    fn load(&self) -> Result<Registry, ConfigurationError> {
        let specs = parse_bundle(&self.describe(), BUNDLED_REGISTRY)?;
        let mut documents = HashMap::new();
        for (name, text) in BUNDLED_PROFILES {
            let doc: Value =
                serde_json::from_str(text).map_err(|e| ConfigurationError::InvalidRegistry {
                    source_name: format!("bundled profile {name}"),
                    reason: e.to_string(),
                })?;
            documents.insert((*name).to_string(), doc);
        }
        Ok(Registry::new(specs, documents))
    }
}

/// Loader for a filesystem directory holding `registry.json` plus schema
/// documents.
#[derive(Debug, Clone)]
pub struct DirRegistryLoader {
    dir: PathBuf,
}

impl DirRegistryLoader {
    /// Point the loader at a registry directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl RegistryLoader for DirRegistryLoader {
    fn describe(&self) -> String {
        format!("registry directory {}", self.dir.display())
    }

    fn load(&self) -> Result<Registry, ConfigurationError> {
        let bundle_path = self.dir.join(REGISTRY_FILE_NAME);
        let text =
            std::fs::read_to_string(&bundle_path).map_err(|e| ConfigurationError::Fetch {
                location: bundle_path.display().to_string(),
                reason: e.to_string(),
            })?;
        let specs = parse_bundle(&self.describe(), &text)?;

        let mut documents = HashMap::new();
        let entries = std::fs::read_dir(&self.dir).map_err(|e| ConfigurationError::Fetch {
            location: self.dir.display().to_string(),
            reason: e.to_string(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| ConfigurationError::Fetch {
                location: self.dir.display().to_string(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name == REGISTRY_FILE_NAME || !name.ends_with(".json") {
                continue;
            }
            let content =
                std::fs::read_to_string(&path).map_err(|e| ConfigurationError::Fetch {
                    location: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            let doc: Value = serde_json::from_str(&content).map_err(|e| {
                ConfigurationError::InvalidRegistry {
                    source_name: path.display().to_string(),
                    reason: format!("invalid JSON: {e}"),
                }
            })?;
            documents.insert(name.to_string(), doc);
        }
        Ok(Registry::new(specs, documents))
    }
}

/// Loader for a remote registry bundle. Schemas referenced by the bundle
/// are fetched lazily when their profile is first resolved.
#[derive(Debug, Clone)]
pub struct RemoteRegistryLoader {
    url: String,
}

impl RemoteRegistryLoader {
    /// Point the loader at a registry-bundle URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl RegistryLoader for RemoteRegistryLoader {
    fn describe(&self) -> String {
        format!("remote registry {}", self.url)
    }

    fn load(&self) -> Result<Registry, ConfigurationError> {
        tracing::debug!(url = %self.url, "fetching remote registry bundle");
        let response = reqwest::blocking::get(&self.url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| ConfigurationError::Fetch {
                location: self.url.clone(),
                reason: e.to_string(),
            })?;
        let text = response.text().map_err(|e| ConfigurationError::Fetch {
            location: self.url.clone(),
            reason: e.to_string(),
        })?;
        let specs = parse_bundle(&self.url, &text)?;
        Ok(Registry::new(specs, HashMap::new()))
    }
}

// ---------------------------------------------------------------------------
// Fallback chain & default registry
// ---------------------------------------------------------------------------

/// Try loaders in priority order; the first success wins and later
/// loaders are never consulted.
///
/// # Errors
///
/// [`ConfigurationError::NoRegistryAvailable`] carrying every attempt's
/// failure when the whole chain is exhausted (or empty).
pub fn load_registry(loaders: &[&dyn RegistryLoader]) -> Result<Registry, ConfigurationError> {
    let mut attempts = Vec::new();
    for loader in loaders {
        match loader.load() {
            Ok(registry) => {
                tracing::debug!(loader = %loader.describe(), "registry loaded");
                return Ok(registry);
            }
            Err(e) => {
                tracing::warn!(loader = %loader.describe(), error = %e, "registry loader failed, falling back");
                attempts.push(format!("{}: {}", loader.describe(), e));
            }
        }
    }
    if attempts.is_empty() {
        attempts.push("no loaders configured".to_string());
    }
    Err(ConfigurationError::NoRegistryAvailable {
        summary: attempts.join("; "),
    })
}

/// The default loader chain: bundled cache first, remote registry second.
pub fn default_loaders() -> Vec<Box<dyn RegistryLoader>> {
    vec![
        Box::new(BundledRegistryLoader),
        Box::new(RemoteRegistryLoader::new(DEFAULT_REMOTE_REGISTRY_URL)),
    ]
}

static DEFAULT_REGISTRY: Lazy<Mutex<Option<Arc<Registry>>>> = Lazy::new(|| Mutex::new(None));

/// The process-wide default registry, built from [`default_loaders`] on
/// first use.
///
/// Initialization runs exactly once under concurrent first callers:
/// later callers block on the cell's lock and then share the built
/// registry. Only success is cached — a failed load leaves the cell
/// empty, so the chain is retried on the next call rather than pinning a
/// transient failure for the life of the process.
pub fn default_registry() -> Result<Arc<Registry>, ConfigurationError> {
    let mut slot = DEFAULT_REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(registry) = slot.as_ref() {
        return Ok(Arc::clone(registry));
    }
    let loaders = default_loaders();
    let refs: Vec<&dyn RegistryLoader> = loaders.iter().map(|l| l.as_ref()).collect();
    let registry = Arc::new(load_registry(&refs)?);
    *slot = Some(Arc::clone(&registry));
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const SIMPLE_SCHEMA: &str = r#"{
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["name"]
    }"#;

    fn bundled() -> Registry {
        BundledRegistryLoader.load().unwrap()
    }

    #[test]
    fn test_bundled_registry_has_known_profiles() {
        let registry = bundled();
        for profile in [
            "data-package",
            "data-resource",
            "fiscal-data-package",
            "table-schema",
            "tabular-data-package",
            "tabular-data-resource",
        ] {
            assert!(registry.validator(profile).is_ok(), "cannot resolve {profile}");
        }
    }

    #[test]
    fn test_validate_valid_package_descriptor() {
        let registry = bundled();
        let descriptor = json!({
            "resources": [{"name": "res1", "path": "foo.csv"}],
        });
        registry.validate(&descriptor, "data-package").unwrap();
    }

    #[test]
    fn test_validate_missing_resources_fails() {
        let registry = bundled();
        let err = registry.validate(&json!({}), "data-package").unwrap_err();
        match err {
            SchemaError::Validation(e) => {
                assert!(!e.violations.is_empty());
                assert!(e.to_string().contains("resources"), "got: {e}");
            }
            other => panic!("expected Validation, got: {other}"),
        }
    }

    #[test]
    fn test_validate_empty_resources_fails() {
        let registry = bundled();
        let err = registry
            .validate(&json!({"resources": []}), "data-package")
            .unwrap_err();
        assert!(matches!(err, SchemaError::Validation(_)));
    }

    #[test]
    fn test_unknown_profile() {
        let registry = bundled();
        let err = registry.validator("boo").unwrap_err();
        match err {
            ConfigurationError::UnknownProfile { profile } => assert_eq!(profile, "boo"),
            other => panic!("expected UnknownProfile, got: {other}"),
        }
    }

    #[test]
    fn test_validator_cache_returns_same_instance() {
        let registry = bundled();
        let a = registry.validator("data-package").unwrap();
        let b = registry.validator("data-package").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_direct_url_profile() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/simple.json");
            then.status(200).body(SIMPLE_SCHEMA);
        });
        let registry = bundled();
        let url = server.url("/simple.json");
        registry.validate(&json!({"name": "foo"}), &url).unwrap();
        let err = registry.validate(&json!({}), &url).unwrap_err();
        assert!(matches!(err, SchemaError::Validation(_)));
    }

    #[test]
    fn test_direct_file_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simple.json");
        std::fs::write(&path, SIMPLE_SCHEMA).unwrap();
        let registry = bundled();
        let reference = format!("file://{}", path.display());
        registry.validate(&json!({"name": "foo"}), &reference).unwrap();
    }

    #[test]
    fn test_remote_registry_loader() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/schemas/simple.json");
            then.status(200).body(SIMPLE_SCHEMA);
        });
        let bundle = format!(
            r#"[{{"id": "simple", "schema": "{}"}}]"#,
            server.url("/schemas/simple.json")
        );
        server.mock(|when, then| {
            when.method(GET).path("/registry.json");
            then.status(200).body(bundle.clone());
        });

        let registry = RemoteRegistryLoader::new(server.url("/registry.json"))
            .load()
            .unwrap();
        registry.validate(&json!({"name": "foo"}), "simple").unwrap();
        assert!(matches!(
            registry.validator("missing"),
            Err(ConfigurationError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn test_remote_registry_malformed_bundle() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/registry.json");
            then.status(200).body("123");
        });
        let err = RemoteRegistryLoader::new(server.url("/registry.json"))
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidRegistry { .. }));
    }

    #[test]
    fn test_remote_registry_unreachable() {
        let err = RemoteRegistryLoader::new("http://127.0.0.1:1/registry.json")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Fetch { .. }));
    }

    #[test]
    fn test_dir_registry_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("registry.json"),
            r#"[{"id": "simple", "schema_path": "simple.json"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("simple.json"), SIMPLE_SCHEMA).unwrap();

        let registry = DirRegistryLoader::new(dir.path()).load().unwrap();
        registry.validate(&json!({"name": "foo"}), "simple").unwrap();
    }

    #[test]
    fn test_dir_registry_loader_missing_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirRegistryLoader::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, ConfigurationError::Fetch { .. }));
    }

    /// Loader that always fails, for exercising the fallback chain.
    struct FailingLoader;

    impl RegistryLoader for FailingLoader {
        fn describe(&self) -> String {
            "always-failing loader".to_string()
        }

        fn load(&self) -> Result<Registry, ConfigurationError> {
            Err(ConfigurationError::Fetch {
                location: "nowhere".to_string(),
                reason: "always fails".to_string(),
            })
        }
    }

    /// Loader producing a one-profile registry with a marker id.
    struct MarkerLoader(&'static str);

    impl RegistryLoader for MarkerLoader {
        fn describe(&self) -> String {
            format!("marker loader {}", self.0)
        }

        fn load(&self) -> Result<Registry, ConfigurationError> {
            Ok(Registry::new(
                vec![ProfileSpec {
                    id: self.0.to_string(),
                    title: String::new(),
                    schema: String::new(),
                    schema_path: String::new(),
                    specification: String::new(),
                }],
                HashMap::new(),
            ))
        }
    }

    #[test]
    fn test_fallback_first_failure_falls_through() {
        let registry =
            load_registry(&[&FailingLoader, &BundledRegistryLoader]).unwrap();
        let descriptor = json!({"resources": [{"name": "res1", "path": "foo.csv"}]});
        registry.validate(&descriptor, "data-package").unwrap();
    }

    #[test]
    fn test_fallback_first_success_wins() {
        let registry = load_registry(&[&MarkerLoader("first"), &MarkerLoader("second")]).unwrap();
        assert_eq!(registry.profile_ids(), ["first"]);
    }

    #[test]
    fn test_fallback_all_fail() {
        let err = load_registry(&[&FailingLoader, &FailingLoader]).unwrap_err();
        match err {
            ConfigurationError::NoRegistryAvailable { summary } => {
                assert!(summary.contains("always-failing loader"));
            }
            other => panic!("expected NoRegistryAvailable, got: {other}"),
        }
    }

    #[test]
    fn test_fallback_no_loaders() {
        assert!(matches!(
            load_registry(&[]),
            Err(ConfigurationError::NoRegistryAvailable { .. })
        ));
    }

    #[test]
    fn test_default_registry_is_shared() {
        let a = default_registry().unwrap();
        let b = default_registry().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
