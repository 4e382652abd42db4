//! # Resource Model
//!
//! A [`Resource`] is one data unit of a package: a validated descriptor
//! fragment plus the classified source it points at. Resources are built
//! once — at package construction or add/update time — and are otherwise
//! immutable.
//!
//! ## Build Pipeline
//!
//! 1. clone the caller's descriptor (isolation boundary);
//! 2. validate the `name`;
//! 3. fill defaults (profile, encoding) — idempotent;
//! 4. materialize a string-valued `schema` reference into its document;
//! 5. validate against the effective profile's schema;
//! 6. parse exactly one of `path` / `data` into a [`Source`].
//!
//! The `Source` sum type makes "a resource never holds both path and
//! data" impossible to violate after construction.

use serde::Serialize;
use serde_json::Value;

use carton_core::descriptor::{clone_descriptor, str_prop, value_kind};
use carton_core::error::NameError;
use carton_core::{Descriptor, ResourceName};
use carton_schema::{default_registry, Registry};

use crate::error::{PackError, PackResult};
use crate::fetch::read_bytes;
use crate::path::{classify, join_path, parse_paths, PathKind};

/// Descriptor property names.
pub const NAME_PROP: &str = "name";
pub const PATH_PROP: &str = "path";
pub const DATA_PROP: &str = "data";
pub const PROFILE_PROP: &str = "profile";
pub const FORMAT_PROP: &str = "format";
pub const MEDIA_TYPE_PROP: &str = "mediatype";
pub const ENCODING_PROP: &str = "encoding";
pub const SCHEMA_PROP: &str = "schema";

/// Profile a resource descriptor is validated against when it names none.
pub const DEFAULT_RESOURCE_PROFILE: &str = "data-resource";
/// Encoding assumed when the descriptor names none.
pub const DEFAULT_RESOURCE_ENCODING: &str = "utf-8";
/// Profile marking a resource as tabular regardless of format.
pub const TABULAR_RESOURCE_PROFILE: &str = "tabular-data-resource";

/// Formats recognized as tabular.
const TABULAR_FORMATS: &[&str] = &["csv", "tsv", "xls", "xlsx"];

/// Where a resource's bytes live: external paths or an inline value.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Uniformly classified path entries (all relative or all remote).
    Path(Vec<String>),
    /// Inline data value.
    Inline(Value),
}

/// One data unit described within a package.
#[derive(Debug, Clone)]
pub struct Resource {
    descriptor: Descriptor,
    name: ResourceName,
    source: Source,
    base_path: Option<String>,
}

impl Resource {
    /// Build a resource from a descriptor, validating against the given
    /// registry.
    ///
    /// # Errors
    ///
    /// Any [`PackError`] raised by the build pipeline; see the module
    /// docs for the stages.
    pub fn build<T: Serialize + ?Sized>(descriptor: &T, registry: &Registry) -> PackResult<Self> {
        Self::build_with_base_path(descriptor, None, registry)
    }

    /// Build a resource whose relative paths resolve against `base_path`.
    pub fn build_with_base_path<T: Serialize + ?Sized>(
        descriptor: &T,
        base_path: Option<&str>,
        registry: &Registry,
    ) -> PackResult<Self> {
        let cloned = clone_descriptor(descriptor)?;
        Self::build_from_owned(cloned, base_path, registry)
    }

    /// Build a resource using the process-wide default registry.
    pub fn build_with_default_registry<T: Serialize + ?Sized>(descriptor: &T) -> PackResult<Self> {
        let registry = default_registry()?;
        Self::build(descriptor, &registry)
    }

    /// Build a resource from a JSON string descriptor.
    pub fn from_string(text: &str, registry: &Registry) -> PackResult<Self> {
        let descriptor: Descriptor =
            serde_json::from_str(text).map_err(|e| PackError::InvalidDescriptor {
                reason: format!("resource descriptor is not a JSON object: {e}"),
            })?;
        Self::build_from_owned(descriptor, None, registry)
    }

    /// Build from a descriptor already owned by this crate (no ingestion
    /// clone). Package construction uses this for descriptor entries it
    /// has already isolated.
    pub(crate) fn build_from_owned(
        mut descriptor: Descriptor,
        base_path: Option<&str>,
        registry: &Registry,
    ) -> PackResult<Self> {
        let name = match descriptor.get(NAME_PROP) {
            Some(Value::String(n)) => ResourceName::parse(n)?,
            _ => return Err(NameError::Missing.into()),
        };

        fill_resource_defaults(&mut descriptor);
        materialize_schema(&mut descriptor, base_path)?;

        let profile = str_prop(&descriptor, PROFILE_PROP)
            .ok_or_else(|| PackError::InvalidDescriptor {
                reason: "resource profile property must be a string".to_string(),
            })?
            .to_string();
        registry.validate(&Value::Object(descriptor.clone()), &profile)?;

        let path_value = descriptor.get(PATH_PROP).filter(|v| !v.is_null());
        let data_value = descriptor.get(DATA_PROP).filter(|v| !v.is_null());
        let source = match (path_value, data_value) {
            (Some(path), None) => {
                let (entries, _) = parse_paths(path)?;
                Source::Path(entries)
            }
            (None, Some(data)) => Source::Inline(parse_data(data, &descriptor, &name)?),
            (Some(_), Some(_)) => {
                return Err(PackError::SourceConflict {
                    name: name.to_string(),
                    found: "both",
                })
            }
            (None, None) => {
                return Err(PackError::SourceConflict {
                    name: name.to_string(),
                    found: "neither",
                })
            }
        };

        Ok(Self {
            descriptor,
            name,
            source,
            base_path: base_path.map(str::to_string),
        })
    }

    /// The resource name.
    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    /// Deep copy of the descriptor this resource was built from,
    /// defaults and materialized schema included.
    pub fn descriptor(&self) -> Descriptor {
        self.descriptor.clone()
    }

    /// The resource's source.
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Declared path entries; empty for inline resources.
    pub fn paths(&self) -> &[String] {
        match &self.source {
            Source::Path(entries) => entries,
            Source::Inline(_) => &[],
        }
    }

    /// Inline data value, if this resource carries one.
    pub fn data(&self) -> Option<&Value> {
        match &self.source {
            Source::Inline(value) => Some(value),
            Source::Path(_) => None,
        }
    }

    /// Effective profile.
    pub fn profile(&self) -> &str {
        str_prop(&self.descriptor, PROFILE_PROP).unwrap_or(DEFAULT_RESOURCE_PROFILE)
    }

    /// Declared format, if any.
    pub fn format(&self) -> Option<&str> {
        str_prop(&self.descriptor, FORMAT_PROP)
    }

    /// Declared media type, if any.
    pub fn mediatype(&self) -> Option<&str> {
        str_prop(&self.descriptor, MEDIA_TYPE_PROP)
    }

    /// Effective encoding.
    pub fn encoding(&self) -> &str {
        str_prop(&self.descriptor, ENCODING_PROP).unwrap_or(DEFAULT_RESOURCE_ENCODING)
    }

    /// Materialized schema document, if the descriptor declares one.
    pub fn schema(&self) -> Option<&Value> {
        self.descriptor.get(SCHEMA_PROP).filter(|v| !v.is_null())
    }

    /// Base path relative entries resolve against.
    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Whether this resource is row/column structured and may be handed
    /// to a table reader: the effective profile is the tabular-resource
    /// profile, or the format is a recognized tabular format.
    pub fn tabular(&self) -> bool {
        if self.profile() == TABULAR_RESOURCE_PROFILE {
            return true;
        }
        self.format()
            .is_some_and(|f| TABULAR_FORMATS.contains(&f))
    }

    /// Path entries resolved against the base path, ready for a reader.
    /// Remote entries pass through untouched.
    pub fn resolved_paths(&self) -> Vec<String> {
        let base = self.base_path.as_deref().unwrap_or("");
        self.paths()
            .iter()
            .map(|entry| join_path(base, entry))
            .collect()
    }

    /// Replace this resource with one built from `descriptor`.
    ///
    /// The new resource is fully built first; only on success is the old
    /// value swapped out, so a failed update leaves the resource exactly
    /// as it was.
    pub fn update<T: Serialize + ?Sized>(
        &mut self,
        descriptor: &T,
        registry: &Registry,
    ) -> PackResult<()> {
        let fresh = Self::build_with_base_path(descriptor, self.base_path.as_deref(), registry)?;
        *self = fresh;
        Ok(())
    }
}

/// Fill in the default profile and encoding. Applying this twice yields
/// the same descriptor as applying it once.
pub(crate) fn fill_resource_defaults(descriptor: &mut Descriptor) {
    ensure_default(descriptor, PROFILE_PROP, DEFAULT_RESOURCE_PROFILE);
    ensure_default(descriptor, ENCODING_PROP, DEFAULT_RESOURCE_ENCODING);
}

pub(crate) fn ensure_default(descriptor: &mut Descriptor, key: &str, value: &str) {
    let missing = descriptor.get(key).map_or(true, Value::is_null);
    if missing {
        descriptor.insert(key.to_string(), Value::String(value.to_string()));
    }
}

/// Validate inline data: objects and arrays pass as-is; strings need a
/// `format` or `mediatype` to disambiguate their content type.
fn parse_data(data: &Value, descriptor: &Descriptor, name: &ResourceName) -> PackResult<Value> {
    match data {
        Value::String(_) => {
            let has_hint = descriptor.get(FORMAT_PROP).is_some_and(|v| !v.is_null())
                || descriptor.get(MEDIA_TYPE_PROP).is_some_and(|v| !v.is_null());
            if has_hint {
                Ok(data.clone())
            } else {
                Err(PackError::AmbiguousStringData {
                    name: name.to_string(),
                })
            }
        }
        Value::Array(_) | Value::Object(_) => Ok(data.clone()),
        other => Err(PackError::InvalidData {
            name: name.to_string(),
            found: value_kind(other),
        }),
    }
}

/// If the descriptor's `schema` property is a string, resolve it like a
/// path entry (relative against the base path, or a remote fetch), parse
/// the document, and replace the string in place.
pub(crate) fn materialize_schema(
    descriptor: &mut Descriptor,
    base_path: Option<&str>,
) -> PackResult<()> {
    let reference = match descriptor.get(SCHEMA_PROP) {
        Some(Value::String(s)) => s.clone(),
        _ => return Ok(()),
    };
    let document = load_schema_document(&reference, base_path)?;
    descriptor.insert(SCHEMA_PROP.to_string(), document);
    Ok(())
}

fn load_schema_document(reference: &str, base_path: Option<&str>) -> PackResult<Value> {
    let location = match classify(reference)? {
        PathKind::Remote => reference.to_string(),
        PathKind::Relative => join_path(base_path.unwrap_or(""), reference),
    };
    let bytes = read_bytes(&location)?;
    serde_json::from_slice(&bytes).map_err(|e| PackError::InvalidDescriptor {
        reason: format!("schema document at {location} is not valid JSON: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use carton_schema::BundledRegistryLoader;
    use carton_schema::RegistryLoader;
    use httpmock::prelude::*;
    use serde_json::json;

    fn registry() -> Registry {
        BundledRegistryLoader.load().unwrap()
    }

    #[test]
    fn test_build_fills_defaults() {
        let reg = registry();
        let r = Resource::build(&json!({"name": "res1", "path": "foo.csv"}), &reg).unwrap();
        assert_eq!(r.name(), &"res1");
        assert_eq!(r.profile(), "data-resource");
        assert_eq!(r.encoding(), "utf-8");
        assert_eq!(r.paths(), ["foo.csv"]);
        let d = r.descriptor();
        assert_eq!(d["profile"], json!("data-resource"));
        assert_eq!(d["encoding"], json!("utf-8"));
    }

    #[test]
    fn test_defaults_do_not_override_declared_values() {
        let reg = registry();
        let r = Resource::build(
            &json!({"name": "res1", "path": "foo.csv", "encoding": "latin-1", "profile": "tabular-data-resource"}),
            &reg,
        )
        .unwrap();
        assert_eq!(r.encoding(), "latin-1");
        assert_eq!(r.profile(), "tabular-data-resource");
    }

    #[test]
    fn test_defaulting_is_idempotent() {
        let mut d = clone_descriptor(&json!({"name": "res1"})).unwrap();
        fill_resource_defaults(&mut d);
        let once = d.clone();
        fill_resource_defaults(&mut d);
        assert_eq!(d, once);
    }

    #[test]
    fn test_missing_name() {
        let reg = registry();
        let err = Resource::build(&json!({"path": "foo.csv"}), &reg).unwrap_err();
        assert!(matches!(err, PackError::Name(NameError::Missing)));
    }

    #[test]
    fn test_invalid_name_pattern() {
        let reg = registry();
        let err = Resource::build(&json!({"name": "Res One", "path": "foo.csv"}), &reg).unwrap_err();
        assert!(matches!(err, PackError::Name(NameError::InvalidName { .. })));
    }

    #[test]
    fn test_neither_path_nor_data() {
        let reg = registry();
        let err = Resource::build(&json!({"name": "res1"}), &reg).unwrap_err();
        match err {
            PackError::SourceConflict { found, .. } => assert_eq!(found, "neither"),
            other => panic!("expected SourceConflict, got: {other}"),
        }
    }

    #[test]
    fn test_both_path_and_data() {
        let reg = registry();
        let err = Resource::build(
            &json!({"name": "res1", "path": "foo.csv", "data": {"a": 1}}),
            &reg,
        )
        .unwrap_err();
        match err {
            PackError::SourceConflict { found, .. } => assert_eq!(found, "both"),
            other => panic!("expected SourceConflict, got: {other}"),
        }
    }

    #[test]
    fn test_inline_object_and_array_data() {
        let reg = registry();
        let r = Resource::build(&json!({"name": "res1", "data": {"a": 1}}), &reg).unwrap();
        assert_eq!(r.data(), Some(&json!({"a": 1})));
        assert!(r.paths().is_empty());

        let r = Resource::build(&json!({"name": "res1", "data": [["a"], [1]]}), &reg).unwrap();
        assert_eq!(r.data(), Some(&json!([["a"], [1]])));
    }

    #[test]
    fn test_string_data_needs_hint() {
        let reg = registry();
        let err = Resource::build(&json!({"name": "res1", "data": "a,b\n1,2"}), &reg).unwrap_err();
        assert!(matches!(err, PackError::AmbiguousStringData { .. }));

        let r = Resource::build(
            &json!({"name": "res1", "data": "a,b\n1,2", "format": "csv"}),
            &reg,
        )
        .unwrap();
        assert_eq!(r.data(), Some(&json!("a,b\n1,2")));

        let r = Resource::build(
            &json!({"name": "res1", "data": "a,b\n1,2", "mediatype": "text/csv"}),
            &reg,
        )
        .unwrap();
        assert!(r.data().is_some());
    }

    #[test]
    fn test_numeric_data_rejected() {
        let reg = registry();
        let err = Resource::build(&json!({"name": "res1", "data": 10}), &reg).unwrap_err();
        assert!(matches!(err, PackError::InvalidData { found: "number", .. }));
    }

    #[test]
    fn test_path_rules_surface() {
        let reg = registry();
        let err =
            Resource::build(&json!({"name": "res1", "path": "/abs.csv"}), &reg).unwrap_err();
        assert!(matches!(err, PackError::Path(_)));

        let err = Resource::build(
            &json!({"name": "res1", "path": ["a.csv", "http://h/b.csv"]}),
            &reg,
        )
        .unwrap_err();
        assert!(matches!(err, PackError::Path(_)));
    }

    #[test]
    fn test_tabular_by_profile_and_format() {
        let reg = registry();
        let by_profile = Resource::build(
            &json!({"name": "res1", "path": "foo.dat", "profile": "tabular-data-resource"}),
            &reg,
        )
        .unwrap();
        assert!(by_profile.tabular());

        let by_format = Resource::build(
            &json!({"name": "res1", "path": "foo.dat", "format": "csv"}),
            &reg,
        )
        .unwrap();
        assert!(by_format.tabular());

        let neither = Resource::build(
            &json!({"name": "res1", "path": "foo.json", "format": "json"}),
            &reg,
        )
        .unwrap();
        assert!(!neither.tabular());
    }

    #[test]
    fn test_resolved_paths_join_base() {
        let reg = registry();
        let r = Resource::build_with_base_path(
            &json!({"name": "res1", "path": "sub/foo.csv"}),
            Some("/tmp/pkg"),
            &reg,
        )
        .unwrap();
        assert_eq!(r.resolved_paths(), ["/tmp/pkg/sub/foo.csv"]);
    }

    #[test]
    fn test_schema_materialized_from_local_file() {
        let reg = registry();
        let dir = tempfile::tempdir().unwrap();
        let schema = json!({"fields": [{"name": "name", "type": "string"}]});
        std::fs::write(
            dir.path().join("schema.json"),
            serde_json::to_vec(&schema).unwrap(),
        )
        .unwrap();

        let base = dir.path().display().to_string();
        let r = Resource::build_with_base_path(
            &json!({"name": "res1", "path": "foo.csv", "schema": "schema.json"}),
            Some(base.as_str()),
            &reg,
        )
        .unwrap();
        assert_eq!(r.schema(), Some(&schema));
        // The stored descriptor carries the document, not the reference.
        assert_eq!(r.descriptor()["schema"], schema);
    }

    #[test]
    fn test_schema_materialized_from_remote() {
        let reg = registry();
        let server = MockServer::start();
        let schema = json!({"fields": [{"name": "id", "type": "integer"}]});
        server.mock(|when, then| {
            when.method(GET).path("/schema.json");
            then.status(200).json_body(schema.clone());
        });

        let r = Resource::build(
            &json!({"name": "res1", "path": "foo.csv", "schema": server.url("/schema.json")}),
            &reg,
        )
        .unwrap();
        assert_eq!(r.schema(), Some(&schema));
    }

    #[test]
    fn test_inline_schema_object_untouched() {
        let reg = registry();
        let schema = json!({"fields": [{"name": "n"}]});
        let r = Resource::build(
            &json!({"name": "res1", "path": "foo.csv", "schema": schema}),
            &reg,
        )
        .unwrap();
        assert_eq!(r.schema(), Some(&schema));
    }

    #[test]
    fn test_update_swaps_whole_value() {
        let reg = registry();
        let mut r = Resource::build(&json!({"name": "res1", "path": "foo.csv"}), &reg).unwrap();
        r.update(&json!({"name": "res2", "path": "bar.csv"}), &reg).unwrap();
        assert_eq!(r.name(), &"res2");
        assert_eq!(r.paths(), ["bar.csv"]);
    }

    #[test]
    fn test_failed_update_leaves_resource_intact() {
        let reg = registry();
        let mut r = Resource::build(&json!({"name": "res1", "path": "foo.csv"}), &reg).unwrap();
        let err = r.update(&json!({"name": "res2"}), &reg).unwrap_err();
        assert!(matches!(err, PackError::SourceConflict { .. }));
        assert_eq!(r.name(), &"res1");
        assert_eq!(r.paths(), ["foo.csv"]);
    }

    #[test]
    fn test_from_string() {
        let reg = registry();
        let r = Resource::from_string(r#"{"name": "res1", "path": "foo.csv"}"#, &reg).unwrap();
        assert_eq!(r.name(), &"res1");
    }
}
