//! # Package Model
//!
//! A [`Package`] owns a validated package descriptor and the [`Resource`]
//! objects built from it, kept in lockstep: the descriptor's `resources`
//! array and the resource list always have the same count and order.
//!
//! ## Transactional Mutation
//!
//! `add_resource`, `remove_resource`, and `update` each build the
//! complete replacement state first — cloned descriptor, every resource
//! rebuilt — and only then swap it in. The exclusive `&mut self` borrow
//! makes the swap atomic to every observer: a failed mutation leaves the
//! package byte-for-byte as it was.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use carton_core::descriptor::{array_prop, clone_descriptor, sort_keys, str_prop, value_kind};
use carton_core::Descriptor;
use carton_schema::Registry;

use crate::error::{PackError, PackResult};
use crate::resource::{
    ensure_default, fill_resource_defaults, materialize_schema, Resource, NAME_PROP, PROFILE_PROP,
};

/// Descriptor property holding the resource array.
pub const RESOURCES_PROP: &str = "resources";
/// Profile a package descriptor is validated against when it names none.
pub const DEFAULT_PACKAGE_PROFILE: &str = "data-package";

/// A built data package: descriptor plus resources, in lockstep.
#[derive(Debug, Clone)]
pub struct Package {
    descriptor: Descriptor,
    resources: Vec<Resource>,
    base_path: Option<String>,
    registry: Arc<Registry>,
}

impl Package {
    /// Run the full construction pipeline over a caller descriptor.
    ///
    /// # Errors
    ///
    /// Any [`PackError`] from cloning, validation, or resource building;
    /// on error nothing is constructed.
    pub fn from_descriptor<T: Serialize + ?Sized>(
        descriptor: &T,
        base_path: Option<&str>,
        registry: Arc<Registry>,
    ) -> PackResult<Self> {
        let mut cloned = clone_descriptor(descriptor)?;
        fill_package_defaults(&mut cloned);
        materialize_package_schemas(&mut cloned, base_path)?;

        let profile = str_prop(&cloned, PROFILE_PROP)
            .ok_or_else(|| PackError::InvalidDescriptor {
                reason: "package profile property must be a string".to_string(),
            })?
            .to_string();
        registry.validate(&Value::Object(cloned.clone()), &profile)?;

        let entries = array_prop(&cloned, RESOURCES_PROP).ok_or_else(|| {
            PackError::InvalidDescriptor {
                reason: format!(
                    "resources property must be an array, got {}",
                    cloned.get(RESOURCES_PROP).map_or("nothing", value_kind)
                ),
            }
        })?;
        let resources = build_resources(entries, base_path, &registry)?;

        Ok(Self {
            descriptor: cloned,
            resources,
            base_path: base_path.map(str::to_string),
            registry,
        })
    }

    /// Construct using the process-wide default registry.
    pub fn new<T: Serialize + ?Sized>(
        descriptor: &T,
        base_path: Option<&str>,
    ) -> PackResult<Self> {
        let registry = carton_schema::default_registry()?;
        Self::from_descriptor(descriptor, base_path, registry)
    }

    /// The resource with the given name, if any (first match, insertion
    /// order).
    pub fn get_resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name() == name)
    }

    /// Resource names in insertion order.
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name().as_str()).collect()
    }

    /// The built resources, in descriptor order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Deep copy of the package descriptor, defaults included.
    pub fn descriptor(&self) -> Descriptor {
        self.descriptor.clone()
    }

    /// Effective package profile.
    pub fn profile(&self) -> &str {
        str_prop(&self.descriptor, PROFILE_PROP).unwrap_or(DEFAULT_PACKAGE_PROFILE)
    }

    /// Base path relative resource entries resolve against.
    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// The registry this package validates against.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Append a resource, rebuilding the whole resource list from the
    /// updated descriptor and swapping both in together.
    ///
    /// # Errors
    ///
    /// Any build failure aborts with no mutation.
    pub fn add_resource<T: Serialize + ?Sized>(&mut self, descriptor: &T) -> PackResult<()> {
        let mut entry = clone_descriptor(descriptor)?;
        fill_resource_defaults(&mut entry);
        materialize_schema(&mut entry, self.base_path.as_deref())?;

        let mut updated = self.resource_entries()?.to_vec();
        updated.push(Value::Object(entry));
        let rebuilt = build_resources(&updated, self.base_path.as_deref(), &self.registry)?;

        self.descriptor
            .insert(RESOURCES_PROP.to_string(), Value::Array(updated));
        self.resources = rebuilt;
        Ok(())
    }

    /// Remove the named resource: exactly the first descriptor entry with
    /// that name, preserving the order of the rest. Returns `Ok(false)`
    /// (a no-op) when no resource has the name.
    ///
    /// # Errors
    ///
    /// Any rebuild failure aborts with no mutation.
    pub fn remove_resource(&mut self, name: &str) -> PackResult<bool> {
        let entries = self.resource_entries()?;
        let index = entries.iter().position(|entry| {
            entry
                .as_object()
                .and_then(|m| str_prop(m, NAME_PROP))
                .is_some_and(|n| n == name)
        });
        let Some(index) = index else {
            return Ok(false);
        };

        let mut updated = entries.to_vec();
        updated.remove(index);
        let rebuilt = build_resources(&updated, self.base_path.as_deref(), &self.registry)?;

        self.descriptor
            .insert(RESOURCES_PROP.to_string(), Value::Array(updated));
        self.resources = rebuilt;
        Ok(true)
    }

    /// Replace the package with one built from `descriptor`.
    ///
    /// The replacement runs the full construction pipeline into a fresh
    /// value; only on full success does it take the live package's
    /// place, as one unit. Observers never see mismatched
    /// descriptor/resource state.
    pub fn update<T: Serialize + ?Sized>(&mut self, descriptor: &T) -> PackResult<()> {
        let fresh = Self::from_descriptor(
            descriptor,
            self.base_path.as_deref(),
            Arc::clone(&self.registry),
        )?;
        *self = fresh;
        Ok(())
    }

    /// Serialize the descriptor pretty-printed with recursively sorted
    /// keys, so identical logical descriptors produce identical bytes.
    pub fn descriptor_string(&self) -> PackResult<String> {
        let sorted = sort_keys(Value::Object(self.descriptor.clone()));
        Ok(serde_json::to_string_pretty(&sorted)?)
    }

    /// Write the descriptor to an output stream.
    pub fn write_descriptor<W: Write>(&self, mut writer: W) -> PackResult<()> {
        let text = self.descriptor_string()?;
        writer
            .write_all(text.as_bytes())
            .map_err(|e| PackError::Io {
                location: "descriptor stream".to_string(),
                source: e,
            })
    }

    /// Save the descriptor to a file, truncating any existing content.
    pub fn save_descriptor(&self, path: impl AsRef<Path>) -> PackResult<()> {
        let path = path.as_ref();
        let text = self.descriptor_string()?;
        std::fs::write(path, text).map_err(|e| PackError::Io {
            location: path.display().to_string(),
            source: e,
        })
    }

    fn resource_entries(&self) -> PackResult<&[Value]> {
        array_prop(&self.descriptor, RESOURCES_PROP)
            .map(Vec::as_slice)
            .ok_or_else(|| PackError::InvalidDescriptor {
                reason: "resources property must be an array".to_string(),
            })
    }
}

/// Fill the default package profile and each resource entry's defaults.
fn fill_package_defaults(descriptor: &mut Descriptor) {
    ensure_default(descriptor, PROFILE_PROP, DEFAULT_PACKAGE_PROFILE);
    if let Some(Value::Array(entries)) = descriptor.get_mut(RESOURCES_PROP) {
        for entry in entries {
            if let Value::Object(map) = entry {
                fill_resource_defaults(map);
            }
        }
    }
}

/// Materialize a string-valued `schema` on the package and on every
/// resource entry, so the stored descriptor and the built resources see
/// the same documents.
fn materialize_package_schemas(
    descriptor: &mut Descriptor,
    base_path: Option<&str>,
) -> PackResult<()> {
    materialize_schema(descriptor, base_path)?;
    if let Some(Value::Array(entries)) = descriptor.get_mut(RESOURCES_PROP) {
        for entry in entries {
            if let Value::Object(map) = entry {
                materialize_schema(map, base_path)?;
            }
        }
    }
    Ok(())
}

/// Build one [`Resource`] per descriptor entry, in order.
fn build_resources(
    entries: &[Value],
    base_path: Option<&str>,
    registry: &Arc<Registry>,
) -> PackResult<Vec<Resource>> {
    let mut resources = Vec::with_capacity(entries.len());
    for entry in entries {
        let Value::Object(map) = entry else {
            return Err(PackError::InvalidDescriptor {
                reason: format!(
                    "resource descriptors must be JSON objects, got {}",
                    value_kind(entry)
                ),
            });
        };
        resources.push(Resource::build_from_owned(map.clone(), base_path, registry)?);
    }
    Ok(resources)
}
