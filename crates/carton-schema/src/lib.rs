//! # carton-schema — Profile Registry and Descriptor Validation
//!
//! Resolves profile identifiers to compiled JSON schemas and validates
//! descriptors against them.
//!
//! ## Resolution
//!
//! A profile is either a direct reference (`http://`, `https://`,
//! `file://`) compiled from the fetched document, or an identifier looked
//! up in a [`registry::Registry`]: an ordered table of profile records,
//! each pointing at a bundled-local schema document or an absolute schema
//! URL.
//!
//! ## Fallback Chain
//!
//! Registries come from [`registry::RegistryLoader`]s tried in priority
//! order — by default the compiled-in profile cache, then the remote
//! registry. The first loader that succeeds wins; loaders that fail are
//! logged and recorded, and only if every loader fails does resolution
//! abort with a configuration error.
//!
//! ## Validation
//!
//! Validation is a trust boundary. Descriptors that fail validation are
//! rejected with structured violation information: the instance path, the
//! schema path, and a message per violating field.
//!
//! ## Thread Safety
//!
//! `Registry` is `Send + Sync`; compiled validators are cached per profile
//! behind a lock, so the first resolution of a profile runs exactly once
//! even under concurrent first callers. The process-wide
//! [`registry::default_registry`] cell caches successful initialization
//! only — a failed load is retried on the next call.

pub mod registry;
pub mod validate;

pub use registry::{
    default_loaders, default_registry, load_registry, BundledRegistryLoader, ConfigurationError,
    DirRegistryLoader, ProfileSpec, Registry, RegistryLoader, RemoteRegistryLoader, SchemaError,
    DEFAULT_REMOTE_REGISTRY_URL,
};
pub use validate::{ValidationError, ValidationViolations, Violation};
