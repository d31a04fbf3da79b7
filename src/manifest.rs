// ABOUTME: Deployment manifest parsing and the string-to-type binding table
// ABOUTME: Turns ordered manifest entries into descriptors via application-supplied bindings
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Deployment Manifest
//!
//! A manifest lists components under a top-level `components` key; document
//! order is significant for eager assembly:
//!
//! ```yaml
//! components:
//!   - module: app
//!     class: DatabasePool
//!     params:
//!       path: database
//!   - module: app
//!     class: DatabaseClient
//!     params:
//!       path: database
//!   - module: app
//!     class: ApplicationService
//! ```
//!
//! The registry core never resolves `module`/`class` strings to types
//! itself. The embedding application supplies a [`BindingSet`] mapping each
//! `module.Class` identifier to an already-known type, and the registry only
//! deals in type identifiers from there on.

use crate::component::{Constructible, FromConfig};
use crate::errors::{RegistryError, RegistryResult};
use crate::registry::{ComponentRegistry, Descriptor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Parsed deployment manifest, entries in document order
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Component entries in the order they appear in the document
    pub components: Vec<ManifestEntry>,
}

/// One component entry of a deployment manifest
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    /// Module identifier, joined with `class` for binding lookup
    pub module: String,
    /// Class identifier within the module
    pub class: String,
    /// Optional construction parameters
    #[serde(default)]
    pub params: Option<EntryParams>,
}

/// Construction parameters of a manifest entry
#[derive(Debug, Clone, Deserialize)]
pub struct EntryParams {
    /// Dot-delimited configuration path handed to the component
    #[serde(default)]
    pub path: Option<String>,
    /// Per-entry laziness override; absent means the assembly-wide setting
    #[serde(default)]
    pub lazy: Option<bool>,
}

impl Manifest {
    /// Parse a manifest from a YAML string
    ///
    /// # Errors
    /// Returns an error if the document is not valid YAML or lacks the
    /// `components` key.
    pub fn from_yaml_str(text: &str) -> RegistryResult<Self> {
        let manifest: Self = serde_yaml::from_str(text)?;
        Ok(manifest)
    }

    /// Load a manifest from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

impl ManifestEntry {
    /// Identifier used to look this entry up in a [`BindingSet`]
    #[must_use]
    pub fn binding_key(&self) -> String {
        format!("{}.{}", self.module, self.class)
    }

    /// Configuration path declared for this entry, if any
    #[must_use]
    pub fn config_path(&self) -> Option<&str> {
        self.params.as_ref().and_then(|p| p.path.as_deref())
    }

    /// Laziness override declared for this entry, if any
    #[must_use]
    pub fn lazy_override(&self) -> Option<bool> {
        self.params.as_ref().and_then(|p| p.lazy)
    }
}

type RegisterFn = Box<dyn Fn(&ComponentRegistry, Descriptor) + Send + Sync>;
type ResolveFn = Box<dyn Fn(&ComponentRegistry) -> RegistryResult<()> + Send + Sync>;

/// Registration recipe for one bound type
pub(crate) struct Binding {
    register_fn: RegisterFn,
    resolve_fn: ResolveFn,
}

impl Binding {
    pub(crate) fn register(&self, registry: &ComponentRegistry, descriptor: Descriptor) {
        (self.register_fn)(registry, descriptor);
    }

    pub(crate) fn resolve(&self, registry: &ComponentRegistry) -> RegistryResult<()> {
        (self.resolve_fn)(registry)
    }
}

/// Application-supplied mapping from manifest identifiers to types
///
/// Each bound identifier carries a recipe for registering its type's
/// descriptor and, in eager mode, resolving it. Re-binding an identifier
/// replaces the previous binding.
#[derive(Default)]
pub struct BindingSet {
    bindings: HashMap<String, Binding>,
}

impl BindingSet {
    /// Create an empty binding set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `module.Class` to a type constructed via [`FromConfig`]
    pub fn bind<T: FromConfig>(&mut self, module: &str, class: &str) -> &mut Self {
        self.bindings.insert(
            format!("{module}.{class}"),
            Binding {
                register_fn: Box::new(|registry, descriptor| registry.register::<T>(descriptor)),
                resolve_fn: Box::new(|registry| registry.get::<T>().map(drop)),
            },
        );
        self
    }

    /// Bind `module.Class` to a type constructed via [`Constructible::create`]
    pub fn bind_with_create<T: Constructible>(&mut self, module: &str, class: &str) -> &mut Self {
        self.bindings.insert(
            format!("{module}.{class}"),
            Binding {
                register_fn: Box::new(|registry, descriptor| {
                    registry.register_with_create::<T>(descriptor);
                }),
                resolve_fn: Box::new(|registry| registry.get::<T>().map(drop)),
            },
        );
        self
    }

    /// Identifiers currently bound, in no particular order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Binding> {
        self.bindings.get(key)
    }
}
