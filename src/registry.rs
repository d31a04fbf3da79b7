// ABOUTME: Type-keyed component registry with singleton caching and ordered teardown
// ABOUTME: Resolves descriptors lazily or eagerly and tears instances down in reverse resolution order
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Component Registry
//!
//! [`ComponentRegistry`] owns the descriptor table and the instance cache for
//! its lifetime. Each type resolves at most once; repeated [`get`] calls
//! return the identical `Arc`. Constructors may pull their own dependencies
//! through the registry, and resolution order is recorded so teardown runs
//! last-resolved-first, mirroring stack unwinding: a component relying on
//! another still has it available during its own cleanup.
//!
//! Registries assembled from a deployment manifest are returned as a
//! [`RegistryGuard`], which tears all cached instances down when it goes out
//! of scope, on both the normal and the failure path.
//!
//! ```no_run
//! use depinj::{BindingSet, ComponentRegistry, Config};
//!
//! # use depinj::{Component, ConfigValue, FromConfig};
//! # struct Database;
//! # impl Component for Database {}
//! # impl FromConfig for Database {
//! #     fn from_config(_: &ComponentRegistry, _: &ConfigValue) -> anyhow::Result<Self> {
//! #         Ok(Self)
//! #     }
//! # }
//! # fn main() -> depinj::RegistryResult<()> {
//! let config = Config::load("config.yaml")?;
//! let mut bindings = BindingSet::new();
//! bindings.bind::<Database>("app", "Database");
//!
//! let registry = ComponentRegistry::from_yaml_file(config, "deployment.yaml", &bindings, false)?;
//! let database = registry.get::<Database>()?;
//! // all resolved components are torn down when `registry` is dropped
//! # Ok(())
//! # }
//! ```
//!
//! The registry assumes single-writer discipline: registration, resolution,
//! and unregistration from one caller at a time. `get` after first
//! resolution is a pure cache lookup and safe to issue concurrently.
//!
//! [`get`]: ComponentRegistry::get

use crate::component::{Component, Constructible, FromConfig};
use crate::config::{Config, ConfigValue};
use crate::errors::{CleanupFailure, RegistryError, RegistryResult};
use crate::manifest::{BindingSet, Manifest};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

/// Declarative record describing how to build a component for a type
///
/// Identity is the type the descriptor is registered under; at most one
/// descriptor per type is active at a time, and a stored descriptor is never
/// mutated in place.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Dot-delimited configuration path resolved at construction time
    pub config_path: Option<String>,
    /// Whether resolution is deferred to first use
    ///
    /// Consulted during manifest assembly. A descriptor registered directly
    /// through [`ComponentRegistry::register`] always resolves on first
    /// `get`, whatever this flag says.
    pub lazy: bool,
}

impl Descriptor {
    /// Create a lazy descriptor with no configuration path
    #[must_use]
    pub fn new() -> Self {
        Self {
            config_path: None,
            lazy: true,
        }
    }

    /// Set the configuration path handed to the constructor
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Set whether resolution is deferred to first use
    #[must_use]
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::new()
    }
}

type ConstructFn =
    Arc<dyn Fn(&ComponentRegistry, &ConfigValue) -> RegistryResult<CachedInstance> + Send + Sync>;

/// Descriptor plus the type-erased construction recipe captured at registration
struct Registration {
    descriptor: Descriptor,
    type_name: &'static str,
    construct: ConstructFn,
}

/// A resolved singleton plus the hook that releases it
struct CachedInstance {
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
    cleanup: Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>,
}

#[derive(Default)]
struct RegistryState {
    registrations: HashMap<TypeId, Registration>,
    instances: HashMap<TypeId, CachedInstance>,
    /// Successful resolutions in order; teardown walks this in reverse
    resolution_order: Vec<TypeId>,
    /// Types currently resolving in this call chain, outermost first
    resolving: Vec<(TypeId, &'static str)>,
}

/// Type-keyed singleton container with deterministic teardown
pub struct ComponentRegistry {
    config: Config,
    state: Mutex<RegistryState>,
}

impl ComponentRegistry {
    /// Create an empty registry backed by the given configuration document
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Assemble a registry from a deployment manifest string
    ///
    /// Every descriptor is registered first; when `lazy` is false (or an
    /// entry overrides it via `params.lazy`), the non-lazy entries are then
    /// resolved in manifest order. A constructor may pull a dependency
    /// declared anywhere in the manifest; a circular manifest fails with a
    /// dependency-cycle error.
    ///
    /// # Errors
    /// Returns an error if the manifest cannot be parsed, names an unbound
    /// `module.Class`, or eager resolution fails.
    pub fn from_yaml_str(
        config: Config,
        manifest_yaml: &str,
        bindings: &BindingSet,
        lazy: bool,
    ) -> RegistryResult<RegistryGuard> {
        let manifest = Manifest::from_yaml_str(manifest_yaml)?;
        Self::from_manifest(config, &manifest, bindings, lazy)
    }

    /// Assemble a registry from a deployment manifest file
    ///
    /// # Errors
    /// Returns an error if the manifest cannot be read or parsed, names an
    /// unbound `module.Class`, or eager resolution fails.
    pub fn from_yaml_file(
        config: Config,
        manifest_path: impl AsRef<Path>,
        bindings: &BindingSet,
        lazy: bool,
    ) -> RegistryResult<RegistryGuard> {
        let manifest = Manifest::load(manifest_path)?;
        Self::from_manifest(config, &manifest, bindings, lazy)
    }

    /// Assemble a registry from an already-parsed manifest
    ///
    /// # Errors
    /// Returns an error if the manifest names an unbound `module.Class` or
    /// eager resolution fails.
    pub fn from_manifest(
        config: Config,
        manifest: &Manifest,
        bindings: &BindingSet,
        lazy: bool,
    ) -> RegistryResult<RegistryGuard> {
        let registry = Self::new(config);

        // Every descriptor is registered before anything resolves, so an
        // eager constructor may pull a peer declared anywhere in the
        // manifest, and a circular manifest surfaces as a dependency cycle
        // rather than a missing registration.
        let mut eager = Vec::new();
        for entry in &manifest.components {
            let key = entry.binding_key();
            let binding = bindings.get(&key).ok_or_else(|| RegistryError::Manifest {
                message: format!("no binding registered for manifest entry `{key}`"),
            })?;

            let descriptor = Descriptor {
                config_path: entry.config_path().map(str::to_owned),
                lazy: entry.lazy_override().unwrap_or(lazy),
            };
            let eager_entry = !descriptor.lazy;
            binding.register(&registry, descriptor);
            if eager_entry {
                eager.push(binding);
            }
        }

        for binding in eager {
            if let Err(err) = binding.resolve(&registry) {
                // Components already resolved eagerly must not leak;
                // tear them down before surfacing the assembly failure.
                if let Err(cleanup_err) = registry.unregister_all() {
                    error!(error = %cleanup_err, "teardown after failed assembly");
                }
                return Err(err);
            }
        }

        info!(
            components = manifest.components.len(),
            lazy, "registry assembled from manifest"
        );
        Ok(RegistryGuard::new(registry))
    }

    /// Register a type constructed via [`FromConfig`]
    ///
    /// Inserts or replaces the descriptor for the type. A live cached
    /// instance is not invalidated; the new descriptor takes effect on the
    /// next resolution after that instance is unregistered.
    pub fn register<T: FromConfig>(&self, descriptor: Descriptor) {
        self.register_constructor::<T>(descriptor, T::from_config);
    }

    /// Register a type constructed via [`Constructible::create`]
    ///
    /// Same replacement semantics as [`register`](Self::register).
    pub fn register_with_create<T: Constructible>(&self, descriptor: Descriptor) {
        self.register_constructor::<T>(descriptor, T::create);
    }

    fn register_constructor<T: Component>(
        &self,
        descriptor: Descriptor,
        construct: fn(&ComponentRegistry, &ConfigValue) -> anyhow::Result<T>,
    ) {
        let type_name = std::any::type_name::<T>();
        let construct: ConstructFn = Arc::new(move |registry, fragment| {
            let instance = construct(registry, fragment)
                .map_err(|cause| construction_error(type_name, cause))?;
            let instance = Arc::new(instance);
            let hook = Arc::clone(&instance);
            Ok(CachedInstance {
                type_name,
                instance,
                cleanup: Box::new(move || hook.cleanup()),
            })
        });

        let mut state = self.lock_state();
        let replaced = state
            .registrations
            .insert(
                TypeId::of::<T>(),
                Registration {
                    descriptor,
                    type_name,
                    construct,
                },
            )
            .is_some();
        info!(component = type_name, replaced, "component registered");
    }

    /// Return the singleton for `T`, resolving it on first use
    ///
    /// Repeated calls return the identical `Arc`. Dependencies pulled by the
    /// constructor are resolved transitively through the same registry.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnregisteredType`] if no descriptor exists,
    /// [`RegistryError::CircularDependency`] if the resolution chain revisits
    /// a type currently resolving, or [`RegistryError::Construction`] if the
    /// constructor fails. No partial cache entry is installed on failure.
    pub fn get<T: Component>(&self) -> RegistryResult<Arc<T>> {
        let type_id = TypeId::of::<T>();

        // Cache check and in-flight bookkeeping happen under the lock; the
        // lock is released before the constructor runs so it can re-enter
        // `get` for its own dependencies.
        let (construct, fragment) = {
            let mut state = self.lock_state();

            if let Some(cached) = state.instances.get(&type_id) {
                return downcast::<T>(&cached.instance);
            }

            if state.resolving.iter().any(|(id, _)| *id == type_id) {
                return Err(RegistryError::CircularDependency {
                    type_name: std::any::type_name::<T>().to_owned(),
                    chain: state
                        .resolving
                        .iter()
                        .map(|(_, name)| (*name).to_owned())
                        .collect(),
                });
            }

            let (construct, type_name, config_path) = {
                let registration = state.registrations.get(&type_id).ok_or_else(|| {
                    RegistryError::UnregisteredType {
                        type_name: std::any::type_name::<T>().to_owned(),
                    }
                })?;
                (
                    Arc::clone(&registration.construct),
                    registration.type_name,
                    registration.descriptor.config_path.clone(),
                )
            };

            state.resolving.push((type_id, type_name));
            let fragment = self.config.fragment(config_path.as_deref());
            (construct, fragment)
        };

        let constructed = construct(self, &fragment);

        let mut state = self.lock_state();
        state.resolving.pop();
        let cached = constructed?;
        let instance = downcast::<T>(&cached.instance)?;
        debug!(component = cached.type_name, "component resolved");
        state.instances.insert(type_id, cached);
        state.resolution_order.push(type_id);
        Ok(instance)
    }

    /// Tear down the cached instance for `T`, if any
    ///
    /// Runs the cleanup hook exactly once, then evicts the instance. The
    /// descriptor stays registered, so a later `get` starts a fresh
    /// lifecycle. Calling this for a type with no cached instance is a
    /// no-op.
    ///
    /// # Errors
    /// Returns [`RegistryError::Cleanup`] if the cleanup hook fails; the
    /// instance is evicted regardless.
    pub fn unregister<T: Component>(&self) -> RegistryResult<()> {
        let type_id = TypeId::of::<T>();
        let evicted = {
            let mut state = self.lock_state();
            let evicted = state.instances.remove(&type_id);
            if evicted.is_some() {
                state.resolution_order.retain(|id| *id != type_id);
            }
            evicted
        };

        let Some(cached) = evicted else {
            return Ok(());
        };

        info!(component = cached.type_name, "component unregistered");
        (cached.cleanup)().map_err(|cause| RegistryError::Cleanup {
            failures: vec![CleanupFailure {
                type_name: cached.type_name.to_owned(),
                cause,
            }],
        })
    }

    /// Tear down every cached instance in reverse resolution order
    ///
    /// Descriptors stay registered. A failing hook is recorded and the
    /// remaining hooks still run.
    ///
    /// # Errors
    /// Returns [`RegistryError::Cleanup`] aggregating every hook failure,
    /// reported once all cleanups have been attempted.
    pub fn unregister_all(&self) -> RegistryResult<()> {
        let torn_down: Vec<CachedInstance> = {
            let mut state = self.lock_state();
            let order = std::mem::take(&mut state.resolution_order);
            order
                .into_iter()
                .rev()
                .filter_map(|id| state.instances.remove(&id))
                .collect()
        };

        let mut failures = Vec::new();
        for cached in torn_down {
            debug!(component = cached.type_name, "running cleanup hook");
            if let Err(cause) = (cached.cleanup)() {
                failures.push(CleanupFailure {
                    type_name: cached.type_name.to_owned(),
                    cause,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Cleanup { failures })
        }
    }

    /// Whether a descriptor is registered for `T`
    #[must_use]
    pub fn is_registered<T: Component>(&self) -> bool {
        self.lock_state().registrations.contains_key(&TypeId::of::<T>())
    }

    /// Whether a live instance is cached for `T`
    #[must_use]
    pub fn is_cached<T: Component>(&self) -> bool {
        self.lock_state().instances.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered descriptors
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.lock_state().registrations.len()
    }

    /// Configuration document backing this registry
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    // The lock is never held across a constructor or cleanup hook, so a
    // poisoned state can only carry a consistent snapshot; recover it.
    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn downcast<T: Component>(instance: &Arc<dyn Any + Send + Sync>) -> RegistryResult<Arc<T>> {
    Arc::clone(instance)
        .downcast::<T>()
        .map_err(|_| RegistryError::Construction {
            type_name: std::any::type_name::<T>().to_owned(),
            cause: anyhow::anyhow!("cached instance has a different concrete type"),
        })
}

/// Unwrap registry errors escaping a constructor so a transitive
/// `CircularDependency` or `UnregisteredType` keeps its identity instead of
/// being re-wrapped as a construction failure of the outer component.
fn construction_error(type_name: &'static str, cause: anyhow::Error) -> RegistryError {
    match cause.downcast::<RegistryError>() {
        Ok(inner) => inner,
        Err(cause) => RegistryError::Construction {
            type_name: type_name.to_owned(),
            cause,
        },
    }
}

/// Scope guard bracketing a registry's active lifetime
///
/// Dereferences to the registry. On drop, every cached instance is torn down
/// in reverse resolution order regardless of whether the scope exits
/// normally or through a propagating failure; teardown failures on the drop
/// path are logged. Call [`shutdown`](Self::shutdown) instead to observe the
/// aggregate cleanup result.
pub struct RegistryGuard {
    registry: Arc<ComponentRegistry>,
    armed: bool,
}

impl RegistryGuard {
    fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            armed: true,
        }
    }

    /// Shared handle to the guarded registry
    #[must_use]
    pub fn registry(&self) -> Arc<ComponentRegistry> {
        Arc::clone(&self.registry)
    }

    /// Tear down all cached instances and disarm the guard
    ///
    /// # Errors
    /// Returns [`RegistryError::Cleanup`] aggregating any hook failures;
    /// every hook still ran.
    pub fn shutdown(mut self) -> RegistryResult<()> {
        self.armed = false;
        self.registry.unregister_all()
    }
}

impl std::fmt::Debug for RegistryGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryGuard")
            .field("armed", &self.armed)
            .field("registered", &self.registry.registered_count())
            .finish_non_exhaustive()
    }
}

impl Deref for RegistryGuard {
    type Target = ComponentRegistry;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.registry.unregister_all() {
            error!(error = %err, "registry teardown failed during drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_builder_sets_path_and_laziness() {
        let descriptor = Descriptor::new().with_path("cache.pool").lazy(false);
        assert_eq!(descriptor.config_path.as_deref(), Some("cache.pool"));
        assert!(!descriptor.lazy);
        assert!(Descriptor::new().lazy);
    }

    #[test]
    fn registry_errors_escape_constructors_unwrapped() {
        let inner = RegistryError::UnregisteredType {
            type_name: "Missing".to_owned(),
        };
        let err = construction_error("Outer", anyhow::Error::new(inner));
        assert!(matches!(err, RegistryError::UnregisteredType { .. }));
    }

    #[test]
    fn guard_debug_output_names_the_type() {
        let guard = RegistryGuard::new(ComponentRegistry::new(Config::from_value(ConfigValue::Null)));
        let rendered = format!("{guard:?}");
        assert!(rendered.contains("RegistryGuard"), "rendered: {rendered}");
        assert!(rendered.contains("armed"), "rendered: {rendered}");
    }

    #[test]
    fn foreign_errors_become_construction_failures() {
        let err = construction_error("Outer", anyhow::anyhow!("connect refused"));
        match err {
            RegistryError::Construction { type_name, .. } => assert_eq!(type_name, "Outer"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
