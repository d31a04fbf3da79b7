// ABOUTME: Capability traits components implement to participate in the registry
// ABOUTME: Defines the cleanup hook, the plain constructor, and the factory-method override
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Component Capability Traits
//!
//! A registered type implements [`Component`] plus exactly one construction
//! trait:
//!
//! - [`FromConfig`] is the normal constructor, handed the configuration
//!   fragment named by the component's descriptor.
//! - [`Constructible`] is the factory-method override for types that want to
//!   control how their configuration maps to construction (derived values,
//!   defaults, pre-flight checks) without changing the registry.
//!
//! Which one applies is decided at the registration site
//! ([`ComponentRegistry::register`] vs [`ComponentRegistry::register_with_create`]),
//! so capability is checked by trait conformance at compile time rather than
//! probed at runtime.
//!
//! Constructors receive the registry by reference and may pull their own
//! dependencies with [`ComponentRegistry::get`]; the registry resolves those
//! transitively and detects cycles.
//!
//! [`ComponentRegistry::register`]: crate::registry::ComponentRegistry::register
//! [`ComponentRegistry::register_with_create`]: crate::registry::ComponentRegistry::register_with_create
//! [`ComponentRegistry::get`]: crate::registry::ComponentRegistry::get

use crate::config::ConfigValue;
use crate::registry::ComponentRegistry;

/// Base trait for everything the registry can hold
///
/// The cleanup hook is invoked at most once per instance, during explicit
/// unregistration or scoped teardown. The default implementation does
/// nothing, so components without resources to release need not override it.
pub trait Component: Send + Sync + 'static {
    /// Release any resources held by this instance
    ///
    /// # Errors
    /// Returns an error if releasing resources fails; during aggregate
    /// teardown the failure is recorded and remaining hooks still run.
    fn cleanup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Plain construction from a configuration fragment
pub trait FromConfig: Component + Sized {
    /// Construct an instance from the fragment named by the descriptor
    ///
    /// # Errors
    /// Returns an error if the fragment is invalid or a dependency pulled
    /// via `registry.get` cannot be resolved.
    fn from_config(registry: &ComponentRegistry, config: &ConfigValue) -> anyhow::Result<Self>;
}

/// Factory-method construction override
///
/// Components implementing this trait are registered through
/// `register_with_create` (or `BindingSet::bind_with_create`) and the
/// registry calls `create` instead of a plain constructor.
pub trait Constructible: Component + Sized {
    /// Create an instance, applying component-specific construction policy
    ///
    /// # Errors
    /// Returns an error if construction fails.
    fn create(registry: &ComponentRegistry, config: &ConfigValue) -> anyhow::Result<Self>;
}
