// ABOUTME: Main library entry point for the depinj component registry
// ABOUTME: Wires configuration, manifest parsing, and the type-keyed registry into one crate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # depinj
//!
//! A type-keyed component registry: builds and wires application components
//! (database clients, caches, metrics collectors) from declarative YAML
//! configuration, caches one instance per type, and tears everything down
//! deterministically in reverse resolution order.
//!
//! ## Features
//!
//! - **Declarative assembly**: a deployment manifest lists components in
//!   order; a [`BindingSet`] maps its `module.Class` identifiers to types
//! - **Lazy or eager instantiation**: defer construction to first use, or
//!   resolve everything in manifest order at assembly time
//! - **Singleton caching**: one instance per type, identical `Arc` on every
//!   [`ComponentRegistry::get`]
//! - **Config-path extraction**: each component receives the configuration
//!   fragment named by its descriptor (`"database"`, `"cache.pool"`, ...)
//! - **Factory override**: types implement [`Constructible`] to control how
//!   configuration maps to construction, or [`FromConfig`] for the plain path
//! - **Deterministic cleanup**: explicit [`ComponentRegistry::unregister`]
//!   or scope-based teardown via [`RegistryGuard`], last-resolved-first
//!
//! ## Quick Start
//!
//! ```no_run
//! use depinj::{BindingSet, Component, ComponentRegistry, Config, ConfigValue, FromConfig};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! impl Component for Database {
//!     fn cleanup(&self) -> anyhow::Result<()> {
//!         // close connections here
//!         Ok(())
//!     }
//! }
//!
//! impl FromConfig for Database {
//!     fn from_config(_registry: &ComponentRegistry, config: &ConfigValue) -> anyhow::Result<Self> {
//!         let url = config
//!             .get("url")
//!             .and_then(ConfigValue::as_str)
//!             .unwrap_or("postgres://localhost")
//!             .to_owned();
//!         Ok(Self { url })
//!     }
//! }
//!
//! fn main() -> depinj::RegistryResult<()> {
//!     let config = Config::load("config.yaml")?;
//!     let mut bindings = BindingSet::new();
//!     bindings.bind::<Database>("app", "Database");
//!
//!     let registry =
//!         ComponentRegistry::from_yaml_file(config, "deployment.yaml", &bindings, false)?;
//!     let database = registry.get::<Database>()?;
//!     println!("connected to {}", database.url);
//!     Ok(())
//!     // cached components are torn down here, in reverse resolution order
//! }
//! ```

/// Component capability traits: cleanup hook, constructor, factory override
pub mod component;

/// Configuration document loading and dot-path fragment extraction
pub mod config;

/// Registry error taxonomy and result alias
pub mod errors;

/// Deployment manifest parsing and the string-to-type binding table
pub mod manifest;

/// The component registry core and its scope guard
pub mod registry;

pub use component::{Component, Constructible, FromConfig};
pub use config::{Config, ConfigValue};
pub use errors::{CleanupFailure, RegistryError, RegistryResult};
pub use manifest::{BindingSet, EntryParams, Manifest, ManifestEntry};
pub use registry::{ComponentRegistry, Descriptor, RegistryGuard};
