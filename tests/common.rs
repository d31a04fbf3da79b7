// ABOUTME: Shared test fixtures for registry integration tests
// ABOUTME: Provides sample components, config documents, and binding sets used across suites
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(dead_code)]

//! Shared fixtures for `depinj` integration tests
//!
//! Components record their construction and cleanup into an [`EventLog`]
//! they resolve from the registry, so tests can assert ordering without any
//! global state.

use anyhow::Context;
use depinj::{Component, ComponentRegistry, Config, ConfigValue, Constructible, FromConfig};
use std::sync::{Arc, Mutex, Once};

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Sample application configuration shared by the suites
pub const SAMPLE_CONFIG: &str = r"
database:
  host: localhost
  port: 5432
  pool_size: 5
cache:
  url: redis://localhost
cache_alt:
  url: redis://fallback
";

/// Deployment manifest mirroring a typical eager assembly
pub const SAMPLE_MANIFEST: &str = r"
components:
  - module: app
    class: EventLog
  - module: app
    class: DatabasePool
    params:
      path: database
  - module: app
    class: DatabaseClient
    params:
      path: database
  - module: app
    class: CacheClient
    params:
      path: cache
  - module: app
    class: ApplicationService
";

/// Parse the sample configuration
pub fn sample_config() -> Config {
    init_tracing();
    Config::from_yaml_str(SAMPLE_CONFIG).expect("sample config parses")
}

/// Binding set covering every fixture component
pub fn standard_bindings() -> depinj::BindingSet {
    let mut bindings = depinj::BindingSet::new();
    bindings
        .bind::<EventLog>("app", "EventLog")
        .bind_with_create::<DatabasePool>("app", "DatabasePool")
        .bind::<DatabaseClient>("app", "DatabaseClient")
        .bind::<CacheClient>("app", "CacheClient")
        .bind::<ApplicationService>("app", "ApplicationService");
    bindings
}

/// Records lifecycle events; resolved by every other fixture component
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Events with the given suffix, e.g. `".cleanup"`
    pub fn events_with_suffix(&self, suffix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.ends_with(suffix))
            .collect()
    }
}

impl Component for EventLog {}

impl FromConfig for EventLog {
    fn from_config(_registry: &ComponentRegistry, _config: &ConfigValue) -> anyhow::Result<Self> {
        Ok(Self::default())
    }
}

/// Pool component using the factory-method override with a size default
#[derive(Debug)]
pub struct DatabasePool {
    pub size: u64,
    log: Arc<EventLog>,
}

impl Component for DatabasePool {
    fn cleanup(&self) -> anyhow::Result<()> {
        self.log.record("database_pool.cleanup");
        Ok(())
    }
}

impl Constructible for DatabasePool {
    fn create(registry: &ComponentRegistry, config: &ConfigValue) -> anyhow::Result<Self> {
        let log = registry.get::<EventLog>()?;
        let size = config
            .get("pool_size")
            .and_then(ConfigValue::as_u64)
            .unwrap_or(10);
        log.record("database_pool.created");
        Ok(Self { size, log })
    }
}

/// Client component that pulls the pool transitively
#[derive(Debug)]
pub struct DatabaseClient {
    pub pool: Arc<DatabasePool>,
    pub host: String,
    log: Arc<EventLog>,
}

impl Component for DatabaseClient {
    fn cleanup(&self) -> anyhow::Result<()> {
        self.log.record("database_client.cleanup");
        Ok(())
    }
}

impl FromConfig for DatabaseClient {
    fn from_config(registry: &ComponentRegistry, config: &ConfigValue) -> anyhow::Result<Self> {
        let log = registry.get::<EventLog>()?;
        let pool = registry.get::<DatabasePool>()?;
        let host = config
            .get("host")
            .and_then(ConfigValue::as_str)
            .unwrap_or("localhost")
            .to_owned();
        log.record("database_client.created");
        Ok(Self { pool, host, log })
    }
}

/// Cache component with a required configuration field
#[derive(Debug)]
pub struct CacheClient {
    pub url: String,
    log: Arc<EventLog>,
}

impl Component for CacheClient {
    fn cleanup(&self) -> anyhow::Result<()> {
        self.log.record("cache_client.cleanup");
        Ok(())
    }
}

impl FromConfig for CacheClient {
    fn from_config(registry: &ComponentRegistry, config: &ConfigValue) -> anyhow::Result<Self> {
        let log = registry.get::<EventLog>()?;
        let url = config
            .get("url")
            .and_then(ConfigValue::as_str)
            .context("cache configuration requires a `url` field")?
            .to_owned();
        log.record("cache_client.created");
        Ok(Self { url, log })
    }
}

/// Service pulling every other component through the registry
#[derive(Debug)]
pub struct ApplicationService {
    pub db: Arc<DatabaseClient>,
    pub cache: Arc<CacheClient>,
    log: Arc<EventLog>,
}

impl Component for ApplicationService {
    fn cleanup(&self) -> anyhow::Result<()> {
        self.log.record("application_service.cleanup");
        Ok(())
    }
}

impl FromConfig for ApplicationService {
    fn from_config(registry: &ComponentRegistry, _config: &ConfigValue) -> anyhow::Result<Self> {
        let log = registry.get::<EventLog>()?;
        let db = registry.get::<DatabaseClient>()?;
        let cache = registry.get::<CacheClient>()?;
        log.record("application_service.created");
        Ok(Self { db, cache, log })
    }
}

/// Component whose cleanup hook always fails
#[derive(Debug)]
pub struct FaultyCleanup {
    log: Arc<EventLog>,
}

impl Component for FaultyCleanup {
    fn cleanup(&self) -> anyhow::Result<()> {
        self.log.record("faulty.cleanup");
        anyhow::bail!("simulated cleanup failure")
    }
}

impl FromConfig for FaultyCleanup {
    fn from_config(registry: &ComponentRegistry, _config: &ConfigValue) -> anyhow::Result<Self> {
        let log = registry.get::<EventLog>()?;
        Ok(Self { log })
    }
}

/// Component whose constructor always fails
#[derive(Debug)]
pub struct FailingConstructor;

impl Component for FailingConstructor {}

impl FromConfig for FailingConstructor {
    fn from_config(_registry: &ComponentRegistry, _config: &ConfigValue) -> anyhow::Result<Self> {
        anyhow::bail!("simulated construction failure")
    }
}

/// One half of a mutual dependency cycle
#[derive(Debug)]
pub struct MutualA {
    _peer: Arc<MutualB>,
}

impl Component for MutualA {}

impl FromConfig for MutualA {
    fn from_config(registry: &ComponentRegistry, _config: &ConfigValue) -> anyhow::Result<Self> {
        Ok(Self {
            _peer: registry.get::<MutualB>()?,
        })
    }
}

/// The other half of the cycle
#[derive(Debug)]
pub struct MutualB {
    _peer: Arc<MutualA>,
}

impl Component for MutualB {}

impl FromConfig for MutualB {
    fn from_config(registry: &ComponentRegistry, _config: &ConfigValue) -> anyhow::Result<Self> {
        Ok(Self {
            _peer: registry.get::<MutualA>()?,
        })
    }
}
