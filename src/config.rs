// ABOUTME: Configuration document loading and dot-delimited path lookup
// ABOUTME: Wraps a parsed YAML tree and hands out per-component fragments to the registry
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Configuration Document
//!
//! A [`Config`] is an immutable nested mapping loaded once at startup. The
//! registry never mutates it; it only reads named paths such as `"database"`
//! or `"cache.pool"` to extract the fragment handed to each component
//! constructor. A path with no value yields an empty mapping so components
//! with optional configuration construct from their defaults.

use crate::errors::{RegistryError, RegistryResult};
use std::fs;
use std::path::Path;

/// Raw configuration value handed to component constructors
pub type ConfigValue = serde_yaml::Value;

/// Immutable configuration document backing a registry
#[derive(Debug, Clone)]
pub struct Config {
    root: ConfigValue,
}

impl Config {
    /// Parse a configuration document from a YAML string
    ///
    /// # Errors
    /// Returns an error if the document is not valid YAML
    pub fn from_yaml_str(text: &str) -> RegistryResult<Self> {
        let root = serde_yaml::from_str(text)?;
        Ok(Self { root })
    }

    /// Load a configuration document from a YAML file
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

    /// Build a configuration document from an already-parsed YAML value
    #[must_use]
    pub fn from_value(root: ConfigValue) -> Self {
        Self { root }
    }

    /// Look up a dot-delimited path, returning the value if present
    ///
    /// Each path segment descends one level of mapping. Lookup stops with
    /// `None` as soon as a segment is missing or the current value is not a
    /// mapping.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ConfigValue> {
        let mut current = &self.root;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current)
    }

    /// Extract the owned configuration fragment for a component
    ///
    /// An absent path (or no path at all) yields an empty mapping, matching
    /// the contract that components with no declared configuration receive
    /// an empty fragment rather than an error.
    #[must_use]
    pub fn fragment(&self, path: Option<&str>) -> ConfigValue {
        path.and_then(|p| self.get(p).cloned())
            .unwrap_or_else(|| ConfigValue::Mapping(serde_yaml::Mapping::new()))
    }
}
