// ABOUTME: Structured error types for registry resolution, construction, and teardown
// ABOUTME: Defines the RegistryError taxonomy and the RegistryResult alias used crate-wide
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Registry Error Types
//!
//! All fallible registry operations return [`RegistryResult`]. The taxonomy
//! distinguishes caller mistakes (`UnregisteredType`, `Manifest`), graph
//! defects (`CircularDependency`), and component failures (`Construction`,
//! `Cleanup`). Construction failures are never swallowed; cleanup failures
//! are collected per instance so one faulty component cannot prevent the
//! others from releasing their resources.

use thiserror::Error;

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors produced by the component registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `get` was called for a type with no registered descriptor
    #[error("no component registered for type `{type_name}`")]
    UnregisteredType {
        /// Fully qualified name of the requested type
        type_name: String,
    },

    /// The resolution chain revisited a type that is currently resolving
    #[error("circular dependency while resolving `{type_name}` (chain: {})", .chain.join(" -> "))]
    CircularDependency {
        /// Type whose resolution closed the cycle
        type_name: String,
        /// Types in flight when the cycle was detected, outermost first
        chain: Vec<String>,
    },

    /// A component constructor or factory method failed
    #[error("failed to construct component `{type_name}`: {cause}")]
    Construction {
        /// Type that was being constructed
        type_name: String,
        /// Underlying error reported by the constructor
        cause: anyhow::Error,
    },

    /// One or more cleanup hooks failed during teardown
    ///
    /// Every remaining hook still ran before this error was reported.
    #[error("cleanup failed for {} component(s)", .failures.len())]
    Cleanup {
        /// Per-instance failures, in the order the hooks were invoked
        failures: Vec<CleanupFailure>,
    },

    /// The deployment manifest is structurally valid YAML but semantically invalid
    #[error("invalid deployment manifest: {message}")]
    Manifest {
        /// Description of the manifest defect
        message: String,
    },

    /// A configuration or manifest file could not be read
    #[error("failed to read `{path}`")]
    Io {
        /// Path that failed to load
        path: String,
        /// Underlying filesystem error
        #[source]
        source: std::io::Error,
    },

    /// A configuration or manifest document could not be parsed
    #[error("failed to parse YAML document")]
    Yaml {
        /// Underlying parser error
        #[from]
        source: serde_yaml::Error,
    },
}

/// A single failed cleanup hook, recorded during aggregate teardown
#[derive(Debug)]
pub struct CleanupFailure {
    /// Type whose cleanup hook failed
    pub type_name: String,
    /// Error returned by the hook
    pub cause: anyhow::Error,
}

impl std::fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.type_name, self.cause)
    }
}
