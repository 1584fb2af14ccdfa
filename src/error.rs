//! Error types for the Appfile deployment system.
//!
//! This module provides the error hierarchy for every stage of a run:
//! template rendering, environment merging, spec parsing, talking to the
//! remote platform, and reconciliation. Validation findings are not errors;
//! they are returned as data by [`crate::config::SpecValidator`].

use std::path::PathBuf;
use thiserror::Error;

use crate::env::ValueError;

/// The main error type for the Appfile deployment system.
#[derive(Debug, Error)]
pub enum AppfileError {
    /// Template rendering errors.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Environment value merge errors.
    #[error("Environment error: {0}")]
    Merge(#[from] MergeError),

    /// Configuration and spec parsing errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote platform errors.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Template rendering errors. Always carry the identity of the template source.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("Could not read template {}: {source}", path.display())]
    Read {
        /// Path to the template file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The template failed to parse or execute.
    #[error("Could not templatize {origin}: {message}")]
    Render {
        /// File path or logical name of the template.
        origin: String,
        /// Description of the failure.
        message: String,
    },
}

/// Environment value errors.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A values file produced a tree that cannot be represented as a value tree.
    #[error("Could not merge values from {location} in env {environment}: {source}")]
    InvalidValues {
        /// Environment being resolved.
        environment: String,
        /// File the values came from.
        location: String,
        /// Why the tree was rejected.
        source: ValueError,
    },

    /// The requested environment is not declared in the manifest.
    #[error("Environment {name} not found in appfile spec at {}", manifest.display())]
    EnvironmentNotFound {
        /// Requested environment name.
        name: String,
        /// Manifest that was searched.
        manifest: PathBuf,
    },
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A referenced file was not found.
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A document could not be parsed.
    #[error("Failed to parse {location}: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// File or logical source of the document.
        location: String,
    },

    /// A required environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// One or more apps failed linting.
    #[error("Lint failed: {errors} error(s) across {apps} app(s)")]
    ValidationFailed {
        /// Number of apps with findings.
        apps: usize,
        /// Total number of findings.
        errors: usize,
    },
}

/// Remote platform errors.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Authentication failed.
    #[error("App Platform authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("App Platform API request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Network error.
    #[error("Network error communicating with App Platform: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from App Platform API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// A DNS record lookup was ambiguous.
    #[error("Same {domain} CNAME record appeared more than once")]
    DuplicateRecord {
        /// Hostname that matched several records.
        domain: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A declared app is absent remotely, so nothing was destroyed.
    #[error("No app to destroy with name {name}")]
    MissingRemoteApp {
        /// Name of the missing app.
        name: String,
    },

    /// The named app is not declared in the appfile.
    #[error("App {name} is not declared in the appfile")]
    UnknownApp {
        /// Requested app name.
        name: String,
    },

    /// Deleting an app failed part-way through a destroy run.
    #[error("Failed to destroy app {name} (already destroyed: [{}]): {reason}", destroyed.join(", "))]
    DeletionFailed {
        /// App whose deletion failed.
        name: String,
        /// Apps deleted before the failure.
        destroyed: Vec<String>,
        /// Underlying failure.
        reason: String,
    },
}

/// Result type alias for Appfile operations.
pub type Result<T> = std::result::Result<T, AppfileError>;

impl AppfileError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl ConfigError {
    /// Creates a parse error for the given source.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location: location.into(),
        }
    }
}

impl PlatformError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}
