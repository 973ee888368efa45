//! Custom error types for layermap.
//!
//! Errors never cross the public service boundary: every analysis contract
//! degrades to an empty or partial result instead. This enum is what the
//! internal layers (configuration, stores, glob compilation) return before
//! that conversion happens.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for layermap operations
#[derive(Error, Debug)]
pub enum LayermapError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Filesystem Errors
    // =========================================================================
    /// Reading or writing a path failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A glob pattern could not be compiled
    #[error("Invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Key-value store operation failed
    #[error("Store error for key '{key}': {message}")]
    Store { key: String, message: String },
}

impl LayermapError {
    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a store error
    pub fn store(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::InvalidConfig { .. } | Self::Glob { .. } => 7,
            Self::Io { .. } => 6,
            _ => 1,
        }
    }
}

/// Type alias for layermap results
pub type Result<T> = std::result::Result<T, LayermapError>;
