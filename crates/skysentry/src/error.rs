//! Error types for skysentry.
//!
//! This module defines all error types used throughout the skysentry crate.
//! Configuration errors are fatal at startup; everything else is logged at
//! the tick where it happened and the owning loop keeps running.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for skysentry operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Backup Store Errors ===
    /// Failed to create the backup directory.
    #[error("failed to create backup directory {path}: {source}")]
    BackupDirCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Payload encryption failed.
    #[error("encryption failed: {message}")]
    Encrypt {
        /// Description of what went wrong.
        message: String,
    },

    /// The store has been erased and refuses new records.
    #[error("backup store is sealed after erasure")]
    StoreSealed,

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Capture Errors ===
    /// A capture source returned an error.
    #[error("capture source '{name}' failed: {message}")]
    CaptureSource {
        /// Name of the capture source.
        name: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// A capture source did not return data in time.
    #[error("capture source '{name}' timed out")]
    CaptureTimeout {
        /// Name of the capture source.
        name: &'static str,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for skysentry operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create an encryption error.
    #[must_use]
    pub fn encrypt(message: impl Into<String>) -> Self {
        Self::Encrypt {
            message: message.into(),
        }
    }

    /// Create a capture source error.
    #[must_use]
    pub fn capture_source(name: &'static str, message: impl Into<String>) -> Self {
        Self::CaptureSource {
            name,
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is fatal at startup (configuration problems).
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigLoad(_) | Self::ConfigValidation { .. })
    }

    /// Check if this error came from the sealed backup store.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        matches!(self, Self::StoreSealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::StoreSealed;
        assert_eq!(err.to_string(), "backup store is sealed after erasure");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_config_validation_display() {
        let err = Error::config_validation("channel_count must be at least 1");
        assert!(err.to_string().contains("channel_count"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_encrypt_error_display() {
        let err = Error::encrypt("nonce generation failed");
        assert!(err.to_string().contains("nonce generation failed"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_capture_source_error_display() {
        let err = Error::capture_source("imu", "bus unavailable");
        let msg = err.to_string();
        assert!(msg.contains("imu"));
        assert!(msg.contains("bus unavailable"));
    }

    #[test]
    fn test_capture_timeout_display() {
        let err = Error::CaptureTimeout { name: "gnss" };
        assert!(err.to_string().contains("gnss"));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_is_sealed() {
        assert!(Error::StoreSealed.is_sealed());
        assert!(!Error::internal("x").is_sealed());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_backup_dir_create_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::BackupDirCreate {
            path: PathBuf::from("/var/empty/backup"),
            source: io_err,
        };
        assert!(err.to_string().contains("/var/empty/backup"));
    }
}
