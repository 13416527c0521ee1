//! Error handling and mapping for the FTP gateway.
//!
//! Errors fall into three groups:
//!
//! - [`ConfigError`]: bad configuration, fatal, never retried.
//! - [`GatewayError::Remote`]: a WebDAV call failed; propagated unchanged.
//! - [`GatewayError::Unsupported`]: the operation is outside the handle's or
//!   filesystem's capability set and fails regardless of arguments.
//!
//! [`GatewayError::to_storage_error`] picks the FTP reply for each.

use libunftp::storage::{Error as StorageError, ErrorKind};
use shareftp_dav::DavError;
use std::io;
use thiserror::Error;

/// Configuration problems detected at startup or while binding a session.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The NextCloud base URL is missing, unparsable or cannot carry a path.
    #[error("invalid share URL {url:?}: {reason}")]
    InvalidShareUrl {
        /// The configured value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The passive port range is empty.
    #[error("invalid passive port range {min}-{max}")]
    InvalidPassiveRange {
        /// Lower bound.
        min: u16,
        /// Upper bound.
        max: u16,
    },

    /// The outbound HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// TLS material could not be generated or staged.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// IO error while staging TLS material.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from filesystem and handle operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The remote store call failed.
    #[error(transparent)]
    Remote(#[from] DavError),

    /// The operation is not part of the capability set.
    #[error("operation not supported: {op}")]
    Unsupported {
        /// Name of the refused operation.
        op: &'static str,
    },

    /// Session could not be bound to a share.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GatewayError {
    /// Capability error for `op`.
    pub fn unsupported(op: &'static str) -> Self {
        GatewayError::Unsupported { op }
    }

    /// Returns true for capability errors, false for everything else.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, GatewayError::Unsupported { .. })
    }

    /// Returns true if the remote reported the resource missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::Remote(e) if e.is_not_found())
    }

    /// Returns true if the remote reported the target as existing.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, GatewayError::Remote(e) if e.is_already_exists())
    }

    /// FTP reply category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Remote(e) if e.is_not_found() => ErrorKind::PermanentFileNotAvailable,
            GatewayError::Remote(e) if e.is_already_exists() => ErrorKind::FileNameNotAllowedError,
            GatewayError::Remote(DavError::InvalidPath(_)) => ErrorKind::FileNameNotAllowedError,
            GatewayError::Unsupported { .. } => ErrorKind::CommandNotImplemented,
            GatewayError::Remote(_) | GatewayError::Config(_) => ErrorKind::LocalError,
        }
    }

    /// Converts this error to a libunftp storage error, keeping it as the source.
    pub fn to_storage_error(self) -> StorageError {
        StorageError::new(self.kind(), self)
    }
}

impl From<GatewayError> for StorageError {
    fn from(e: GatewayError) -> Self {
        e.to_storage_error()
    }
}

impl From<GatewayError> for io::Error {
    fn from(e: GatewayError) -> Self {
        let kind = match &e {
            GatewayError::Unsupported { .. } => io::ErrorKind::Unsupported,
            e if e.is_not_found() => io::ErrorKind::NotFound,
            e if e.is_already_exists() => io::ErrorKind::AlreadyExists,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

/// Errors that stop the FTP server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Startup configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The FTP engine failed to start or stopped with an error.
    #[error("FTP server error: {0}")]
    Server(#[from] libunftp::ServerError),
}

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
