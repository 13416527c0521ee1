//! Error types for remote store operations.

use reqwest::StatusCode;
use std::io;
use thiserror::Error;

/// Errors surfaced by a [`RemoteStore`](crate::RemoteStore).
///
/// Callers treat every variant as "remote operation failed"; the variants only
/// exist so the FTP layer can pick a sensible reply code.
#[derive(Debug, Error)]
pub enum DavError {
    /// The HTTP exchange itself failed (connect, TLS, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a status the operation does not accept.
    #[error("{method} {path} failed with HTTP {status}")]
    Status {
        /// HTTP method of the failed request.
        method: String,
        /// Share-relative path the request targeted.
        path: String,
        /// Status code returned by the server.
        status: StatusCode,
    },

    /// The resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The target already exists (MKCOL on a collection, MOVE without overwrite).
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Multistatus body could not be parsed.
    #[error("malformed multistatus response: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Response was well-formed XML but not what we asked for.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A path could not be turned into a resource URL.
    #[error("invalid path {0:?}")]
    InvalidPath(String),

    /// A request method token was rejected.
    #[error("invalid request method: {0}")]
    InvalidMethod(#[from] http::method::InvalidMethod),

    /// IO error while streaming.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl DavError {
    /// Returns true if the error means the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            DavError::NotFound(_) => true,
            DavError::Status { status, .. } => *status == StatusCode::NOT_FOUND,
            _ => false,
        }
    }

    /// Returns true if the error means the target already exists.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, DavError::AlreadyExists(_))
    }
}

/// Result type for remote store operations.
pub type DavResult<T> = Result<T, DavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(DavError::NotFound("/a".to_string()).is_not_found());
        assert!(
            DavError::Status {
                method: "GET".to_string(),
                path: "/a".to_string(),
                status: StatusCode::NOT_FOUND,
            }
            .is_not_found()
        );
        assert!(!DavError::AlreadyExists("/a".to_string()).is_not_found());
    }

    #[test]
    fn test_status_display() {
        let e = DavError::Status {
            method: "MKCOL".to_string(),
            path: "/docs".to_string(),
            status: StatusCode::FORBIDDEN,
        };
        assert_eq!(e.to_string(), "MKCOL /docs failed with HTTP 403 Forbidden");
    }
}
