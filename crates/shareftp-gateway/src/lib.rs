//! FTP gateway onto NextCloud public shares.
//!
//! This crate exposes a NextCloud public share as an FTP filesystem. The FTP
//! protocol itself is handled by `libunftp`; this crate supplies the parts
//! `libunftp` calls back into.
//!
//! # How It Works
//!
//! 1. A client logs in. The password is the share token; the username is only
//!    logged.
//! 2. The [`SessionDriver`] builds the share's WebDAV URL and binds a fresh
//!    [`ShareFs`] to it.
//! 3. Every FTP command becomes one WebDAV call through that `ShareFs`.
//!
//! Downloads stream straight from the remote. Uploads are buffered in memory
//! and sent as a single `PUT` when the transfer completes.
//!
//! # Example
//!
//! ```ignore
//! use shareftp_gateway::{GatewayConfig, SessionDriver, serve};
//!
//! let config = GatewayConfig::new("https://cloud.example.com");
//! serve(SessionDriver::new(config)).await?;
//! ```
//!
//! # Limitations
//!
//! - No caching: every listing and stat is a round trip.
//! - No resumed transfers, no random access, no permission changes.

mod audit;
mod auth;
mod backend;
mod config;
mod driver;
mod error;
mod file;
mod fileinfo;
mod filesystem;
mod server;
mod session;
mod tls;

pub use audit::{AuditObserver, FsOperation, TracingAudit};
pub use auth::ShareAuthenticator;
pub use backend::{ShareBackend, ShareUser};
pub use config::{DEFAULT_PASSIVE_PORTS, DEFAULT_PORT, GatewayConfig};
pub use driver::{GREETING, ListenerSettings, SessionDriver, TlsMode};
pub use error::{ConfigError, ConfigResult, GatewayError, GatewayResult, ServeError};
pub use file::{FileHandle, OpenFile, ReadHandle, WriteHandle};
pub use fileinfo::{FileInfo, base_name};
pub use filesystem::{OpenFlags, ShareFs};
pub use server::{PresenceLog, serve};
pub use session::SessionInfo;
pub use tls::{StagedTls, TlsMaterial, TlsVersion};
