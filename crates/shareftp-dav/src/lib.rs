//! Minimal async WebDAV client for NextCloud public shares.
//!
//! This crate talks to exactly one share root at a time. It covers the verbs
//! an FTP gateway needs and nothing else:
//!
//! | Operation     | Request                         |
//! |---------------|---------------------------------|
//! | `stat`        | `PROPFIND` with `Depth: 0`      |
//! | `list`        | `PROPFIND` with `Depth: 1`      |
//! | `read_stream` | `GET`, body streamed            |
//! | `write`       | `PUT`, body sent in one request |
//! | `mkdir`       | `MKCOL`                         |
//! | `remove`      | `DELETE`                        |
//! | `rename`      | `MOVE` with `Overwrite`         |
//!
//! # Example
//!
//! ```ignore
//! use shareftp_dav::{DavClient, RemoteStore, TransportOptions, build_transport};
//!
//! let transport = build_transport(TransportOptions::default())?;
//! let base = url::Url::parse("https://cloud.example.com/public.php/dav/files/AbC123")?;
//! let client = DavClient::new(base, "AbC123", "", transport);
//!
//! for entry in client.list("/").await? {
//!     println!("{} {}", entry.size, entry.path);
//! }
//! ```
//!
//! # Testing
//!
//! [`testing::MemoryStore`] implements [`RemoteStore`] in memory with the same
//! error contract as [`DavClient`], and records every write it receives.

mod client;
mod entry;
mod error;
mod multistatus;
mod store;
mod transport;

pub mod testing;

pub use client::DavClient;
pub use entry::{DIR_MODE, FILE_MODE, RemoteEntry};
pub use error::{DavError, DavResult};
pub use store::{RemoteStore, RemoteStream};
pub use transport::{HttpTransport, TracingTransport, Transport, TransportOptions, build_transport};
