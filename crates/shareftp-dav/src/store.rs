//! The high-level remote store contract.

use crate::entry::RemoteEntry;
use crate::error::DavResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;
use tokio::io::AsyncRead;

/// A live remote byte stream, read sequentially.
pub type RemoteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Operations a remote file store offers.
///
/// Paths are share-relative with a leading `/`. Implementations never cache:
/// every call is a round trip.
#[async_trait]
pub trait RemoteStore: Send + Sync + Debug {
    /// Metadata for a single resource.
    async fn stat(&self, path: &str) -> DavResult<RemoteEntry>;

    /// Children of a collection, in the order the store reports them.
    async fn list(&self, path: &str) -> DavResult<Vec<RemoteEntry>>;

    /// Open the content of a resource as a stream.
    async fn read_stream(&self, path: &str) -> DavResult<RemoteStream>;

    /// Replace the content of a resource with `data` in one request.
    async fn write(&self, path: &str, data: Bytes) -> DavResult<()>;

    /// Create a single collection. The parent must exist.
    async fn mkdir(&self, path: &str) -> DavResult<()>;

    /// Create a collection and any missing ancestors.
    async fn mkdir_all(&self, path: &str) -> DavResult<()>;

    /// Delete a resource. Fails if it does not exist.
    async fn remove(&self, path: &str) -> DavResult<()>;

    /// Delete a resource and everything below it. A missing resource is not
    /// an error.
    async fn remove_all(&self, path: &str) -> DavResult<()>;

    /// Move `from` to `to`. With `overwrite` unset, an existing destination
    /// makes the call fail.
    async fn rename(&self, from: &str, to: &str, overwrite: bool) -> DavResult<()>;
}
