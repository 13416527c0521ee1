//! File handles bridging FTP transfers and the remote store.
//!
//! There are two handle types, each with a narrow capability set:
//!
//! - [`ReadHandle`]: sequential reads from a live remote stream.
//! - [`WriteHandle`]: appends into a memory buffer; `close` uploads it in a
//!   single remote write.
//!
//! Both implement [`FileHandle`]. Anything outside a handle's capability set
//! fails with [`GatewayError::Unsupported`], never with a remote error.

use crate::error::{GatewayError, GatewayResult};
use crate::fileinfo::FileInfo;
use crate::session::SessionInfo;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use shareftp_dav::{DavError, RemoteStore, RemoteStream};
use std::fmt;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::{debug, info, warn};

/// Operations every handle exposes.
#[async_trait]
pub trait FileHandle: Send + Sync + fmt::Debug {
    /// Path the handle was opened for.
    fn name(&self) -> &str;

    /// Read the next bytes into `buf`. Returns 0 at end of stream.
    async fn read(&mut self, buf: &mut [u8]) -> GatewayResult<usize>;

    /// Read at an absolute offset.
    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> GatewayResult<usize>;

    /// Append `data`.
    fn write(&mut self, data: &[u8]) -> GatewayResult<usize>;

    /// Write at an absolute offset.
    fn write_at(&mut self, data: &[u8], offset: u64) -> GatewayResult<usize>;

    /// Move the cursor.
    fn seek(&mut self, pos: SeekFrom) -> GatewayResult<u64>;

    /// Change the size of the file.
    fn truncate(&mut self, size: u64) -> GatewayResult<()>;

    /// Metadata of the open file.
    fn stat(&self) -> GatewayResult<FileInfo>;

    /// Flush to stable storage.
    fn sync(&mut self) -> GatewayResult<()>;

    /// Release the handle. Calling it again is a no-op.
    async fn close(&mut self) -> GatewayResult<()>;
}

// ============================================================================
// ReadHandle
// ============================================================================

/// Sequential reader over a remote stream.
///
/// The stream sits behind a mutex only so the handle is `Sync`; all access
/// goes through `&mut self`.
pub struct ReadHandle {
    name: String,
    stream: Mutex<Option<RemoteStream>>,
}

impl ReadHandle {
    /// Wrap an open remote stream.
    pub fn new(name: impl Into<String>, stream: RemoteStream) -> Self {
        Self {
            name: name.into(),
            stream: Mutex::new(Some(stream)),
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.stream.lock().is_none()
    }
}

impl fmt::Debug for ReadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl FileHandle for ReadHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&mut self, buf: &mut [u8]) -> GatewayResult<usize> {
        let stream = self
            .stream
            .get_mut()
            .as_mut()
            .ok_or_else(|| GatewayError::unsupported("read after close"))?;
        let n = tokio::io::AsyncReadExt::read(stream, buf)
            .await
            .map_err(DavError::Io)?;
        Ok(n)
    }

    fn read_at(&mut self, _buf: &mut [u8], _offset: u64) -> GatewayResult<usize> {
        Err(GatewayError::unsupported("read_at"))
    }

    fn write(&mut self, _data: &[u8]) -> GatewayResult<usize> {
        Err(GatewayError::unsupported("write on read handle"))
    }

    fn write_at(&mut self, _data: &[u8], _offset: u64) -> GatewayResult<usize> {
        Err(GatewayError::unsupported("write_at on read handle"))
    }

    fn seek(&mut self, _pos: SeekFrom) -> GatewayResult<u64> {
        Err(GatewayError::unsupported("seek"))
    }

    fn truncate(&mut self, _size: u64) -> GatewayResult<()> {
        Err(GatewayError::unsupported("truncate on read handle"))
    }

    fn stat(&self) -> GatewayResult<FileInfo> {
        Err(GatewayError::unsupported("stat on stream"))
    }

    fn sync(&mut self) -> GatewayResult<()> {
        Ok(())
    }

    async fn close(&mut self) -> GatewayResult<()> {
        if self.stream.get_mut().take().is_some() {
            debug!(path = %self.name, "read stream released");
        }
        Ok(())
    }
}

impl AsyncRead for ReadHandle {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().stream.get_mut() {
            Some(stream) => Pin::new(stream).poll_read(cx, buf),
            None => Poll::Ready(Err(GatewayError::unsupported("read after close").into())),
        }
    }
}

// ============================================================================
// WriteHandle
// ============================================================================

/// Buffers everything written and uploads it once on `close`.
///
/// An empty buffer uploads nothing. A handle dropped without `close` discards
/// its buffer.
pub struct WriteHandle {
    name: String,
    store: Arc<dyn RemoteStore>,
    session: Arc<SessionInfo>,
    buffer: Vec<u8>,
    closed: bool,
}

impl WriteHandle {
    /// Empty handle that will write to `name` on close.
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn RemoteStore>,
        session: Arc<SessionInfo>,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            session,
            buffer: Vec::new(),
            closed: false,
        }
    }

    /// Bytes buffered so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn append(&mut self, data: &[u8]) -> GatewayResult<usize> {
        if self.closed {
            return Err(GatewayError::unsupported("write after close"));
        }
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }
}

impl fmt::Debug for WriteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteHandle")
            .field("name", &self.name)
            .field("buffered", &self.buffer.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FileHandle for WriteHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&mut self, _buf: &mut [u8]) -> GatewayResult<usize> {
        Err(GatewayError::unsupported("read on write handle"))
    }

    fn read_at(&mut self, _buf: &mut [u8], _offset: u64) -> GatewayResult<usize> {
        Err(GatewayError::unsupported("read_at on write handle"))
    }

    fn write(&mut self, data: &[u8]) -> GatewayResult<usize> {
        self.append(data)
    }

    fn write_at(&mut self, _data: &[u8], _offset: u64) -> GatewayResult<usize> {
        Err(GatewayError::unsupported("write_at"))
    }

    fn seek(&mut self, _pos: SeekFrom) -> GatewayResult<u64> {
        Err(GatewayError::unsupported("seek"))
    }

    fn truncate(&mut self, _size: u64) -> GatewayResult<()> {
        Err(GatewayError::unsupported("truncate"))
    }

    fn stat(&self) -> GatewayResult<FileInfo> {
        Err(GatewayError::unsupported("stat on stream"))
    }

    fn sync(&mut self) -> GatewayResult<()> {
        Ok(())
    }

    async fn close(&mut self) -> GatewayResult<()> {
        if self.closed {
            return Ok(());
        }
        // Marked before the upload so a failed close is never retried.
        self.closed = true;
        if self.buffer.is_empty() {
            return Ok(());
        }

        let data = Bytes::from(std::mem::take(&mut self.buffer));
        let len = data.len();
        self.store.write(&self.name, data).await?;

        info!(
            remote = %self.session.remote_addr,
            path = %self.name,
            bytes = len,
            "Successfully wrote file"
        );
        Ok(())
    }
}

impl AsyncWrite for WriteHandle {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(self.get_mut().append(buf).map_err(io::Error::from))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    // Upload happens in `close`, which needs an async remote call.
    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl Drop for WriteHandle {
    fn drop(&mut self) {
        if !self.closed && !self.buffer.is_empty() {
            warn!(
                remote = %self.session.remote_addr,
                path = %self.name,
                bytes = self.buffer.len(),
                "write handle dropped without close, discarding buffered data"
            );
        }
    }
}

// ============================================================================
// OpenFile
// ============================================================================

/// Result of a flag-based open: exactly one of the two handle kinds.
#[derive(Debug)]
pub enum OpenFile {
    /// Opened for reading.
    Read(ReadHandle),
    /// Opened for writing.
    Write(WriteHandle),
}

impl OpenFile {
    /// The handle behind the tag.
    pub fn handle_mut(&mut self) -> &mut dyn FileHandle {
        match self {
            OpenFile::Read(h) => h,
            OpenFile::Write(h) => h,
        }
    }

    /// Path the handle was opened for.
    pub fn name(&self) -> &str {
        match self {
            OpenFile::Read(h) => h.name(),
            OpenFile::Write(h) => h.name(),
        }
    }

    /// Close whichever handle this is.
    pub async fn close(&mut self) -> GatewayResult<()> {
        self.handle_mut().close().await
    }
}
