//! Per-session filesystem over a remote share.
//!
//! [`ShareFs`] is what the FTP engine talks to once a user is logged in. Every
//! call maps to one remote operation (or none, for write opens) and is
//! reported to the session's [`AuditObserver`] first. Nothing is cached:
//! metadata is fetched fresh on every stat and listing.

use crate::audit::{AuditObserver, FsOperation, TracingAudit};
use crate::error::{GatewayError, GatewayResult};
use crate::file::{OpenFile, ReadHandle, WriteHandle};
use crate::fileinfo::FileInfo;
use crate::session::SessionInfo;
use shareftp_dav::RemoteStore;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, instrument};

/// Access mode requested by a flag-based open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenFlags {
    /// Open an existing file for reading.
    pub const READ_ONLY: Self = Self {
        read: true,
        write: false,
        create: false,
        truncate: false,
    };

    /// Open for writing, creating or truncating as needed.
    pub const WRITE_ONLY: Self = Self {
        read: false,
        write: true,
        create: true,
        truncate: true,
    };

    /// Read-write, create, truncate: what `create` asks for.
    pub const CREATE: Self = Self {
        read: true,
        write: true,
        create: true,
        truncate: true,
    };

    fn wants_write(self) -> bool {
        self.write || self.create
    }
}

impl fmt::Display for OpenFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        match (self.read, self.write) {
            (true, true) => parts.push("rdwr"),
            (false, true) => parts.push("wronly"),
            (true, false) => parts.push("rdonly"),
            (false, false) => parts.push("none"),
        }
        if self.create {
            parts.push("create");
        }
        if self.truncate {
            parts.push("trunc");
        }
        f.write_str(&parts.join("|"))
    }
}

/// Filesystem view of one share, bound to one session.
#[derive(Clone)]
pub struct ShareFs {
    store: Arc<dyn RemoteStore>,
    session: Arc<SessionInfo>,
    audit: Arc<dyn AuditObserver>,
}

impl fmt::Debug for ShareFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareFs")
            .field("session", &self.session)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl ShareFs {
    /// Filesystem over `store` for `session`, logging calls through `tracing`.
    pub fn new(store: Arc<dyn RemoteStore>, session: SessionInfo) -> Self {
        Self {
            store,
            session: Arc::new(session),
            audit: Arc::new(TracingAudit),
        }
    }

    /// Replace the audit observer.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditObserver>) -> Self {
        self.audit = audit;
        self
    }

    /// Filesystem name reported to the engine.
    pub fn name(&self) -> &'static str {
        "NextCloudFS"
    }

    /// The session this filesystem belongs to.
    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// The remote store behind this filesystem.
    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    fn audit(&self, op: &FsOperation) {
        self.audit.record(&self.session, op);
    }

    /// Metadata for `path`.
    #[instrument(level = "debug", skip(self))]
    pub async fn stat(&self, path: &str) -> GatewayResult<FileInfo> {
        self.audit(&FsOperation::Stat { path: path.into() });
        let entry = self.store.stat(path).await?;
        Ok(FileInfo::from(entry))
    }

    /// Entries of the directory at `path`, in the order the remote lists them.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_dir(&self, path: &str) -> GatewayResult<Vec<FileInfo>> {
        self.audit(&FsOperation::ListDir { path: path.into() });
        let entries = self.store.list(path).await?;
        debug!(count = entries.len(), "listed directory");
        Ok(entries.iter().map(FileInfo::from_entry).collect())
    }

    /// Open `path` for sequential reading.
    #[instrument(level = "debug", skip(self))]
    pub async fn open_read(&self, path: &str) -> GatewayResult<ReadHandle> {
        self.audit(&FsOperation::OpenRead { path: path.into() });
        let stream = self.store.read_stream(path).await?;
        Ok(ReadHandle::new(path, stream))
    }

    /// Open `path` for writing. No remote call happens until the handle is
    /// closed.
    pub fn open_write(&self, path: &str, create_if_missing: bool) -> WriteHandle {
        self.audit(&FsOperation::OpenWrite {
            path: path.into(),
            create: create_if_missing,
        });
        self.write_handle(path)
    }

    fn write_handle(&self, path: &str) -> WriteHandle {
        WriteHandle::new(path, Arc::clone(&self.store), Arc::clone(&self.session))
    }

    /// Flag-based open.
    ///
    /// Any of write/create yields a [`WriteHandle`], read alone yields a
    /// [`ReadHandle`], anything else is refused.
    #[instrument(level = "debug", skip(self))]
    pub async fn open_file(&self, path: &str, flags: OpenFlags) -> GatewayResult<OpenFile> {
        self.audit(&FsOperation::OpenFile {
            path: path.into(),
            flags: flags.to_string(),
        });
        if flags.wants_write() {
            return Ok(OpenFile::Write(self.write_handle(path)));
        }
        if flags.read {
            let stream = self.store.read_stream(path).await?;
            return Ok(OpenFile::Read(ReadHandle::new(path, stream)));
        }
        Err(GatewayError::unsupported("open mode"))
    }

    /// Create or truncate `path` for writing.
    pub async fn create(&self, path: &str) -> GatewayResult<WriteHandle> {
        self.audit(&FsOperation::Create { path: path.into() });
        match self.open_file(path, OpenFlags::CREATE).await? {
            OpenFile::Write(handle) => Ok(handle),
            OpenFile::Read(_) => Err(GatewayError::unsupported("create")),
        }
    }

    /// Create a directory. The parent must exist.
    #[instrument(level = "debug", skip(self))]
    pub async fn mkdir(&self, path: &str) -> GatewayResult<()> {
        self.audit(&FsOperation::Mkdir { path: path.into() });
        Ok(self.store.mkdir(path).await?)
    }

    /// Create a directory and any missing parents.
    #[instrument(level = "debug", skip(self))]
    pub async fn mkdir_all(&self, path: &str) -> GatewayResult<()> {
        self.audit(&FsOperation::MkdirAll { path: path.into() });
        Ok(self.store.mkdir_all(path).await?)
    }

    /// Delete `path`.
    #[instrument(level = "debug", skip(self))]
    pub async fn remove(&self, path: &str) -> GatewayResult<()> {
        self.audit(&FsOperation::Remove { path: path.into() });
        Ok(self.store.remove(path).await?)
    }

    /// Delete `path` and everything below it.
    #[instrument(level = "debug", skip(self))]
    pub async fn remove_all(&self, path: &str) -> GatewayResult<()> {
        self.audit(&FsOperation::RemoveAll { path: path.into() });
        Ok(self.store.remove_all(path).await?)
    }

    /// Move `from` to `to`. Fails if `to` exists.
    #[instrument(level = "debug", skip(self))]
    pub async fn rename(&self, from: &str, to: &str) -> GatewayResult<()> {
        self.audit(&FsOperation::Rename {
            from: from.into(),
            to: to.into(),
        });
        Ok(self.store.rename(from, to, false).await?)
    }

    /// Always fails: the share has no permission model.
    pub fn set_permissions(&self, path: &str, mode: u32) -> GatewayResult<()> {
        self.audit(&FsOperation::SetPermissions {
            path: path.into(),
            mode,
        });
        Err(GatewayError::unsupported("chmod"))
    }

    /// Always fails.
    pub fn set_times(
        &self,
        path: &str,
        _atime: SystemTime,
        _mtime: SystemTime,
    ) -> GatewayResult<()> {
        self.audit(&FsOperation::SetTimes { path: path.into() });
        Err(GatewayError::unsupported("chtimes"))
    }

    /// Always fails.
    pub fn set_owner(&self, path: &str, uid: u32, gid: u32) -> GatewayResult<()> {
        self.audit(&FsOperation::SetOwner {
            path: path.into(),
            uid,
            gid,
        });
        Err(GatewayError::unsupported("chown"))
    }
}
