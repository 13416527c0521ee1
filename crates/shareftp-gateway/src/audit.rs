//! Per-session audit trail of filesystem calls.
//!
//! Every [`ShareFs`](crate::ShareFs) call is reported to an [`AuditObserver`]
//! before it touches the remote. The default [`TracingAudit`] writes one
//! `info` event per call; tests swap in an observer that records calls.

use crate::session::SessionInfo;
use std::fmt;
use tracing::info;

/// A filesystem call as issued by the FTP engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOperation {
    Stat { path: String },
    ListDir { path: String },
    OpenRead { path: String },
    OpenWrite { path: String, create: bool },
    OpenFile { path: String, flags: String },
    Create { path: String },
    Mkdir { path: String },
    MkdirAll { path: String },
    Remove { path: String },
    RemoveAll { path: String },
    Rename { from: String, to: String },
    SetPermissions { path: String, mode: u32 },
    SetTimes { path: String },
    SetOwner { path: String, uid: u32, gid: u32 },
}

impl FsOperation {
    /// Short operation name, as used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            FsOperation::Stat { .. } => "Stat",
            FsOperation::ListDir { .. } => "ReadDir",
            FsOperation::OpenRead { .. } => "Open",
            FsOperation::OpenWrite { .. } => "OpenWrite",
            FsOperation::OpenFile { .. } => "OpenFile",
            FsOperation::Create { .. } => "Create",
            FsOperation::Mkdir { .. } => "Mkdir",
            FsOperation::MkdirAll { .. } => "MkdirAll",
            FsOperation::Remove { .. } => "Remove",
            FsOperation::RemoveAll { .. } => "RemoveAll",
            FsOperation::Rename { .. } => "Rename",
            FsOperation::SetPermissions { .. } => "Chmod",
            FsOperation::SetTimes { .. } => "Chtimes",
            FsOperation::SetOwner { .. } => "Chown",
        }
    }
}

impl fmt::Display for FsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match self {
            FsOperation::Rename { from, to } => write!(f, "{name}: {from} -> {to}"),
            FsOperation::OpenFile { path, flags } => write!(f, "{name}: {path} ({flags})"),
            FsOperation::SetPermissions { path, mode } => write!(f, "{name}: {path} ({mode:o})"),
            FsOperation::Stat { path }
            | FsOperation::ListDir { path }
            | FsOperation::OpenRead { path }
            | FsOperation::OpenWrite { path, .. }
            | FsOperation::Create { path }
            | FsOperation::Mkdir { path }
            | FsOperation::MkdirAll { path }
            | FsOperation::Remove { path }
            | FsOperation::RemoveAll { path }
            | FsOperation::SetTimes { path }
            | FsOperation::SetOwner { path, .. } => write!(f, "{name}: {path}"),
        }
    }
}

/// Receives one notification per filesystem call.
pub trait AuditObserver: Send + Sync + fmt::Debug {
    /// Called before the operation runs.
    fn record(&self, session: &SessionInfo, op: &FsOperation);
}

/// Logs every call through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAudit;

impl AuditObserver for TracingAudit {
    fn record(&self, session: &SessionInfo, op: &FsOperation) {
        info!(remote = %session.remote_addr, user = %session.username, "{op}");
    }
}
