//! Metadata for one remote resource.

use std::time::SystemTime;

/// Mode bits reported for collections.
pub const DIR_MODE: u32 = 0o775;

/// Mode bits reported for plain resources.
pub const FILE_MODE: u32 = 0o664;

/// One resource as reported by the remote store.
///
/// `path` is share-relative and percent-decoded. Collections keep the
/// trailing `/` the server uses in their href, so consumers that want a
/// display name must strip it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Decoded path of the resource, relative to the share root.
    pub path: String,
    /// Content length in bytes (0 for collections).
    pub size: u64,
    /// Synthesized mode bits.
    pub mode: u32,
    /// Last modification time (`UNIX_EPOCH` when the server omits it).
    pub modified: SystemTime,
    /// Whether the resource is a collection.
    pub is_dir: bool,
    /// Content type, if the server reported one.
    pub content_type: Option<String>,
    /// Entity tag, if the server reported one.
    pub etag: Option<String>,
}

impl RemoteEntry {
    /// A plain file entry.
    pub fn file(path: impl Into<String>, size: u64, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            size,
            mode: FILE_MODE,
            modified,
            is_dir: false,
            content_type: None,
            etag: None,
        }
    }

    /// A collection entry. A trailing `/` is added if missing.
    pub fn directory(path: impl Into<String>, modified: SystemTime) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            size: 0,
            mode: DIR_MODE,
            modified,
            is_dir: true,
            content_type: None,
            etag: None,
        }
    }
}
