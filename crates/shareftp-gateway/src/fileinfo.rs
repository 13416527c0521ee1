//! Translation of remote entries into FTP-facing file metadata.
//!
//! This module provides [`FileInfo`] and the `libunftp` `Metadata` trait
//! implementation for it.

use libunftp::storage::{Error as StorageError, Metadata};
use shareftp_dav::RemoteEntry;
use std::time::SystemTime;

/// Metadata for one file or directory as the FTP engine sees it.
///
/// Derived from a [`RemoteEntry`] on every stat or listing; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Last path segment, without trailing separators. Empty for the root.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Mode bits as reported by the remote.
    pub mode: u32,
    /// Modification time.
    pub modified: SystemTime,
    /// Whether this is a directory.
    pub is_dir: bool,
}

impl FileInfo {
    /// Translate a remote entry.
    pub fn from_entry(entry: &RemoteEntry) -> Self {
        Self {
            name: base_name(&entry.path).to_string(),
            size: entry.size,
            mode: entry.mode,
            modified: entry.modified,
            is_dir: entry.is_dir,
        }
    }
}

impl From<RemoteEntry> for FileInfo {
    fn from(entry: RemoteEntry) -> Self {
        Self::from_entry(&entry)
    }
}

/// Last segment of `path` once trailing separators are stripped.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

impl Metadata for FileInfo {
    fn len(&self) -> u64 {
        self.size
    }

    fn is_dir(&self) -> bool {
        self.is_dir
    }

    fn is_file(&self) -> bool {
        !self.is_dir
    }

    fn is_symlink(&self) -> bool {
        false
    }

    fn modified(&self) -> Result<SystemTime, StorageError> {
        Ok(self.modified)
    }

    // Ownership is not modelled by the share.
    fn gid(&self) -> u32 {
        0
    }

    fn uid(&self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shareftp_dav::{DIR_MODE, FILE_MODE};
    use std::time::Duration;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/a.txt"), "a.txt");
        assert_eq!(base_name("/sub/"), "sub");
        assert_eq!(base_name("/deep/er/path///"), "path");
        assert_eq!(base_name("plain"), "plain");
        assert_eq!(base_name("/"), "");
        assert_eq!(base_name(""), "");
    }

    #[test]
    fn test_file_entry_passes_fields_through() {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let info = FileInfo::from(RemoteEntry::file("/docs/report.pdf", 4096, modified));

        assert_eq!(info.name, "report.pdf");
        assert_eq!(info.size, 4096);
        assert_eq!(info.mode, FILE_MODE);
        assert_eq!(info.modified, modified);
        assert!(info.is_file());
        assert_eq!(Metadata::len(&info), 4096);
        assert_eq!(Metadata::modified(&info).unwrap(), modified);
    }

    #[test]
    fn test_directory_name_has_no_trailing_separator() {
        let info = FileInfo::from(RemoteEntry::directory("/docs/", SystemTime::UNIX_EPOCH));
        assert_eq!(info.name, "docs");
        assert!(Metadata::is_dir(&info));
        assert!(!info.is_symlink());
        assert_eq!(info.mode, DIR_MODE);
    }
}
