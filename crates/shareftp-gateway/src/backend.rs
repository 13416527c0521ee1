//! `libunftp` storage backend forwarding to the session's [`ShareFs`].
//!
//! The backend itself is stateless; the filesystem for a connection travels
//! inside the authenticated [`ShareUser`].

use crate::file::FileHandle;
use crate::fileinfo::FileInfo;
use crate::filesystem::ShareFs;
use async_trait::async_trait;
use libunftp::auth::UserDetail;
use libunftp::storage::{Error as StorageError, ErrorKind, Fileinfo, Metadata, StorageBackend};
use std::fmt::{self, Debug};
use std::io::SeekFrom;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;
use tracing::{debug, instrument};

/// An authenticated FTP user and the share it is bound to.
#[derive(Debug)]
pub struct ShareUser {
    username: String,
    fs: ShareFs,
}

impl ShareUser {
    /// Bind `username` to `fs`.
    pub fn new(username: impl Into<String>, fs: ShareFs) -> Self {
        Self {
            username: username.into(),
            fs,
        }
    }

    /// The FTP username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Address the user connected from.
    pub fn remote_addr(&self) -> IpAddr {
        self.fs.session().remote_addr
    }

    /// The session's filesystem.
    pub fn fs(&self) -> &ShareFs {
        &self.fs
    }
}

impl fmt::Display for ShareUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

impl UserDetail for ShareUser {}

/// Share-relative path with a leading `/`, as the remote store expects.
fn remote_path<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref().to_string_lossy();
    if path.starts_with('/') {
        path.into_owned()
    } else {
        format!("/{path}")
    }
}

/// Storage backend handed to `libunftp`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShareBackend;

#[async_trait]
impl StorageBackend<ShareUser> for ShareBackend {
    type Metadata = FileInfo;

    // Restarted transfers would need random access, which neither handle has.
    fn supported_features(&self) -> u32 {
        0
    }

    #[instrument(level = "debug", skip(self, user))]
    async fn metadata<P: AsRef<Path> + Send + Debug>(
        &self,
        user: &ShareUser,
        path: P,
    ) -> Result<Self::Metadata, StorageError> {
        Ok(user.fs().stat(&remote_path(path)).await?)
    }

    #[instrument(level = "debug", skip(self, user))]
    async fn list<P: AsRef<Path> + Send + Debug>(
        &self,
        user: &ShareUser,
        path: P,
    ) -> Result<Vec<Fileinfo<PathBuf, Self::Metadata>>, StorageError>
    where
        <Self as StorageBackend<ShareUser>>::Metadata: Metadata,
    {
        let entries = user.fs().list_dir(&remote_path(path)).await?;
        Ok(entries
            .into_iter()
            .map(|info| Fileinfo {
                path: PathBuf::from(&info.name),
                metadata: info,
            })
            .collect())
    }

    #[instrument(level = "debug", skip(self, user))]
    async fn get<P: AsRef<Path> + Send + Debug>(
        &self,
        user: &ShareUser,
        path: P,
        start_pos: u64,
    ) -> Result<Box<dyn AsyncRead + Send + Sync + Unpin>, StorageError> {
        let mut handle = user.fs().open_read(&remote_path(path)).await?;
        if start_pos > 0 {
            handle.seek(SeekFrom::Start(start_pos))?;
        }
        Ok(Box::new(handle))
    }

    #[instrument(level = "debug", skip(self, user, input))]
    async fn put<P: AsRef<Path> + Send + Debug, R: AsyncRead + Send + Sync + Unpin + 'static>(
        &self,
        user: &ShareUser,
        mut input: R,
        path: P,
        start_pos: u64,
    ) -> Result<u64, StorageError> {
        let mut handle = user.fs().create(&remote_path(path)).await?;
        if start_pos > 0 {
            handle.write_at(&[], start_pos)?;
        }

        let copied = tokio::io::copy(&mut input, &mut handle)
            .await
            .map_err(|e| StorageError::new(ErrorKind::LocalError, e))?;
        debug!(bytes = copied, "upload buffered");

        handle.close().await?;
        Ok(copied)
    }

    #[instrument(level = "debug", skip(self, user))]
    async fn del<P: AsRef<Path> + Send + Debug>(
        &self,
        user: &ShareUser,
        path: P,
    ) -> Result<(), StorageError> {
        Ok(user.fs().remove(&remote_path(path)).await?)
    }

    #[instrument(level = "debug", skip(self, user))]
    async fn mkd<P: AsRef<Path> + Send + Debug>(
        &self,
        user: &ShareUser,
        path: P,
    ) -> Result<(), StorageError> {
        Ok(user.fs().mkdir(&remote_path(path)).await?)
    }

    #[instrument(level = "debug", skip(self, user))]
    async fn rename<P: AsRef<Path> + Send + Debug>(
        &self,
        user: &ShareUser,
        from: P,
        to: P,
    ) -> Result<(), StorageError> {
        let (from, to) = (remote_path(from), remote_path(to));
        Ok(user.fs().rename(&from, &to).await?)
    }

    #[instrument(level = "debug", skip(self, user))]
    async fn rmd<P: AsRef<Path> + Send + Debug>(
        &self,
        user: &ShareUser,
        path: P,
    ) -> Result<(), StorageError> {
        Ok(user.fs().remove_all(&remote_path(path)).await?)
    }

    #[instrument(level = "debug", skip(self, user))]
    async fn cwd<P: AsRef<Path> + Send + Debug>(
        &self,
        user: &ShareUser,
        path: P,
    ) -> Result<(), StorageError> {
        let path = remote_path(path);
        let info = user.fs().stat(&path).await?;
        if info.is_dir {
            Ok(())
        } else {
            Err(StorageError::new(
                ErrorKind::PermanentFileNotAvailable,
                format!("not a directory: {path}"),
            ))
        }
    }
}
