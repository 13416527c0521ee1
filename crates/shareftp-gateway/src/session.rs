//! Identity of one authenticated FTP connection.

use std::fmt;
use std::net::IpAddr;

/// Who is on the other end of a session. Used for logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Client address.
    pub remote_addr: IpAddr,
    /// FTP username. Descriptive only; the password selects the share.
    pub username: String,
}

impl SessionInfo {
    /// New session identity.
    pub fn new(remote_addr: IpAddr, username: impl Into<String>) -> Self {
        Self {
            remote_addr,
            username: username.into(),
        }
    }
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.remote_addr)
    }
}
