//! `libunftp` authenticator backed by the [`SessionDriver`].

use crate::backend::ShareUser;
use crate::driver::SessionDriver;
use crate::session::SessionInfo;
use async_trait::async_trait;
use libunftp::auth::{AuthenticationError, Authenticator, Credentials};
use std::net::IpAddr;
use tracing::{error, warn};

/// Accepts any username; the password must be a share token.
#[derive(Debug, Clone)]
pub struct ShareAuthenticator {
    driver: SessionDriver,
}

impl ShareAuthenticator {
    /// Authenticator creating sessions through `driver`.
    pub fn new(driver: SessionDriver) -> Self {
        Self { driver }
    }

    /// Log `username` in from `source_ip` with `password` as the share token.
    pub fn login(
        &self,
        username: &str,
        password: Option<&str>,
        source_ip: IpAddr,
    ) -> Result<ShareUser, AuthenticationError> {
        let Some(token) = password.filter(|p| !p.is_empty()) else {
            warn!(remote = %source_ip, user = %username, "login without share token");
            return Err(AuthenticationError::BadPassword);
        };

        let session = SessionInfo::new(source_ip, username);
        let fs = self.driver.authenticate(session, token).map_err(|e| {
            error!(remote = %source_ip, user = %username, error = %e, "cannot bind session");
            AuthenticationError::ImplPropagated(e.to_string(), Some(Box::new(e)))
        })?;
        Ok(ShareUser::new(username, fs))
    }
}

#[async_trait]
impl Authenticator<ShareUser> for ShareAuthenticator {
    async fn authenticate(
        &self,
        username: &str,
        creds: &Credentials,
    ) -> Result<ShareUser, AuthenticationError> {
        self.login(username, creds.password.as_deref(), creds.source_ip)
    }
}
