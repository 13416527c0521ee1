//! Session lifecycle: listener settings, authentication, TLS material.
//!
//! The FTP password is a NextCloud public-share token. Authenticating binds a
//! new [`ShareFs`] to the WebDAV endpoint of that share:
//!
//! ```text
//! <nextcloud-url>/public.php/dav/files/<token>/
//! ```
//!
//! The username is only used for logging.

use crate::audit::{AuditObserver, TracingAudit};
use crate::config::GatewayConfig;
use crate::error::{ConfigError, ConfigResult, GatewayResult};
use crate::filesystem::ShareFs;
use crate::session::SessionInfo;
use crate::tls::TlsMaterial;
use shareftp_dav::{DavClient, TransportOptions, build_transport};
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;

/// Path segments between the NextCloud base URL and the share token.
const PUBLIC_SHARE_SEGMENTS: [&str; 3] = ["public.php", "dav", "files"];

/// Greeting sent to clients on connect.
pub const GREETING: &str = "Welcome to NextCloud FTP Gateway";

/// How the control and data channels are secured.
///
/// `libunftp` negotiates TLS in-band only, so there is no implicit mode:
/// with TLS on, the server greets in clear text and refuses every command
/// except `AUTH TLS` until the upgrade, and data transfers need `PROT P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain FTP.
    Off,
    /// `AUTH TLS` upgrade mandatory on control and data channels.
    ExplicitRequired,
}

/// What the FTP listener needs to know to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSettings {
    /// Control channel address.
    pub listen_addr: SocketAddr,
    /// Ports offered for passive data connections.
    pub passive_ports: RangeInclusive<u16>,
    /// Channel security.
    pub tls_mode: TlsMode,
}

impl ListenerSettings {
    /// Whether every connection must use TLS.
    pub fn tls_required(&self) -> bool {
        self.tls_mode != TlsMode::Off
    }
}

/// Creates one [`ShareFs`] per authenticated connection.
#[derive(Debug, Clone)]
pub struct SessionDriver {
    config: Arc<GatewayConfig>,
    audit: Arc<dyn AuditObserver>,
}

impl SessionDriver {
    /// Driver for `config`. Filesystem calls are logged through `tracing`.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config: Arc::new(config),
            audit: Arc::new(TracingAudit),
        }
    }

    /// Use `audit` for every session created from now on.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditObserver>) -> Self {
        self.audit = audit;
        self
    }

    /// The configuration this driver was built with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Listener address, passive range and TLS requirement.
    pub fn listener_settings(&self) -> ListenerSettings {
        info!(
            min = self.config.passive_ports.start(),
            max = self.config.passive_ports.end(),
            "Passive port range"
        );
        ListenerSettings {
            listen_addr: self.config.listen_addr(),
            passive_ports: self.config.passive_ports.clone(),
            tls_mode: if self.config.tls {
                TlsMode::ExplicitRequired
            } else {
                TlsMode::Off
            },
        }
    }

    /// WebDAV root of the public share identified by `token`.
    ///
    /// The token is escaped as a single path segment.
    pub fn share_url(&self, token: &str) -> ConfigResult<Url> {
        let mut url = self.config.base_url()?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| ConfigError::InvalidShareUrl {
                url: self.config.nextcloud_url.clone(),
                reason: "URL cannot carry a path".to_string(),
            })?;
            segments.pop_if_empty();
            segments.extend(PUBLIC_SHARE_SEGMENTS);
            segments.push(token);
        }
        Ok(url)
    }

    /// Bind a new filesystem to the share `token` refers to.
    ///
    /// No remote call is made; a wrong token shows up on the first operation.
    #[instrument(
        level = "debug",
        skip(self, session, token),
        fields(remote = %session.remote_addr, user = %session.username)
    )]
    pub fn authenticate(&self, session: SessionInfo, token: &str) -> GatewayResult<ShareFs> {
        info!(
            remote = %session.remote_addr,
            user = %session.username,
            "Authentication attempt"
        );

        let url = self.share_url(token)?;
        let transport = build_transport(TransportOptions {
            insecure_skip_verify: self.config.insecure_skip_verify,
            trace: self.config.debug,
        })
        .map_err(ConfigError::from)?;

        let client = DavClient::new(url, &session.username, token, transport);
        Ok(ShareFs::new(Arc::new(client), session).with_audit(Arc::clone(&self.audit)))
    }

    /// Fresh self-signed TLS material, or `None` when TLS is off.
    pub fn tls_material(&self) -> ConfigResult<Option<TlsMaterial>> {
        if !self.config.tls {
            return Ok(None);
        }
        TlsMaterial::self_signed(&["localhost"]).map(Some)
    }
}
