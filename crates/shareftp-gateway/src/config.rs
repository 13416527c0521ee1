//! Gateway configuration.
//!
//! A [`GatewayConfig`] is built once at startup and handed to the
//! [`SessionDriver`](crate::SessionDriver). Nothing mutates it afterwards.

use crate::error::{ConfigError, ConfigResult};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::ops::RangeInclusive;
use url::Url;

/// Default FTP control port.
pub const DEFAULT_PORT: u16 = 2121;

/// Default passive-mode port range.
pub const DEFAULT_PASSIVE_PORTS: RangeInclusive<u16> = 30000..=30100;

/// Immutable configuration for one gateway process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL of the NextCloud instance, kept as given.
    pub nextcloud_url: String,
    /// Address the control channel binds to.
    pub bind_address: IpAddr,
    /// Control channel port.
    pub port: u16,
    /// Ports offered for passive data connections.
    pub passive_ports: RangeInclusive<u16>,
    /// Require TLS on control and data channels.
    pub tls: bool,
    /// Log every outbound WebDAV request and response.
    pub debug: bool,
    /// Accept invalid certificates on outbound WebDAV calls.
    pub insecure_skip_verify: bool,
}

impl GatewayConfig {
    /// Configuration with defaults for everything except the NextCloud URL.
    pub fn new(nextcloud_url: impl Into<String>) -> Self {
        Self {
            nextcloud_url: nextcloud_url.into(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            passive_ports: DEFAULT_PASSIVE_PORTS,
            tls: false,
            debug: false,
            insecure_skip_verify: false,
        }
    }

    /// Socket address of the control channel.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Parse the NextCloud base URL.
    ///
    /// The URL must be absolute and able to carry path segments.
    pub fn base_url(&self) -> ConfigResult<Url> {
        let url = Url::parse(&self.nextcloud_url).map_err(|e| ConfigError::InvalidShareUrl {
            url: self.nextcloud_url.clone(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidShareUrl {
                url: self.nextcloud_url.clone(),
                reason: "URL cannot carry a path".to_string(),
            });
        }
        Ok(url)
    }

    /// Check everything that can be checked without a network round trip.
    pub fn validate(&self) -> ConfigResult<()> {
        self.base_url()?;
        if self.passive_ports.start() > self.passive_ports.end() {
            return Err(ConfigError::InvalidPassiveRange {
                min: *self.passive_ports.start(),
                max: *self.passive_ports.end(),
            });
        }
        Ok(())
    }
}
