//! FTP server lifecycle.
//!
//! Wires the [`SessionDriver`] into a `libunftp` server: authenticator,
//! storage backend, passive range, greeting, presence logging and, when
//! enabled, mandatory TLS with an ephemeral certificate. TLS is negotiated
//! with `AUTH TLS`; the engine has no implicit FTPS listener.

use crate::auth::ShareAuthenticator;
use crate::backend::{ShareBackend, ShareUser};
use crate::driver::{GREETING, SessionDriver, TlsMode};
use crate::error::ServeError;
use crate::tls::{StagedTls, TlsVersion};
use async_trait::async_trait;
use libunftp::ServerBuilder;
use libunftp::notification::{EventMeta, PresenceEvent, PresenceListener};
use libunftp::options::{FtpsRequired, TlsFlags};
use std::sync::Arc;
use tracing::info;

/// Logs logins and logouts.
#[derive(Debug, Default, Clone, Copy)]
pub struct PresenceLog;

#[async_trait]
impl PresenceListener for PresenceLog {
    async fn receive_presence_event(&self, event: PresenceEvent, meta: EventMeta) {
        match event {
            PresenceEvent::LoggedIn => {
                info!(user = %meta.username, trace_id = %meta.trace_id, "Client connected");
            }
            PresenceEvent::LoggedOut => {
                info!(user = %meta.username, trace_id = %meta.trace_id, "Client disconnected");
            }
        }
    }
}

/// Engine requirement for (control, data) channels, `None` for plain FTP.
fn ftps_requirements(mode: TlsMode) -> Option<(FtpsRequired, FtpsRequired)> {
    match mode {
        TlsMode::Off => None,
        TlsMode::ExplicitRequired => Some((FtpsRequired::All, FtpsRequired::All)),
    }
}

fn tls_flags(min: TlsVersion) -> TlsFlags {
    match min {
        TlsVersion::V1_2 => TlsFlags::V1_2 | TlsFlags::V1_3,
        TlsVersion::V1_3 => TlsFlags::V1_3,
    }
}

/// Run the FTP server until it fails or the future is dropped.
pub async fn serve(driver: SessionDriver) -> Result<(), ServeError> {
    driver.config().validate()?;
    let settings = driver.listener_settings();

    let authenticator = Arc::new(ShareAuthenticator::new(driver.clone()));
    let mut builder = ServerBuilder::<ShareBackend, ShareUser>::with_authenticator(
        Box::new(|| ShareBackend),
        authenticator,
    )
    .greeting(GREETING)
    // libunftp 0.20 takes a `Range` but binds PASV ports up to and including `end`.
    .passive_ports(*settings.passive_ports.start()..*settings.passive_ports.end())
    .notify_presence(PresenceLog);

    // Must outlive the server: libunftp reads the files by path.
    let mut staged: Option<StagedTls> = None;
    if let (Some((control, data)), Some(material)) =
        (ftps_requirements(settings.tls_mode), driver.tls_material()?)
    {
        let files = material.stage()?;
        builder = builder
            .ftps(files.cert_path().to_path_buf(), files.key_path().to_path_buf())
            .ftps_required(control, data)
            .ftps_tls_flags(tls_flags(material.min_version()));
        staged = Some(files);
        info!("FTPS enabled, AUTH TLS required on control and data channels");
    }

    let server = builder.build()?;
    info!(addr = %settings.listen_addr, "FTP server listening");
    server.listen(settings.listen_addr.to_string()).await?;

    drop(staged);
    Ok(())
}
