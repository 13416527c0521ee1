//! Ephemeral TLS material for the FTP listener.
//!
//! A fresh self-signed certificate is generated at startup and never
//! persisted by the gateway itself. `libunftp` loads certificates from files,
//! so [`TlsMaterial::stage`] writes them to private temporary files that live
//! exactly as long as the returned [`StagedTls`].

use crate::error::{ConfigError, ConfigResult};
use std::fmt;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Lowest TLS protocol version the listener accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// TLS 1.2
    V1_2,
    /// TLS 1.3
    V1_3,
}

/// An in-memory certificate and private key, PEM encoded.
#[derive(Clone)]
pub struct TlsMaterial {
    cert_pem: String,
    key_pem: String,
    min_version: TlsVersion,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("min_version", &self.min_version)
            .finish_non_exhaustive()
    }
}

impl TlsMaterial {
    /// Generate a self-signed certificate for `names`, requiring TLS 1.2 or later.
    pub fn self_signed(names: &[&str]) -> ConfigResult<Self> {
        let names: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();
        let certified = rcgen::generate_simple_self_signed(names)
            .map_err(|e| ConfigError::Tls(e.to_string()))?;

        Ok(Self {
            cert_pem: certified.cert.pem(),
            key_pem: certified.key_pair.serialize_pem(),
            min_version: TlsVersion::V1_2,
        })
    }

    /// PEM-encoded certificate.
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// PEM-encoded private key.
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// Minimum accepted protocol version.
    pub fn min_version(&self) -> TlsVersion {
        self.min_version
    }

    /// Write the certificate and key to temporary files.
    pub fn stage(&self) -> ConfigResult<StagedTls> {
        let cert = write_temp("shareftp-cert", &self.cert_pem)?;
        let key = write_temp("shareftp-key", &self.key_pem)?;
        debug!(cert = %cert.path().display(), "staged TLS material");
        Ok(StagedTls { cert, key })
    }
}

fn write_temp(prefix: &str, contents: &str) -> ConfigResult<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".pem")
        .tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Certificate and key files on disk. Both are deleted on drop.
#[derive(Debug)]
pub struct StagedTls {
    cert: NamedTempFile,
    key: NamedTempFile,
}

impl StagedTls {
    /// Path of the certificate file.
    pub fn cert_path(&self) -> &Path {
        self.cert.path()
    }

    /// Path of the private key file.
    pub fn key_path(&self) -> &Path {
        self.key.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_signed_material() {
        let material = TlsMaterial::self_signed(&["localhost"]).unwrap();
        assert!(material.cert_pem().starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(material.key_pem().contains("PRIVATE KEY-----"));
        assert_eq!(material.min_version(), TlsVersion::V1_2);
    }

    #[test]
    fn test_each_call_generates_new_material() {
        let a = TlsMaterial::self_signed(&["localhost"]).unwrap();
        let b = TlsMaterial::self_signed(&["localhost"]).unwrap();
        assert_ne!(a.cert_pem(), b.cert_pem());
    }

    #[test]
    fn test_staged_files_are_removed_on_drop() {
        let material = TlsMaterial::self_signed(&["localhost"]).unwrap();
        let staged = material.stage().unwrap();
        let cert_path = staged.cert_path().to_path_buf();

        let on_disk = std::fs::read_to_string(&cert_path).unwrap();
        assert_eq!(on_disk, material.cert_pem());
        assert!(staged.key_path().exists());

        drop(staged);
        assert!(!cert_path.exists());
    }

    #[test]
    fn test_debug_hides_key() {
        let material = TlsMaterial::self_signed(&["localhost"]).unwrap();
        assert!(!format!("{material:?}").contains("PRIVATE KEY"));
    }
}
