//! FTP server for NextCloud public shares.
//!
//! Clients log in with any username and the share token as password; the
//! server then serves that share over FTP until it is stopped with Ctrl-C.
//!
//! Every flag can also be set through the environment variable shown in
//! `--help`. Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::FalseyValueParser;
use shareftp_gateway::{DEFAULT_PORT, GatewayConfig, SessionDriver, serve};
use std::net::{IpAddr, Ipv4Addr};
use tracing_subscriber::EnvFilter;

/// FTP gateway onto NextCloud public shares
#[derive(Parser, Debug)]
#[command(name = "shareftp", version, about)]
struct Args {
    /// Base URL of the NextCloud instance, e.g. https://cloud.example.com
    #[arg(long, env = "NEXTCLOUD_URL")]
    nextcloud_url: String,

    /// FTP control port
    #[arg(short, long, env = "FTP_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to listen on
    #[arg(long, env = "FTP_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Lowest passive data port
    #[arg(long, env = "PASV_MIN_PORT", default_value_t = 30000)]
    pasv_min_port: u16,

    /// Highest passive data port
    #[arg(long, env = "PASV_MAX_PORT", default_value_t = 30100)]
    pasv_max_port: u16,

    /// Require explicit FTPS (AUTH TLS) on control and data connections, self-signed certificate
    #[arg(long, env = "FTP_TLS", value_parser = FalseyValueParser::new())]
    tls: bool,

    /// Trace every WebDAV request and response
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    debug: bool,

    /// Skip certificate verification on calls to NextCloud
    #[arg(long, env = "INSECURE_SKIP_VERIFY", value_parser = FalseyValueParser::new())]
    insecure_skip_verify: bool,
}

impl Args {
    fn into_config(self) -> GatewayConfig {
        let mut config = GatewayConfig::new(self.nextcloud_url);
        config.bind_address = self.bind;
        config.port = self.port;
        config.passive_ports = self.pasv_min_port..=self.pasv_max_port;
        config.tls = self.tls;
        config.debug = self.debug;
        config.insecure_skip_verify = self.insecure_skip_verify;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    config.validate().context("invalid configuration")?;

    tracing::info!(url = %config.nextcloud_url, "Starting NextCloud FTP gateway");
    if config.tls {
        tracing::info!("TLS enabled (explicit FTPS, AUTH TLS required)");
    }
    if config.debug {
        tracing::info!("DEBUG mode enabled");
    }
    if config.insecure_skip_verify {
        tracing::warn!("Certificate verification disabled for NextCloud calls");
    }

    tokio::select! {
        result = serve(SessionDriver::new(config)) => {
            result.context("FTP server stopped")?;
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
