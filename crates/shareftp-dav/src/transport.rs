//! Outbound HTTP transport and its middleware.
//!
//! A [`DavClient`](crate::DavClient) never talks to `reqwest` directly; it hands
//! fully built requests to a [`Transport`]. Decorators wrap a transport to add
//! behavior without touching the client:
//!
//! ```text
//! TracingTransport ─▶ HttpTransport (optionally accepting invalid certs)
//! ```
//!
//! Certificate-bypass lives in the innermost layer because it is a property
//! of the TLS connector; tracing is always outermost so it sees exactly what
//! goes on the wire.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Request, Response};
use std::fmt::{Debug, Write as _};
use std::sync::Arc;
use tracing::{info, warn};

/// Something that can execute an HTTP request.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Send `request` and return the response head with an unread body.
    async fn execute(&self, request: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: Request) -> reqwest::Result<Response> {
        (**self).execute(request).await
    }
}

/// Base transport backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport with normal certificate validation.
    pub fn new() -> reqwest::Result<Self> {
        Self::build(false)
    }

    /// Transport that accepts any server certificate.
    pub fn insecure() -> reqwest::Result<Self> {
        Self::build(true)
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(accept_invalid_certs: bool) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> reqwest::Result<Response> {
        self.client.execute(request).await
    }
}

/// Logs every request and response, bodies included.
///
/// The response body is read into memory so it can be logged, then handed
/// back unchanged. Transport failures are logged and returned as-is.
#[derive(Debug)]
pub struct TracingTransport<T> {
    inner: T,
}

impl<T> TracingTransport<T> {
    /// Wrap `inner`.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// The wrapped transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for TracingTransport<T> {
    async fn execute(&self, request: Request) -> reqwest::Result<Response> {
        info!(target: "shareftp_dav::wire", "WebDAV request:\n{}", dump_request(&request));

        let response = match self.inner.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                info!(target: "shareftp_dav::wire", error = %e, "WebDAV request failed");
                return Err(e);
            }
        };

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                info!(target: "shareftp_dav::wire", error = %e, "WebDAV response body failed");
                return Err(e);
            }
        };

        let mut dump = format!("{version:?} {status}\n");
        write_headers(&mut dump, &headers);
        dump.push('\n');
        dump.push_str(&String::from_utf8_lossy(&body));
        info!(target: "shareftp_dav::wire", "WebDAV response:\n{dump}");

        let mut rebuilt = http::Response::new(body);
        *rebuilt.status_mut() = status;
        *rebuilt.version_mut() = version;
        *rebuilt.headers_mut() = headers;
        Ok(Response::from(rebuilt))
    }
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        if value.is_sensitive() {
            let _ = writeln!(out, "{name}: <redacted>");
        } else {
            let _ = writeln!(out, "{name}: {}", String::from_utf8_lossy(value.as_bytes()));
        }
    }
}

fn dump_request(request: &Request) -> String {
    let mut out = format!("{} {} {:?}\n", request.method(), request.url(), request.version());
    write_headers(&mut out, request.headers());
    out.push('\n');
    match request.body() {
        Some(body) => match body.as_bytes() {
            Some(bytes) => out.push_str(&String::from_utf8_lossy(bytes)),
            None => out.push_str("<streaming body>"),
        },
        None => {}
    }
    out
}

/// Which decorators to stack on the base transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Accept invalid server certificates on outbound calls.
    pub insecure_skip_verify: bool,
    /// Log full request/response pairs.
    pub trace: bool,
}

/// Build the transport stack described by `options`.
pub fn build_transport(options: TransportOptions) -> reqwest::Result<Arc<dyn Transport>> {
    let base = if options.insecure_skip_verify {
        warn!("TLS certificate verification disabled for outbound WebDAV calls");
        HttpTransport::insecure()?
    } else {
        HttpTransport::new()?
    };

    if options.trace {
        Ok(Arc::new(TracingTransport::new(base)))
    } else {
        Ok(Arc::new(base))
    }
}
