//! WebDAV client bound to one share.

use crate::entry::RemoteEntry;
use crate::error::{DavError, DavResult};
use crate::multistatus::{self, PROPFIND_BODY};
use crate::store::{RemoteStore, RemoteStream};
use crate::transport::Transport;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Body, Method, Request, Response, StatusCode};
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use tracing::{debug, instrument, trace};
use url::Url;

const PROPFIND: &str = "PROPFIND";
const MKCOL: &str = "MKCOL";
const MOVE: &str = "MOVE";

const DEPTH: &str = "depth";
const DESTINATION: &str = "destination";
const OVERWRITE: &str = "overwrite";

/// WebDAV client for a single share root.
///
/// The base URL is fixed at construction. Every method is one round trip
/// (or a short sequence of them for `mkdir_all`) through the configured
/// [`Transport`].
#[derive(Debug, Clone)]
pub struct DavClient {
    base: Url,
    auth: HeaderValue,
    transport: Arc<dyn Transport>,
}

impl DavClient {
    /// Create a client for the collection at `base`.
    ///
    /// `user` and `password` are sent as HTTP Basic credentials.
    pub fn new(mut base: Url, user: &str, password: &str, transport: Arc<dyn Transport>) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let encoded = STANDARD.encode(format!("{user}:{password}"));
        // base64 output is always a valid header value
        let mut auth = HeaderValue::from_str(&format!("Basic {encoded}"))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
        auth.set_sensitive(true);

        Self {
            base,
            auth,
            transport,
        }
    }

    /// The share root this client is bound to.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a share-relative path to a resource URL.
    ///
    /// Each segment is percent-encoded. `..` is rejected so a path can never
    /// leave the share.
    pub fn resource_url(&self, path: &str, collection: bool) -> DavResult<Url> {
        let mut url = self.base.clone();
        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if segments.contains(&"..") {
            return Err(DavError::InvalidPath(path.to_string()));
        }

        {
            let mut out = url
                .path_segments_mut()
                .map_err(|()| DavError::InvalidPath(path.to_string()))?;
            out.pop_if_empty();
            out.extend(segments.iter().copied());
            if collection || segments.is_empty() {
                out.push("");
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> Request {
        let mut request = Request::new(method, url);
        request.headers_mut().insert(AUTHORIZATION, self.auth.clone());
        request
    }

    async fn send(&self, request: Request) -> DavResult<Response> {
        trace!(method = %request.method(), url = %request.url(), "sending");
        Ok(self.transport.execute(request).await?)
    }

    async fn propfind(&self, path: &str, depth: &'static str) -> DavResult<Vec<RemoteEntry>> {
        let url = self.resource_url(path, depth != "0")?;
        let propfind = extension_method(PROPFIND)?;
        let mut request = self.request(propfind.clone(), url);
        let headers = request.headers_mut();
        headers.insert(HeaderName::from_static(DEPTH), HeaderValue::from_static(depth));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/xml; charset=utf-8"),
        );
        *request.body_mut() = Some(Body::from(PROPFIND_BODY));

        let response = self.send(request).await?;
        let status = response.status();
        if status != StatusCode::MULTI_STATUS {
            return Err(status_error(&propfind, path, status));
        }

        let body = response.text().await?;
        multistatus::parse(&body, self.base.path())
    }
}

/// A WebDAV method outside the `http` crate's predefined set.
fn extension_method(name: &str) -> DavResult<Method> {
    Ok(Method::from_bytes(name.as_bytes())?)
}

fn status_error(method: &Method, path: &str, status: StatusCode) -> DavError {
    if status == StatusCode::NOT_FOUND {
        DavError::NotFound(path.to_string())
    } else {
        DavError::Status {
            method: method.to_string(),
            path: path.to_string(),
            status,
        }
    }
}

/// Canonical form used to recognize the collection itself in a listing.
pub(crate) fn normalize(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

#[async_trait]
impl RemoteStore for DavClient {
    #[instrument(level = "trace", skip(self))]
    async fn stat(&self, path: &str) -> DavResult<RemoteEntry> {
        self.propfind(path, "0")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DavError::InvalidResponse(format!("empty multistatus for {path}")))
    }

    #[instrument(level = "trace", skip(self))]
    async fn list(&self, path: &str) -> DavResult<Vec<RemoteEntry>> {
        let own = normalize(path);
        let entries = self.propfind(path, "1").await?;
        Ok(entries
            .into_iter()
            .filter(|e| e.path.trim_end_matches('/') != own.trim_end_matches('/'))
            .collect())
    }

    #[instrument(level = "trace", skip(self))]
    async fn read_stream(&self, path: &str) -> DavResult<RemoteStream> {
        let url = self.resource_url(path, false)?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&Method::GET, path, status));
        }

        let stream = response.bytes_stream().map_err(io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(stream))))
    }

    #[instrument(level = "trace", skip(self, data), fields(len = data.len()))]
    async fn write(&self, path: &str, data: Bytes) -> DavResult<()> {
        let url = self.resource_url(path, false)?;
        let mut request = self.request(Method::PUT, url);
        *request.body_mut() = Some(Body::from(data));

        let status = self.send(request).await?.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(&Method::PUT, path, status))
        }
    }

    #[instrument(level = "trace", skip(self))]
    async fn mkdir(&self, path: &str) -> DavResult<()> {
        let url = self.resource_url(path, true)?;
        let mkcol = extension_method(MKCOL)?;
        let status = self.send(self.request(mkcol.clone(), url)).await?.status();
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::METHOD_NOT_ALLOWED => Err(DavError::AlreadyExists(path.to_string())),
            s => Err(status_error(&mkcol, path, s)),
        }
    }

    #[instrument(level = "trace", skip(self))]
    async fn mkdir_all(&self, path: &str) -> DavResult<()> {
        match self.mkdir(path).await {
            Ok(()) | Err(DavError::AlreadyExists(_)) => return Ok(()),
            Err(DavError::Status { status, .. }) if status == StatusCode::CONFLICT => {}
            Err(e) => return Err(e),
        }

        // Parent chain is missing: create from the top down.
        debug!(path = %path, "creating missing ancestors");
        let mut prefix = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            prefix.push('/');
            prefix.push_str(segment);
            match self.mkdir(&prefix).await {
                Ok(()) | Err(DavError::AlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    async fn remove(&self, path: &str) -> DavResult<()> {
        let url = self.resource_url(path, false)?;
        let status = self.send(self.request(Method::DELETE, url)).await?.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(&Method::DELETE, path, status))
        }
    }

    #[instrument(level = "trace", skip(self))]
    async fn remove_all(&self, path: &str) -> DavResult<()> {
        match self.remove(path).await {
            Err(DavError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    #[instrument(level = "trace", skip(self))]
    async fn rename(&self, from: &str, to: &str, overwrite: bool) -> DavResult<()> {
        let source = self.resource_url(from, false)?;
        let destination = self.resource_url(to, false)?;

        let method = extension_method(MOVE)?;
        let mut request = self.request(method.clone(), source);
        let headers = request.headers_mut();
        let destination = HeaderValue::from_str(destination.as_str())
            .map_err(|_| DavError::InvalidPath(to.to_string()))?;
        headers.insert(HeaderName::from_static(DESTINATION), destination);
        headers.insert(
            HeaderName::from_static(OVERWRITE),
            HeaderValue::from_static(if overwrite { "T" } else { "F" }),
        );

        let status = self.send(request).await?.status();
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::PRECONDITION_FAILED => Err(DavError::AlreadyExists(to.to_string())),
            s => Err(status_error(&method, from, s)),
        }
    }
}
