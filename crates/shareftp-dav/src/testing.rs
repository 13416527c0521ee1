//! In-process remote store for tests.
//!
//! [`MemoryStore`] follows the same contract as [`DavClient`](crate::DavClient)
//! (same error variants for the same situations) and records every write call,
//! so callers can assert how many remote writes an operation caused and what
//! they carried.

use crate::client::normalize;
use crate::entry::RemoteEntry;
use crate::error::{DavError, DavResult};
use crate::store::{RemoteStore, RemoteStream};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use std::io::Cursor;
use std::time::SystemTime;

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Bytes),
}

#[derive(Debug, Default)]
struct State {
    /// Nodes in creation order; listings follow this order.
    nodes: Vec<(String, Node, SystemTime)>,
    writes: Vec<(String, Bytes)>,
    fail_writes: bool,
}

impl State {
    fn find(&self, path: &str) -> Option<usize> {
        self.nodes.iter().position(|(p, _, _)| p == path)
    }

    fn is_dir(&self, path: &str) -> bool {
        path == "/"
            || self
                .find(path)
                .is_some_and(|i| matches!(self.nodes[i].1, Node::Dir))
    }
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

fn is_within(path: &str, root: &str) -> bool {
    path == root || path.starts_with(&format!("{root}/"))
}

fn status(method: &str, path: &str, status: StatusCode) -> DavError {
    DavError::Status {
        method: method.to_string(),
        path: path.to_string(),
        status,
    }
}

/// Remote store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Empty share (only the root collection).
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording a write.
    pub fn insert_file(&self, path: &str, data: impl Into<Bytes>) {
        let path = normalize(path);
        let mut state = self.state.lock();
        let node = Node::File(data.into());
        match state.find(&path) {
            Some(i) => state.nodes[i].1 = node,
            None => state.nodes.push((path, node, SystemTime::now())),
        }
    }

    /// Seed a collection without recording anything.
    pub fn insert_dir(&self, path: &str) {
        let path = normalize(path);
        let mut state = self.state.lock();
        if state.find(&path).is_none() {
            state.nodes.push((path, Node::Dir, SystemTime::now()));
        }
    }

    /// Content of a file, if it exists.
    pub fn content(&self, path: &str) -> Option<Bytes> {
        let path = normalize(path);
        let state = self.state.lock();
        state.find(&path).and_then(|i| match &state.nodes[i].1 {
            Node::File(data) => Some(data.clone()),
            Node::Dir => None,
        })
    }

    /// Whether anything exists at `path`.
    pub fn exists(&self, path: &str) -> bool {
        let path = normalize(path);
        path == "/" || self.state.lock().find(&path).is_some()
    }

    /// Every write call received so far, in order.
    pub fn writes(&self) -> Vec<(String, Bytes)> {
        self.state.lock().writes.clone()
    }

    /// Number of write calls received so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Make subsequent writes fail with HTTP 507.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    fn entry(path: &str, node: &Node, modified: SystemTime) -> RemoteEntry {
        match node {
            Node::Dir => RemoteEntry::directory(path, modified),
            Node::File(data) => RemoteEntry::file(path, data.len() as u64, modified),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn stat(&self, path: &str) -> DavResult<RemoteEntry> {
        let path = normalize(path);
        if path == "/" {
            return Ok(RemoteEntry::directory("/", SystemTime::UNIX_EPOCH));
        }
        let state = self.state.lock();
        let i = state.find(&path).ok_or_else(|| DavError::NotFound(path.clone()))?;
        let (p, node, modified) = &state.nodes[i];
        Ok(Self::entry(p, node, *modified))
    }

    async fn list(&self, path: &str) -> DavResult<Vec<RemoteEntry>> {
        let path = normalize(path);
        let state = self.state.lock();
        if !state.is_dir(&path) {
            return match state.find(&path) {
                Some(_) => Ok(Vec::new()),
                None => Err(DavError::NotFound(path)),
            };
        }
        Ok(state
            .nodes
            .iter()
            .filter(|(p, _, _)| parent(p) == path)
            .map(|(p, node, modified)| Self::entry(p, node, *modified))
            .collect())
    }

    async fn read_stream(&self, path: &str) -> DavResult<RemoteStream> {
        let path = normalize(path);
        let state = self.state.lock();
        match state.find(&path).map(|i| &state.nodes[i].1) {
            Some(Node::File(data)) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Node::Dir) => Err(status("GET", &path, StatusCode::METHOD_NOT_ALLOWED)),
            None => Err(DavError::NotFound(path)),
        }
    }

    async fn write(&self, path: &str, data: Bytes) -> DavResult<()> {
        let path = normalize(path);
        let mut state = self.state.lock();
        state.writes.push((path.clone(), data.clone()));

        if state.fail_writes {
            return Err(status("PUT", &path, StatusCode::INSUFFICIENT_STORAGE));
        }
        if !state.is_dir(parent(&path)) {
            return Err(status("PUT", &path, StatusCode::CONFLICT));
        }
        match state.find(&path) {
            Some(i) if matches!(state.nodes[i].1, Node::Dir) => {
                Err(status("PUT", &path, StatusCode::METHOD_NOT_ALLOWED))
            }
            Some(i) => {
                state.nodes[i].1 = Node::File(data);
                state.nodes[i].2 = SystemTime::now();
                Ok(())
            }
            None => {
                state.nodes.push((path, Node::File(data), SystemTime::now()));
                Ok(())
            }
        }
    }

    async fn mkdir(&self, path: &str) -> DavResult<()> {
        let path = normalize(path);
        let mut state = self.state.lock();
        if path == "/" || state.find(&path).is_some() {
            return Err(DavError::AlreadyExists(path));
        }
        if !state.is_dir(parent(&path)) {
            return Err(status("MKCOL", &path, StatusCode::CONFLICT));
        }
        state.nodes.push((path, Node::Dir, SystemTime::now()));
        Ok(())
    }

    // Same sequence as `DavClient`: one MKCOL, then top-down only on 409.
    async fn mkdir_all(&self, path: &str) -> DavResult<()> {
        let path = normalize(path);
        match self.mkdir(&path).await {
            Ok(()) | Err(DavError::AlreadyExists(_)) => return Ok(()),
            Err(DavError::Status { status, .. }) if status == StatusCode::CONFLICT => {}
            Err(e) => return Err(e),
        }

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

    async fn remove(&self, path: &str) -> DavResult<()> {
        let path = normalize(path);
        let mut state = self.state.lock();
        if state.find(&path).is_none() {
            return Err(DavError::NotFound(path));
        }
        state.nodes.retain(|(p, _, _)| !is_within(p, &path));
        Ok(())
    }

    async fn remove_all(&self, path: &str) -> DavResult<()> {
        match self.remove(path).await {
            Err(DavError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    async fn rename(&self, from: &str, to: &str, overwrite: bool) -> DavResult<()> {
        let from = normalize(from);
        let to = normalize(to);
        let mut state = self.state.lock();

        if state.find(&from).is_none() {
            return Err(DavError::NotFound(from));
        }
        if state.find(&to).is_some() || to == "/" {
            if !overwrite {
                return Err(DavError::AlreadyExists(to));
            }
            state.nodes.retain(|(p, _, _)| !is_within(p, &to));
        }
        if !state.is_dir(parent(&to)) {
            return Err(status("MOVE", &from, StatusCode::CONFLICT));
        }

        for (p, _, _) in &mut state.nodes {
            if is_within(p, &from) {
                *p = format!("{to}{}", &p[from.len()..]);
            }
        }
        Ok(())
    }
}
