//! Common test utilities for gateway integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use shareftp_dav::testing::MemoryStore;
use shareftp_gateway::{AuditObserver, FsOperation, SessionInfo, ShareFs};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

/// Audit observer that keeps every call it sees.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    calls: Mutex<Vec<(String, FsOperation)>>,
}

impl RecordingAudit {
    pub fn operations(&self) -> Vec<FsOperation> {
        self.calls.lock().iter().map(|(_, op)| op.clone()).collect()
    }

    pub fn users(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(u, _)| u.clone()).collect()
    }
}

impl AuditObserver for RecordingAudit {
    fn record(&self, session: &SessionInfo, op: &FsOperation) {
        self.calls.lock().push((session.username.clone(), op.clone()));
    }
}

/// A filesystem over an in-memory share, plus handles on both ends.
pub struct TestShare {
    pub store: Arc<MemoryStore>,
    pub audit: Arc<RecordingAudit>,
    pub fs: ShareFs,
}

impl TestShare {
    pub fn new() -> Self {
        Self::for_user("tester")
    }

    pub fn for_user(username: &str) -> Self {
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(RecordingAudit::default());
        let session = SessionInfo::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10)), username);
        let fs = ShareFs::new(store.clone(), session).with_audit(audit.clone());
        Self { store, audit, fs }
    }
}
