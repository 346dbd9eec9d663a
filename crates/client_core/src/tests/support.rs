//! Fakes shared by the unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use shared::domain::{Session, UserId};
use storage::{KeyValueStore, MemoryStore};

use crate::{
    session::SessionStore,
    transport::{ApiRequest, ApiResponse, Transport, TransportError},
};

/// Answers each request path from its own queue of scripted results.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<ApiResponse, TransportError>>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, path: &str, result: Result<ApiResponse, TransportError>) {
        self.responses
            .lock()
            .expect("responses")
            .entry(path.to_string())
            .or_default()
            .push_back(result);
    }

    pub(crate) fn respond_json<T: Serialize>(&self, path: &str, status: u16, body: &T) {
        let body = serde_json::to_vec(body).expect("serializable body");
        self.respond(path, Ok(ApiResponse { status, body }));
    }

    pub(crate) fn fail(&self, path: &str, status: u16, body: &str) {
        self.respond(path, Err(TransportError::http(status, body)));
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().expect("requests").clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn perform(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let path = request.path.clone();
        self.requests.lock().expect("requests").push(request);
        self.responses
            .lock()
            .expect("responses")
            .get_mut(&path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(TransportError::Other(format!("no response scripted for {path}"))))
    }
}

/// In-memory store that counts deletes.
#[derive(Default)]
pub(crate) struct CountingStore {
    inner: MemoryStore,
    deletes: AtomicUsize,
}

impl CountingStore {
    pub(crate) fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.inner.write(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(key).await
    }
}

pub(crate) fn memory_session() -> SessionStore {
    SessionStore::new(Arc::new(MemoryStore::new()))
}

pub(crate) fn test_session() -> Session {
    Session {
        user_id: UserId(42),
        username: "ada".into(),
        token: "token-42".into(),
    }
}

pub(crate) async fn signed_in_session() -> SessionStore {
    let session = memory_session();
    session
        .save_session(&test_session())
        .await
        .expect("save session");
    session
}
