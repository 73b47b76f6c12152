//! Scriptable in-memory backend shared by the service tests.

use super::RemoteBackend;
use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum StubReply {
    Fail(String),
    Empty,
    Payload(serde_json::Value),
}

/// Records every call and answers per function name (default: failure).
#[derive(Default)]
pub struct StubBackend {
    replies: Mutex<HashMap<String, StubReply>>,
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, function: &str, reply: StubReply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(function.to_string(), reply);
        self
    }

    pub fn set_reply(&self, function: &str, reply: StubReply) {
        self.replies
            .lock()
            .unwrap()
            .insert(function.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, function: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(f, _)| f == function)
            .count()
    }
}

impl RemoteBackend for StubBackend {
    async fn call_rpc(
        &self,
        function: &str,
        params: serde_json::Value,
    ) -> Result<Option<serde_json::Value>> {
        self.calls
            .lock()
            .unwrap()
            .push((function.to_string(), params));
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(function)
            .cloned()
            .unwrap_or_else(|| StubReply::Fail("connection refused".to_string()));
        match reply {
            StubReply::Fail(message) => Err(AppError::Remote {
                function: function.to_string(),
                message,
            }),
            StubReply::Empty => Ok(None),
            StubReply::Payload(value) => Ok(Some(value)),
        }
    }
}
