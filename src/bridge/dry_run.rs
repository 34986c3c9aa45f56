use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::bridge::throttle::CallWeight;
use crate::bridge::{Api, Bridge, Reply};
use crate::error::Result;
use crate::log::LogSink;

/// Reads from the wrapped bridge, but only logs and records writes.
pub struct DryRunBridge<'a> {
    inner: &'a dyn Bridge,
    log: &'a dyn LogSink,
    writes: Mutex<Vec<(Api, String, Value)>>,
}

impl<'a> DryRunBridge<'a> {
    pub fn new(inner: &'a dyn Bridge, log: &'a dyn LogSink) -> Self {
        Self {
            inner,
            log,
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Writes that would have been sent, in order.
    pub fn writes(&self) -> Vec<(Api, String, Value)> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Bridge for DryRunBridge<'_> {
    async fn get(&self, api: Api, path: &str) -> Result<Reply> {
        self.inner.get(api, path).await
    }

    async fn put(&self, api: Api, path: &str, body: Value, _weight: CallWeight) -> Result<Reply> {
        self.log
            .info(&format!("dry run: would PUT {api} {path} {body}"));
        if let Ok(mut writes) = self.writes.lock() {
            writes.push((api, path.to_string(), body));
        }
        Ok(Reply::new(Value::Null))
    }
}
