//! An in-process bridge holding both APIs' resources as JSON.
//!
//! Writes are merged into the stored resources and recorded, so a test can
//! check both the end state and the exact calls made. Individual paths can
//! be made to fail or to answer with a warning.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::bridge::throttle::CallWeight;
use crate::bridge::{Api, Bridge, Reply};
use crate::error::{BulbError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPut {
    pub api: Api,
    pub path: String,
    pub body: Value,
    pub weight: CallWeight,
}

#[derive(Default)]
struct State {
    legacy: Map<String, Value>,
    modern: BTreeMap<String, Vec<Value>>,
    puts: Vec<RecordedPut>,
    failing_gets: HashSet<(Api, String)>,
    failing_puts: HashSet<(Api, String)>,
    put_warnings: HashMap<(Api, String), String>,
}

#[derive(Default)]
pub struct MemoryBridge {
    state: Mutex<State>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic in another test thread must not cascade into this one.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a legacy resource, e.g. `("groups", "1", {...})`.
    pub fn with_legacy(self, collection: &str, id: &str, value: Value) -> Self {
        {
            let mut state = self.state();
            let entry = state
                .legacy
                .entry(collection.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Some(obj) = entry.as_object_mut() {
                obj.insert(id.to_string(), value);
            }
        }
        self
    }

    /// Add a modern resource of type `rtype`; `value` must carry its `id`.
    pub fn with_modern(self, rtype: &str, value: Value) -> Self {
        self.state()
            .modern
            .entry(rtype.to_string())
            .or_default()
            .push(value);
        self
    }

    /// Make the legacy collection itself answer with `value` verbatim.
    pub fn with_raw_legacy_collection(self, collection: &str, value: Value) -> Self {
        self.state().legacy.insert(collection.to_string(), value);
        self
    }

    pub fn fail_get(self, api: Api, path: &str) -> Self {
        self.state().failing_gets.insert((api, path.to_string()));
        self
    }

    pub fn fail_put(self, api: Api, path: &str) -> Self {
        self.state().failing_puts.insert((api, path.to_string()));
        self
    }

    pub fn warn_on_put(self, api: Api, path: &str, message: &str) -> Self {
        self.state()
            .put_warnings
            .insert((api, path.to_string()), message.to_string());
        self
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.state().puts.clone()
    }

    pub fn puts_to(&self, api: Api, path: &str) -> Vec<RecordedPut> {
        self.puts()
            .into_iter()
            .filter(|p| p.api == api && p.path == path)
            .collect()
    }

    pub fn clear_puts(&self) {
        self.state().puts.clear();
    }

    /// Current legacy resource at `path`, e.g. `groups/1`.
    pub fn legacy(&self, path: &str) -> Option<Value> {
        let state = self.state();
        let mut node = state.legacy.get(segments(path).first()?.as_str())?;
        for segment in segments(path).iter().skip(1) {
            node = node.get(segment.as_str())?;
        }
        Some(node.clone())
    }

    /// Current modern resource of `rtype` with `id`.
    pub fn modern(&self, rtype: &str, id: &str) -> Option<Value> {
        self.state()
            .modern
            .get(rtype)?
            .iter()
            .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            .cloned()
    }
}

fn segments(path: &str) -> Vec<String> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge(existing, value)
                    }
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

fn not_found(api: Api, path: &str) -> BulbError {
    BulbError::NotFound(format!("{api} {path}"))
}

fn injected_failure(api: Api, path: &str) -> BulbError {
    BulbError::Status {
        status: 500,
        url: format!("{api} {path}"),
        message: "injected failure".to_string(),
    }
}

impl State {
    fn get_legacy(&self, path: &str) -> Result<Value> {
        let parts = segments(path);
        let Some((first, rest)) = parts.split_first() else {
            return Ok(Value::Object(self.legacy.clone()));
        };
        let mut node = self
            .legacy
            .get(first.as_str())
            .ok_or_else(|| not_found(Api::Legacy, path))?;
        for segment in rest {
            node = node
                .get(segment.as_str())
                .ok_or_else(|| not_found(Api::Legacy, path))?;
        }
        let mut value = node.clone();
        // The collection listing omits per-light scene states, as the bridge does.
        if parts.len() == 1 && first == "scenes"
            && let Some(scenes) = value.as_object_mut()
        {
            for scene in scenes.values_mut() {
                if let Some(scene) = scene.as_object_mut() {
                    scene.remove("lightstates");
                }
            }
        }
        Ok(value)
    }

    fn put_legacy(&mut self, path: &str, body: Value) -> Result<()> {
        let parts = segments(path);
        let Some((first, rest)) = parts.split_first() else {
            return Err(not_found(Api::Legacy, path));
        };
        let mut node = self
            .legacy
            .get_mut(first.as_str())
            .ok_or_else(|| not_found(Api::Legacy, path))?;
        // The resource itself must exist; sub-paths below it are created on write.
        let resource = rest.first().ok_or_else(|| not_found(Api::Legacy, path))?;
        node = node
            .get_mut(resource.as_str())
            .ok_or_else(|| not_found(Api::Legacy, path))?;
        for segment in rest.iter().skip(1) {
            let Value::Object(obj) = node else {
                return Err(not_found(Api::Legacy, path));
            };
            node = obj
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        merge(node, body);
        Ok(())
    }

    fn modern_target(&mut self, path: &str) -> Result<(String, Option<String>)> {
        let parts = segments(path);
        match parts.as_slice() {
            [resource, rtype] if resource == "resource" => Ok((rtype.clone(), None)),
            [resource, rtype, id] if resource == "resource" => {
                Ok((rtype.clone(), Some(id.clone())))
            }
            _ => Err(not_found(Api::Modern, path)),
        }
    }

    fn get_modern(&mut self, path: &str) -> Result<Value> {
        let (rtype, id) = self.modern_target(path)?;
        let items = self.modern.get(&rtype).cloned().unwrap_or_default();
        match id {
            None => Ok(Value::Array(items)),
            Some(id) => items
                .into_iter()
                .find(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str()))
                .map(|r| Value::Array(vec![r]))
                .ok_or_else(|| not_found(Api::Modern, path)),
        }
    }

    fn put_modern(&mut self, path: &str, body: Value) -> Result<Value> {
        let (rtype, id) = self.modern_target(path)?;
        let id = id.ok_or_else(|| not_found(Api::Modern, path))?;
        let item = self
            .modern
            .get_mut(&rtype)
            .and_then(|items| {
                items
                    .iter_mut()
                    .find(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str()))
            })
            .ok_or_else(|| not_found(Api::Modern, path))?;
        merge(item, body);
        Ok(json!([{ "rid": id, "rtype": rtype }]))
    }
}

#[async_trait]
impl Bridge for MemoryBridge {
    async fn get(&self, api: Api, path: &str) -> Result<Reply> {
        let mut state = self.state();
        if state.failing_gets.contains(&(api, path.to_string())) {
            return Err(injected_failure(api, path));
        }
        let body = match api {
            Api::Legacy => state.get_legacy(path)?,
            Api::Modern => state.get_modern(path)?,
        };
        Ok(Reply::new(body))
    }

    async fn put(&self, api: Api, path: &str, body: Value, weight: CallWeight) -> Result<Reply> {
        let mut state = self.state();
        state.puts.push(RecordedPut {
            api,
            path: path.to_string(),
            body: body.clone(),
            weight,
        });
        let key = (api, path.to_string());
        if state.failing_puts.contains(&key) {
            return Err(injected_failure(api, path));
        }
        let reply_body = match api {
            Api::Legacy => {
                state.put_legacy(path, body.clone())?;
                let address = format!("/{}", path.trim_matches('/'));
                json!([{ "success": { address: body } }])
            }
            Api::Modern => state.put_modern(path, body)?,
        };
        let warnings = state.put_warnings.get(&key).cloned().into_iter().collect();
        Ok(Reply {
            body: reply_body,
            warnings,
        })
    }
}
