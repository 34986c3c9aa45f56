//! Correspondence between legacy numeric light ids and modern GUIDs.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::bridge::{Api, Bridge};
use crate::error::{BulbError, Result};
use crate::model::{Light, MigrationPlan, RenameMode};

static LEGACY_LIGHT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/lights/(\d+)$").expect("static regex is valid"));

/// Legacy id → GUID, one entry per light both APIs know about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap(BTreeMap<String, String>);

impl IdentifierMap {
    /// Derive the map from the modern light collection (`data` of
    /// `GET resource/light`). Entries without an `id_v1` back-reference are
    /// left out.
    pub fn from_modern_lights(modern: &Value) -> Result<Self> {
        let items = modern.as_array().ok_or_else(|| {
            BulbError::Malformed("v2 light collection is not an array".to_string())
        })?;

        let mut map = BTreeMap::new();
        for item in items {
            let Some(guid) = item.get("id").and_then(Value::as_str) else {
                continue;
            };
            let Some(back_ref) = item.get("id_v1").and_then(Value::as_str) else {
                continue;
            };
            if let Some(caps) = LEGACY_LIGHT_PATH.captures(back_ref) {
                map.insert(caps[1].to_string(), guid.to_string());
            }
        }
        Ok(Self(map))
    }

    pub fn guid(&self, legacy_id: &str) -> Option<&str> {
        self.0.get(legacy_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Every light the legacy API reports, joined with its GUID where one exists.
#[derive(Debug, Clone, Default)]
pub struct LightInventory {
    lights: BTreeMap<String, Light>,
    ids: IdentifierMap,
}

impl LightInventory {
    /// Read both light collections. Any failure here ends the run.
    pub async fn fetch(bridge: &dyn Bridge) -> Result<Self> {
        let legacy = bridge.get(Api::Legacy, "lights").await?.body;
        let modern = bridge.get(Api::Modern, "resource/light").await?.body;
        Self::from_collections(&legacy, &modern)
    }

    pub fn from_collections(legacy: &Value, modern: &Value) -> Result<Self> {
        let entries = legacy.as_object().ok_or_else(|| {
            BulbError::Malformed("v1 light collection is not an object".to_string())
        })?;
        let ids = IdentifierMap::from_modern_lights(modern)?;

        let mut lights = BTreeMap::new();
        for (legacy_id, entry) in entries {
            if !entry.is_object() {
                return Err(BulbError::Malformed(format!(
                    "v1 light {legacy_id} is not an object"
                )));
            }
            let name = entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let startup_mode = entry
                .pointer("/config/startup/mode")
                .and_then(Value::as_str)
                .map(str::to_string);
            lights.insert(
                legacy_id.clone(),
                Light {
                    legacy_id: legacy_id.clone(),
                    guid: ids.guid(legacy_id).map(str::to_string),
                    name,
                    startup_mode,
                },
            );
        }

        Ok(Self { lights, ids })
    }

    pub fn get(&self, legacy_id: &str) -> Option<&Light> {
        self.lights.get(legacy_id)
    }

    /// Lights in numeric id order.
    pub fn lights(&self) -> Vec<&Light> {
        let mut lights: Vec<&Light> = self.lights.values().collect();
        lights.sort_by_key(|l| (l.legacy_id.parse::<u64>().unwrap_or(u64::MAX), l.legacy_id.clone()));
        lights
    }

    pub fn identifiers(&self) -> &IdentifierMap {
        &self.ids
    }

    /// Validate an operator's selection into a plan.
    pub fn plan(&self, old: &str, new: &str, mode: RenameMode) -> Result<MigrationPlan> {
        if old == new {
            return Err(BulbError::InvalidSelection(format!(
                "old and new light are both {old}"
            )));
        }
        let old = self
            .get(old)
            .ok_or_else(|| BulbError::LightNotFound(old.to_string()))?;
        let new = self
            .get(new)
            .ok_or_else(|| BulbError::LightNotFound(new.to_string()))?;
        MigrationPlan::new(old.clone(), new.clone(), mode)
    }
}
