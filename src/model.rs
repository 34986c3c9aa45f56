use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{BulbError, Result};

/// Longest light name the bridge accepts.
pub const MAX_NAME_LEN: usize = 32;

pub const OLD_SUFFIX: &str = " (old)";
pub const NEW_SUFFIX: &str = " (new)";

/// A bulb as seen through both APIs, captured once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Light {
    pub legacy_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_mode: Option<String>,
}

/// A typed pointer as the modern API embeds it: `{"rid": ..., "rtype": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub rid: String,
    pub rtype: String,
}

impl ResourceRef {
    pub fn light(rid: impl Into<String>) -> Self {
        Self {
            rid: rid.into(),
            rtype: "light".to_string(),
        }
    }

    /// True when `value` is an object whose `rid` and `rtype` equal this reference.
    /// Other keys on the object are ignored.
    pub fn matches(&self, value: &Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };
        obj.get("rid").and_then(Value::as_str) == Some(self.rid.as_str())
            && obj.get("rtype").and_then(Value::as_str) == Some(self.rtype.as_str())
    }

    pub fn to_value(&self) -> Value {
        json!({ "rid": self.rid, "rtype": self.rtype })
    }
}

/// How the two bulbs are renamed at the end of a migration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RenameMode {
    /// Old bulb becomes "<name> (old)", new bulb takes "<name>".
    #[default]
    Inherit,
    /// Old bulb keeps "<name>", new bulb becomes "<name> (new)".
    MarkNew,
}

impl std::fmt::Display for RenameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inherit => write!(f, "inherit"),
            Self::MarkNew => write!(f, "mark-new"),
        }
    }
}

impl RenameMode {
    /// Target names for (old, new), derived from the old bulb's current name.
    /// `None` means the bulb keeps its name.
    pub fn target_names(self, original: &str) -> (Option<String>, Option<String>) {
        match self {
            Self::Inherit => (
                Some(suffixed_name(original, OLD_SUFFIX)),
                Some(original.to_string()),
            ),
            Self::MarkNew => (None, Some(suffixed_name(original, NEW_SUFFIX))),
        }
    }
}

/// True when an earlier `Inherit` run already renamed the pair: the old name
/// carries the suffix and the new name starts with what precedes it.
pub fn already_inherited(old_name: &str, new_name: &str) -> bool {
    old_name
        .strip_suffix(OLD_SUFFIX)
        .is_some_and(|base| !base.trim().is_empty() && new_name.starts_with(base))
}

/// Append `suffix`, shortening the base so the result fits the bridge's name limit.
pub fn suffixed_name(base: &str, suffix: &str) -> String {
    let budget = MAX_NAME_LEN.saturating_sub(suffix.chars().count());
    let base: String = if base.chars().count() > budget {
        base.chars().take(budget).collect::<String>().trim_end().to_string()
    } else {
        base.to_string()
    };
    format!("{base}{suffix}")
}

/// The validated pair of bulbs a run operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub old: Light,
    pub new: Light,
    pub mode: RenameMode,
}

impl MigrationPlan {
    pub fn new(old: Light, new: Light, mode: RenameMode) -> Result<Self> {
        if old.legacy_id == new.legacy_id {
            return Err(BulbError::InvalidSelection(format!(
                "old and new light are both {}",
                old.legacy_id
            )));
        }
        Ok(Self { old, new, mode })
    }

    pub fn old_guid(&self) -> Option<&str> {
        self.old.guid.as_deref()
    }

    pub fn new_guid(&self) -> Option<&str> {
        self.new.guid.as_deref()
    }
}
