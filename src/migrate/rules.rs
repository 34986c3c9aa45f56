use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::bridge::{Api, CallWeight};
use crate::error::{BulbError, Result};
use crate::migrate::{Context, StepCounts, label};
use crate::model::MigrationPlan;

/// The update for one rule, when it needs one.
#[derive(Debug, Clone, PartialEq)]
pub struct RulePatch {
    pub body: Value,
    pub added_conditions: usize,
    pub added_actions: usize,
}

/// `/lights/{old}/state/on` → `/lights/{new}/state/on`. Addresses of other
/// lights, including ones whose id merely starts with `old`, give `None`.
pub fn rewrite_address(address: &str, old: &str, new: &str) -> Option<String> {
    let rest = address.strip_prefix("/lights/")?.strip_prefix(old)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(format!("/lights/{new}{rest}"))
    } else {
        None
    }
}

fn address(item: &Value) -> Option<&str> {
    item.get("address").and_then(Value::as_str)
}

/// Append a rewritten copy of every item addressing `old`. Whether a copy is
/// needed is decided against the list as it was before this pass, so two
/// old items that rewrite to the same address both get their copy.
fn augment(items: &[Value], old: &str, new: &str) -> (Vec<Value>, usize) {
    let original: HashSet<&str> = items.iter().filter_map(address).collect();
    let mut out = items.to_vec();
    let mut added = 0;
    for item in items {
        let Some(rewritten) = address(item).and_then(|a| rewrite_address(a, old, new)) else {
            continue;
        };
        if original.contains(rewritten.as_str()) {
            continue;
        }
        let mut copy = item.clone();
        if let Some(obj) = copy.as_object_mut() {
            obj.insert("address".to_string(), Value::String(rewritten));
        }
        out.push(copy);
        added += 1;
    }
    (out, added)
}

/// Compute the update for `rule`, or `None` when nothing needs adding.
pub fn rewrite_rule(rule: &Value, old: &str, new: &str) -> Option<RulePatch> {
    let items = |key: &str| {
        rule.get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };
    let (conditions, added_conditions) = augment(&items("conditions"), old, new);
    let (actions, added_actions) = augment(&items("actions"), old, new);
    if added_conditions + added_actions == 0 {
        return None;
    }

    let mut body = Map::new();
    if !conditions.is_empty() {
        body.insert("conditions".to_string(), Value::Array(conditions));
    }
    if !actions.is_empty() {
        body.insert("actions".to_string(), Value::Array(actions));
    }
    Some(RulePatch {
        body: Value::Object(body),
        added_conditions,
        added_actions,
    })
}

/// Mirror every condition and action on the old light for the new one.
pub async fn migrate(ctx: &Context<'_>, plan: &MigrationPlan) -> Result<StepCounts> {
    let old = plan.old.legacy_id.as_str();
    let new = plan.new.legacy_id.as_str();

    ctx.log.info("Checking rules");
    let rules = ctx.bridge.get(Api::Legacy, "rules").await?.body;
    let rules = rules
        .as_object()
        .ok_or_else(|| BulbError::Malformed("v1 rule collection is not an object".to_string()))?;

    let mut counts = StepCounts::default();
    for (id, rule) in rules {
        let Some(patch) = rewrite_rule(rule, old, new) else {
            continue;
        };
        let name = label(rule, id);
        let path = format!("rules/{id}");
        match ctx
            .write(Api::Legacy, &path, patch.body, CallWeight::Standard)
            .await
        {
            Ok(()) => {
                ctx.log.success(&format!(
                    "rule {name}: added {} conditions and {} actions for light {new}",
                    patch.added_conditions, patch.added_actions
                ));
                counts.updated += 1;
            }
            Err(e) => {
                ctx.log.error(&format!("could not update rule {name}: {e}"));
                counts.failed += 1;
            }
        }
    }

    if counts.attempted() == 0 {
        ctx.log
            .info(&format!("no rule needs changes for light {old}"));
    }
    Ok(counts)
}
