//! Scenes are read completely before any of them is written: the listing
//! omits per-light states, so every scene's detail is fetched first and the
//! ones involving the old light are collected into [`SceneRecord`]s.

use serde_json::{Value, json};

use crate::bridge::{Api, CallWeight};
use crate::error::{BulbError, Result};
use crate::migrate::{Context, StepCounts, label, string_list};
use crate::model::MigrationPlan;

/// A scene that involves the old light, as read before any write.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRecord {
    pub id: String,
    pub label: String,
    pub lights: Vec<String>,
    pub old_state: Option<Value>,
    pub new_state: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneCounts {
    pub states: StepCounts,
    pub members: StepCounts,
    pub unreadable: usize,
}

/// Build a record from a scene's detail when it references `old` in its
/// light list or its light states.
pub fn classify(id: &str, detail: &Value, old: &str, new: &str) -> Option<SceneRecord> {
    let lights = string_list(detail, "lights");
    let states = detail.get("lightstates");
    let old_state = states.and_then(|s| s.get(old)).cloned();
    if old_state.is_none() && !lights.iter().any(|l| l == old) {
        return None;
    }
    Some(SceneRecord {
        id: id.to_string(),
        label: label(detail, id),
        lights,
        old_state,
        new_state: states.and_then(|s| s.get(new)).cloned(),
    })
}

/// Phase one: fetch every scene and keep those involving the old light. A
/// scene that cannot be read is reported and left out.
pub async fn discover(ctx: &Context<'_>, plan: &MigrationPlan) -> Result<(Vec<SceneRecord>, usize)> {
    let old = plan.old.legacy_id.as_str();
    let new = plan.new.legacy_id.as_str();

    let scenes = ctx.bridge.get(Api::Legacy, "scenes").await?.body;
    let scenes = scenes
        .as_object()
        .ok_or_else(|| BulbError::Malformed("v1 scene collection is not an object".to_string()))?;
    ctx.log
        .info(&format!("Reading {} scenes", scenes.len()));

    let mut records = Vec::new();
    let mut unreadable = 0;
    for id in scenes.keys() {
        match ctx.bridge.get(Api::Legacy, &format!("scenes/{id}")).await {
            Ok(reply) => records.extend(classify(id, &reply.body, old, new)),
            Err(e) => {
                ctx.log
                    .warn(&format!("could not read scene {id}, leaving it out: {e}"));
                unreadable += 1;
            }
        }
    }
    Ok((records, unreadable))
}

/// Copy the old light's state and membership in each discovered scene.
pub async fn migrate(ctx: &Context<'_>, plan: &MigrationPlan) -> Result<SceneCounts> {
    ctx.log.info("Checking scenes");
    let (records, unreadable) = discover(ctx, plan).await?;
    ctx.log.info(&format!(
        "{} scenes involve light {}",
        records.len(),
        plan.old.legacy_id
    ));

    let mut counts = SceneCounts {
        unreadable,
        ..SceneCounts::default()
    };
    for record in &records {
        copy_state(ctx, plan, record, &mut counts.states).await;
        add_member(ctx, plan, record, &mut counts.members).await;
    }
    Ok(counts)
}

async fn copy_state(ctx: &Context<'_>, plan: &MigrationPlan, record: &SceneRecord, counts: &mut StepCounts) {
    let new = plan.new.legacy_id.as_str();
    let Some(state) = &record.old_state else {
        return;
    };
    if record.new_state.as_ref() == Some(state) {
        ctx.log.info(&format!(
            "scene {} already has the same state for light {new}",
            record.label
        ));
        counts.skipped += 1;
        return;
    }

    let path = format!("scenes/{}/lightstates/{new}", record.id);
    match ctx
        .write(Api::Legacy, &path, state.clone(), CallWeight::Light)
        .await
    {
        Ok(()) => {
            ctx.log
                .success(&format!("copied light state into scene {}", record.label));
            counts.updated += 1;
        }
        Err(e) => {
            ctx.log.error(&format!(
                "could not copy light state into scene {}: {e}",
                record.label
            ));
            counts.failed += 1;
        }
    }
}

async fn add_member(ctx: &Context<'_>, plan: &MigrationPlan, record: &SceneRecord, counts: &mut StepCounts) {
    let old = plan.old.legacy_id.as_str();
    let new = plan.new.legacy_id.as_str();
    if !record.lights.iter().any(|l| l == old) {
        return;
    }
    if record.lights.iter().any(|l| l == new) {
        counts.skipped += 1;
        return;
    }

    let mut lights = record.lights.clone();
    lights.push(new.to_string());
    let path = format!("scenes/{}", record.id);
    match ctx
        .write(Api::Legacy, &path, json!({ "lights": lights }), CallWeight::Heavy)
        .await
    {
        Ok(()) => {
            ctx.log
                .success(&format!("added light {new} to scene {}", record.label));
            counts.updated += 1;
        }
        Err(e) => {
            ctx.log.error(&format!(
                "could not update light list of scene {}: {e}",
                record.label
            ));
            counts.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MemoryBridge;
    use crate::log::{Level, MemoryLog};
    use crate::model::{Light, RenameMode};

    fn plan() -> MigrationPlan {
        let light = |id: &str| Light {
            legacy_id: id.into(),
            guid: None,
            name: format!("L{id}"),
            startup_mode: None,
        };
        MigrationPlan::new(light("5"), light("7"), RenameMode::Inherit).unwrap()
    }

    #[test]
    fn classify_uses_either_light_list_or_states() {
        let by_list = json!({"name": "Relax", "lights": ["5"], "lightstates": {}});
        let by_state = json!({"lights": [], "lightstates": {"5": {"on": true, "bri": 120}}});
        let neither = json!({"lights": ["9"], "lightstates": {"9": {"on": false}}});

        let record = classify("a", &by_list, "5", "7").unwrap();
        assert_eq!(record.old_state, None);
        assert_eq!(record.label, "\"Relax\" (a)");

        let record = classify("b", &by_state, "5", "7").unwrap();
        assert_eq!(record.old_state, Some(json!({"on": true, "bri": 120})));

        assert!(classify("c", &neither, "5", "7").is_none());
    }

    #[tokio::test]
    async fn copies_state_and_membership() {
        let bridge = MemoryBridge::new().with_legacy(
            "scenes",
            "abc",
            json!({
                "name": "Relax",
                "lights": ["5", "9"],
                "lightstates": {"5": {"on": true, "bri": 120, "ct": 366}, "9": {"on": false}}
            }),
        );
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };

        let counts = migrate(&ctx, &plan()).await.unwrap();

        assert_eq!(counts.states.updated, 1);
        assert_eq!(counts.members.updated, 1);
        let scene = bridge.legacy("scenes/abc").unwrap();
        assert_eq!(scene["lights"], json!(["5", "9", "7"]));
        assert_eq!(scene["lightstates"]["7"], json!({"on": true, "bri": 120, "ct": 366}));

        let state_puts = bridge.puts_to(Api::Legacy, "scenes/abc/lightstates/7");
        assert_eq!(state_puts.len(), 1);
        assert_eq!(state_puts[0].weight, CallWeight::Light);
    }

    #[tokio::test]
    async fn unreadable_scene_is_left_out_but_others_proceed() {
        let bridge = MemoryBridge::new()
            .with_legacy("scenes", "bad", json!({"lights": ["5"]}))
            .with_legacy("scenes", "good", json!({"lights": ["5"]}))
            .fail_get(Api::Legacy, "scenes/bad");
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };

        let counts = migrate(&ctx, &plan()).await.unwrap();

        assert_eq!(counts.unreadable, 1);
        assert_eq!(counts.members.updated, 1);
        assert!(bridge.puts_to(Api::Legacy, "scenes/bad").is_empty());
        assert_eq!(bridge.legacy("scenes/good").unwrap()["lights"], json!(["5", "7"]));
        assert_eq!(log.messages(Level::Warn).len(), 1);
    }

    #[tokio::test]
    async fn failed_state_copy_does_not_block_membership_update() {
        let bridge = MemoryBridge::new()
            .with_legacy(
                "scenes",
                "abc",
                json!({"lights": ["5"], "lightstates": {"5": {"on": true}}}),
            )
            .fail_put(Api::Legacy, "scenes/abc/lightstates/7");
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };

        let counts = migrate(&ctx, &plan()).await.unwrap();

        assert_eq!(counts.states.failed, 1);
        assert_eq!(counts.members.updated, 1);
    }

    #[tokio::test]
    async fn rerun_is_a_no_op() {
        let bridge = MemoryBridge::new().with_legacy(
            "scenes",
            "abc",
            json!({"lights": ["5"], "lightstates": {"5": {"on": true}}}),
        );
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };

        migrate(&ctx, &plan()).await.unwrap();
        bridge.clear_puts();
        let counts = migrate(&ctx, &plan()).await.unwrap();

        assert!(bridge.puts().is_empty());
        assert_eq!(counts.states.skipped, 1);
        assert_eq!(counts.members.skipped, 1);
    }
}
