use serde_json::{Value, json};

use crate::bridge::{Api, CallWeight};
use crate::error::{BulbError, Result};
use crate::migrate::{Context, StepCounts, label, references, scan_and_augment};
use crate::model::{MigrationPlan, ResourceRef};

const COLLECTION: &str = "resource/behavior_instance";

/// Add the new light next to the old one inside every behavior instance
/// configuration. Needs both GUIDs; without them the step is skipped.
pub async fn migrate(ctx: &Context<'_>, plan: &MigrationPlan) -> Result<StepCounts> {
    let mut counts = StepCounts::default();
    let (Some(old_guid), Some(new_guid)) = (plan.old_guid(), plan.new_guid()) else {
        ctx.log.warn(
            "skipping automations: both lights need a v2 id to update behavior instances",
        );
        return Ok(counts);
    };
    let old_ref = ResourceRef::light(old_guid);
    let new_ref = ResourceRef::light(new_guid);

    ctx.log.info("Checking automations");
    let instances = ctx.bridge.get(Api::Modern, COLLECTION).await?.body;
    let instances = instances.as_array().ok_or_else(|| {
        BulbError::Malformed("behavior instance collection is not an array".to_string())
    })?;

    for instance in instances {
        let Some(id) = instance.get("id").and_then(Value::as_str) else {
            continue;
        };
        // Cheap filter on the listing before fetching the instance again.
        let mentions_old = instance
            .get("configuration")
            .is_some_and(|c| c.to_string().contains(old_guid));
        if !mentions_old {
            continue;
        }
        let name = label(instance, id);
        let path = format!("{COLLECTION}/{id}");

        let current = match ctx.bridge.get(Api::Modern, &path).await {
            Ok(reply) => reply.body,
            Err(e) => {
                ctx.log
                    .error(&format!("could not re-read automation {name}: {e}"));
                counts.failed += 1;
                continue;
            }
        };
        let Some(mut configuration) = current
            .as_array()
            .and_then(|items| items.first())
            .and_then(|item| item.get("configuration"))
            .cloned()
        else {
            ctx.log
                .warn(&format!("automation {name} has no configuration any more"));
            counts.skipped += 1;
            continue;
        };

        if !scan_and_augment(&mut configuration, &old_ref, &new_ref) {
            if references(&configuration, &old_ref) {
                ctx.log
                    .info(&format!("automation {name} already references the new light"));
            } else {
                ctx.log.info(&format!(
                    "automation {name} mentions {old_guid} but holds no light reference to extend"
                ));
            }
            counts.skipped += 1;
            continue;
        }

        match ctx
            .write(
                Api::Modern,
                &path,
                json!({ "configuration": configuration }),
                CallWeight::Heavy,
            )
            .await
        {
            Ok(()) => {
                ctx.log
                    .success(&format!("added new light to automation {name}"));
                counts.updated += 1;
            }
            Err(e) => {
                ctx.log
                    .error(&format!("could not update automation {name}: {e}"));
                counts.failed += 1;
            }
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MemoryBridge;
    use crate::log::{Level, MemoryLog};
    use crate::model::{Light, RenameMode};

    fn plan(old_guid: Option<&str>, new_guid: Option<&str>) -> MigrationPlan {
        let light = |id: &str, guid: Option<&str>| Light {
            legacy_id: id.into(),
            guid: guid.map(str::to_string),
            name: id.into(),
            startup_mode: None,
        };
        MigrationPlan::new(light("5", old_guid), light("7", new_guid), RenameMode::Inherit)
            .unwrap()
    }

    fn wake_up() -> Value {
        json!({
            "id": "b1",
            "metadata": {"name": "Wake up"},
            "script_id": "ff8957e3",
            "configuration": {
                "where": [{
                    "group": {"rid": "room-1", "rtype": "room"},
                    "items": [
                        {"rid": "guidA", "rtype": "light"},
                        {"rid": "guidB", "rtype": "light"}
                    ]
                }],
                "fade_in_duration": {"seconds": 1800}
            }
        })
    }

    #[tokio::test]
    async fn adds_reference_and_writes_configuration_only() {
        let bridge = MemoryBridge::new()
            .with_modern("behavior_instance", wake_up())
            .with_modern(
                "behavior_instance",
                json!({"id": "b2", "configuration": {"where": [{"items": [{"rid": "guidB", "rtype": "light"}]}]}}),
            );
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };

        let counts = migrate(&ctx, &plan(Some("guidA"), Some("guidC"))).await.unwrap();

        assert_eq!(counts.updated, 1);
        let puts = bridge.puts();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].path, "resource/behavior_instance/b1");
        let body = puts[0].body.as_object().unwrap();
        assert_eq!(body.keys().collect::<Vec<_>>(), vec!["configuration"]);

        let items = &bridge.modern("behavior_instance", "b1").unwrap()["configuration"]["where"][0]["items"];
        assert_eq!(
            items,
            &json!([
                {"rid": "guidA", "rtype": "light"},
                {"rid": "guidB", "rtype": "light"},
                {"rid": "guidC", "rtype": "light"}
            ])
        );
    }

    #[tokio::test]
    async fn missing_guid_skips_with_warning() {
        let bridge = MemoryBridge::new().with_modern("behavior_instance", wake_up());
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };

        let counts = migrate(&ctx, &plan(Some("guidA"), None)).await.unwrap();

        assert_eq!(counts, StepCounts::default());
        assert!(bridge.puts().is_empty());
        assert_eq!(log.messages(Level::Warn).len(), 1);
    }

    #[tokio::test]
    async fn failed_refetch_counts_and_continues() {
        let mut second = wake_up();
        second["id"] = json!("b3");
        let bridge = MemoryBridge::new()
            .with_modern("behavior_instance", wake_up())
            .with_modern("behavior_instance", second)
            .fail_get(Api::Modern, "resource/behavior_instance/b1");
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };

        let counts = migrate(&ctx, &plan(Some("guidA"), Some("guidC"))).await.unwrap();

        assert_eq!(counts.failed, 1);
        assert_eq!(counts.updated, 1);
    }

    #[tokio::test]
    async fn already_migrated_instance_is_skipped() {
        let bridge = MemoryBridge::new().with_modern("behavior_instance", wake_up());
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };
        let plan = plan(Some("guidA"), Some("guidB"));

        let counts = migrate(&ctx, &plan).await.unwrap();

        assert_eq!(counts.skipped, 1);
        assert!(bridge.puts().is_empty());
        assert!(
            log.messages(Level::Info)
                .iter()
                .any(|m| m.contains("already references the new light"))
        );
    }

    #[tokio::test]
    async fn guid_outside_a_light_reference_is_not_reported_as_migrated() {
        let bridge = MemoryBridge::new().with_modern(
            "behavior_instance",
            json!({
                "id": "b4",
                "metadata": {"name": "Motion"},
                "configuration": {
                    "source": {"rid": "guidA", "rtype": "device"},
                    "note": "follows guidA"
                }
            }),
        );
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };

        let counts = migrate(&ctx, &plan(Some("guidA"), Some("guidC"))).await.unwrap();

        assert_eq!(counts.skipped, 1);
        assert!(bridge.puts().is_empty());
        let info = log.messages(Level::Info);
        assert!(info.iter().any(|m| m.contains("no light reference to extend")));
        assert!(!info.iter().any(|m| m.contains("already references")));
    }
}
