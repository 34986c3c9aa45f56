use serde_json::json;

use crate::bridge::{Api, CallWeight};
use crate::migrate::{Context, StepCounts};
use crate::model::{Light, MigrationPlan, RenameMode, already_inherited};

/// Give the new bulb the old bulb's power-on behavior (legacy API only).
pub async fn transfer_startup(ctx: &Context<'_>, plan: &MigrationPlan) -> StepCounts {
    let mut counts = StepCounts::default();
    let Some(mode) = &plan.old.startup_mode else {
        ctx.log.info(&format!(
            "light {} has no startup configuration; leaving light {} as it is",
            plan.old.legacy_id, plan.new.legacy_id
        ));
        counts.skipped += 1;
        return counts;
    };

    let path = format!("lights/{}/config", plan.new.legacy_id);
    match ctx
        .write(
            Api::Legacy,
            &path,
            json!({ "startup": { "mode": mode } }),
            CallWeight::Standard,
        )
        .await
    {
        Ok(()) => {
            ctx.log.success(&format!(
                "set startup mode \"{mode}\" on light {}",
                plan.new.legacy_id
            ));
            counts.updated += 1;
        }
        Err(e) => {
            ctx.log.error(&format!(
                "could not set startup mode on light {}: {e}",
                plan.new.legacy_id
            ));
            counts.failed += 1;
        }
    }
    counts
}

/// Rename the pair according to the plan's mode.
pub async fn rename(ctx: &Context<'_>, plan: &MigrationPlan) -> StepCounts {
    let mut counts = StepCounts::default();
    if plan.old.name.trim().is_empty() {
        ctx.log.warn(&format!(
            "light {} has no name; leaving both names as they are",
            plan.old.legacy_id
        ));
        counts.skipped += 1;
        return counts;
    }
    if plan.mode == RenameMode::Inherit && already_inherited(&plan.old.name, &plan.new.name) {
        ctx.log.info(&format!(
            "light {} already took over the name of light {}",
            plan.new.legacy_id, plan.old.legacy_id
        ));
        counts.skipped += 1;
        return counts;
    }

    let (old_target, new_target) = plan.mode.target_names(&plan.old.name);
    match old_target {
        Some(target) => counts.absorb(rename_light(ctx, &plan.old, &target).await),
        None => ctx.log.info(&format!(
            "light {} keeps its name \"{}\"",
            plan.old.legacy_id, plan.old.name
        )),
    }
    if let Some(target) = new_target {
        counts.absorb(rename_light(ctx, &plan.new, &target).await);
    }
    counts
}

/// Rename through both APIs; each attempt stands on its own.
async fn rename_light(ctx: &Context<'_>, light: &Light, target: &str) -> StepCounts {
    let mut counts = StepCounts::default();
    let id = &light.legacy_id;
    if light.name == target {
        ctx.log
            .info(&format!("light {id} is already named \"{target}\""));
        counts.skipped += 1;
        return counts;
    }

    let legacy_path = format!("lights/{id}");
    match ctx
        .write(
            Api::Legacy,
            &legacy_path,
            json!({ "name": target }),
            CallWeight::Standard,
        )
        .await
    {
        Ok(()) => {
            ctx.log
                .success(&format!("renamed light {id} to \"{target}\" (v1)"));
            counts.updated += 1;
        }
        Err(e) => {
            ctx.log
                .error(&format!("could not rename light {id} via v1: {e}"));
            counts.failed += 1;
        }
    }

    let Some(guid) = &light.guid else {
        ctx.log
            .warn(&format!("light {id} has no v2 id; skipping v2 rename"));
        counts.skipped += 1;
        return counts;
    };
    let modern_path = format!("resource/light/{guid}");
    match ctx
        .write(
            Api::Modern,
            &modern_path,
            json!({ "metadata": { "name": target } }),
            CallWeight::Standard,
        )
        .await
    {
        Ok(()) => {
            ctx.log
                .success(&format!("renamed light {id} to \"{target}\" (v2)"));
            counts.updated += 1;
        }
        Err(e) => {
            ctx.log
                .error(&format!("could not rename light {id} via v2: {e}"));
            counts.failed += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::MemoryBridge;
    use crate::log::{Level, MemoryLog};

    fn light(id: &str, guid: Option<&str>, name: &str, startup: Option<&str>) -> Light {
        Light {
            legacy_id: id.into(),
            guid: guid.map(str::to_string),
            name: name.into(),
            startup_mode: startup.map(str::to_string),
        }
    }

    fn bridge() -> MemoryBridge {
        MemoryBridge::new()
            .with_legacy("lights", "5", json!({"name": "Lamp"}))
            .with_legacy("lights", "7", json!({"name": "Hue color lamp 3"}))
            .with_modern("light", json!({"id": "g5", "metadata": {"name": "Lamp"}}))
            .with_modern("light", json!({"id": "g7", "metadata": {"name": "Hue color lamp 3"}}))
    }

    #[tokio::test]
    async fn startup_mode_is_copied_to_new_light() {
        let bridge = bridge();
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };
        let plan = MigrationPlan::new(
            light("5", None, "Lamp", Some("powerfail")),
            light("7", None, "Other", None),
            RenameMode::Inherit,
        )
        .unwrap();

        let counts = transfer_startup(&ctx, &plan).await;

        assert_eq!(counts.updated, 1);
        assert_eq!(
            bridge.legacy("lights/7").unwrap()["config"]["startup"]["mode"],
            "powerfail"
        );
    }

    #[tokio::test]
    async fn missing_startup_mode_is_only_an_info_note() {
        let bridge = bridge();
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };
        let plan = MigrationPlan::new(
            light("5", None, "Lamp", None),
            light("7", None, "Other", None),
            RenameMode::Inherit,
        )
        .unwrap();

        let counts = transfer_startup(&ctx, &plan).await;

        assert_eq!(counts.skipped, 1);
        assert!(bridge.puts().is_empty());
        assert!(log.messages(Level::Warn).is_empty());
        assert_eq!(log.messages(Level::Info).len(), 1);
    }

    #[tokio::test]
    async fn v1_failure_does_not_block_v2_rename() {
        let bridge = bridge().fail_put(Api::Legacy, "lights/7");
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };
        let plan = MigrationPlan::new(
            light("5", Some("g5"), "Lamp", None),
            light("7", Some("g7"), "Hue color lamp 3", None),
            RenameMode::Inherit,
        )
        .unwrap();

        let counts = rename(&ctx, &plan).await;

        assert_eq!(counts.failed, 1);
        assert_eq!(counts.updated, 3);
        assert_eq!(bridge.modern("light", "g7").unwrap()["metadata"]["name"], "Lamp");
        assert_eq!(bridge.legacy("lights/5").unwrap()["name"], "Lamp (old)");
    }

    #[tokio::test]
    async fn unknown_guid_skips_v2_rename_with_warning() {
        let bridge = bridge();
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };
        let plan = MigrationPlan::new(
            light("5", Some("g5"), "Lamp", None),
            light("7", None, "Hue color lamp 3", None),
            RenameMode::MarkNew,
        )
        .unwrap();

        let counts = rename(&ctx, &plan).await;

        assert_eq!(counts.updated, 1);
        assert_eq!(bridge.legacy("lights/7").unwrap()["name"], "Lamp (new)");
        assert_eq!(bridge.legacy("lights/5").unwrap()["name"], "Lamp");
        assert_eq!(log.messages(Level::Warn).len(), 1);
    }

    #[tokio::test]
    async fn inherit_rerun_keeps_both_names() {
        let bridge = bridge();
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };
        let plan = MigrationPlan::new(
            light("5", Some("g5"), "Lamp (old)", None),
            light("7", Some("g7"), "Lamp", None),
            RenameMode::Inherit,
        )
        .unwrap();

        let counts = rename(&ctx, &plan).await;

        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.attempted(), 0);
        assert!(bridge.puts().is_empty());
    }

    #[tokio::test]
    async fn unnamed_old_light_is_not_renamed() {
        let bridge = bridge();
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };
        let plan = MigrationPlan::new(
            light("5", Some("g5"), "", None),
            light("7", Some("g7"), "Hue color lamp 3", None),
            RenameMode::Inherit,
        )
        .unwrap();

        let counts = rename(&ctx, &plan).await;

        assert_eq!(counts.skipped, 1);
        assert!(bridge.puts().is_empty());
        assert_eq!(log.messages(Level::Warn).len(), 1);
        assert_eq!(bridge.legacy("lights/7").unwrap()["name"], "Hue color lamp 3");
    }

    #[tokio::test]
    async fn same_name_is_skipped() {
        let bridge = bridge();
        let log = MemoryLog::new();
        let ctx = Context {
            bridge: &bridge,
            log: &log,
        };
        let plan = MigrationPlan::new(
            light("5", Some("g5"), "Lamp", None),
            light("7", Some("g7"), "Lamp (new)", None),
            RenameMode::MarkNew,
        )
        .unwrap();

        let counts = rename(&ctx, &plan).await;

        assert_eq!(counts.skipped, 1);
        assert!(bridge.puts().is_empty());
    }
}
