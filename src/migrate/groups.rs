use serde_json::json;

use crate::bridge::{Api, CallWeight};
use crate::error::{BulbError, Result};
use crate::migrate::{Context, StepCounts, label, string_list};
use crate::model::MigrationPlan;

/// Add the new light to every group that holds the old one.
pub async fn migrate(ctx: &Context<'_>, plan: &MigrationPlan) -> Result<StepCounts> {
    let old = plan.old.legacy_id.as_str();
    let new = plan.new.legacy_id.as_str();

    ctx.log.info("Checking groups");
    let groups = ctx.bridge.get(Api::Legacy, "groups").await?.body;
    let groups = groups
        .as_object()
        .ok_or_else(|| BulbError::Malformed("v1 group collection is not an object".to_string()))?;

    let mut counts = StepCounts::default();
    for (id, group) in groups {
        let mut lights = string_list(group, "lights");
        if !lights.iter().any(|l| l == old) {
            continue;
        }
        let name = label(group, id);
        if lights.iter().any(|l| l == new) {
            ctx.log
                .info(&format!("group {name} already contains light {new}"));
            counts.skipped += 1;
            continue;
        }

        lights.push(new.to_string());
        let path = format!("groups/{id}");
        match ctx
            .write(Api::Legacy, &path, json!({ "lights": lights }), CallWeight::Standard)
            .await
        {
            Ok(()) => {
                ctx.log.success(&format!("added light {new} to group {name}"));
                counts.updated += 1;
            }
            Err(e) => {
                ctx.log.error(&format!("could not update group {name}: {e}"));
                counts.failed += 1;
            }
        }
    }

    if counts == StepCounts::default() {
        ctx.log.info(&format!("no group contains light {old}"));
    }
    Ok(counts)
}
