//! Moving every reference from one bulb to another.
//!
//! A run reads both light collections once, validates the selection, then
//! walks groups, scenes, rules and automations in that order before
//! carrying over startup behavior and names. There is no transaction: each
//! resource is written on its own, and a failed write is logged, counted
//! and left behind while the run moves on.

pub mod automations;
pub mod groups;
pub mod identity;
pub mod reconcile;
pub mod rules;
pub mod scanner;
pub mod scenes;
pub mod summary;

use serde_json::Value;

use crate::bridge::{Api, Bridge, CallWeight};
use crate::error::Result;
use crate::log::{CountingLog, LogSink};
use crate::model::RenameMode;

pub use reconcile::{IdentifierMap, LightInventory};
pub use scanner::{references, scan_and_augment};
pub use summary::{MigrationSummary, StepCounts};

/// What the operator asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    pub old: String,
    pub new: String,
    pub mode: RenameMode,
    pub dry_run: bool,
}

/// Bridge and log handed to every step.
pub struct Context<'a> {
    pub bridge: &'a dyn Bridge,
    pub log: &'a dyn LogSink,
}

impl Context<'_> {
    /// Write and surface any warnings the bridge returned with its 2xx reply.
    pub async fn write(&self, api: Api, path: &str, body: Value, weight: CallWeight) -> Result<()> {
        let reply = self.bridge.put(api, path, body, weight).await?;
        for warning in reply.warnings {
            self.log.warn(&format!("bridge warning on {api} {path}: {warning}"));
        }
        Ok(())
    }
}

/// Entries of a string array member such as a group's `lights`.
pub(crate) fn string_list(resource: &Value, key: &str) -> Vec<String> {
    resource
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `"Name" (id)` for log lines.
pub(crate) fn label(resource: &Value, id: &str) -> String {
    let name = resource
        .get("name")
        .or_else(|| resource.pointer("/metadata/name"))
        .and_then(Value::as_str);
    match name {
        Some(name) => format!("\"{name}\" ({id})"),
        None => id.to_string(),
    }
}

pub struct Migrator<'a> {
    bridge: &'a dyn Bridge,
    log: &'a dyn LogSink,
}

impl<'a> Migrator<'a> {
    pub fn new(bridge: &'a dyn Bridge, log: &'a dyn LogSink) -> Self {
        Self { bridge, log }
    }

    /// Run every step. Only reading the lights and validating the selection
    /// can fail the run; everything after that is contained per step.
    pub async fn run(&self, request: &MigrationRequest) -> Result<MigrationSummary> {
        let log = CountingLog::new(self.log);
        let ctx = Context {
            bridge: self.bridge,
            log: &log,
        };

        log.info("Reading lights from both APIs");
        let inventory = LightInventory::fetch(self.bridge).await?;
        log.info(&format!(
            "Found {} lights, {} of them known to the v2 API",
            inventory.lights().len(),
            inventory.identifiers().len()
        ));

        let plan = inventory.plan(&request.old, &request.new, request.mode)?;
        log.info(&format!(
            "Migrating \"{}\" ({}) to \"{}\" ({}), rename mode {}",
            plan.old.name, plan.old.legacy_id, plan.new.name, plan.new.legacy_id, plan.mode
        ));
        for light in [&plan.old, &plan.new] {
            if light.guid.is_none() {
                log.warn(&format!(
                    "light {} has no v2 id; v2 renames and automations will be skipped for it",
                    light.legacy_id
                ));
            }
        }

        let mut summary = MigrationSummary::new(&plan, request.dry_run);

        summary.groups = contain(&log, "groups", groups::migrate(&ctx, &plan).await);

        match scenes::migrate(&ctx, &plan).await {
            Ok(counts) => {
                summary.scene_states = counts.states;
                summary.scene_members = counts.members;
                summary.scenes_unreadable = counts.unreadable;
            }
            Err(e) => {
                log.error(&format!("scenes: step aborted: {e}"));
                summary.scene_states = StepCounts::aborted();
            }
        }

        summary.rules = contain(&log, "rules", rules::migrate(&ctx, &plan).await);
        summary.automations = contain(&log, "automations", automations::migrate(&ctx, &plan).await);
        summary.startup = identity::transfer_startup(&ctx, &plan).await;
        summary.renames = identity::rename(&ctx, &plan).await;

        summary.finish(log.warnings(), log.errors());
        log.info(&format!(
            "Done: {} writes attempted, {} failed, {} warnings. Check the result in the app.",
            summary.total_attempted(),
            summary.total_failed(),
            summary.warnings
        ));
        Ok(summary)
    }
}

fn contain(log: &dyn LogSink, step: &str, result: Result<StepCounts>) -> StepCounts {
    match result {
        Ok(counts) => counts,
        Err(e) => {
            log.error(&format!("{step}: step aborted: {e}"));
            StepCounts::aborted()
        }
    }
}
