use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::build_info;
use crate::model::{Light, MigrationPlan, RenameMode};

/// Outcome tally for one kind of write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepCounts {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl StepCounts {
    pub fn attempted(&self) -> usize {
        self.updated + self.failed
    }

    /// Fold another tally into this one.
    pub fn absorb(&mut self, other: StepCounts) {
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    pub(crate) fn aborted() -> Self {
        Self {
            failed: 1,
            ..Self::default()
        }
    }
}

/// Receipt of what a run attempted. It does not prove the bridge ended up
/// in the intended state; check the result in the app.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationSummary {
    pub version: String,
    pub dry_run: bool,
    pub old: Light,
    pub new: Light,
    pub mode: RenameMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub groups: StepCounts,
    pub scene_states: StepCounts,
    pub scene_members: StepCounts,
    pub scenes_unreadable: usize,
    pub rules: StepCounts,
    pub automations: StepCounts,
    pub startup: StepCounts,
    pub renames: StepCounts,
    pub warnings: usize,
    pub errors: usize,
}

impl MigrationSummary {
    pub fn new(plan: &MigrationPlan, dry_run: bool) -> Self {
        Self {
            version: build_info::version_label(),
            dry_run,
            old: plan.old.clone(),
            new: plan.new.clone(),
            mode: plan.mode,
            started_at: Utc::now(),
            finished_at: None,
            groups: StepCounts::default(),
            scene_states: StepCounts::default(),
            scene_members: StepCounts::default(),
            scenes_unreadable: 0,
            rules: StepCounts::default(),
            automations: StepCounts::default(),
            startup: StepCounts::default(),
            renames: StepCounts::default(),
            warnings: 0,
            errors: 0,
        }
    }

    pub fn finish(&mut self, warnings: usize, errors: usize) {
        self.warnings = warnings;
        self.errors = errors;
        self.finished_at = Some(Utc::now());
    }

    /// (label, counts) rows in step order.
    pub fn rows(&self) -> [(&'static str, StepCounts); 7] {
        [
            ("groups", self.groups),
            ("scene light states", self.scene_states),
            ("scene members", self.scene_members),
            ("rules", self.rules),
            ("automations", self.automations),
            ("startup config", self.startup),
            ("renames", self.renames),
        ]
    }

    pub fn total_failed(&self) -> usize {
        self.rows().iter().map(|(_, c)| c.failed).sum()
    }

    pub fn total_attempted(&self) -> usize {
        self.rows().iter().map(|(_, c)| c.attempted()).sum()
    }
}
