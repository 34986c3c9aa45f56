use crate::bridge::{Bridge, BridgeConfig, DryRunBridge, HttpBridge};
use crate::commands::block_on;
use crate::error::{BulbError, Result};
use crate::log::{ConsoleLog, LogSink};
use crate::migrate::{MigrationRequest, MigrationSummary, Migrator};
use crate::output::{Format, print_summary};
use crate::store::credentials::CredentialStore;
use crate::store::lock;

pub fn run(
    config: BridgeConfig,
    store: &CredentialStore,
    request: MigrationRequest,
    format: Format,
) -> Result<()> {
    // Reject before touching the network or the lock.
    if request.old == request.new {
        return Err(BulbError::InvalidSelection(format!(
            "old and new light are both {}",
            request.old
        )));
    }

    let lock_file = if request.dry_run {
        None
    } else {
        Some(lock::acquire_lock(&store.lock_path(&config.host))?)
    };

    let bridge = HttpBridge::new(config)?;
    let log = ConsoleLog::new(format);
    let summary = block_on(execute(&bridge, &log, &request))??;

    if let Some(file) = lock_file {
        lock::release_lock(file)?;
    }
    print_summary(&summary, format)
}

/// Run a migration, wrapping the bridge so nothing is written on a dry run.
pub async fn execute(
    bridge: &dyn Bridge,
    log: &dyn LogSink,
    request: &MigrationRequest,
) -> Result<MigrationSummary> {
    if request.dry_run {
        log.info("Dry run: nothing will be written to the bridge");
        let dry = DryRunBridge::new(bridge, log);
        Migrator::new(&dry, log).run(request).await
    } else {
        Migrator::new(bridge, log).run(request).await
    }
}
