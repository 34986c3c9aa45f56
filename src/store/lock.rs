use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

use crate::error::{BulbError, Result};

/// Acquire an exclusive lock on a file, returning the locked File handle.
/// The lock is released when the File is dropped.
pub fn acquire_lock(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    file.try_lock_exclusive().map_err(|_| {
        BulbError::Locked(format!(
            "another migration is running against this bridge ({})",
            path.display()
        ))
    })?;

    Ok(file)
}

/// Release lock explicitly (normally handled by Drop).
pub fn release_lock(file: File) -> Result<()> {
    file.unlock()?;
    Ok(())
}
