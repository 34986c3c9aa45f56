pub mod lights;
pub mod login;
pub mod logout;
pub mod migrate;

use std::future::Future;

use crate::error::Result;

/// Drive a future on a single-threaded runtime; bridge calls never overlap.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
