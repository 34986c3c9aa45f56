use serde_json::json;

use crate::error::{BulbError, Result};
use crate::output::Format;
use crate::store::credentials::{CredentialStore, StoredCredentials};

pub fn run(
    store: &CredentialStore,
    host: String,
    username: String,
    insecure: bool,
    format: Format,
) -> Result<()> {
    if host.trim().is_empty() || username.trim().is_empty() {
        return Err(BulbError::NotConfigured);
    }
    let path = store.save(&StoredCredentials {
        host,
        username,
        insecure,
    })?;
    match format {
        Format::Json => println!("{}", json!({ "saved": path.display().to_string() })),
        _ => eprintln!("Saved bridge credentials to {}", path.display()),
    }
    Ok(())
}
