use serde_json::json;

use crate::error::Result;
use crate::output::Format;
use crate::store::credentials::CredentialStore;

pub fn run(store: &CredentialStore, format: Format) -> Result<()> {
    let removed = store.clear()?;
    match format {
        Format::Json => println!("{}", json!({ "removed": removed })),
        _ if removed => eprintln!("Removed stored bridge credentials"),
        _ => eprintln!("No stored bridge credentials"),
    }
    Ok(())
}
