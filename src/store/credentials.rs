use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bridge::BridgeConfig;
use crate::bridge::http::normalize_host;
use crate::error::{BulbError, Result};

pub const CONFIG_DIR_ENV: &str = "BULBSWAP_CONFIG_DIR";

/// Bridge address and API username remembered between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub host: String,
    pub username: String,
    #[serde(default)]
    pub insecure: bool,
}

/// File-based storage for credentials in `{config_dir}/bridge.json`.
pub struct CredentialStore {
    root: PathBuf,
}

impl CredentialStore {
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// `$BULBSWAP_CONFIG_DIR`, else the platform config dir.
    pub fn open_default() -> Result<Self> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Ok(Self::open(Path::new(&dir)));
        }
        let base = dirs::config_dir().ok_or_else(|| {
            BulbError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no config directory on this platform; set {CONFIG_DIR_ENV}"),
            ))
        })?;
        Ok(Self::open(&base.join("bulbswap")))
    }

    fn credentials_path(&self) -> PathBuf {
        self.root.join("bridge.json")
    }

    /// Lock file guarding writes to one bridge.
    pub fn lock_path(&self, host: &str) -> PathBuf {
        let safe: String = host
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("run-{safe}.lock"))
    }

    pub fn load(&self) -> Result<Option<StoredCredentials>> {
        let path = self.credentials_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub fn save(&self, credentials: &StoredCredentials) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.credentials_path();
        let stored = StoredCredentials {
            host: normalize_host(&credentials.host),
            ..credentials.clone()
        };
        fs::write(&path, serde_json::to_string_pretty(&stored)?)?;
        Ok(path)
    }

    /// Forget stored credentials. Returns whether anything was removed.
    pub fn clear(&self) -> Result<bool> {
        let path = self.credentials_path();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    /// Combine explicit values with stored ones; explicit values win field by field.
    pub fn resolve(
        &self,
        host: Option<String>,
        username: Option<String>,
        insecure: bool,
    ) -> Result<BridgeConfig> {
        let stored = self.load()?;
        let host = host.or_else(|| stored.as_ref().map(|s| s.host.clone()));
        let username = username.or_else(|| stored.as_ref().map(|s| s.username.clone()));
        let insecure = insecure || stored.as_ref().is_some_and(|s| s.insecure);
        match (host, username) {
            (Some(host), Some(username)) if !host.trim().is_empty() && !username.is_empty() => {
                Ok(BridgeConfig::new(host, username).insecure(insecure))
            }
            _ => Err(BulbError::NotConfigured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_load_and_clear() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path());
        assert!(store.load().unwrap().is_none());

        store
            .save(&StoredCredentials {
                host: "https://10.0.0.2/".into(),
                username: "user-1".into(),
                insecure: true,
            })
            .unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.host, "10.0.0.2");
        assert!(loaded.insecure);

        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn explicit_values_override_stored_ones() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path());
        store
            .save(&StoredCredentials {
                host: "10.0.0.2".into(),
                username: "stored".into(),
                insecure: false,
            })
            .unwrap();

        let config = store.resolve(None, Some("flag".into()), false).unwrap();
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.username, "flag");
    }

    #[test]
    fn resolve_without_anything_is_not_configured() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::open(dir.path());
        let err = store.resolve(Some("10.0.0.2".into()), None, false).unwrap_err();
        assert_eq!(err.code(), "not_configured");
    }

    #[test]
    fn lock_path_is_filesystem_safe() {
        let store = CredentialStore::open(Path::new("/tmp/x"));
        assert_eq!(
            store.lock_path("192.168.1.20:443"),
            Path::new("/tmp/x/run-192.168.1.20_443.lock")
        );
    }
}
