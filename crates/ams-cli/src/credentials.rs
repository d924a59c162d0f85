//! Access token storage
//!
//! Stores the bearer token in ~/.config/ams/credentials.json with restricted
//! permissions (0o600). `AMS_ACCESS_TOKEN` is used when nothing is stored.

use ams_stream::CredentialProvider;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Environment variable read as a fallback token
pub const TOKEN_ENV_VAR: &str = "AMS_ACCESS_TOKEN";

/// Stored token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    /// When the token was saved, in milliseconds
    pub saved_at: i64,
}

/// Token store backed by a JSON file
#[derive(Debug)]
pub struct FileCredentials {
    path: PathBuf,
    env_token: RwLock<Option<String>>,
}

impl FileCredentials {
    /// Store under the default config directory, with the env fallback
    pub fn open_default() -> Self {
        let store = Self::at(crate::config::Config::config_dir().join("credentials.json"));
        *store.env_token.write() = std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty());
        store
    }

    /// Store at an explicit path, without the env fallback
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_token: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Token saved on disk, ignoring the env fallback
    pub fn load(&self) -> Option<StoredToken> {
        let content = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Whether the token in use comes from the environment
    pub fn from_env(&self) -> bool {
        self.load().is_none() && self.env_token.read().is_some()
    }

    fn save(&self, token: &StoredToken) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
                #[cfg(unix)]
                fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
            }
        }

        let content = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, content)?;

        #[cfg(unix)]
        fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl CredentialProvider for FileCredentials {
    fn get(&self) -> Option<String> {
        self.load()
            .map(|t| t.access_token)
            .or_else(|| self.env_token.read().clone())
    }

    fn set(&self, token: String) {
        let stored = StoredToken {
            access_token: token,
            saved_at: chrono::Utc::now().timestamp_millis(),
        };
        if let Err(e) = self.save(&stored) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to save token");
        }
    }

    fn clear(&self) {
        *self.env_token.write() = None;
        if let Err(e) = self.remove() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove token");
        }
    }
}
