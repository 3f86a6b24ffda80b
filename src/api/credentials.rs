//! Credential providers for authenticated API calls
//!
//! Every request asks its provider for a token at call time, so a login or
//! logout performed elsewhere is picked up by the next call.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "token";
pub const USER_NAME_KEY: &str = "user_name";

/// Source of the bearer token attached to each request
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Fixed token, used for `--token` overrides and tests
#[derive(Debug, Clone)]
pub struct StaticToken(pub Option<String>);

impl CredentialProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Persisted string key-value store holding the signed-in session
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read session file: {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Malformed session file: {}", self.path.display()))
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("Cannot write session file: {}", self.path.display()))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                warn!("Ignoring unreadable session: {:#}", e);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    /// Store a fresh session, replacing any previous one
    pub fn sign_in(&self, token: &str, user_name: Option<&str>) -> Result<()> {
        let mut entries = BTreeMap::new();
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        if let Some(name) = user_name {
            entries.insert(USER_NAME_KEY.to_string(), name.to_string());
        }
        self.save(&entries)
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Cannot remove session file: {}", self.path.display()))?;
        }
        debug!("Session cleared");
        Ok(())
    }

    pub fn user_name(&self) -> Option<String> {
        self.get(USER_NAME_KEY)
    }
}

impl CredentialProvider for SessionStore {
    fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_is_read_on_every_call() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        assert_eq!(store.token(), None);

        store.sign_in("abc", Some("Koy")).unwrap();
        assert_eq!(store.token().as_deref(), Some("abc"));
        assert_eq!(store.user_name().as_deref(), Some("Koy"));

        store.set(TOKEN_KEY, "rotated").unwrap();
        assert_eq!(store.token().as_deref(), Some("rotated"));
        assert_eq!(store.user_name().as_deref(), Some("Koy"));

        store.clear().unwrap();
        assert_eq!(store.token(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_malformed_session_reads_as_signed_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        let store = SessionStore::new(path);
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_static_token() {
        assert_eq!(StaticToken(Some("t".into())).token().as_deref(), Some("t"));
        assert_eq!(StaticToken(None).token(), None);
    }
}
