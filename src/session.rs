use crate::error::{MetaError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which side of the migration a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSlot {
    Source,
    Dest,
}

impl AccountSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountSlot::Source => "source",
            AccountSlot::Dest => "destination",
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            AccountSlot::Source => "source",
            AccountSlot::Dest => "dest",
        }
    }
}

impl fmt::Display for AccountSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session record persisted between `--setup` and later runs.
///
/// For Drive the OAuth tokens themselves live in the SDK's token file (see
/// [`SessionStore::token_path`]); this record carries the identity and, for
/// Box, the bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub backend: String,
    pub account_email: String,
    pub obtained_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// File-backed store for per-slot sessions, passed explicitly to whatever
/// needs it rather than held as global state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Store under the user config directory (`~/.config/remeta`).
    pub fn open_default() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| MetaError::Config("could not determine config directory".into()))?;
        Self::open(base.join("remeta"))
    }

    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the Drive SDK should persist OAuth tokens for this slot.
    pub fn token_path(&self, slot: AccountSlot) -> PathBuf {
        self.dir.join(format!("{}-tokens.json", slot.file_stem()))
    }

    /// Where the OAuth client secret is expected.
    pub fn client_secret_path(&self) -> PathBuf {
        self.dir.join("client_secret.json")
    }

    fn session_path(&self, slot: AccountSlot) -> PathBuf {
        self.dir.join(format!("{}-session.json", slot.file_stem()))
    }

    pub fn load(&self, slot: AccountSlot) -> Result<Option<StoredSession>> {
        let path = self.session_path(slot);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Like [`load`](Self::load) but failing with a setup hint when absent.
    pub fn require(&self, slot: AccountSlot) -> Result<StoredSession> {
        self.load(slot)?.ok_or_else(|| MetaError::Auth {
            account: slot.as_str().to_string(),
        })
    }

    pub fn save(&self, slot: AccountSlot, session: &StoredSession) -> Result<()> {
        let path = self.session_path(slot);
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn clear(&self, slot: AccountSlot) -> Result<()> {
        let path = self.session_path(slot);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(backend: &str) -> StoredSession {
        StoredSession {
            backend: backend.to_string(),
            account_email: "alice@old.example".to_string(),
            obtained_at: Utc::now(),
            access_token: Some("tok".to_string()),
            refresh_token: None,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();

        assert!(store.load(AccountSlot::Source).unwrap().is_none());

        store.save(AccountSlot::Source, &sample("drive")).unwrap();
        let loaded = store.load(AccountSlot::Source).unwrap().unwrap();
        assert_eq!(loaded.backend, "drive");
        assert_eq!(loaded.account_email, "alice@old.example");

        // Slots are independent
        assert!(store.load(AccountSlot::Dest).unwrap().is_none());
    }

    #[test]
    fn require_reports_missing_session_as_auth_error() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();

        let err = store.require(AccountSlot::Dest).unwrap_err();
        assert!(matches!(err, crate::error::MetaError::Auth { .. }));
    }

    #[test]
    fn clear_removes_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();

        store.save(AccountSlot::Dest, &sample("box")).unwrap();
        store.clear(AccountSlot::Dest).unwrap();
        assert!(store.load(AccountSlot::Dest).unwrap().is_none());
    }
}
