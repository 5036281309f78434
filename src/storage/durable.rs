use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::Identity;

const STATE_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionState {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    usuario: Option<Identity>,
    #[serde(default)]
    logged_out_at: Option<DateTime<Utc>>,
}

/// Durable session state: the storage scope that survives the process.
/// Holds the token mirror, the cached identity snapshot and the last
/// logout timestamp, persisted whole on every mutation.
#[derive(Debug)]
pub struct DurableStore {
    path: PathBuf,
    state: RwLock<SessionState>,
}

impl DurableStore {
    /// Open the state file under the given directory, creating the
    /// directory if needed. A missing or corrupt file reads as an
    /// empty session.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| Error::storage(dir, e))?;
        let path = dir.join(STATE_FILE);
        let state = Self::load(&path);
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    fn load(path: &Path) -> SessionState {
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "corrupt session state file, starting empty"
                );
                SessionState::default()
            }),
            Err(_) => SessionState::default(),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.read().usuario.clone()
    }

    pub fn last_logout(&self) -> Option<DateTime<Utc>> {
        self.read().logged_out_at
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.update(|state| state.token = Some(token.to_string()))
    }

    pub fn set_identity(&self, identity: &Identity) -> Result<()> {
        self.update(|state| state.usuario = Some(identity.clone()))
    }

    /// Drop the token and the cached identity snapshot in one write.
    pub fn clear_session(&self) -> Result<()> {
        self.update(|state| {
            state.token = None;
            state.usuario = None;
        })
    }

    /// Record when the last logout happened. This is the durable trace
    /// of the logout signal broadcast to peer contexts.
    pub fn record_logout(&self, at: DateTime<Utc>) -> Result<()> {
        self.update(|state| state.logged_out_at = Some(at))
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        match self.state.read() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut SessionState)) -> Result<()> {
        let mut state = match self.state.write() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        apply(&mut state);
        let raw = serde_json::to_string_pretty(&*state)?;
        fs::write(&self.path, raw).map_err(|e| Error::storage(&self.path, e))?;
        debug!(path = %self.path.display(), "session state persisted");
        Ok(())
    }
}
