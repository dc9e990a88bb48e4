//! Session persistence
//!
//! Stores the queue index and position on teardown so the next start can
//! pick up where the listener left off.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{PlaybackError, Result};

/// Persisted playback position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub last_index: usize,
    pub last_position_ms: u64,

    /// Unix seconds at which the session was saved
    #[serde(default)]
    pub saved_at: i64,
}

impl PersistedSession {
    /// Create a session stamped with the current time
    pub fn new(last_index: usize, last_position_ms: u64) -> Self {
        Self {
            last_index,
            last_position_ms,
            saved_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Storage for the persisted session
pub trait SessionStore: Send {
    /// Write the session, replacing any previous one
    fn save(&self, session: &PersistedSession) -> Result<()>;

    /// Read the last saved session, if any
    fn load(&self) -> Result<Option<PersistedSession>>;
}

/// Session stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonSessionStore {
    path: PathBuf,
}

impl JsonSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for JsonSessionStore {
    fn save(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write-then-rename; readers never observe a partial file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(session)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedSession>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            PlaybackError::Session(format!("corrupt session file {:?}: {}", self.path, e))
        })
    }
}

/// In-memory session store
///
/// Clones share storage, so a handle kept by the host can inspect what the
/// controller saved.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<Option<PersistedSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `session`
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(session))),
        }
    }

    /// Last saved session
    pub fn get(&self) -> Option<PersistedSession> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(*session);
        Ok(())
    }

    fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.get())
    }
}
