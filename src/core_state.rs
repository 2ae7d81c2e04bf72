//! Application-scoped session context.
//!
//! `CoreState` is created once at startup and passed by `Arc` to the API
//! client and every view. It owns the bearer token and the authenticated
//! doctor, mirrors them to a durable session file, and publishes auth
//! status changes on a watch channel so the front-end can route to the
//! login screen when a session ends.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config;
use crate::models::Doctor;

// ═══════════════════════════════════════════════════════════
// Durable session file
// ═══════════════════════════════════════════════════════════

/// What survives a restart: the token and the doctor it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub doctor: Doctor,
}

/// JSON file holding the current [`StoredSession`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `config::session_file()`.
    pub fn at_default_location() -> Self {
        Self::new(config::session_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session. A missing file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<StoredSession>, SessionError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionError::Storage(e)),
        };
        let session = serde_json::from_slice(&bytes)?;
        Ok(Some(session))
    }

    /// Write the session atomically (temp file + rename).
    pub fn save(&self, session: &StoredSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(session)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Remove the stored session. Missing file is not an error.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Storage(e)),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

/// Published whenever the session changes.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    LoggedOut,
    Authenticated(Doctor),
    /// Ended by the server (401). The front-end must show the login screen.
    Expired,
}

/// Process-wide session state with an explicit `init`/`teardown` lifecycle.
pub struct CoreState {
    session: RwLock<Option<StoredSession>>,
    store: SessionStore,
    status: watch::Sender<AuthStatus>,
}

impl CoreState {
    pub fn new(store: SessionStore) -> Self {
        let (status, _) = watch::channel(AuthStatus::LoggedOut);
        Self {
            session: RwLock::new(None),
            store,
            status,
        }
    }

    /// Restore a previously stored session.
    ///
    /// A corrupt session file is removed and treated as logged out.
    pub fn init(&self) -> Result<AuthStatus, SessionError> {
        let restored = match self.store.load() {
            Ok(restored) => restored,
            Err(SessionError::Corrupt(e)) => {
                tracing::warn!(error = %e, "Discarding unreadable session file");
                self.store.clear()?;
                None
            }
            Err(e) => return Err(e),
        };

        let status = match &restored {
            Some(s) => {
                tracing::info!(doctor = %s.doctor.name, "Restored stored session");
                AuthStatus::Authenticated(s.doctor.clone())
            }
            None => AuthStatus::LoggedOut,
        };
        *self.session.write().map_err(|_| SessionError::LockPoisoned)? = restored;
        self.status.send_replace(status.clone());
        Ok(status)
    }

    /// Drop the in-memory session. The durable file is left for the next start.
    pub fn teardown(&self) {
        if let Ok(mut guard) = self.session.write() {
            *guard = None;
        }
        self.status.send_replace(AuthStatus::LoggedOut);
        tracing::debug!("Session context torn down");
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Option<StoredSession>>, SessionError> {
        self.session.read().map_err(|_| SessionError::LockPoisoned)
    }

    // ── Read path ───────────────────────────────────────────

    /// Bearer token for outgoing requests.
    pub fn token(&self) -> Option<String> {
        self.read().ok()?.as_ref().map(|s| s.token.clone())
    }

    pub fn doctor(&self) -> Option<Doctor> {
        self.read().ok()?.as_ref().map(|s| s.doctor.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Doctor must change the initial password before using the app.
    pub fn requires_password_change(&self) -> bool {
        self.doctor()
            .map(|d| d.require_password_change)
            .unwrap_or(false)
    }

    pub fn status(&self) -> AuthStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    // ── Write path ──────────────────────────────────────────

    /// Start a session after a successful login.
    pub fn set_session(&self, token: String, doctor: Doctor) -> Result<(), SessionError> {
        let session = StoredSession {
            token,
            doctor: doctor.clone(),
        };
        self.store.save(&session)?;
        *self
            .session
            .write()
            .map_err(|_| SessionError::LockPoisoned)? = Some(session);
        self.status.send_replace(AuthStatus::Authenticated(doctor));
        Ok(())
    }

    /// Replace the stored doctor profile, keeping the token.
    pub fn update_doctor(&self, doctor: Doctor) -> Result<(), SessionError> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| SessionError::LockPoisoned)?;
        let session = guard.as_mut().ok_or(SessionError::NoActiveSession)?;
        session.doctor = doctor.clone();
        self.store.save(session)?;
        drop(guard);
        self.status.send_replace(AuthStatus::Authenticated(doctor));
        Ok(())
    }

    /// User-initiated logout.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.clear_all()?;
        self.status.send_replace(AuthStatus::LoggedOut);
        tracing::info!("Logged out");
        Ok(())
    }

    /// Server reported the session as no longer valid.
    pub fn expire(&self) {
        if let Err(e) = self.clear_all() {
            tracing::warn!(error = %e, "Failed to clear expired session");
        }
        self.status.send_replace(AuthStatus::Expired);
        tracing::info!("Session expired, stored identity cleared");
    }

    /// Login was refused. Any identity left from an earlier session goes
    /// too, but this is not an expiry.
    pub fn reject_credentials(&self) {
        if let Err(e) = self.clear_all() {
            tracing::warn!(error = %e, "Failed to clear stored session");
        }
        self.status.send_replace(AuthStatus::LoggedOut);
        tracing::info!("Credentials rejected, stored identity cleared");
    }

    fn clear_all(&self) -> Result<(), SessionError> {
        if let Ok(mut guard) = self.session.write() {
            *guard = None;
        }
        self.store.clear()
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("No active session")]
    NoActiveSession,
    #[error("Session storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
