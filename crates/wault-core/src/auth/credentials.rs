use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::SessionStore;
use crate::clock::Clock;

/// Key the session record is stored under
pub const SESSION_STORAGE_KEY: &str = "wault.user";

/// A signed-in session. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub device_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What actually gets persisted. Expiry lives in the store entry itself.
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    access_token: String,
    device_id: String,
}

/// Persists the current credential in a time-bounded `SessionStore`.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Store `credential`, overwriting any previous session.
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let record = SessionRecord {
            access_token: credential.access_token.clone(),
            device_id: credential.device_id.clone(),
        };
        let value = serde_json::to_string(&record)?;
        self.backend
            .set(SESSION_STORAGE_KEY, &value, credential.expires_at)?;
        debug!(expires_at = %credential.expires_at, "Session saved");
        Ok(())
    }

    /// The stored credential, if there is a live and readable one.
    pub fn load(&self) -> Option<Credential> {
        let entry = match self.backend.get(SESSION_STORAGE_KEY, self.clock.now()) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read session store");
                return None;
            }
        };
        let record: SessionRecord = serde_json::from_str(&entry.value).ok()?;
        let credential = Credential {
            access_token: record.access_token,
            device_id: record.device_id,
            expires_at: entry.expires_at,
        };
        // Not every backend enforces expiry on read.
        if credential.is_expired_at(self.clock.now()) {
            debug!(expires_at = %credential.expires_at, "Ignoring expired session");
            return None;
        }
        Some(credential)
    }

    /// Invalidate the stored session immediately by back-dating its expiry.
    pub fn clear(&self) -> Result<()> {
        let past = self.clock.now() - Duration::days(1);
        self.backend.set(SESSION_STORAGE_KEY, "", past)?;
        debug!("Session cleared");
        Ok(())
    }

    pub fn is_signed_in(&self) -> bool {
        self.load().is_some()
    }
}
