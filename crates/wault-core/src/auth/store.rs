//! Cookie-like session storage backends.
//!
//! Every backend stores named string values with an absolute expiry and must
//! refuse to hand back an entry once that expiry has passed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Keychain service name for the keyring backend
const SERVICE_NAME: &str = "wault";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredEntry {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub trait SessionStore: Send + Sync {
    /// Write `value` under `name`, replacing whatever was there.
    fn set(&self, name: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Read the entry for `name`. Entries whose expiry is not after `now` are
    /// never returned.
    fn get(&self, name: &str, now: DateTime<Utc>) -> Result<Option<StoredEntry>>;

    fn remove(&self, name: &str) -> Result<()>;
}

/// Process-local store. Useful for tests and short-lived hosts.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry regardless of expiry.
    pub fn raw(&self, name: &str) -> Option<StoredEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}

impl SessionStore for MemorySessionStore {
    fn set(&self, name: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).insert(
            name.to_string(),
            StoredEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    fn get(&self, name: &str, now: DateTime<Utc>) -> Result<Option<StoredEntry>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(name).filter(|e| e.is_live(now)).cloned())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
        Ok(())
    }
}

/// One JSON file per entry in a directory. Expired files are deleted when
/// they are next read.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create session directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

impl SessionStore for FileSessionStore {
    fn set(&self, name: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at,
        };
        let contents = serde_json::to_string_pretty(&entry)?;
        std::fs::write(self.entry_path(name), contents)
            .with_context(|| format!("Failed to write session entry {}", name))?;
        Ok(())
    }

    fn get(&self, name: &str, now: DateTime<Utc>) -> Result<Option<StoredEntry>> {
        let path = self.entry_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session entry {}", name))?;
        let entry: StoredEntry = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session entry {}", name))?;

        if entry.is_live(now) {
            Ok(Some(entry))
        } else {
            debug!(name = name, "Evicting expired session entry");
            std::fs::remove_file(&path)?;
            Ok(None)
        }
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.entry_path(name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// OS keychain backed store. The keychain has no notion of expiry, so the
/// entry is kept as a JSON `StoredEntry` and checked on read.
#[derive(Debug, Clone, Default)]
pub struct KeyringSessionStore;

impl KeyringSessionStore {
    fn entry(name: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, name).context("Failed to create keyring entry")
    }
}

impl SessionStore for KeyringSessionStore {
    fn set(&self, name: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let entry = StoredEntry {
            value: value.to_string(),
            expires_at,
        };
        Self::entry(name)?
            .set_password(&serde_json::to_string(&entry)?)
            .context("Failed to store session in keychain")?;
        Ok(())
    }

    fn get(&self, name: &str, now: DateTime<Utc>) -> Result<Option<StoredEntry>> {
        let raw = match Self::entry(name)?.get_password() {
            Ok(raw) => raw,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e).context("Failed to retrieve session from keychain"),
        };
        let entry: StoredEntry =
            serde_json::from_str(&raw).context("Failed to parse keychain session entry")?;
        Ok(Some(entry).filter(|e| e.is_live(now)))
    }

    fn remove(&self, name: &str) -> Result<()> {
        match Self::entry(name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}
