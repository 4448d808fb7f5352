use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const SESSION_FILE: &str = "session.json";

/// How long a sign-in lasts.
pub const SESSION_LIFETIME_HOURS: i64 = 24;

/// Who is signed in and the token to present to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub username: String,
    /// Bearer token, if the service issued one at login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub signed_in_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(username: &str, token: Option<String>) -> Self {
        Self::signed_in_at(username, token, Utc::now())
    }

    fn signed_in_at(username: &str, token: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            username: username.to_string(),
            token,
            signed_in_at: at,
            expires_at: at + Duration::hours(SESSION_LIFETIME_HOURS),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Minutes left before the sign-in lapses, zero once expired.
    pub fn minutes_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_minutes().max(0)
    }
}

/// The signed-in user, persisted as JSON under the cache directory.
pub struct Session {
    path: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            path: cache_dir.join(SESSION_FILE),
            data: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored sign-in. Returns whether a live one was found; an
    /// expired file is left in place and ignored.
    pub fn load(&mut self) -> Result<bool> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        let data: SessionData =
            serde_json::from_str(&contents).context("Session file is corrupt")?;

        if data.is_expired() {
            debug!(username = %data.username, "Stored session has expired");
            return Ok(false);
        }
        self.data = Some(data);
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        let Some(data) = &self.data else {
            return Ok(());
        };
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(data)?)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Forget the sign-in, in memory and on disk.
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("Failed to remove {}", self.path.display()))
            }
            _ => Ok(()),
        }
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    fn live(&self) -> Option<&SessionData> {
        self.data.as_ref().filter(|d| !d.is_expired())
    }

    pub fn token(&self) -> Option<&str> {
        self.live().and_then(|d| d.token.as_deref())
    }

    pub fn username(&self) -> Option<&str> {
        self.live().map(|d| d.username.as_str())
    }

    pub fn is_valid(&self) -> bool {
        self.live().is_some()
    }
}
