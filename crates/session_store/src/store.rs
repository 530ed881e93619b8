use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::SessionStoreError;
use crate::paths::{cookie_cache_path, staging_path};
use crate::schema::{SessionRecord, RECORD_VERSION};
use crate::session::{now_epoch_seconds, session_checksum, Session, LOGIN_INTERVAL_SECS};

/// File-backed persistence for the current [`Session`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    login_interval: i64,
}

impl CredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            login_interval: LOGIN_INTERVAL_SECS,
        }
    }

    #[must_use]
    pub fn in_cache_dir(cache_dir: &Path) -> Self {
        Self::new(cookie_cache_path(cache_dir))
    }

    #[must_use]
    pub fn with_login_interval(mut self, login_interval: i64) -> Self {
        self.login_interval = login_interval;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn login_interval(&self) -> i64 {
        self.login_interval
    }

    /// Persists `session`, logging and swallowing any failure.
    ///
    /// The in-memory session stays usable even when the cache cannot be
    /// written.
    pub fn save(&self, session: &Session) {
        match self.try_save(session) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "session cache saved"),
            Err(error) => {
                tracing::warn!(path = %self.path.display(), %error, "failed to save session cache")
            }
        }
    }

    pub fn try_save(&self, session: &Session) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| {
                SessionStoreError::io("creating session cache directory", parent, source)
            })?;
        }

        let staging = staging_path(&self.path);
        {
            let file = File::create(&staging).map_err(|source| {
                SessionStoreError::io("creating session cache file", &staging, source)
            })?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &SessionRecord::from(session))
                .map_err(|source| SessionStoreError::serialize(&self.path, source))?;
            writer.flush().map_err(|source| {
                SessionStoreError::io("flushing session cache file", &staging, source)
            })?;
        }

        fs::rename(&staging, &self.path).map_err(|source| {
            let _ = fs::remove_file(&staging);
            SessionStoreError::io("replacing session cache file", &self.path, source)
        })
    }

    /// Loads the cached session, treating every rejection as a cache miss.
    #[must_use]
    pub fn load(&self) -> Option<Session> {
        match self.try_load() {
            Ok(session) => {
                tracing::info!(path = %self.path.display(), "loaded session from cache");
                Some(session)
            }
            Err(SessionStoreError::Missing { .. }) => None,
            Err(error) if error.is_corruption() => {
                tracing::warn!(%error, "discarding corrupt session cache");
                None
            }
            Err(error) => {
                tracing::debug!(%error, "session cache not usable");
                None
            }
        }
    }

    pub fn try_load(&self) -> Result<Session, SessionStoreError> {
        self.try_load_at(now_epoch_seconds())
    }

    /// Same as [`Self::try_load`] with an explicit "now" in epoch seconds.
    pub fn try_load_at(&self, now: i64) -> Result<Session, SessionStoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(SessionStoreError::Missing {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(SessionStoreError::io(
                    "opening session cache file",
                    &self.path,
                    source,
                ));
            }
        };

        let record: SessionRecord = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| SessionStoreError::parse(&self.path, source))?;

        if record.version != RECORD_VERSION {
            return Err(SessionStoreError::UnsupportedVersion {
                path: self.path.clone(),
                found: record.version,
                expected: RECORD_VERSION,
            });
        }

        let age_secs = now.saturating_sub(record.last_login_time);
        if age_secs > self.login_interval {
            return Err(SessionStoreError::Expired {
                path: self.path.clone(),
                age_secs,
                interval_secs: self.login_interval,
            });
        }

        if session_checksum(&record.cookies, record.last_login_time) != record.checksum {
            return Err(SessionStoreError::ChecksumMismatch {
                path: self.path.clone(),
            });
        }

        Ok(record.into_session())
    }

    /// Removes the cache file; a missing file is not an error.
    pub fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::io(
                "removing session cache file",
                &self.path,
                source,
            )),
        }
    }
}
