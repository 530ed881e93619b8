use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Seconds a login stays trusted before a fresh login is required.
pub const LOGIN_INTERVAL_SECS: i64 = 7200;

/// Authenticated (or anonymous) cookie session issued by the gateway.
///
/// A session is never edited in place: a refresh produces a new value with a
/// new timestamp and checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    cookies: BTreeMap<String, String>,
    last_login_time: i64,
    checksum: String,
}

impl Session {
    #[must_use]
    pub fn new(cookies: BTreeMap<String, String>, last_login_time: i64) -> Self {
        let checksum = session_checksum(&cookies, last_login_time);
        Self {
            cookies,
            last_login_time,
            checksum,
        }
    }

    /// Session stamped with the current wall-clock time.
    #[must_use]
    pub fn issued_now(cookies: BTreeMap<String, String>) -> Self {
        Self::new(cookies, now_epoch_seconds())
    }

    /// Cookie-less session handed out when every login strategy failed.
    ///
    /// Its timestamp is the epoch, so it is already expired and never reused.
    #[must_use]
    pub fn degraded() -> Self {
        Self::new(BTreeMap::new(), 0)
    }

    /// Rebuilds a session from stored parts without recomputing the checksum.
    pub(crate) fn from_parts(
        cookies: BTreeMap<String, String>,
        last_login_time: i64,
        checksum: String,
    ) -> Self {
        Self {
            cookies,
            last_login_time,
            checksum,
        }
    }

    #[must_use]
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    #[must_use]
    pub fn last_login_time(&self) -> i64 {
        self.last_login_time
    }

    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    #[must_use]
    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.cookies.is_empty()
    }

    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        session_checksum(&self.cookies, self.last_login_time) == self.checksum
    }

    #[must_use]
    pub fn is_expired_at(&self, now: i64, login_interval: i64) -> bool {
        now.saturating_sub(self.last_login_time) > login_interval
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_epoch_seconds(), LOGIN_INTERVAL_SECS)
    }

    /// `Cookie` request header value, `None` for a cookie-less session.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Hex SHA-256 over the key-sorted JSON cookie map followed by the timestamp.
#[must_use]
pub fn session_checksum(cookies: &BTreeMap<String, String>, last_login_time: i64) -> String {
    let canonical = serde_json::to_string(cookies).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(last_login_time.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[must_use]
pub fn now_epoch_seconds() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
