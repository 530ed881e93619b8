//! Durable, checksummed persistence of the CAS login session.
//!
//! The on-disk record is plain versioned JSON. Anything that fails to parse,
//! carries an unexpected version, is older than the login interval, or whose
//! checksum disagrees with the recomputed one is treated as a cache miss.

mod error;
mod paths;
mod schema;
mod session;
mod store;

pub use error::SessionStoreError;
pub use paths::{cookie_cache_path, COOKIE_CACHE_FILE, DEFAULT_CACHE_DIR};
pub use schema::{SessionRecord, RECORD_VERSION};
pub use session::{now_epoch_seconds, session_checksum, Session, LOGIN_INTERVAL_SECS};
pub use store::CredentialStore;
