use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::Session;

pub const RECORD_VERSION: u32 = 1;

/// On-disk shape of a persisted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionRecord {
    pub version: u32,
    pub cookies: BTreeMap<String, String>,
    pub last_login_time: i64,
    pub checksum: String,
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        Self {
            version: RECORD_VERSION,
            cookies: session.cookies().clone(),
            last_login_time: session.last_login_time(),
            checksum: session.checksum().to_owned(),
        }
    }
}

impl SessionRecord {
    pub(crate) fn into_session(self) -> Session {
        Session::from_parts(self.cookies, self.last_login_time, self.checksum)
    }
}
