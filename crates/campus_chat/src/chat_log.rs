use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use campus_llm::ChatLogRecorder;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const CHAT_LOG_FILE: &str = "chat_log.jsonl";

/// One line of the JSONL chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatLogLine {
    pub timestamp: String,
    pub model: String,
    pub input: String,
    pub output: String,
}

/// Appends each exchange as one JSON object per line.
///
/// Write failures are logged and dropped; a broken log never fails a call.
#[derive(Debug, Clone)]
pub struct JsonlChatLog {
    path: PathBuf,
}

impl JsonlChatLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_cache_dir(cache_dir: &Path) -> Self {
        Self::new(cache_dir.join(CHAT_LOG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn try_append(&self, line: &ChatLogLine) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut encoded = serde_json::to_string(line).map_err(std::io::Error::other)?;
        encoded.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(encoded.as_bytes())?;
        file.flush()
    }

    /// Every parsable line, oldest first.
    pub fn read_all(&self) -> std::io::Result<Vec<ChatLogLine>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };
        Ok(raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

impl ChatLogRecorder for JsonlChatLog {
    fn record(&self, model: &str, input: &str, output: &str) {
        let line = ChatLogLine {
            timestamp: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            model: model.to_owned(),
            input: input.to_owned(),
            output: output.to_owned(),
        };
        if let Err(error) = self.try_append(&line) {
            tracing::warn!(path = %self.path.display(), %error, "failed to append chat log");
        }
    }
}
