use serde::Deserialize;

/// End-of-stream marker carried in a `data:` line.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One classified line of the completion event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Blank line, comment, or any line that is not a `data:` event.
    Heartbeat,
    /// Text fragment from `choices[0].delta.content`.
    Delta(String),
    /// `data: [DONE]`.
    Done,
    /// `data:` payload that is not valid JSON; kept for logging.
    Malformed(String),
    /// Well-formed event without text, such as a role-only delta.
    Ignored,
}

impl StreamChunk {
    /// Classifies one line, without its trailing newline.
    pub fn from_line(line: &str) -> Self {
        let line = line.trim();
        let Some(payload) = line.strip_prefix("data:") else {
            return Self::Heartbeat;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return Self::Heartbeat;
        }
        if payload == DONE_SENTINEL {
            return Self::Done;
        }

        match serde_json::from_str::<ChunkPayload>(payload) {
            Ok(chunk) => chunk
                .into_delta()
                .map(Self::Delta)
                .unwrap_or(Self::Ignored),
            Err(_) => Self::Malformed(payload.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

impl ChunkPayload {
    fn into_delta(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()?
            .delta?
            .content
            .filter(|content| !content.is_empty())
    }
}

/// Non-streaming `chat/completions` body.
#[derive(Debug, Deserialize)]
pub(crate) struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl CompletionBody {
    /// `choices[0].message.content`, if present.
    pub(crate) fn into_content(self) -> Option<String> {
        self.choices.into_iter().next()?.message?.content
    }
}
