//! Collaborator contract for one completion call.
//!
//! This crate defines the request shape handed to the completion client and
//! the two callbacks the client drives: a partial-result sink that receives
//! ordered text snapshots, and a chat-log recorder that is told about every
//! completed exchange. It holds no transport or authentication details.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.95;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Speaker of one conversational turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One role-tagged turn. Images are base64 JPEG payloads without a data-URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub images: Vec<String>,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            images: Vec::new(),
        }
    }

    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Immutable completion request. Build it with [`CompletionRequest::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    model: String,
    input: String,
    messages: Vec<ChatMessage>,
    sampling: SamplingParams,
    stream: bool,
    api_key: Option<String>,
}

impl CompletionRequest {
    /// Starts a request whose final user turn is `input`.
    #[must_use]
    pub fn builder(input: impl Into<String>) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(input)
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Text of the final user turn, as recorded in the chat log.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn sampling(&self) -> SamplingParams {
        self.sampling
    }

    #[must_use]
    pub fn stream(&self) -> bool {
        self.stream
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Ordered image payloads attached to the final user turn.
    #[must_use]
    pub fn images(&self) -> &[String] {
        self.messages
            .last()
            .map(|message| message.images.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequestBuilder {
    model: String,
    input: String,
    system_prompt: Option<String>,
    history: Vec<String>,
    images: Vec<String>,
    sampling: SamplingParams,
    stream: bool,
    api_key: Option<String>,
}

impl CompletionRequestBuilder {
    fn new(input: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            input: input.into(),
            system_prompt: None,
            history: Vec::new(),
            images: Vec::new(),
            sampling: SamplingParams::default(),
            stream: true,
            api_key: None,
        }
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Blank prompts are dropped.
    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    /// Flat history alternating user and assistant text, oldest first.
    ///
    /// A trailing item without its assistant reply is ignored.
    #[must_use]
    pub fn history(mut self, history: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.history = history.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn image(mut self, base64_jpeg: impl Into<String>) -> Self {
        self.images.push(base64_jpeg.into());
        self
    }

    #[must_use]
    pub fn sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.sampling.temperature = temperature;
        self
    }

    #[must_use]
    pub fn top_p(mut self, top_p: f64) -> Self {
        self.sampling.top_p = top_p;
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.sampling.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Optional bearer key; blank keys are dropped.
    #[must_use]
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        self.api_key = (!api_key.trim().is_empty()).then(|| api_key.trim().to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(prompt) = self.system_prompt {
            messages.push(ChatMessage::system(prompt));
        }
        for pair in self.history.chunks_exact(2) {
            messages.push(ChatMessage::user(pair[0].clone()));
            messages.push(ChatMessage::assistant(pair[1].clone()));
        }
        messages.push(ChatMessage {
            role: Role::User,
            text: self.input.clone(),
            images: self.images,
        });

        CompletionRequest {
            model: self.model,
            input: self.input,
            messages,
            sampling: self.sampling,
            stream: self.stream,
            api_key: self.api_key,
        }
    }
}

/// Status label attached to every partial-result notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Waiting,
    Streaming,
    Finished,
}

impl StreamStatus {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting for response",
            Self::Streaming => "streaming",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of the accumulated text so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialUpdate<'a> {
    pub text: &'a str,
    pub status: StreamStatus,
}

impl PartialUpdate<'_> {
    #[must_use]
    pub fn to_owned_result(&self) -> PartialResult {
        PartialResult {
            text: self.text.to_owned(),
            status: self.status,
        }
    }
}

/// Owned form of [`PartialUpdate`] for sinks that move results across tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResult {
    pub text: String,
    pub status: StreamStatus,
}

/// Receiver of ordered partial results.
///
/// Returning `ControlFlow::Break` tells the producer that nobody is listening
/// anymore; it stops consuming the stream.
pub trait PartialResultSink: Send {
    fn push(&mut self, update: PartialUpdate<'_>) -> ControlFlow<()>;
}

impl<F> PartialResultSink for F
where
    F: FnMut(PartialUpdate<'_>) -> ControlFlow<()> + Send,
{
    fn push(&mut self, update: PartialUpdate<'_>) -> ControlFlow<()> {
        self(update)
    }
}

/// Sink that forwards owned results over an unbounded channel.
///
/// Dropping the receiver cancels the producer on its next push.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<PartialResult>,
}

impl ChannelSink {
    #[must_use]
    pub fn new(sender: UnboundedSender<PartialResult>) -> Self {
        Self { sender }
    }
}

impl PartialResultSink for ChannelSink {
    fn push(&mut self, update: PartialUpdate<'_>) -> ControlFlow<()> {
        match self.sender.send(update.to_owned_result()) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }
}

/// Records each completed exchange exactly once.
pub trait ChatLogRecorder: Send + Sync {
    fn record(&self, model: &str, input: &str, output: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChatLog;

impl ChatLogRecorder for NoopChatLog {
    fn record(&self, _model: &str, _input: &str, _output: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub model: String,
    pub input: String,
    pub output: String,
}

/// In-memory recorder, handy for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryChatLog {
    entries: Mutex<Vec<ChatLogEntry>>,
}

impl MemoryChatLog {
    #[must_use]
    pub fn entries(&self) -> Vec<ChatLogEntry> {
        lock_unpoisoned(&self.entries).clone()
    }
}

impl ChatLogRecorder for MemoryChatLog {
    fn record(&self, model: &str, input: &str, output: &str) {
        lock_unpoisoned(&self.entries).push(ChatLogEntry {
            model: model.to_owned(),
            input: input.to_owned(),
            output: output.to_owned(),
        });
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
