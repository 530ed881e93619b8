use chat_contract::{ChatMessage, CompletionRequest, Role};
use serde::Serialize;

/// Prefix turning a base64 JPEG payload into an `image_url` data URL.
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Wire body for `POST chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: WireContent,
}

/// Plain text, or multi-part content when the turn carries images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let content = if message.images.is_empty() {
            WireContent::Text(message.text.clone())
        } else {
            let mut parts = Vec::with_capacity(message.images.len() + 1);
            parts.push(ContentPart::Text {
                text: message.text.clone(),
            });
            parts.extend(message.images.iter().map(|image| ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("{JPEG_DATA_URL_PREFIX}{image}"),
                },
            }));
            WireContent::Parts(parts)
        };

        Self {
            role: message.role,
            content,
        }
    }
}

/// Builds the wire body, overriding the request's stream flag with `stream`.
pub fn build_payload(request: &CompletionRequest, stream: bool) -> ChatPayload {
    let sampling = request.sampling();
    ChatPayload {
        model: request.model().to_string(),
        messages: request.messages().iter().map(WireMessage::from).collect(),
        temperature: sampling.temperature,
        top_p: sampling.top_p,
        max_tokens: sampling.max_tokens,
        stream,
    }
}
