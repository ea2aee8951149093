//! Vendor request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// OpenAI chat completions (also used by `custom` and Cloudflare requests).

/// A chat message in OpenAI shape.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,
    /// Plain text or an array of content parts
    pub content: MessageContent,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a message with the given role and content.
    pub fn new(role: &str, content: MessageContent) -> Self {
        Self {
            role: role.to_string(),
            content,
        }
    }
}

/// Message content: a single string or ordered parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Single text payload.
    Text(String),
    /// Multimodal parts.
    Parts(Vec<OpenAiPart>),
}

/// OpenAI content part.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAiPart {
    /// Text part.
    Text {
        /// The text.
        text: String,
    },
    /// Image part.
    ImageUrl {
        /// Image location.
        image_url: OpenAiImageUrl,
    },
}

/// Image location for OpenAI vision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAiImageUrl {
    /// HTTP URL or data URI.
    pub url: String,
    /// Detail level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model to use
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<ChatMessage>,
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Frequency penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Presence penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    /// Passthrough parameters
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Response choices
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Token usage
    pub usage: Option<OpenAiUsage>,
}

/// A response choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// The message
    pub message: ResponseMessage,
}

/// Response message.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    /// Content (may be null or structured)
    pub content: Option<Value>,
}

/// OpenAI token usage.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiUsage {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Completion tokens
    #[serde(default)]
    pub completion_tokens: u32,
}

// Cloudflare Workers AI.

/// Workers AI response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareResponse {
    /// Model output
    pub result: Option<CloudflareResult>,
    /// Whether the call succeeded
    #[serde(default = "default_true")]
    pub success: bool,
    /// Error entries
    #[serde(default)]
    pub errors: Vec<CloudflareMessage>,
}

/// Workers AI result.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareResult {
    /// Generated text (or structure for JSON mode)
    pub response: Option<Value>,
}

/// Workers AI error entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareMessage {
    /// Error message
    #[serde(default)]
    pub message: String,
}

fn default_true() -> bool {
    true
}

// Ollama.

/// Ollama chat message.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaMessage {
    /// Role
    pub role: String,
    /// Text content
    pub content: String,
    /// Base64 images (no data URI prefix)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// Ollama chat request.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaRequest {
    /// Model to use
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<OllamaMessage>,
    /// Always false; the adapter reads one response
    pub stream: bool,
    /// Sampling options
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

/// Ollama chat response.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaResponse {
    /// Generated message
    pub message: Option<OllamaResponseMessage>,
    /// Prompt tokens
    pub prompt_eval_count: Option<u32>,
    /// Completion tokens
    pub eval_count: Option<u32>,
}

/// Ollama response message.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaResponseMessage {
    /// Generated text
    #[serde(default)]
    pub content: String,
}

// Gemini.

/// Gemini `generateContent` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// System instruction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    /// Conversation
    pub contents: Vec<GeminiContent>,
    /// Sampling configuration
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub generation_config: Map<String, Value>,
}

/// Gemini content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    /// "user" or "model"; absent for system instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Parts
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// Gemini part. Exactly one field is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    /// Text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline image bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<GeminiBlob>,
    /// Remote image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<GeminiFileData>,
}

impl GeminiPart {
    /// A text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Inline bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiBlob {
    /// Media type
    pub mime_type: String,
    /// Base64 data
    pub data: String,
}

/// Remote file reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiFileData {
    /// File URI
    pub file_uri: String,
}

/// Gemini response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    /// Candidates
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    /// Token usage
    pub usage_metadata: Option<GeminiUsage>,
}

/// A Gemini candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidate {
    /// Generated content
    pub content: Option<GeminiContent>,
}

/// Gemini token usage.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsage {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_token_count: u32,
    /// Completion tokens
    #[serde(default)]
    pub candidates_token_count: u32,
}

// Errors.

/// API error response (OpenAI and Gemini shape).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Error details
    pub error: ApiErrorDetails,
}

/// API error details.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetails {
    /// Error message
    pub message: String,
}
