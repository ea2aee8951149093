//! Per-vendor request building and response normalization.

use brain_core::{AdapterReply, BrainError, Role, Turn, Usage};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::api_types::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, CloudflareResponse,
    GeminiBlob, GeminiContent, GeminiFileData, GeminiPart, GeminiRequest, GeminiResponse,
    MessageContent, OllamaMessage, OllamaRequest, OllamaResponse, OpenAiImageUrl, OpenAiPart,
};
use crate::config::{AdapterEntry, AdapterKind};
use crate::multimodal::{split_content, ContentPart, ImageSource};
use crate::params::decode_params;

/// A JSON POST ready for a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Full URL.
    pub url: String,
    /// Extra headers (content type is added by the transport).
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Value,
}

impl HttpRequest {
    /// Look up a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Wire format of one backend kind.
pub trait Protocol: Send + Sync {
    /// Build the request for a system prompt plus turns.
    fn build_request(
        &self,
        entry: &AdapterEntry,
        system_prompt: &str,
        turns: &[Turn],
    ) -> Result<HttpRequest, BrainError>;

    /// Turn a success body into a normalized reply.
    fn normalize(&self, body: Value) -> Result<AdapterReply, BrainError>;
}

/// The protocol implementation for a kind.
pub fn protocol_for(kind: AdapterKind) -> Box<dyn Protocol> {
    match kind {
        AdapterKind::OpenAi => Box::new(OpenAiProtocol { verbatim: false }),
        AdapterKind::Custom => Box::new(OpenAiProtocol { verbatim: true }),
        AdapterKind::Cloudflare => Box::new(CloudflareProtocol),
        AdapterKind::Ollama => Box::new(OllamaProtocol),
        AdapterKind::Gemini => Box::new(GeminiProtocol),
    }
}

fn base(endpoint: &str) -> &str {
    endpoint.trim().trim_end_matches('/')
}

fn to_body<T: serde::Serialize>(request: &T) -> Result<Value, BrainError> {
    serde_json::to_value(request)
        .map_err(|e| BrainError::Configuration(format!("failed to encode request: {e}")))
}

fn parse<T: DeserializeOwned>(body: Value, vendor: &str) -> Result<T, BrainError> {
    // Some backends answer 200 with an error envelope.
    if let Ok(api_error) = serde_json::from_value::<ApiError>(body.clone()) {
        return Err(BrainError::InvalidResponse(format!(
            "{vendor} returned an error: {}",
            api_error.error.message
        )));
    }
    serde_json::from_value(body)
        .map_err(|e| BrainError::InvalidResponse(format!("unexpected {vendor} response: {e}")))
}

fn bearer(entry: &AdapterEntry) -> Vec<(String, String)> {
    if entry.api_key.is_empty() {
        Vec::new()
    } else {
        vec![(
            "Authorization".to_string(),
            format!("Bearer {}", entry.api_key),
        )]
    }
}

/// Sampling fields shared by protocols that nest them in an options map.
fn sampling_map(entry: &AdapterEntry, names: &SamplingNames) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(t) = entry.temperature {
        map.insert("temperature".into(), Value::from(t));
    }
    if let Some(n) = entry.max_tokens {
        map.insert(names.max_tokens.into(), Value::from(n));
    }
    if let Some(p) = entry.top_p {
        map.insert(names.top_p.into(), Value::from(p));
    }
    if let Some(p) = entry.frequency_penalty {
        map.insert(names.frequency_penalty.into(), Value::from(p));
    }
    if let Some(p) = entry.presence_penalty {
        map.insert(names.presence_penalty.into(), Value::from(p));
    }
    if !entry.stop.is_empty() {
        map.insert(names.stop.into(), Value::from(entry.stop.clone()));
    }
    map.extend(decode_params(&entry.other_parameters));
    map
}

struct SamplingNames {
    max_tokens: &'static str,
    top_p: &'static str,
    frequency_penalty: &'static str,
    presence_penalty: &'static str,
    stop: &'static str,
}

const OLLAMA_NAMES: SamplingNames = SamplingNames {
    max_tokens: "num_predict",
    top_p: "top_p",
    frequency_penalty: "frequency_penalty",
    presence_penalty: "presence_penalty",
    stop: "stop",
};

const GEMINI_NAMES: SamplingNames = SamplingNames {
    max_tokens: "maxOutputTokens",
    top_p: "topP",
    frequency_penalty: "frequencyPenalty",
    presence_penalty: "presencePenalty",
    stop: "stopSequences",
};

// OpenAI / custom

struct OpenAiProtocol {
    verbatim: bool,
}

fn openai_content(entry: &AdapterEntry, text: &str) -> MessageContent {
    if !entry.multimodal {
        return MessageContent::Text(text.to_string());
    }
    let parts = split_content(text);
    if !parts.iter().any(ContentPart::is_image) {
        return MessageContent::Text(text.to_string());
    }
    MessageContent::Parts(
        parts
            .into_iter()
            .map(|part| match part {
                ContentPart::Text(text) => OpenAiPart::Text { text },
                ContentPart::Image { source, detail } => OpenAiPart::ImageUrl {
                    image_url: OpenAiImageUrl {
                        url: source.to_url(),
                        detail,
                    },
                },
            })
            .collect(),
    )
}

fn chat_request(
    entry: &AdapterEntry,
    system_prompt: &str,
    turns: &[Turn],
    multimodal: bool,
) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    if !system_prompt.is_empty() {
        messages.push(ChatMessage::system(system_prompt));
    }
    for turn in turns {
        let content = if multimodal {
            openai_content(entry, &turn.content)
        } else {
            MessageContent::Text(turn.content.clone())
        };
        messages.push(ChatMessage::new(turn.role.as_str(), content));
    }

    ChatCompletionRequest {
        model: entry.model.clone(),
        messages,
        temperature: entry.temperature,
        max_tokens: entry.max_tokens,
        top_p: entry.top_p,
        frequency_penalty: entry.frequency_penalty,
        presence_penalty: entry.presence_penalty,
        stop: entry.stop.clone(),
        extra: decode_params(&entry.other_parameters),
    }
}

impl Protocol for OpenAiProtocol {
    fn build_request(
        &self,
        entry: &AdapterEntry,
        system_prompt: &str,
        turns: &[Turn],
    ) -> Result<HttpRequest, BrainError> {
        let url = if self.verbatim {
            entry.endpoint.trim().to_string()
        } else {
            format!("{}/chat/completions", base(&entry.endpoint))
        };
        let request = chat_request(entry, system_prompt, turns, true);
        Ok(HttpRequest {
            url,
            headers: bearer(entry),
            body: to_body(&request)?,
        })
    }

    fn normalize(&self, body: Value) -> Result<AdapterReply, BrainError> {
        let response: ChatCompletionResponse = parse(body, "chat completion")?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BrainError::InvalidResponse("no choices in response".to_string()))?;
        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens));
        Ok(AdapterReply { content, usage })
    }
}

// Cloudflare Workers AI

struct CloudflareProtocol;

impl Protocol for CloudflareProtocol {
    fn build_request(
        &self,
        entry: &AdapterEntry,
        system_prompt: &str,
        turns: &[Turn],
    ) -> Result<HttpRequest, BrainError> {
        let mut request = chat_request(entry, system_prompt, turns, false);
        // The model travels in the URL.
        request.model = String::new();
        Ok(HttpRequest {
            url: format!("{}/{}", base(&entry.endpoint), entry.model.trim_start_matches('/')),
            headers: bearer(entry),
            body: to_body(&request)?,
        })
    }

    fn normalize(&self, body: Value) -> Result<AdapterReply, BrainError> {
        let response: CloudflareResponse = parse(body, "workers ai")?;
        if !response.success {
            let message = response
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BrainError::InvalidResponse(format!(
                "workers ai reported failure: {message}"
            )));
        }
        let content = response
            .result
            .and_then(|result| result.response)
            .ok_or_else(|| BrainError::InvalidResponse("missing result.response".to_string()))?;
        // Workers AI reports no token counts.
        Ok(AdapterReply {
            content,
            usage: None,
        })
    }
}

// Ollama

struct OllamaProtocol;

fn ollama_message(entry: &AdapterEntry, role: &str, text: &str) -> OllamaMessage {
    if !entry.multimodal {
        return OllamaMessage {
            role: role.to_string(),
            content: text.to_string(),
            images: Vec::new(),
        };
    }

    let mut content = String::new();
    let mut images = Vec::new();
    for part in split_content(text) {
        match part {
            ContentPart::Text(text) => content.push_str(&text),
            ContentPart::Image {
                source: ImageSource::Base64 { data, .. },
                ..
            } => images.push(data),
            // Ollama only accepts inline bytes; keep remote images visible.
            ContentPart::Image {
                source: ImageSource::Url(url),
                ..
            } => {
                content.push_str("[image: ");
                content.push_str(&url);
                content.push(']');
            }
        }
    }
    OllamaMessage {
        role: role.to_string(),
        content,
        images,
    }
}

impl Protocol for OllamaProtocol {
    fn build_request(
        &self,
        entry: &AdapterEntry,
        system_prompt: &str,
        turns: &[Turn],
    ) -> Result<HttpRequest, BrainError> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if !system_prompt.is_empty() {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
                images: Vec::new(),
            });
        }
        messages.extend(
            turns
                .iter()
                .map(|turn| ollama_message(entry, turn.role.as_str(), &turn.content)),
        );

        let request = OllamaRequest {
            model: entry.model.clone(),
            messages,
            stream: false,
            options: sampling_map(entry, &OLLAMA_NAMES),
        };
        Ok(HttpRequest {
            url: format!("{}/api/chat", base(&entry.endpoint)),
            headers: bearer(entry),
            body: to_body(&request)?,
        })
    }

    fn normalize(&self, body: Value) -> Result<AdapterReply, BrainError> {
        let response: OllamaResponse = parse(body, "ollama")?;
        let message = response
            .message
            .ok_or_else(|| BrainError::InvalidResponse("missing message".to_string()))?;
        let usage = match (response.prompt_eval_count, response.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(Usage::new(
                prompt.unwrap_or_default(),
                completion.unwrap_or_default(),
            )),
        };
        Ok(AdapterReply::text(message.content, usage))
    }
}

// Gemini

struct GeminiProtocol;

fn gemini_parts(entry: &AdapterEntry, text: &str) -> Vec<GeminiPart> {
    if !entry.multimodal {
        return vec![GeminiPart::text(text)];
    }
    let parts: Vec<GeminiPart> = split_content(text)
        .into_iter()
        .map(|part| match part {
            ContentPart::Text(text) => GeminiPart::text(text),
            ContentPart::Image {
                source: ImageSource::Base64 { mime_type, data },
                ..
            } => GeminiPart {
                inline_data: Some(GeminiBlob { mime_type, data }),
                ..Default::default()
            },
            ContentPart::Image {
                source: ImageSource::Url(url),
                ..
            } => GeminiPart {
                file_data: Some(GeminiFileData { file_uri: url }),
                ..Default::default()
            },
        })
        .collect();
    if parts.is_empty() {
        vec![GeminiPart::text(text)]
    } else {
        parts
    }
}

impl Protocol for GeminiProtocol {
    fn build_request(
        &self,
        entry: &AdapterEntry,
        system_prompt: &str,
        turns: &[Turn],
    ) -> Result<HttpRequest, BrainError> {
        let contents = turns
            .iter()
            .map(|turn| GeminiContent {
                role: Some(
                    match turn.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: gemini_parts(entry, &turn.content),
            })
            .collect();

        let request = GeminiRequest {
            system_instruction: (!system_prompt.is_empty()).then(|| GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(system_prompt)],
            }),
            contents,
            generation_config: sampling_map(entry, &GEMINI_NAMES),
        };

        Ok(HttpRequest {
            url: format!(
                "{}/models/{}:generateContent?key={}",
                base(&entry.endpoint),
                entry.model,
                entry.api_key
            ),
            headers: Vec::new(),
            body: to_body(&request)?,
        })
    }

    fn normalize(&self, body: Value) -> Result<AdapterReply, BrainError> {
        let response: GeminiResponse = parse(body, "gemini")?;
        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| BrainError::InvalidResponse("no candidates in response".to_string()))?;
        let text: String = content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        let usage = response
            .usage_metadata
            .map(|u| Usage::new(u.prompt_token_count, u.candidates_token_count));
        Ok(AdapterReply::text(text, usage))
    }
}
