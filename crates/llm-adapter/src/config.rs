//! Configuration for backend adapters.

use std::env;
use std::fmt;
use std::str::FromStr;

use brain_core::BrainError;
use serde::{Deserialize, Serialize};

/// Environment variable holding the adapter roster as a JSON array.
pub const ADAPTERS_ENV: &str = "CHIME_ADAPTERS";

/// Wire protocol spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AdapterKind {
    /// OpenAI chat completions (`{endpoint}/chat/completions`).
    OpenAi,
    /// OpenAI wire shape against an endpoint used verbatim.
    Custom,
    /// Cloudflare Workers AI (`{endpoint}/{model}`).
    Cloudflare,
    /// Ollama chat API (`{endpoint}/api/chat`).
    Ollama,
    /// Google Gemini `generateContent`.
    Gemini,
}

impl AdapterKind {
    /// Lowercase configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Custom => "custom",
            Self::Cloudflare => "cloudflare",
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = BrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "custom" => Ok(Self::Custom),
            "cloudflare" => Ok(Self::Cloudflare),
            "ollama" => Ok(Self::Ollama),
            "gemini" => Ok(Self::Gemini),
            other => Err(BrainError::Configuration(format!(
                "unknown adapter kind: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for AdapterKind {
    type Error = BrainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AdapterKind> for String {
    fn from(kind: AdapterKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A vendor-specific parameter forwarded as-is.
///
/// The value is decoded when the request is built; see
/// [`decode_param_value`](crate::decode_param_value).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassthroughParam {
    /// Request field name.
    pub key: String,
    /// Raw value text.
    pub value: String,
}

/// One backend in the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterEntry {
    /// Protocol spoken by the backend.
    pub kind: AdapterKind,

    /// Base URL (or the full URL for `custom`).
    pub endpoint: String,

    /// API key; empty for unauthenticated local backends.
    #[serde(default)]
    pub api_key: String,

    /// Model name.
    pub model: String,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Nucleus sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Frequency penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    /// Presence penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Stop sequences.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,

    /// Extra request fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other_parameters: Vec<PassthroughParam>,

    /// Split inline `<img>` markers into image parts.
    #[serde(default)]
    pub multimodal: bool,
}

impl Default for AdapterEntry {
    fn default() -> Self {
        Self {
            kind: AdapterKind::OpenAi,
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.7),
            max_tokens: Some(1024),
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            stop: Vec::new(),
            other_parameters: Vec::new(),
            multimodal: false,
        }
    }
}

impl AdapterEntry {
    /// Create a new entry builder.
    pub fn builder() -> AdapterEntryBuilder {
        AdapterEntryBuilder::default()
    }

    /// Short label for logs. Never includes the key.
    pub fn label(&self) -> String {
        format!("{}:{}", self.kind, self.model)
    }

    /// Check fields every protocol needs.
    pub fn validate(&self) -> Result<(), BrainError> {
        if self.endpoint.trim().is_empty() {
            return Err(BrainError::Configuration(format!(
                "{} adapter has no endpoint",
                self.kind
            )));
        }
        if self.model.trim().is_empty() && self.kind != AdapterKind::Custom {
            return Err(BrainError::Configuration(format!(
                "{} adapter has no model",
                self.kind
            )));
        }
        Ok(())
    }

    /// Parse a roster from a JSON array of entries.
    pub fn roster_from_json(json: &str) -> Result<Vec<Self>, BrainError> {
        let roster: Vec<Self> = serde_json::from_str(json)
            .map_err(|e| BrainError::Configuration(format!("invalid adapter roster: {e}")))?;
        for entry in &roster {
            entry.validate()?;
        }
        Ok(roster)
    }

    /// Read the roster from `CHIME_ADAPTERS`.
    ///
    /// A missing or empty variable yields an empty roster.
    pub fn roster_from_env() -> Result<Vec<Self>, BrainError> {
        match env::var(ADAPTERS_ENV) {
            Ok(json) if !json.trim().is_empty() => Self::roster_from_json(&json),
            _ => Ok(Vec::new()),
        }
    }
}

/// Builder for [`AdapterEntry`].
#[derive(Debug, Default)]
pub struct AdapterEntryBuilder {
    entry: AdapterEntry,
}

impl AdapterEntryBuilder {
    /// Set the protocol kind.
    pub fn kind(mut self, kind: AdapterKind) -> Self {
        self.entry.kind = kind;
        self
    }

    /// Set the endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.entry.endpoint = endpoint.into();
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.entry.api_key = key.into();
        self
    }

    /// Set the model name.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.entry.model = model.into();
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temp: f32) -> Self {
        self.entry.temperature = Some(temp);
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.entry.max_tokens = Some(tokens);
        self
    }

    /// Set top-p.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.entry.top_p = Some(top_p);
        self
    }

    /// Set the frequency penalty.
    pub fn frequency_penalty(mut self, penalty: f32) -> Self {
        self.entry.frequency_penalty = Some(penalty);
        self
    }

    /// Set the presence penalty.
    pub fn presence_penalty(mut self, penalty: f32) -> Self {
        self.entry.presence_penalty = Some(penalty);
        self
    }

    /// Add a stop sequence.
    pub fn stop(mut self, sequence: impl Into<String>) -> Self {
        self.entry.stop.push(sequence.into());
        self
    }

    /// Add a passthrough parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entry.other_parameters.push(PassthroughParam {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Enable inline image splitting.
    pub fn multimodal(mut self, enable: bool) -> Self {
        self.entry.multimodal = enable;
        self
    }

    /// Build the entry.
    pub fn build(self) -> AdapterEntry {
        self.entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("openai".parse::<AdapterKind>().unwrap(), AdapterKind::OpenAi);
        assert_eq!("Gemini".parse::<AdapterKind>().unwrap(), AdapterKind::Gemini);
        assert_eq!(AdapterKind::Cloudflare.to_string(), "cloudflare");

        match "anthropic".parse::<AdapterKind>() {
            Err(BrainError::Configuration(msg)) => assert!(msg.contains("anthropic")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_all_options() {
        let entry = AdapterEntry::builder()
            .kind(AdapterKind::Ollama)
            .endpoint("http://localhost:11434")
            .model("llama3")
            .temperature(0.2)
            .max_tokens(256)
            .top_p(0.9)
            .frequency_penalty(0.1)
            .presence_penalty(0.3)
            .stop("###")
            .param("seed", "42")
            .multimodal(true)
            .build();

        assert_eq!(entry.kind, AdapterKind::Ollama);
        assert_eq!(entry.endpoint, "http://localhost:11434");
        assert_eq!(entry.temperature, Some(0.2));
        assert_eq!(entry.max_tokens, Some(256));
        assert_eq!(entry.top_p, Some(0.9));
        assert_eq!(entry.stop, vec!["###".to_string()]);
        assert_eq!(entry.other_parameters[0].key, "seed");
        assert!(entry.multimodal);
        assert_eq!(entry.label(), "ollama:llama3");
    }

    #[test]
    fn test_roster_from_json() {
        let roster = AdapterEntry::roster_from_json(
            r#"[
                {"kind": "openai", "endpoint": "https://api.openai.com/v1", "api_key": "k", "model": "gpt-4o"},
                {"kind": "cloudflare", "endpoint": "https://cf/ai/run", "model": "@cf/meta/llama",
                 "other_parameters": [{"key": "raw", "value": "true"}]}
            ]"#,
        )
        .unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].kind, AdapterKind::OpenAi);
        assert_eq!(roster[1].api_key, "");
        assert_eq!(roster[1].other_parameters[0].value, "true");
        assert!(!roster[1].multimodal);
    }

    #[test]
    fn test_roster_rejects_unknown_kind() {
        let result = AdapterEntry::roster_from_json(
            r#"[{"kind": "mystery", "endpoint": "http://x", "model": "m"}]"#,
        );
        assert!(matches!(result, Err(BrainError::Configuration(_))));
    }

    #[test]
    fn test_roster_rejects_missing_endpoint() {
        let result =
            AdapterEntry::roster_from_json(r#"[{"kind": "ollama", "endpoint": " ", "model": "m"}]"#);
        assert!(matches!(result, Err(BrainError::Configuration(_))));
    }

    // Env vars are process-global; keep every scenario behind one lock.
    #[test]
    fn test_roster_from_env_scenarios() {
        use std::sync::Mutex;
        static ENV_LOCK: Mutex<()> = Mutex::new(());
        let _guard = ENV_LOCK.lock().unwrap();

        std::env::remove_var(ADAPTERS_ENV);
        assert!(AdapterEntry::roster_from_env().unwrap().is_empty());

        std::env::set_var(
            ADAPTERS_ENV,
            r#"[{"kind": "gemini", "endpoint": "https://g/v1beta", "api_key": "k", "model": "gemini-pro"}]"#,
        );
        let roster = AdapterEntry::roster_from_env().unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].kind, AdapterKind::Gemini);

        std::env::set_var(ADAPTERS_ENV, "not json");
        assert!(AdapterEntry::roster_from_env().is_err());

        std::env::remove_var(ADAPTERS_ENV);
    }
}
