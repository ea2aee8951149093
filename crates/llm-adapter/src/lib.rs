//! Backend adapters for chime.
//!
//! This crate turns one roster entry into an [`Adapter`](brain_core::Adapter)
//! that speaks a vendor's chat API:
//!
//! - [`AdapterEntry`] / [`AdapterKind`] - Roster configuration (`openai`, `custom`,
//!   `cloudflare`, `ollama`, `gemini`)
//! - [`Protocol`] - Builds the vendor request and normalizes its response
//! - [`Transport`] / [`HttpTransport`] - Posts JSON with reqwest
//! - [`split_content`] - Splits inline `<img>` markers into image parts
//!
//! # Usage
//!
//! ```rust,no_run
//! use brain_core::{Adapter, Turn};
//! use llm_adapter::{AdapterEntry, AdapterKind, LlmAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let entry = AdapterEntry::builder()
//!         .kind(AdapterKind::Ollama)
//!         .endpoint("http://localhost:11434")
//!         .model("llama3")
//!         .build();
//!     let adapter = LlmAdapter::from_entry(entry)?;
//!     let reply = adapter.call("Answer in JSON.", &[Turn::user("hi")]).await?;
//!     println!("{}", reply.content_text());
//!     Ok(())
//! }
//! ```

mod adapter;
mod api_types;
mod config;
mod multimodal;
mod params;
mod protocol;
mod transport;

pub use adapter::LlmAdapter;
pub use config::{AdapterEntry, AdapterEntryBuilder, AdapterKind, PassthroughParam, ADAPTERS_ENV};
pub use multimodal::{has_images, split_content, ContentPart, ImageSource};
pub use params::{decode_param_value, decode_params};
pub use protocol::{protocol_for, HttpRequest, Protocol};
pub use transport::{HttpTransport, Transport, DEFAULT_TIMEOUT};
