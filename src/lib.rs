//! `openai-chat-http` is an async client for the OpenAI chat completions API.
//!
//! One call sends a system and a user message to `/chat/completions` and
//! retries transient failures (timeouts, connection errors, 429 and 5xx) with
//! exponential backoff or the server's `Retry-After` hint:
//! - [`OpenAiClient::chat`] returns the reply text
//! - [`OpenAiClient::chat_json`] requests a JSON object and decodes it
//!
//! Every successful call also returns a [`RequestStatus`]; failures are
//! reported as an [`OpenAiError`].

mod backoff;
mod client;
mod credential;
mod decode;
mod error;
mod options;
mod params;
mod types;
mod wire;

pub use client::OpenAiClient;
pub use credential::{CredentialError, CredentialProvider, EnvKey, StaticKey};
pub use decode::{body_snippet, BODY_SNIPPET_LIMIT};
pub use error::{is_retryable_status, OpenAiError};
pub use options::{ClientOptions, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
pub use params::ChatParams;
pub use tokio_util::sync::CancellationToken;
pub use types::RequestStatus;

pub type Result<T> = std::result::Result<T, OpenAiError>;
