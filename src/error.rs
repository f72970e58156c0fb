use crate::credential::CredentialError;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    /// The chat completions endpoint could not be formed from the base URL.
    #[error("bad url: {0}")]
    BadUrl(String),
    /// Non-success HTTP status code with a bounded snippet of the response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Structured error message returned by the API.
    #[error("api error {status}: {message}")]
    Api {
        /// HTTP status of the failing response.
        status: u16,
        /// `error.message` from the response envelope.
        message: String,
    },
    /// Request encoding, response decoding or typed-result decoding error.
    #[error("decode error: {0}")]
    Decode(String),
    /// The per-attempt deadline was exceeded on the last allowed attempt.
    #[error("request timed out")]
    Timeout,
    /// The call was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,
    /// Any other transport failure after retries were exhausted.
    #[error("network error: {0}")]
    Network(String),
    /// The credential provider failed; no request was sent.
    #[error("credential error: {0}")]
    Credential(#[source] CredentialError),
}

impl OpenAiError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Returns `true` for statuses the client retries: 429 and the 5xx range.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}
