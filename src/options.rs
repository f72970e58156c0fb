use reqwest::Url;

use crate::OpenAiError;

/// Default API root used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default `User-Agent` value sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("openai-chat-http/", env!("CARGO_PKG_VERSION"));

/// Configures endpoint, timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// API root; `/chat/completions` is appended to it.
    pub base_url: String,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// `User-Agent` header value. `None` leaves the header unset.
    pub user_agent: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: 30_000,
            max_retries: 2,
            user_agent: Some(DEFAULT_USER_AGENT.to_owned()),
        }
    }
}

impl ClientOptions {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Full URL of the chat completions endpoint.
    ///
    /// The path segments are appended to the base URL's path, so a query
    /// string on the base (e.g. `?api-version=...`) is kept as is.
    pub(crate) fn endpoint(&self) -> Result<Url, OpenAiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| OpenAiError::BadUrl(format!("{}: {err}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| {
                OpenAiError::BadUrl(format!("{}: cannot be a base url", self.base_url))
            })?
            .pop_if_empty()
            .extend(["chat", "completions"]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientOptions, DEFAULT_BASE_URL};
    use crate::OpenAiError;

    fn endpoint_of(base_url: &str) -> String {
        ClientOptions::default()
            .with_base_url(base_url)
            .endpoint()
            .unwrap()
            .to_string()
    }

    #[test]
    fn defaults_match_public_api() {
        let opts = ClientOptions::default();
        assert_eq!(opts.base_url, DEFAULT_BASE_URL);
        assert_eq!(opts.timeout_ms, 30_000);
        assert_eq!(opts.max_retries, 2);
        assert!(opts
            .user_agent
            .as_deref()
            .is_some_and(|ua| ua.starts_with("openai-chat-http/")));
    }

    #[test]
    fn endpoint_appends_path_once() {
        assert_eq!(
            endpoint_of("http://127.0.0.1:8080/v1/"),
            "http://127.0.0.1:8080/v1/chat/completions"
        );
        assert_eq!(
            endpoint_of(DEFAULT_BASE_URL),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            endpoint_of("http://127.0.0.1:8080"),
            "http://127.0.0.1:8080/chat/completions"
        );
    }

    #[test]
    fn endpoint_keeps_query_string_of_base() {
        assert_eq!(
            endpoint_of("https://example.openai.azure.com/openai?api-version=2024-06-01"),
            "https://example.openai.azure.com/openai/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn endpoint_rejects_unusable_bases() {
        for base_url in ["not a url", "mailto:ops@example.com"] {
            let err = ClientOptions::default()
                .with_base_url(base_url)
                .endpoint()
                .unwrap_err();
            assert!(matches!(err, OpenAiError::BadUrl(_)), "{base_url}: {err:?}");
        }
    }
}
