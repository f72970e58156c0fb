use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Url,
};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::{
    backoff::retry_delay,
    credential::{CredentialProvider, StaticKey},
    decode::{
        body_snippet, decode_api_error, decode_completion, decode_typed, encode_request,
        request_id, retry_after, BODY_SNIPPET_LIMIT,
    },
    error::is_retryable_status,
    ChatParams, ClientOptions, OpenAiError, RequestStatus, Result,
};

#[derive(Clone)]
/// HTTP client for the chat completions endpoint.
///
/// The client holds no per-call state: clones share the underlying
/// `reqwest::Client` and credential provider, and any number of calls may run
/// concurrently against the same instance.
pub struct OpenAiClient {
    http: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    model: String,
    options: ClientOptions,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("model", &self.model)
            .field("credentials", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

/// Raw result of one HTTP exchange.
struct Exchange {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl OpenAiClient {
    /// Creates a client with a fixed API key.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_provider(StaticKey::new(api_key), model)
    }

    /// Creates a client that asks `provider` for the API key on every call.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use openai_chat_http::{EnvKey, OpenAiClient};
    ///
    /// let client = OpenAiClient::with_provider(EnvKey::default(), "gpt-4o-mini");
    /// ```
    pub fn with_provider<P>(provider: P, model: impl Into<String>) -> Self
    where
        P: CredentialProvider + 'static,
    {
        Self {
            http: reqwest::Client::new(),
            credentials: Arc::new(provider),
            model: model.into(),
            options: ClientOptions::default(),
        }
    }

    /// Applies client options such as base URL, timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Sends requests through an existing `reqwest::Client` (and its pool).
    ///
    /// The per-attempt timeout from [`ClientOptions`] is applied on each
    /// request, on top of whatever the given client is configured with.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Options this client was configured with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends a chat request and returns the reply text.
    pub async fn chat(&self, params: &ChatParams) -> Result<(String, RequestStatus)> {
        self.chat_with_cancel(params, &CancellationToken::new()).await
    }

    /// Like [`OpenAiClient::chat`], aborting with [`OpenAiError::Cancelled`]
    /// once `cancel` fires, including mid-request and mid-backoff.
    pub async fn chat_with_cancel(
        &self,
        params: &ChatParams,
        cancel: &CancellationToken,
    ) -> Result<(String, RequestStatus)> {
        self.send_with_retry(params, params.structured_output, cancel).await
    }

    /// Sends a structured-output request and decodes the reply as `T`.
    ///
    /// The JSON-object response format is always requested. A reply that does
    /// not decode as `T` fails with [`OpenAiError::Decode`] and is not retried.
    pub async fn chat_json<T: DeserializeOwned>(
        &self,
        params: &ChatParams,
    ) -> Result<(T, RequestStatus)> {
        self.chat_json_with_cancel(params, &CancellationToken::new()).await
    }

    /// Like [`OpenAiClient::chat_json`], observing `cancel` the same way as
    /// [`OpenAiClient::chat_with_cancel`].
    pub async fn chat_json_with_cancel<T: DeserializeOwned>(
        &self,
        params: &ChatParams,
        cancel: &CancellationToken,
    ) -> Result<(T, RequestStatus)> {
        let (raw, status) = self.send_with_retry(params, true, cancel).await?;
        let value = decode_typed(&raw)?;
        Ok((value, status))
    }

    async fn send_with_retry(
        &self,
        params: &ChatParams,
        structured_output: bool,
        cancel: &CancellationToken,
    ) -> Result<(String, RequestStatus)> {
        let url = self.options.endpoint()?;

        let api_key = self
            .credentials
            .api_key()
            .map_err(OpenAiError::Credential)?;
        let mut authorization =
            HeaderValue::try_from(format!("Bearer {api_key}")).map_err(|_| {
                OpenAiError::Credential("api key is not a valid header value".into())
            })?;
        authorization.set_sensitive(true);

        let body = encode_request(&self.model, params, structured_output)?;
        let timeout = Duration::from_millis(self.options.timeout_ms);
        let max_retries = self.options.max_retries;
        let start = Instant::now();
        let mut attempt = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(OpenAiError::Cancelled);
            }
            attempt += 1;

            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, model = %self.model, "sending chat completion request");

            let request = self.exchange(url.clone(), &authorization, body.clone(), timeout);
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(OpenAiError::Cancelled),
                outcome = request => outcome,
            };

            let hint = match outcome {
                Ok(exchange) if (200..300).contains(&exchange.status) => {
                    let text = decode_completion(&exchange.body)?;
                    let status = RequestStatus {
                        http_status: exchange.status,
                        request_id: request_id(&exchange.headers),
                        retries: attempt - 1,
                        duration_ms: u64::try_from(start.elapsed().as_millis())
                            .unwrap_or(u64::MAX),
                    };

                    #[cfg(feature = "tracing")]
                    tracing::debug!(%status, "chat completion succeeded");

                    return Ok((text, status));
                }
                Ok(exchange) => {
                    if is_retryable_status(exchange.status) && attempt <= max_retries {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(attempt, status = exchange.status, "retryable http status");

                        retry_after(&exchange.headers)
                    } else {
                        return Err(Self::status_error(exchange));
                    }
                }
                Err(err) if err.is_timeout() => {
                    if attempt > max_retries {
                        return Err(OpenAiError::Timeout);
                    }

                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, "request timed out");

                    None
                }
                Err(err) => {
                    if attempt > max_retries {
                        return Err(OpenAiError::Network(error_chain(&err)));
                    }

                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, error = %err, "transport error");

                    None
                }
            };

            self.wait_before_retry(attempt, hint, cancel).await?;
        }
    }

    async fn exchange(
        &self,
        url: Url,
        authorization: &HeaderValue,
        body: Vec<u8>,
        timeout: Duration,
    ) -> std::result::Result<Exchange, reqwest::Error> {
        let mut request = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, authorization.clone())
            .timeout(timeout)
            .body(body);
        if let Some(user_agent) = &self.options.user_agent {
            request = request.header(header::USER_AGENT, user_agent);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        // The request timeout also covers reading the body.
        let body = response.bytes().await?.to_vec();

        Ok(Exchange {
            status,
            headers,
            body,
        })
    }

    /// Terminal error for a non-2xx response.
    ///
    /// A parseable error envelope wins over the raw body snippet.
    fn status_error(exchange: Exchange) -> OpenAiError {
        match decode_api_error(&exchange.body) {
            Some(message) => OpenAiError::Api {
                status: exchange.status,
                message,
            },
            None => OpenAiError::Http {
                status: exchange.status,
                body: body_snippet(&exchange.body, BODY_SNIPPET_LIMIT),
            },
        }
    }

    /// Sleeps before the next attempt, returning early with
    /// [`OpenAiError::Cancelled`] if the call is cancelled meanwhile.
    async fn wait_before_retry(
        &self,
        attempt: usize,
        retry_after: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let delay = retry_delay(attempt, retry_after);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            server_hint = retry_after.is_some(),
            "retrying chat completion request"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(OpenAiError::Cancelled),
            _ = sleep(delay) => Ok(()),
        }
    }
}

/// Renders an error with its whole `source()` chain.
///
/// `reqwest::Error`'s `Display` omits the underlying cause (refused
/// connection, DNS failure, reset).
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    detail
}
