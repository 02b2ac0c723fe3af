//! Chat Completions client.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::ChatConfig;
use crate::consumer::{consume, delta_stream, with_cancellation};
use crate::error::{ChatError, map_body_error, map_http_status, map_reqwest_error};
use crate::mapping::to_api_request;
use crate::types::ChatRequest;

/// Boxed stream of reply fragments returned by [`ChatClient::send_stream`].
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

/// Client for a streaming, OpenAI-compatible Chat Completions endpoint.
///
/// Holds no per-request state: concurrent sends each own their decoder,
/// line buffer and aggregate.
///
/// # Example
///
/// ```no_run
/// use salesdash_chat::{ChatClient, ChatConfig, ChatRequest};
///
/// # async fn run() -> Result<(), salesdash_chat::ChatError> {
/// let client = ChatClient::new(ChatConfig::new("sk-..."));
/// let _reply = client
///     .send(&ChatRequest::new("Which deals are stuck?"), |delta| print!("{delta}"), None)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChatClient {
    config: ChatConfig,
    client: reqwest::Client,
}

impl ChatClient {
    /// Create a client from an explicit configuration.
    pub fn new(config: ChatConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured [`reqwest::Client`] (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The configuration this client sends with.
    #[must_use]
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Build the chat completions endpoint URL.
    pub(crate) fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Send a request and stream the reply through `on_delta`.
    ///
    /// Resolves with the full concatenated reply once the server closes the
    /// stream. `on_delta` receives each fragment, in order, before that.
    ///
    /// # Errors
    ///
    /// - [`ChatError::MissingCredential`] before any network call if the key is blank.
    /// - A status-mapped error carrying the response body on non-success status.
    /// - [`ChatError::Cancelled`] if `cancel` fires at any point.
    /// - [`ChatError::Network`] / [`ChatError::Timeout`] on transport failure.
    pub async fn send<F>(
        &self,
        request: &ChatRequest,
        on_delta: F,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ChatError>
    where
        F: FnMut(&str),
    {
        let response = match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(ChatError::Cancelled),
                response = self.open(request) => response?,
            },
            None => self.open(request).await?,
        };

        let timeout = self.config.timeout;
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_body_error(e, timeout)));
        consume(body, cancel, on_delta).await
    }

    /// Send a request and return the reply as a lazy stream of fragments.
    ///
    /// The stream ends when the server closes the connection. If `cancel`
    /// fires, the stream yields [`ChatError::Cancelled`] once and ends.
    ///
    /// # Errors
    ///
    /// Same setup errors as [`send`](Self::send); once the stream is returned,
    /// failures arrive as stream items.
    pub async fn send_stream(
        &self,
        request: &ChatRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<DeltaStream, ChatError> {
        let token = cancel.unwrap_or_default();

        let response = tokio::select! {
            biased;
            () = token.cancelled() => return Err(ChatError::Cancelled),
            response = self.open(request) => response?,
        };

        let timeout = self.config.timeout;
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_body_error(e, timeout)));
        Ok(Box::pin(with_cancellation(delta_stream(body), token)))
    }

    /// Validate, post, and check the status. The returned response has an
    /// unread body.
    async fn open(&self, request: &ChatRequest) -> Result<reqwest::Response, ChatError> {
        self.config.require_credential()?;

        let url = self.completions_url();
        let body = to_api_request(request, &self.config);

        tracing::debug!(
            url = %url,
            model = %self.config.model,
            history = request.history.len(),
            "sending streaming chat request"
        );

        let timeout = self.config.timeout;
        let mut builder = self.config.api_key.with_str(|key| {
            self.client
                .post(&url)
                .bearer_auth(key)
                .header("content-type", "application/json")
                .json(&body)
        });
        if let Some(limit) = timeout {
            builder = builder.timeout(limit);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;
            tracing::debug!(status = status.as_u16(), "chat request rejected");
            return Err(map_http_status(status, &body_text));
        }

        Ok(response)
    }
}
