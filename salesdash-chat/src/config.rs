//! Client configuration, injected explicitly per client.

use std::time::Duration;

use zeroize::Zeroizing;

use crate::error::ChatError;

/// Default model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default completion API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default completion length cap.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Environment variable holding the API key for [`ChatConfig::from_env`].
pub const ENV_API_KEY: &str = "SALESDASH_LLM_API_KEY";
/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "SALESDASH_LLM_BASE_URL";
/// Environment variable overriding the model.
pub const ENV_MODEL: &str = "SALESDASH_LLM_MODEL";

/// Bearer credential for the completion API.
///
/// Zeroed on drop. Has no `Display`, `Clone` or `Serialize`, and `Debug`
/// prints `[REDACTED]`.
pub struct ApiKey {
    inner: Zeroizing<String>,
}

impl ApiKey {
    /// Wrap a key. The string is moved, not copied.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            inner: Zeroizing::new(key.into()),
        }
    }

    /// Whether the key is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.inner.trim().is_empty()
    }

    /// Scoped access to the key text.
    pub(crate) fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.inner)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Settings for one [`ChatClient`](crate::ChatClient).
///
/// # Example
///
/// ```
/// use salesdash_chat::ChatConfig;
///
/// let config = ChatConfig::new("sk-test")
///     .model("gpt-4o")
///     .temperature(0.2)
///     .max_tokens(512);
/// assert_eq!(config.model, "gpt-4o");
/// ```
#[derive(Debug)]
pub struct ChatConfig {
    /// Bearer credential.
    pub api_key: ApiKey,
    /// API base URL, without a trailing path.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length cap.
    pub max_tokens: u32,
    /// Total time limit for one request, including reading the streamed
    /// reply. `None` leaves the HTTP client's own setting in force.
    pub timeout: Option<Duration>,
}

impl ChatConfig {
    /// Configuration with the given key and defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: ApiKey::new(api_key),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: None,
        }
    }

    /// Read configuration from the process environment.
    ///
    /// Only [`ENV_API_KEY`] is required. Call this at the edge of the
    /// application and pass the result down.
    ///
    /// # Errors
    ///
    /// [`ChatError::MissingCredential`] if the key variable is unset or blank.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ChatError> {
        let key = lookup(ENV_API_KEY)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ChatError::MissingCredential(format!("{ENV_API_KEY} is not set")))?;

        let mut config = Self::new(key);
        if let Some(url) = lookup(ENV_BASE_URL) {
            config.base_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            config.model = model;
        }
        Ok(config)
    }

    /// Override the API base URL (mock servers, proxies, self-hosted gateways).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Override the model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the completion length cap.
    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Limit each request, streamed body included, to `timeout`.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Fail fast when no usable credential is configured.
    pub(crate) fn require_credential(&self) -> Result<(), ChatError> {
        if self.api_key.is_blank() {
            return Err(ChatError::MissingCredential(
                "chat API key is empty".to_string(),
            ));
        }
        Ok(())
    }
}
