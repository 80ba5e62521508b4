//! Generative-model client abstraction.
//!
//! Defines the [`TextGenerator`] trait consumed by document analysis and the
//! dialogue director, plus the shared option and error types. One client is
//! implemented: [`gemini::GeminiClient`] against the Google Generative
//! Language REST API.

use async_trait::async_trait;
use regex::Regex;

pub mod gemini;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Per-call generation options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional thinking-token budget, passed through when the model
    /// supports it.
    pub thinking_budget: Option<u32>,
    /// Request a JSON response body instead of free text.
    pub json_response: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            thinking_budget: None,
            json_response: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by generative-model clients.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure (network, DNS, TLS).
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Upstream responded with a non-success status.
    #[error("model returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// Response did not match the expected schema.
    #[error("model response parse error: {0}")]
    Parse(String),
    /// The request was blocked by a content safety filter.
    #[error("the request was blocked by content safety filters: {0}")]
    Blocked(String),
    /// The model produced no usable text.
    #[error("the model returned an empty response: {0}")]
    Empty(String),
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check HTTP response status and return the body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure,
/// `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"AIza[A-Za-z0-9_\-]{20,}",
        r"key=[A-Za-z0-9_\-]{16,}",
        r"sk-[A-Za-z0-9]{32,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core text generation interface.
///
/// Implementations must be `Send + Sync`: the dialogue director shares one
/// client across concurrently in-flight operations.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport, API, parse, safety-filter, or
    /// empty-output failure.
    async fn generate(&self, prompt: &str, options: &GenerateOptions)
        -> Result<String, ProviderError>;

    /// The model identifier this client is instantiated for.
    fn model_id(&self) -> &str;
}

/// Model discovery interface.
///
/// Kept separate from [`TextGenerator`]: generation callers never need
/// listing, and the studio surface degrades gracefully when listing fails.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// List identifiers of models that can serve generation calls.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport, API, or parse failure. Callers
    /// fall back to an empty list and surface the message.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;
}
