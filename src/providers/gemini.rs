//! Gemini client for the Google Generative Language `generateContent` API.

use serde::{Deserialize, Serialize};

use super::{check_http_response, GenerateOptions, ModelCatalog, ProviderError, TextGenerator};

/// Default API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// `generateContent` request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// Conversation contents; a single user part for one-shot prompts.
    pub contents: Vec<GeminiContent>,
    /// Generation parameters.
    pub generation_config: GenerationConfig,
}

/// A content entry holding text parts.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Text parts. Absent in some error-shaped responses.
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A single text part.
#[doc(hidden)]
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    /// The text payload.
    #[serde(default)]
    pub text: String,
}

/// Generation parameters.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// MIME type constraint, `application/json` for schema'd calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Thinking-token budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
}

/// Thinking budget wrapper.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    /// Maximum thinking tokens.
    pub thinking_budget: u32,
}

/// `generateContent` response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    /// Generated candidates; may be absent when the prompt was blocked.
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    /// Feedback on the prompt itself.
    pub prompt_feedback: Option<PromptFeedback>,
}

/// One generated candidate.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    /// The candidate content.
    pub content: Option<GeminiContent>,
}

/// Prompt-level feedback, present when generation was blocked.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    /// Why the prompt was blocked, when it was.
    pub block_reason: Option<String>,
}

/// Model listing response.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    /// Available models.
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// One entry in the model listing.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    /// Fully qualified name, e.g. `models/gemini-2.5-flash`.
    pub name: String,
    /// Generation methods the model supports.
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build a `generateContent` request body.
#[doc(hidden)]
pub fn build_request(prompt: &str, options: &GenerateOptions) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            parts: vec![GeminiPart {
                text: prompt.to_owned(),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: options.temperature,
            response_mime_type: options
                .json_response
                .then(|| "application/json".to_owned()),
            thinking_config: options
                .thinking_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
        },
    }
}

/// Parse a `generateContent` response into the generated text.
///
/// # Errors
///
/// Returns `ProviderError::Parse` when the body cannot be deserialized,
/// `ProviderError::Blocked` when the prompt was rejected by a safety filter,
/// and `ProviderError::Empty` when no candidate carries text.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, ProviderError> {
    let resp: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    if let Some(reason) = resp
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(ProviderError::Blocked(format!(
            "reason: {reason}; modify the input and try again"
        )));
    }

    let text: String = resp
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ProviderError::Empty(
            "no candidate text in the response".to_owned(),
        ));
    }
    Ok(text)
}

/// Extract generation-capable model identifiers from a listing response.
///
/// # Errors
///
/// Returns `ProviderError::Parse` when the body cannot be deserialized.
#[doc(hidden)]
pub fn parse_models_response(body: &str) -> Result<Vec<String>, ProviderError> {
    let resp: ModelsResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(resp
        .models
        .into_iter()
        .filter(|m| {
            m.supported_generation_methods
                .iter()
                .any(|method| method == "generateContent")
        })
        .map(|m| {
            m.name
                .strip_prefix("models/")
                .map(str::to_owned)
                .unwrap_or(m.name)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Gemini REST client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client for the given base URL, API key, and model.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl ModelCatalog for GeminiClient {
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/v1beta/models?pageSize=100", self.base_url);
        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        let payload = check_http_response(response).await?;
        parse_models_response(&payload)
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let api_request = build_request(prompt, options);
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
