//! Google Gemini implementation of [`PageGenerator`].
//!
//! Talks to `{base}/models/{model}:generateContent` (non-streaming). The
//! whole document is needed before anything can be previewed, so there is
//! nothing to gain from SSE here.
//!
//! # Request shape
//!
//! Gemini uses mixed casing:
//! - `system_instruction` (snake_case)
//! - `generationConfig`, `thinkingConfig`, `thinkingBudget` (camelCase)
//! - `contents` (lowercase)

use crate::{
    GENERIC_FAILURE_MESSAGE, GEMINI_API_BASE_URL, GenerationError, PageGenerator,
    base_client_builder, clean_generated_html, http_client, read_capped_error_body,
};
use futures_util::future::BoxFuture;
use pagesmith_types::{ApiKey, GeneratedPage, GenerationMode, GenerationRequest};
use serde_json::{Value, json};

/// Upper bound on deep-reasoning tokens, sent in thinking mode.
pub const MAX_THINKING_BUDGET: u32 = 32_768;

/// Fixed directive sent with every request regardless of mode.
pub const SYSTEM_INSTRUCTION: &str = "\
You are an expert Frontend AI Engineer.
Your task is to generate a COMPLETE, SINGLE-FILE HTML solution based on the user's request.
The file must include ALL necessary CSS (inside <style> tags) and JavaScript (inside <script> tags).
Do not use external CSS/JS files unless using a CDN for popular libraries (like Tailwind, React, Vue via CDN is okay).
ENSURE the UI is modern, responsive, and aesthetically pleasing.
OUTPUT FORMAT: Return ONLY the raw HTML code. Do NOT wrap it in markdown code blocks (e.g., ```html ... ```). Do not add introductory text.";

/// Backend settings for one [`GenerationMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelProfile {
    pub model: &'static str,
    /// `None` omits `thinkingConfig` from the request entirely.
    pub thinking_budget: Option<u32>,
}

const FAST_PROFILE: ModelProfile = ModelProfile {
    model: "gemini-3-flash-preview",
    thinking_budget: None,
};

const THINKING_PROFILE: ModelProfile = ModelProfile {
    model: "gemini-3-pro-preview",
    thinking_budget: Some(MAX_THINKING_BUDGET),
};

#[must_use]
pub const fn profile_for(mode: GenerationMode) -> ModelProfile {
    match mode {
        GenerationMode::Fast => FAST_PROFILE,
        GenerationMode::Thinking => THINKING_PROFILE,
    }
}

// ============================================================================
// Request / response
// ============================================================================

fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

pub(crate) fn build_request_body(prompt: &str, profile: ModelProfile) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(
        "contents".into(),
        json!([{
            "role": "user",
            "parts": [text_part(prompt)]
        }]),
    );
    body.insert(
        "system_instruction".into(),
        json!({
            "parts": [text_part(SYSTEM_INSTRUCTION)]
        }),
    );

    if let Some(budget) = profile.thinking_budget {
        body.insert(
            "generationConfig".into(),
            json!({
                "thinkingConfig": {
                    "thinkingBudget": budget
                }
            }),
        );
    }

    Value::Object(body)
}

mod typed {
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct Response {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
        pub prompt_feedback: Option<PromptFeedback>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Candidate {
        pub content: Option<Content>,
        pub finish_reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Content {
        #[serde(default)]
        pub parts: Vec<Part>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Part {
        pub text: Option<String>,
        #[serde(default)]
        pub thought: bool,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PromptFeedback {
        pub block_reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorEnvelope {
        pub error: ErrorInfo,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorInfo {
        pub message: Option<String>,
    }

    /// Message for a finish reason that explains a missing answer.
    pub fn finish_reason_message(reason: &str) -> Option<&'static str> {
        match reason {
            "SAFETY" => Some("Content filtered by safety settings"),
            "RECITATION" => Some("Response blocked: recitation"),
            "LANGUAGE" => Some("Unsupported language"),
            "BLOCKLIST" => Some("Content contains blocked terms"),
            "PROHIBITED_CONTENT" => Some("Prohibited content detected"),
            "SPII" => Some("Sensitive PII detected"),
            "MAX_TOKENS" => Some("Output token limit reached"),
            "OTHER" => Some("Generation stopped: unknown reason"),
            _ => None,
        }
    }
}

/// Concatenated non-thought text of the first candidate.
fn response_text(response: &typed::Response) -> String {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text.as_deref())
                .collect()
        })
        .unwrap_or_default()
}

fn empty_reason(response: &typed::Response) -> Option<String> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Some(format!("Prompt blocked: {reason}"));
    }

    response
        .candidates
        .first()
        .and_then(|candidate| candidate.finish_reason.as_deref())
        .and_then(typed::finish_reason_message)
        .map(str::to_string)
}

pub(crate) fn page_from_response(response: &typed::Response) -> Result<GeneratedPage, GenerationError> {
    let raw = response_text(response);
    let cleaned = clean_generated_html(&raw);
    if cleaned.is_empty() {
        return Err(GenerationError::EmptyResponse {
            reason: empty_reason(response),
        });
    }
    Ok(GeneratedPage::new(cleaned))
}

fn api_error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<typed::ErrorEnvelope>(body)
        && let Some(message) = envelope.error.message
        && !message.trim().is_empty()
    {
        return message;
    }
    if body.trim().is_empty() {
        GENERIC_FAILURE_MESSAGE.to_string()
    } else {
        body.trim().to_string()
    }
}

// ============================================================================
// Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClient {
    /// Client for the production endpoint over the shared HTTPS-only client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: http_client().clone(),
            base_url: GEMINI_API_BASE_URL.to_string(),
        }
    }

    /// Client for an explicit base URL (proxy, regional endpoint, test server).
    ///
    /// HTTPS is only enforced when the override itself is HTTPS.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, GenerationError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let https_only = base_url.starts_with("https://");
        let http = base_client_builder().https_only(https_only).build()?;
        Ok(Self { http, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    /// One round trip: select the profile, send, clean.
    pub async fn generate_page(
        &self,
        api_key: Option<&ApiKey>,
        request: &GenerationRequest,
    ) -> Result<GeneratedPage, GenerationError> {
        let Some(api_key) = api_key else {
            tracing::warn!("Generation requested without an API key");
            return Err(GenerationError::MissingCredential);
        };

        let profile = profile_for(request.mode());
        let body = build_request_body(request.prompt().as_str(), profile);

        tracing::info!(
            model = profile.model,
            thinking_budget = ?profile.thinking_budget,
            prompt_chars = request.prompt().as_str().chars().count(),
            "Sending generation request"
        );

        let response = self
            .http
            .post(self.endpoint(profile.model))
            .header("x-goog-api-key", api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(%e, "Gemini request failed");
                GenerationError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = read_capped_error_body(response).await;
            let message = api_error_message(&error_text);
            tracing::error!(status = status.as_u16(), %message, "Gemini API error");
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: typed::Response = response.json().await.map_err(|e| {
            tracing::error!(%e, "Failed to decode Gemini response");
            GenerationError::from(e)
        })?;

        let page = page_from_response(&parsed)?;
        tracing::info!(
            model = profile.model,
            bytes = page.html().len(),
            "Generation complete"
        );
        Ok(page)
    }
}

impl PageGenerator for GeminiClient {
    fn generate(
        &self,
        api_key: Option<ApiKey>,
        request: GenerationRequest,
    ) -> BoxFuture<'static, Result<GeneratedPage, GenerationError>> {
        let client = self.clone();
        Box::pin(async move { client.generate_page(api_key.as_ref(), &request).await })
    }
}
