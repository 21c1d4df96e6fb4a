//! Page generation client for Pagesmith.
//!
//! # Architecture
//!
//! - [`PageGenerator`] - the seam the engine calls; one request in, one cleaned page out
//! - [`gemini`] - Google Gemini implementation (GenerateContent API)
//! - [`clean_generated_html`] - strips stray markdown fences from model output
//!
//! # Error Handling
//!
//! Every failure is a [`GenerationError`]. There is no retry and no partial
//! result: a call either yields a complete [`GeneratedPage`] or an error that
//! is safe to show to the user (after terminal sanitization).

mod fence;
pub mod gemini;

pub use fence::clean_generated_html;
pub use gemini::{GeminiClient, MAX_THINKING_BUDGET, ModelProfile, SYSTEM_INSTRUCTION, profile_for};
pub use pagesmith_types;

use futures_util::future::BoxFuture;
use pagesmith_types::{ApiKey, GeneratedPage, GenerationRequest};
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Shown when the backend gives no usable reason.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate code.";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

// ============================================================================
// Errors
// ============================================================================

/// Coarse class of a generation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credential missing; detected before any network call.
    Configuration,
    /// The call itself failed: network, TLS, HTTP status, undecodable body.
    Transport,
    /// The call succeeded but carried no usable text.
    EmptyResult,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API key is missing. Set GEMINI_API_KEY or [api_keys] google in the config file.")]
    MissingCredential,
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("No code generated.{}", reason_suffix(.reason))]
    EmptyResponse { reason: Option<String> },
}

#[allow(clippy::ref_option)]
fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default()
}

impl GenerationError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingCredential => FailureKind::Configuration,
            Self::Transport(_) | Self::Api { .. } => FailureKind::Transport,
            Self::EmptyResponse { .. } => FailureKind::EmptyResult,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if message.trim().is_empty() {
            Self::Transport(GENERIC_FAILURE_MESSAGE.to_string())
        } else {
            Self::Transport(message)
        }
    }
}

// ============================================================================
// Generator seam
// ============================================================================

/// Turns one request into one cleaned page.
///
/// The credential is passed per call so the caller decides where it comes
/// from; implementations must fail with [`GenerationError::MissingCredential`]
/// before touching the network when it is `None`.
pub trait PageGenerator: Send + Sync {
    fn generate(
        &self,
        api_key: Option<ApiKey>,
        request: GenerationRequest,
    ) -> BoxFuture<'static, Result<GeneratedPage, GenerationError>>;
}

// ============================================================================
// HTTP plumbing
// ============================================================================

/// Shared hardened client for the production endpoint.
pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().https_only(true).build().unwrap_or_else(|e| {
            tracing::error!(
                "Failed to build hardened HTTP client: {e}. Attempting minimal hardened fallback."
            );
            reqwest::Client::builder()
                .https_only(true)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Minimal hardened HTTP client must build; cannot proceed without TLS")
        })
    })
}

/// No total timeout: generation can legitimately take minutes in thinking mode.
pub(crate) fn base_client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
}

pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
