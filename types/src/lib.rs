//! Core domain types for Pagesmith.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod sanitize;
pub use sanitize::{sanitize_source_for_display, sanitize_terminal_text};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Generation Mode
// ============================================================================

/// Generation preset trading latency for reasoning depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Fast,
    Thinking,
}

impl GenerationMode {
    pub const ALL: [Self; 2] = [Self::Fast, Self::Thinking];

    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Fast => Self::Thinking,
            Self::Thinking => Self::Fast,
        }
    }

    /// Short label used on the mode toggle.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fast => "Fast",
            Self::Thinking => "Think",
        }
    }

    /// Model family shown while a request is in flight.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Fast => "Gemini 3 Flash",
            Self::Thinking => "Gemini 3 Pro (Thinking)",
        }
    }
}

// ============================================================================
// Prompt & Request
// ============================================================================

/// Prompt text guaranteed to be non-empty after trimming.
///
/// The untrimmed text is preserved; trimming is only used for validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PromptText(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("prompt must not be empty")]
pub struct EmptyPromptError;

impl PromptText {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyPromptError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyPromptError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for PromptText {
    type Error = EmptyPromptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PromptText {
    type Error = EmptyPromptError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PromptText> for String {
    fn from(value: PromptText) -> Self {
        value.0
    }
}

impl AsRef<str> for PromptText {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// One submission: what the user asked for and how hard the model should think.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: PromptText,
    mode: GenerationMode,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(prompt: PromptText, mode: GenerationMode) -> Self {
        Self { prompt, mode }
    }

    #[must_use]
    pub fn prompt(&self) -> &PromptText {
        &self.prompt
    }

    #[must_use]
    pub const fn mode(&self) -> GenerationMode {
        self.mode
    }
}

/// A successfully generated, cleaned single-file HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPage {
    html: String,
}

impl GeneratedPage {
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    #[must_use]
    pub fn into_html(self) -> String {
        self.html
    }

    /// Contents of the first `<title>` element, if the document declares one.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        let lower = self.html.to_ascii_lowercase();
        let open = lower.find("<title")?;
        let content_start = open + lower[open..].find('>')? + 1;
        let content_end = content_start + lower[content_start..].find("</title")?;
        let title = self.html[content_start..content_end].trim();
        (!title.is_empty()).then_some(title)
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.html.lines().count()
    }
}

// ============================================================================
// Presentation
// ============================================================================

/// Which rendering of the generated page is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Preview,
    Code,
}

impl ViewMode {
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Preview => Self::Code,
            Self::Code => Self::Preview,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Preview => "Preview",
            Self::Code => "Code",
        }
    }
}

/// Accessibility toggles read from the `[app]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiOptions {
    pub ascii_only: bool,
    pub high_contrast: bool,
}

// ============================================================================
// Credentials
// ============================================================================

/// Generation API credential.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("API key must not be blank")]
pub struct BlankApiKeyError;

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Result<Self, BlankApiKeyError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(BlankApiKeyError);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}
