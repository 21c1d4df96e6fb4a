//! Markdown fence cleanup for model output.
//!
//! The system instruction forbids fenced output, but models still wrap the
//! document in one from time to time. Cleanup is anchored at the raw string
//! boundaries and never looks inside the HTML.

const HTML_FENCE_OPEN: &str = "```html";
const FENCE: &str = "```";

/// Strip a leading "```html", then a leading "```", then a trailing "```",
/// and trim surrounding whitespace.
///
/// Each step sees the output of the previous one. The trailing fence must be
/// the very last characters of the raw text to be removed.
#[must_use]
pub fn clean_generated_html(raw: &str) -> &str {
    let text = raw.strip_prefix(HTML_FENCE_OPEN).unwrap_or(raw);
    let text = text.strip_prefix(FENCE).unwrap_or(text);
    let text = text.strip_suffix(FENCE).unwrap_or(text);
    text.trim()
}
