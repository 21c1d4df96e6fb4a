//! Request composer: the prompt draft and the mode toggle.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use pagesmith_types::{GenerationMode, GenerationRequest, PromptText};

/// The composer never grows taller than this many text rows.
pub const COMPOSER_MAX_ROWS: u16 = 8;

/// Hard-wrap `text` to `width` display columns, breaking at grapheme boundaries.
///
/// Every `\n` starts a new row, so `text.split('\n')` rows are never merged.
#[must_use]
pub fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let mut row = String::new();
        let mut row_width = 0usize;
        for grapheme in line.graphemes(true) {
            let w = grapheme.width();
            if row_width + w > width && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            row.push_str(grapheme);
            row_width += w;
        }
        rows.push(row);
    }
    rows
}

/// Handles text editing with proper Unicode grapheme cluster support.
#[derive(Debug, Default, Clone)]
pub struct DraftInput {
    text: String,
    /// Grapheme index, not a byte offset.
    cursor: usize,
}

impl DraftInput {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = self.cursor.saturating_add(1).min(self.grapheme_count());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.grapheme_count();
    }

    pub fn enter_char(&mut self, new_char: char) {
        let index = self.byte_index_at(self.cursor);
        self.text.insert(index, new_char);
        self.move_cursor_right();
    }

    pub fn enter_newline(&mut self) {
        self.enter_char('\n');
    }

    /// Insert pasted text verbatim, normalizing line endings.
    pub fn enter_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let index = self.byte_index_at(self.cursor);
        self.text.insert_str(index, &normalized);
        let inserted = normalized.graphemes(true).count();
        self.cursor = self
            .cursor
            .saturating_add(inserted)
            .min(self.grapheme_count());
    }

    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.byte_index_at(self.cursor - 1);
        let end = self.byte_index_at(self.cursor);
        self.text.replace_range(start..end, "");
        self.move_cursor_left();
    }

    pub fn delete_char_forward(&mut self) {
        if self.cursor >= self.grapheme_count() {
            return;
        }
        let start = self.byte_index_at(self.cursor);
        let end = self.byte_index_at(self.cursor + 1);
        self.text.replace_range(start..end, "");
    }

    pub fn delete_word_backwards(&mut self) {
        while self.cursor > 0 && self.grapheme_is_whitespace(self.cursor - 1) {
            self.delete_char();
        }
        while self.cursor > 0 && !self.grapheme_is_whitespace(self.cursor - 1) {
            self.delete_char();
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    #[must_use]
    pub fn grapheme_count(&self) -> usize {
        self.text.graphemes(true).count()
    }

    fn grapheme_is_whitespace(&self, index: usize) -> bool {
        self.text
            .graphemes(true)
            .nth(index)
            .is_some_and(|grapheme| grapheme.chars().all(char::is_whitespace))
    }

    fn byte_index_at(&self, grapheme_index: usize) -> usize {
        self.text
            .grapheme_indices(true)
            .nth(grapheme_index)
            .map_or(self.text.len(), |(i, _)| i)
    }

    /// Hard-wrap the draft to `width` display columns.
    ///
    /// Explicit newlines always start a new row; an empty draft is one empty row.
    #[must_use]
    pub fn wrapped_lines(&self, width: usize) -> Vec<String> {
        wrap_to_width(&self.text, width)
    }

    /// Cursor position as `(row, column)` within [`Self::wrapped_lines`].
    #[must_use]
    pub fn cursor_visual(&self, width: usize) -> (usize, usize) {
        let width = width.max(1);
        let mut row = 0usize;
        let mut col = 0usize;
        for (index, grapheme) in self.text.graphemes(true).enumerate() {
            if index == self.cursor {
                break;
            }
            if grapheme == "\n" {
                row += 1;
                col = 0;
                continue;
            }
            let w = grapheme.width();
            if col + w > width && col > 0 {
                row += 1;
                col = 0;
            }
            col += w;
        }
        if col >= width {
            (row + 1, 0)
        } else {
            (row, col)
        }
    }
}

/// Prompt draft plus the Fast/Think selection.
#[derive(Debug, Default, Clone)]
pub struct Composer {
    draft: DraftInput,
    mode: GenerationMode,
}

impl Composer {
    #[must_use]
    pub fn draft(&self) -> &DraftInput {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut DraftInput {
        &mut self.draft
    }

    #[must_use]
    pub const fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GenerationMode) {
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
    }

    /// Whether the send action is currently available.
    #[must_use]
    pub fn can_submit(&self, busy: bool) -> bool {
        !busy && !self.draft.is_blank()
    }

    /// Build a request from the draft.
    ///
    /// `None` when the draft is blank or `busy`; nothing is reported in that case.
    /// The draft is left intact so a failed generation can be edited and resent.
    #[must_use]
    pub fn submit(&self, busy: bool) -> Option<GenerationRequest> {
        if busy {
            return None;
        }
        let prompt = PromptText::new(self.draft.text()).ok()?;
        Some(GenerationRequest::new(prompt, self.mode))
    }

    /// Rows the text box needs at `width`, clamped to `1..=COMPOSER_MAX_ROWS`.
    #[must_use]
    pub fn visible_rows(&self, width: usize) -> u16 {
        let (cursor_row, _) = self.draft.cursor_visual(width);
        let rows = self.draft.wrapped_lines(width).len().max(cursor_row + 1);
        (rows as u16).clamp(1, COMPOSER_MAX_ROWS)
    }

    pub fn clear_draft(&mut self) {
        self.draft.clear();
    }
}
