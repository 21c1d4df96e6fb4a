//! Terminal-safe rendering of untrusted text.
//!
//! Generated pages and backend error messages are untrusted. Printed verbatim
//! they could drive the terminal: OSC 52 writes the clipboard, OSC 8 forges
//! hyperlinks, CSI sequences move the cursor and repaint the screen. Every
//! string from the model or the network passes through here before it reaches
//! a ratatui buffer.

use std::borrow::Cow;
use std::iter::Peekable;

const ESC: char = '\x1b';
const BEL: char = '\x07';
const C1_CSI: char = '\u{009b}';
const TAB_WIDTH: usize = 4;

/// What an escape introducer turned out to be.
enum Sequence {
    /// `ESC [` ... final byte
    Csi,
    /// `ESC ]` ... BEL or ST
    Osc,
    /// `ESC P`, `ESC ^`, `ESC _` ... ST
    String,
    /// `ESC` + intermediate + one designator char (charset selection etc.)
    Designator,
    /// `ESC` + one command char (save cursor, reset, keypad modes)
    Single,
    /// Lone `ESC`; the next char is ordinary text.
    Bare,
}

fn classify(next: Option<char>) -> Sequence {
    match next {
        Some('[') => Sequence::Csi,
        Some(']') => Sequence::Osc,
        Some('P' | '^' | '_') => Sequence::String,
        Some('(' | ')' | '*' | '+' | '#' | ' ') => Sequence::Designator,
        Some('7' | '8' | 'c' | 'D' | 'E' | 'H' | 'M' | 'N' | 'O' | 'Z' | '=' | '>' | '<') => {
            Sequence::Single
        }
        _ => Sequence::Bare,
    }
}

fn is_forbidden(c: char) -> bool {
    match c {
        '\n' | '\t' | '\r' => false,
        '\0'..='\x1f' | '\x7f' | '\u{0080}'..='\u{009f}' => true,
        _ => false,
    }
}

/// Strip escape sequences and control characters, keeping `\n`, `\t` and `\r`.
///
/// Clean input is returned borrowed.
///
/// ```
/// use pagesmith_types::sanitize_terminal_text;
///
/// assert_eq!(sanitize_terminal_text("<h1>hi</h1>"), "<h1>hi</h1>");
/// assert_eq!(sanitize_terminal_text("a\x1b]52;c;aGk=\x07b"), "ab");
/// ```
#[must_use]
pub fn sanitize_terminal_text(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_forbidden) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ESC {
            consume_sequence(&mut chars);
        } else if c == C1_CSI {
            consume_csi(&mut chars);
        } else if !is_forbidden(c) {
            out.push(c);
        }
    }

    Cow::Owned(out)
}

/// Sanitize generated source for the code view.
///
/// Like [`sanitize_terminal_text`], but also expands tabs to spaces and drops
/// carriage returns, since neither renders predictably inside a ratatui cell grid.
#[must_use]
pub fn sanitize_source_for_display(input: &str) -> Cow<'_, str> {
    let cleaned = sanitize_terminal_text(input);
    if !cleaned.contains(['\t', '\r']) {
        return cleaned;
    }

    let mut out = String::with_capacity(cleaned.len());
    let mut column = 0usize;
    for c in cleaned.chars() {
        match c {
            '\r' => {}
            '\n' => {
                out.push('\n');
                column = 0;
            }
            '\t' => {
                let pad = TAB_WIDTH - column % TAB_WIDTH;
                out.extend(std::iter::repeat_n(' ', pad));
                column += pad;
            }
            other => {
                out.push(other);
                column += 1;
            }
        }
    }
    Cow::Owned(out)
}

fn consume_sequence<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    match classify(chars.peek().copied()) {
        Sequence::Csi => {
            chars.next();
            consume_csi(chars);
        }
        Sequence::Osc => {
            chars.next();
            consume_until_terminator(chars, true);
        }
        Sequence::String => {
            chars.next();
            consume_until_terminator(chars, false);
        }
        Sequence::Designator => {
            chars.next();
            chars.next();
        }
        Sequence::Single => {
            chars.next();
        }
        Sequence::Bare => {}
    }
}

/// Parameter/intermediate bytes (0x20-0x3F) up to and including the final byte (0x40-0x7E).
fn consume_csi<I: Iterator<Item = char>>(chars: &mut Peekable<I>) {
    while let Some(&c) = chars.peek() {
        match c {
            '\x40'..='\x7e' => {
                chars.next();
                return;
            }
            '\x20'..='\x3f' => {
                chars.next();
            }
            _ => return,
        }
    }
}

/// Consume through ST (`ESC \`), or BEL when `bel_terminates`.
fn consume_until_terminator<I: Iterator<Item = char>>(chars: &mut Peekable<I>, bel_terminates: bool) {
    while let Some(c) = chars.next() {
        if bel_terminates && c == BEL {
            return;
        }
        if c == ESC && chars.peek() == Some(&'\\') {
            chars.next();
            return;
        }
    }
}
