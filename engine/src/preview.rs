//! Sandboxed live preview.
//!
//! Generated pages are untrusted. They never run in the terminal; instead they
//! are embedded as the `srcdoc` of a sandboxed iframe inside a tiny host
//! document that is opened in the system browser.
//!
//! The token list grants `allow-scripts` together with `allow-same-origin`, so
//! a `srcdoc` frame shares the host's origin and could reach into its parent.
//! The host therefore holds no script, no storage and nothing beyond the frame:
//! an empty host is what contains the page, not the token list. Top-level
//! navigation and sandbox-escaping popups are never granted.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use pagesmith_types::GeneratedPage;

use crate::atomic_write::atomic_write;

/// The only capabilities granted to generated content.
pub const SANDBOX_PERMISSIONS: [&str; 5] = [
    "allow-scripts",
    "allow-modals",
    "allow-forms",
    "allow-popups",
    "allow-same-origin",
];

pub const PREVIEW_FILE_NAME: &str = "preview.html";

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("failed to write preview {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open browser for {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Escape `value` for use inside a double-quoted HTML attribute.
#[must_use]
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + value.len() / 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build the host document that frames `page` in the sandbox.
#[must_use]
pub fn sandbox_host_document(page: &GeneratedPage) -> String {
    let title = page.title().unwrap_or("Preview");
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"en\">\n",
            "<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<meta name=\"referrer\" content=\"no-referrer\">\n",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
            "<title>Pagesmith preview: {title}</title>\n",
            "<style>html,body{{margin:0;height:100%;background:#fff}}",
            "iframe{{border:0;width:100%;height:100%;display:block}}</style>\n",
            "</head>\n",
            "<body>\n",
            "<iframe title=\"Preview\" sandbox=\"{sandbox}\" srcdoc=\"{srcdoc}\"></iframe>\n",
            "</body>\n",
            "</html>\n",
        ),
        title = escape_text(title),
        sandbox = SANDBOX_PERMISSIONS.join(" "),
        srcdoc = escape_attribute(page.html()),
    )
}

/// Write the host document for `page` into `dir`, replacing the previous one.
pub fn write_preview(dir: &Path, page: &GeneratedPage) -> Result<PathBuf, PreviewError> {
    let path = dir.join(PREVIEW_FILE_NAME);
    atomic_write(&path, sandbox_host_document(page).as_bytes()).map_err(|source| {
        PreviewError::Write {
            path: path.clone(),
            source,
        }
    })?;
    tracing::debug!(path = %path.display(), "Wrote preview host document");
    Ok(path)
}

/// Hands a written preview file to the desktop.
pub type BrowserLauncher = fn(&Path) -> io::Result<()>;

/// Open `path` in the user's default browser.
pub fn launch_browser(path: &Path) -> io::Result<()> {
    open::that_detached(path)
}

pub(crate) fn open_in_browser(launcher: BrowserLauncher, path: &Path) -> Result<(), PreviewError> {
    launcher(path).map_err(|source| {
        tracing::warn!(path = %path.display(), "Failed to launch browser: {source}");
        PreviewError::Launch {
            path: path.to_path_buf(),
            source,
        }
    })
}
