//! Export of the current page as a standalone HTML file.

use std::path::{Path, PathBuf};

use thiserror::Error;

use pagesmith_types::GeneratedPage;

use crate::atomic_write::atomic_write;

pub const EXPORT_FILE_NAME: &str = "index.html";
pub const EXPORT_CONTENT_TYPE: &str = "text/html";

/// The downloadable form of a page: fixed name, fixed type, exact bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    #[must_use]
    pub fn from_page(page: &GeneratedPage) -> Self {
        Self {
            file_name: EXPORT_FILE_NAME,
            content_type: EXPORT_CONTENT_TYPE,
            bytes: page.html().as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Error)]
#[error("failed to write {}: {source}", path.display())]
pub struct ExportError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Write `artifact` into `dir`, replacing any previous export.
pub fn write_artifact(dir: &Path, artifact: &ExportArtifact) -> Result<PathBuf, ExportError> {
    let path = dir.join(artifact.file_name);
    atomic_write(&path, &artifact.bytes).map_err(|source| ExportError {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = artifact.bytes.len(), "Exported page");
    Ok(path)
}
