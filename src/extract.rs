//! PDF text extraction.
//!
//! Uses pdf-extract; pages are concatenated in document order.

use std::fs;
use std::panic;
use std::path::Path;
use tracing::{debug, warn};

use crate::{AssistantError, Result};

/// Extract the text of a PDF held in memory
#[inline]
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed documents
    let extracted = catch_quietly(|| pdf_extract::extract_text_from_mem(bytes)).ok_or_else(|| {
        warn!("PDF extraction panicked");
        AssistantError::Extraction("Could not read PDF: document is malformed".to_string())
    })?;

    extracted.map_err(|e| {
        warn!("PDF extraction failed: {}", e);
        AssistantError::Extraction(format!("Could not read PDF: {}", e))
    })
}

/// Run `f`, turning a panic into `None` without the default hook printing it
/// over the terminal menu. The previous hook is restored afterwards.
fn catch_quietly<T>(f: impl FnOnce() -> T + panic::UnwindSafe) -> Option<T> {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| debug!("Suppressed panic: {}", info)));
    let result = panic::catch_unwind(f);
    panic::set_hook(previous);
    result.ok()
}

/// Read and extract the PDF at `path`. An unreadable file is an extraction error.
#[inline]
pub fn extract_pdf_file(path: &Path) -> Result<String> {
    debug!("Extracting PDF: {}", path.display());

    let bytes = fs::read(path).map_err(|e| {
        AssistantError::Extraction(format!("Could not open {}: {}", path.display(), e))
    })?;

    let text = extract_pdf_text(&bytes)?;
    debug!(
        "Extracted {} characters from {}",
        text.chars().count(),
        path.display()
    );
    Ok(text)
}
