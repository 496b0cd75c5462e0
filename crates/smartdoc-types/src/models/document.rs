//! Validated upload records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for a document identifier, unique within one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Create a new DocumentId
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

impl From<u64> for DocumentId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A document that passed intake validation
///
/// The raw payload is kept in memory for the backend request but never
/// serialized into reports or JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    /// Session-unique identifier
    pub id: DocumentId,

    /// Original file name (e.g. "syllabus.pdf")
    pub name: String,

    /// Size of the payload in bytes
    pub size_bytes: u64,

    /// Declared media type (may be empty when the source did not provide one)
    pub mime_type: String,

    /// Raw file contents
    #[serde(skip)]
    pub payload: Vec<u8>,
}

impl UploadedDocument {
    /// Human-readable file size ("0 Bytes", "1.5 KB", "2 MB")
    ///
    /// Base 1024, at most two decimals, trailing zeros trimmed.
    pub fn size_display(&self) -> String {
        format_file_size(self.size_bytes)
    }

    /// Lowercased file extension including the dot, if any
    pub fn extension(&self) -> Option<String> {
        self.name
            .rfind('.')
            .map(|idx| self.name[idx..].to_lowercase())
    }
}

/// Format a byte count the way upload lists display it
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
