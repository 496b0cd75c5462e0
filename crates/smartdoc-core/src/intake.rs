//! Upload intake: type/size/count validation
//!
//! Rules are applied in a fixed order (count, type, size) so the first
//! violated rule decides the reason code. Rejections never mutate the session.

use crate::error::{CoreError, IntakeError};
use smartdoc_types::{DocumentId, UploadedDocument};
use std::path::Path;
use tracing::debug;

/// Maximum documents held by one session
pub const MAX_DOCUMENTS: usize = 3;

/// Maximum accepted payload size (10 MiB)
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Media types accepted regardless of file name
pub const ACCEPTED_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Extensions accepted regardless of declared media type
pub const ACCEPTED_EXTENSIONS: [&str; 3] = [".pdf", ".docx", ".txt"];

/// A raw file offered for upload, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub payload: Vec<u8>,
}

impl FileCandidate {
    /// Candidate from in-memory bytes; size is the payload length
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: payload.len() as u64,
            payload,
        }
    }

    /// Read a candidate from disk
    ///
    /// The media type is guessed from the extension. Oversized files are not
    /// read into memory; intake rejects them on the declared size alone.
    pub async fn from_path(path: &Path) -> Result<Self, CoreError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| CoreError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();

        let size_bytes = metadata.len();
        let payload = if size_bytes > MAX_FILE_SIZE_BYTES {
            Vec::new()
        } else {
            tokio::fs::read(path)
                .await
                .map_err(|source| CoreError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })?
        };

        Ok(Self {
            name,
            mime_type,
            size_bytes,
            payload,
        })
    }

    fn has_accepted_type(&self) -> bool {
        if ACCEPTED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return true;
        }
        let lower = self.name.to_lowercase();
        ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }
}

/// Ordered set of validated documents for the current session
#[derive(Debug, Default)]
pub struct DocumentIntake {
    documents: Vec<UploadedDocument>,
    /// Never reset, so identifiers stay unique across clears
    next_id: u64,
}

impl DocumentIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one candidate and append it on success
    pub fn validate(&mut self, candidate: FileCandidate) -> Result<&UploadedDocument, IntakeError> {
        if self.documents.len() >= MAX_DOCUMENTS {
            debug!(name = %candidate.name, "Rejected: session full");
            return Err(IntakeError::TooManyFiles { max: MAX_DOCUMENTS });
        }

        if !candidate.has_accepted_type() {
            debug!(name = %candidate.name, mime = %candidate.mime_type, "Rejected: unsupported type");
            return Err(IntakeError::UnsupportedType {
                name: candidate.name,
                mime_type: candidate.mime_type,
            });
        }

        if candidate.size_bytes > MAX_FILE_SIZE_BYTES {
            debug!(name = %candidate.name, size = candidate.size_bytes, "Rejected: too large");
            return Err(IntakeError::TooLarge {
                name: candidate.name,
                size_bytes: candidate.size_bytes,
                max_bytes: MAX_FILE_SIZE_BYTES,
            });
        }

        self.next_id += 1;
        let document = UploadedDocument {
            id: DocumentId::new(self.next_id),
            name: candidate.name,
            size_bytes: candidate.size_bytes,
            mime_type: candidate.mime_type,
            payload: candidate.payload,
        };
        debug!(id = %document.id, name = %document.name, "Accepted document");

        self.documents.push(document);
        Ok(&self.documents[self.documents.len() - 1])
    }

    /// Validate a multi-file drop in order
    ///
    /// A rejection does not stop later candidates from being evaluated.
    pub fn validate_all<I>(&mut self, candidates: I) -> Vec<(String, Result<DocumentId, IntakeError>)>
    where
        I: IntoIterator<Item = FileCandidate>,
    {
        candidates
            .into_iter()
            .map(|candidate| {
                let name = candidate.name.clone();
                let outcome = self.validate(candidate).map(|doc| doc.id);
                (name, outcome)
            })
            .collect()
    }

    /// Remove a document by id; returns false (and does nothing) if absent
    pub fn remove(&mut self, id: DocumentId) -> bool {
        let before = self.documents.len();
        self.documents.retain(|doc| doc.id != id);
        self.documents.len() != before
    }

    /// Drop every document
    pub fn clear(&mut self) {
        self.documents.clear();
    }

    /// Documents in insertion order
    pub fn documents(&self) -> &[UploadedDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectionCode;

    fn pdf(name: &str) -> FileCandidate {
        FileCandidate::new(name, "application/pdf", b"%PDF-1.7".to_vec())
    }

    #[test]
    fn test_accepts_up_to_three_in_order() {
        let mut intake = DocumentIntake::new();
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            intake.validate(pdf(name)).unwrap();
        }

        let names: Vec<_> = intake.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_never_exceeds_three_across_five_calls() {
        let mut intake = DocumentIntake::new();
        let outcomes = intake.validate_all((1..=5).map(|i| pdf(&format!("doc{}.pdf", i))));

        assert_eq!(intake.len(), MAX_DOCUMENTS);
        for (_, outcome) in &outcomes[..3] {
            assert!(outcome.is_ok());
        }
        for (_, outcome) in &outcomes[3..] {
            assert_eq!(
                outcome.as_ref().unwrap_err().code(),
                RejectionCode::TooManyFiles
            );
        }
        let names: Vec<_> = intake.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["doc1.pdf", "doc2.pdf", "doc3.pdf"]);
    }

    #[test]
    fn test_count_rule_checked_before_type() {
        let mut intake = DocumentIntake::new();
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            intake.validate(pdf(name)).unwrap();
        }
        let err = intake
            .validate(FileCandidate::new("virus.exe", "application/x-msdownload", vec![]))
            .unwrap_err();
        assert_eq!(err.code(), RejectionCode::TooManyFiles);
    }

    #[test]
    fn test_type_accepted_by_mime_or_extension() {
        let mut intake = DocumentIntake::new();

        // Declared type is enough
        intake
            .validate(FileCandidate::new("notes", "text/plain", b"hi".to_vec()))
            .unwrap();
        // Extension is enough, case-insensitive
        intake
            .validate(FileCandidate::new("Policy.DOCX", "", b"PK".to_vec()))
            .unwrap();

        let err = intake
            .validate(FileCandidate::new("image.png", "image/png", vec![1, 2, 3]))
            .unwrap_err();
        assert_eq!(err.code(), RejectionCode::UnsupportedType);
        assert_eq!(intake.len(), 2);
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let mut intake = DocumentIntake::new();

        let mut at_limit = pdf("limit.pdf");
        at_limit.size_bytes = MAX_FILE_SIZE_BYTES;
        intake.validate(at_limit).unwrap();

        let mut over = pdf("over.pdf");
        over.size_bytes = MAX_FILE_SIZE_BYTES + 1;
        let err = intake.validate(over).unwrap_err();
        assert_eq!(err.code(), RejectionCode::TooLarge);
        assert_eq!(intake.len(), 1);
    }

    #[test]
    fn test_remove_by_id() {
        let mut intake = DocumentIntake::new();
        let first = intake.validate(pdf("a.pdf")).unwrap().id;
        let second = intake.validate(pdf("b.pdf")).unwrap().id;

        assert!(intake.remove(first));
        assert!(!intake.remove(first));
        assert_eq!(intake.documents()[0].id, second);
    }

    #[test]
    fn test_ids_unique_after_clear() {
        let mut intake = DocumentIntake::new();
        let before = intake.validate(pdf("a.pdf")).unwrap().id;
        intake.clear();
        let after = intake.validate(pdf("a.pdf")).unwrap().id;
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn test_from_path_guesses_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handbook.txt");
        std::fs::write(&path, "Attendance is mandatory.").unwrap();

        let candidate = FileCandidate::from_path(&path).await.unwrap();
        assert_eq!(candidate.name, "handbook.txt");
        assert_eq!(candidate.mime_type, "text/plain");
        assert_eq!(candidate.size_bytes, 24);
        assert_eq!(candidate.payload, b"Attendance is mandatory.");
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let err = FileCandidate::from_path(Path::new("/nonexistent/smartdoc/x.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::FileRead { .. }));
    }
}
