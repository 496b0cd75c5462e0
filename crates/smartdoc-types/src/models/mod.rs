//! Data models for smartdoc

pub mod analysis;
pub mod billing;
pub mod document;

pub use analysis::{AnalysisPhase, AnalysisResult, ContradictionFinding, DocPair};
pub use billing::{BillingSummary, CostEstimate};
pub use document::{DocumentId, UploadedDocument};
