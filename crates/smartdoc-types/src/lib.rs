//! smartdoc-types - Shared data types for smartdoc
//!
//! This crate contains pure data structures without heavy dependencies.
//! No tokio, no async runtime - just serde-serializable types.
//!
//! Used by:
//! - smartdoc-core (intake, ledger, orchestration)
//! - smartdoc (CLI rendering and JSON output)

pub mod models;

pub use models::{
    AnalysisPhase, AnalysisResult, BillingSummary, ContradictionFinding, CostEstimate, DocPair,
    DocumentId, UploadedDocument,
};
