//! smartdoc-core - Core library for smartdoc
//!
//! Provides upload intake, the cost ledger, backend response normalization,
//! the progress animation and the analysis orchestrator.

pub mod backend;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod intake;
pub mod ledger;
pub mod normalizer;
pub mod orchestrator;
pub mod progress;

pub use backend::{AnalysisBackend, BackendResponse, HttpBackend};
pub use config::{ExportFormat, SmartDocConfig};
pub use error::{AnalysisError, CoreError, IntakeError, RejectionCode};
pub use event::{Notification, NotificationBus, Severity};
pub use export::{exporter_for, JsonReportExporter, MarkdownReportExporter, Report, ReportExporter};
pub use intake::{DocumentIntake, FileCandidate};
pub use ledger::CostLedger;
pub use normalizer::PairedResponse;
pub use orchestrator::AnalysisOrchestrator;
pub use progress::{NoopProgress, PhaseState, ProgressPhase, ProgressSimulator, ProgressSink};

pub use smartdoc_types;
