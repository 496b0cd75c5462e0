//! Analysis orchestrator
//!
//! State machine: `Idle → Submitting → Running → {Completed | Failed}`, with
//! `reset` returning to `Idle`. While running, the backend call and the
//! cosmetic progress animation are joined on the caller's task; results are
//! only published once both have finished. The backend outcome alone picks
//! the terminal state.
//!
//! The orchestrator owns the session: uploads, the last result and the
//! cost ledger. Callers construct it and drop it; there is no global instance.

use crate::backend::AnalysisBackend;
use crate::config::SmartDocConfig;
use crate::error::{AnalysisError, CoreError, IntakeError};
use crate::event::{Notification, NotificationBus};
use crate::export::{Report, ReportExporter};
use crate::intake::{DocumentIntake, FileCandidate, MAX_DOCUMENTS};
use crate::ledger::CostLedger;
use crate::normalizer;
use crate::progress::{ProgressSimulator, ProgressSink, DEFAULT_PHASES};
use chrono::Utc;
use smartdoc_types::{
    AnalysisPhase, AnalysisResult, BillingSummary, CostEstimate, DocumentId, UploadedDocument,
};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Fewest documents a comparison needs
pub const MIN_DOCUMENTS: usize = 2;

/// Session-level driver for intake, analysis, billing and export
pub struct AnalysisOrchestrator<B, X> {
    backend: B,
    exporter: X,
    intake: DocumentIntake,
    ledger: CostLedger,
    simulator: ProgressSimulator,
    phase: AnalysisPhase,
    result: Option<AnalysisResult>,
    last_error: Option<AnalysisError>,
    notifications: NotificationBus,
}

impl<B, X> AnalysisOrchestrator<B, X>
where
    B: AnalysisBackend,
    X: ReportExporter,
{
    /// Orchestrator with default pricing and the standard 9 s animation
    pub fn new(backend: B, exporter: X) -> Self {
        Self::with_config(backend, exporter, &SmartDocConfig::default())
    }

    pub fn with_config(backend: B, exporter: X, config: &SmartDocConfig) -> Self {
        Self {
            backend,
            exporter,
            intake: DocumentIntake::new(),
            ledger: CostLedger::with_pricing(&config.pricing),
            simulator: ProgressSimulator::new(
                DEFAULT_PHASES.to_vec(),
                config.progress.tick_interval(),
            ),
            phase: AnalysisPhase::Idle,
            result: None,
            last_error: None,
            notifications: NotificationBus::default_capacity(),
        }
    }

    /// Replace the progress animation
    pub fn with_simulator(mut self, simulator: ProgressSimulator) -> Self {
        self.simulator = simulator;
        self
    }

    // ===================
    // Intake
    // ===================

    /// Validate and append one upload; rejections are also published as notifications
    pub fn add_document(&mut self, candidate: FileCandidate) -> Result<DocumentId, IntakeError> {
        let outcome = self.intake.validate(candidate).map(|doc| doc.id);
        if let Err(e) = &outcome {
            self.notify_rejection(e);
        }
        outcome
    }

    /// Validate a multi-file drop in order
    pub fn add_documents<I>(&mut self, candidates: I) -> Vec<(String, Result<DocumentId, IntakeError>)>
    where
        I: IntoIterator<Item = FileCandidate>,
    {
        let outcomes = self.intake.validate_all(candidates);
        for (_, outcome) in &outcomes {
            if let Err(e) = outcome {
                self.notify_rejection(e);
            }
        }
        outcomes
    }

    /// Remove an upload; no-op when the id is unknown
    pub fn remove_document(&mut self, id: DocumentId) -> bool {
        self.intake.remove(id)
    }

    fn notify_rejection(&self, error: &IntakeError) {
        warn!(error = %error, "Upload rejected");
        self.notifications
            .publish(Notification::from_core_error(&CoreError::Intake(error.clone())));
    }

    // ===================
    // Accessors
    // ===================

    pub fn documents(&self) -> &[UploadedDocument] {
        self.intake.documents()
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    /// Result of the last settled run (degraded after a failure)
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// Backend error of the last run, if it failed
    pub fn last_error(&self) -> Option<&AnalysisError> {
        self.last_error.as_ref()
    }

    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    /// Cost figures for the documents currently uploaded
    pub fn estimate(&self) -> CostEstimate {
        self.ledger.estimate(self.intake.len())
    }

    pub fn billing_summary(&self) -> BillingSummary {
        self.ledger.summary()
    }

    /// Subscribe to user-facing notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// True when `run_analysis` would be accepted
    pub fn can_analyze(&self) -> bool {
        self.check_can_start().is_ok()
    }

    fn check_can_start(&self) -> Result<(), CoreError> {
        if self.phase.is_busy() {
            return Err(CoreError::AnalysisInProgress);
        }
        let count = self.intake.len();
        if !(MIN_DOCUMENTS..=MAX_DOCUMENTS).contains(&count) {
            return Err(CoreError::DocumentCount {
                count,
                min: MIN_DOCUMENTS,
                max: MAX_DOCUMENTS,
            });
        }
        Ok(())
    }

    // ===================
    // Transitions
    // ===================

    /// Run one analysis over the current documents
    ///
    /// Returns the terminal phase (`Completed` or `Failed`). Backend failures
    /// never surface as `Err`; only guard violations do, and those leave the
    /// state untouched. Takes at least as long as the progress animation.
    ///
    /// Dropping the future before it settles (a caller-side timeout, Ctrl-C)
    /// puts the phase back to what it was before the call, without a charge.
    pub async fn run_analysis(
        &mut self,
        progress: &mut dyn ProgressSink,
    ) -> Result<AnalysisPhase, CoreError> {
        if let Err(e) = self.check_can_start() {
            warn!(error = %e, phase = %self.phase, "Analysis not started");
            self.notifications.publish(Notification::from_core_error(&e));
            return Err(e);
        }

        let document_count = self.intake.len();
        info!(
            documents = document_count,
            animation_secs = self.simulator.nominal_duration().as_secs_f64(),
            "Submitting analysis"
        );
        let mut phase = PhaseGuard::enter(&mut self.phase, AnalysisPhase::Submitting);

        let request = timed(self.backend.analyze(self.intake.documents()));
        phase.set(AnalysisPhase::Running);

        let ((outcome, elapsed), ()) = tokio::join!(request, self.simulator.run(progress));

        let terminal = match outcome {
            Ok(response) => {
                let result = normalizer::normalize(&response, elapsed);
                self.ledger.charge_analysis(document_count);
                info!(
                    findings = result.finding_count(),
                    declared = result.total_contradictions,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "Analysis completed"
                );
                self.result = Some(result);
                self.last_error = None;
                AnalysisPhase::Completed
            }
            Err(e) => {
                error!(error = %e, elapsed_secs = elapsed.as_secs_f64(), "Analysis failed");
                self.notifications
                    .publish(Notification::error(failure_message(&e)));
                self.result = Some(normalizer::degraded_result());
                self.last_error = Some(e);
                AnalysisPhase::Failed
            }
        };

        phase.settle(terminal);
        Ok(terminal)
    }

    /// Start a new session: drop uploads and result, zero the ledger
    pub fn reset(&mut self) {
        self.intake.clear();
        self.result = None;
        self.last_error = None;
        self.ledger.reset();
        self.phase = AnalysisPhase::Idle;
        info!("Session reset");
        self.notifications
            .publish(Notification::success("Analysis reset. Ready for new documents."));
    }

    /// Charge one export, then hand the current result to the exporter
    ///
    /// Every call is a separate billable export, even for the same result.
    pub fn export_report(&mut self) -> Result<PathBuf, CoreError> {
        let Some(result) = self.result.as_ref() else {
            let err = CoreError::NoResult;
            self.notifications.publish(Notification::from_core_error(&err));
            return Err(err);
        };

        self.ledger.charge_export(self.intake.len());

        let report = Report {
            documents: self.intake.documents(),
            analysis_result: result,
            total_cost_to_date: self.ledger.total(),
            generated_at: Utc::now(),
        };

        match self.exporter.export(&report) {
            Ok(path) => {
                info!(path = %path.display(), "Report exported");
                self.notifications.publish(Notification::success(format!(
                    "Report exported to {}",
                    path.display()
                )));
                Ok(path)
            }
            Err(e) => {
                let err = CoreError::Export {
                    message: format!("{:#}", e),
                };
                error!(error = %err, "Report export failed");
                self.notifications.publish(Notification::from_core_error(&err));
                Err(err)
            }
        }
    }
}

/// Text shown to the user for a failed run; malformed bodies get a generic message
fn failure_message(error: &AnalysisError) -> String {
    if error.is_malformed() {
        "Failed to analyze documents: the backend returned an unexpected response".to_string()
    } else {
        format!("Failed to analyze documents: {}", error)
    }
}

/// Phase held by an in-flight run
///
/// Restores the phase seen on entry if dropped before `settle`, so a
/// cancelled run never leaves the session stuck in `Running`.
struct PhaseGuard<'a> {
    phase: &'a mut AnalysisPhase,
    restore: AnalysisPhase,
    settled: bool,
}

impl<'a> PhaseGuard<'a> {
    fn enter(phase: &'a mut AnalysisPhase, next: AnalysisPhase) -> Self {
        let restore = std::mem::replace(phase, next);
        Self {
            phase,
            restore,
            settled: false,
        }
    }

    fn set(&mut self, next: AnalysisPhase) {
        *self.phase = next;
    }

    fn settle(mut self, terminal: AnalysisPhase) {
        *self.phase = terminal;
        self.settled = true;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(
                phase = %self.phase,
                restored = %self.restore,
                "Analysis cancelled before settling"
            );
            *self.phase = self.restore;
        }
    }
}

/// Await `fut` and report how long it took
async fn timed<F: Future>(fut: F) -> (F::Output, Duration) {
    let started = Instant::now();
    let output = fut.await;
    (output, started.elapsed())
}
