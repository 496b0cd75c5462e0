//! End-to-end orchestrator flow with scripted backends (virtual time)

use smartdoc_core::normalizer::{PairGroup, RawFinding, ResponseSummary};
use smartdoc_core::{
    AnalysisBackend, AnalysisError, AnalysisOrchestrator, CoreError, FileCandidate, NoopProgress,
    Notification, PairedResponse, PhaseState, ProgressPhase, ProgressSink, Report, ReportExporter,
    Severity,
};
use smartdoc_core::smartdoc_types::{AnalysisPhase, DocPair, UploadedDocument};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

// ============================================================================
// Fakes
// ============================================================================

/// Settles after `delay` with a fixed outcome
struct ScriptedBackend {
    delay: Duration,
    outcome: Result<PairedResponse, AnalysisError>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    fn succeeding(delay: Duration) -> Self {
        Self {
            delay,
            outcome: Ok(sample_response()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(delay: Duration, error: AnalysisError) -> Self {
        Self {
            delay,
            outcome: Err(error),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl AnalysisBackend for ScriptedBackend {
    fn analyze(
        &self,
        documents: &[UploadedDocument],
    ) -> impl Future<Output = Result<PairedResponse, AnalysisError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(documents.iter().all(|d| !d.payload.is_empty()));
        let delay = self.delay;
        let outcome = self.outcome.clone();
        async move {
            tokio::time::sleep(delay).await;
            outcome
        }
    }
}

/// Records the cost-to-date each export saw
#[derive(Clone, Default)]
struct RecordingExporter {
    seen_totals: Arc<Mutex<Vec<f64>>>,
    fail: bool,
}

impl ReportExporter for RecordingExporter {
    fn export(&self, report: &Report<'_>) -> anyhow::Result<PathBuf> {
        self.seen_totals
            .lock()
            .unwrap()
            .push(report.total_cost_to_date);
        if self.fail {
            anyhow::bail!("disk full");
        }
        Ok(PathBuf::from(format!(
            "smart-doc-analysis-{}.json",
            report.generated_at.timestamp_millis()
        )))
    }
}

#[derive(Default)]
struct RecordingSink {
    percents: Vec<f64>,
    last_states: Vec<PhaseState>,
}

impl ProgressSink for RecordingSink {
    fn phase_changed(&mut self, states: &[PhaseState], _active: Option<&ProgressPhase>) {
        self.last_states = states.to_vec();
    }

    fn percent(&mut self, value: f64) {
        self.percents.push(value);
    }
}

fn sample_response() -> PairedResponse {
    let finding = |label: &str, score: f64| RawFinding {
        entity_doc1: vec![serde_json::json!("10:00 PM"), serde_json::json!(label)],
        sentence_doc1: "Submissions are due at 10:00 PM".into(),
        sentence_doc2: "Submit by midnight".into(),
        sentence_contradiction_score: score,
        explanation: "Conflicting deadline times detected.".into(),
    };
    PairedResponse {
        groups: vec![PairGroup {
            doc_pair: DocPair(0, 1),
            contradiction_pairs: vec![finding("TIME", 0.9), finding("DATE", -0.2)],
        }],
        summary: ResponseSummary {
            total_contradictions: 2,
            average_confidence: 0.42,
        },
    }
}

fn txt(name: &str) -> FileCandidate {
    FileCandidate::new(name, "text/plain", format!("contents of {}", name).into_bytes())
}

fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut received = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        received.push(notification);
    }
    received
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn with_documents<B: AnalysisBackend>(
    backend: B,
    exporter: RecordingExporter,
    count: usize,
) -> AnalysisOrchestrator<B, RecordingExporter> {
    let mut orch = AnalysisOrchestrator::new(backend, exporter);
    for i in 0..count {
        orch.add_document(txt(&format!("doc{}.txt", i + 1))).unwrap();
    }
    orch
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_success_charges_per_document() {
    let backend = ScriptedBackend::succeeding(Duration::from_millis(1200));
    let calls = backend.calls.clone();
    let mut orch = with_documents(backend, RecordingExporter::default(), 3);

    let start = Instant::now();
    let mut sink = RecordingSink::default();
    let phase = orch.run_analysis(&mut sink).await.unwrap();

    assert_eq!(phase, AnalysisPhase::Completed);
    assert_eq!(orch.phase(), AnalysisPhase::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // Results wait for the animation even though the backend answered at 1.2 s
    assert!(start.elapsed() >= Duration::from_millis(9000));
    assert_eq!(sink.percents.last().copied(), Some(100.0));
    assert!(sink.last_states.iter().all(|s| *s == PhaseState::Completed));

    let result = orch.result().unwrap();
    assert_eq!(result.contradictions.len(), 2);
    assert!(approx(result.average_confidence_percent, 85.5));
    // Elapsed time covers the backend call only
    assert!(result.analysis_elapsed_seconds >= 1.2);
    assert!(result.analysis_elapsed_seconds < 1.5);
    assert!(!result.degraded);

    assert!(approx(orch.ledger().accumulated_doc_cost(), 0.30));
    assert!(approx(orch.ledger().total(), 0.30));
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_extends_the_run() {
    let backend = ScriptedBackend::succeeding(Duration::from_secs(12));
    let mut orch = with_documents(backend, RecordingExporter::default(), 2);

    let start = Instant::now();
    let phase = orch.run_analysis(&mut NoopProgress).await.unwrap();

    assert_eq!(phase, AnalysisPhase::Completed);
    assert!(start.elapsed() >= Duration::from_secs(12));
    assert!(orch.result().unwrap().analysis_elapsed_seconds >= 12.0);
}

#[tokio::test(start_paused = true)]
async fn test_failure_settles_after_animation_without_charge() {
    let backend = ScriptedBackend::failing(
        Duration::from_millis(1200),
        AnalysisError::Status {
            status: 500,
            detail: "Internal Server Error".into(),
        },
    );
    let mut orch = with_documents(backend, RecordingExporter::default(), 2);
    let mut rx = orch.subscribe();

    let start = Instant::now();
    let phase = orch.run_analysis(&mut NoopProgress).await.unwrap();

    assert_eq!(phase, AnalysisPhase::Failed);
    assert!(start.elapsed() >= Duration::from_millis(9000));
    assert_eq!(orch.ledger().accumulated_doc_cost(), 0.0);

    let result = orch.result().unwrap();
    assert!(result.degraded);
    assert!(result.contradictions.is_empty());
    assert_eq!(result.total_contradictions, 0);

    let notifications = drain(&mut rx);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Error);
    assert_eq!(
        notifications[0].message,
        "Failed to analyze documents: Internal Server Error"
    );
}

#[tokio::test(start_paused = true)]
async fn test_malformed_response_fails_without_charge() {
    let backend = ScriptedBackend::failing(
        Duration::from_millis(300),
        AnalysisError::malformed("missing trailing summary record"),
    );
    let mut orch = with_documents(backend, RecordingExporter::default(), 2);
    let mut rx = orch.subscribe();

    let phase = orch.run_analysis(&mut NoopProgress).await.unwrap();

    assert_eq!(phase, AnalysisPhase::Failed);
    assert_eq!(orch.ledger().total(), 0.0);
    assert!(orch.last_error().is_some_and(|e| e.is_malformed()));

    let notifications = drain(&mut rx);
    assert_eq!(notifications[0].severity, Severity::Error);
    assert!(notifications[0]
        .message
        .starts_with("Failed to analyze documents"));
}

#[tokio::test(start_paused = true)]
async fn test_session_expired_is_reported() {
    let backend = ScriptedBackend::failing(Duration::ZERO, AnalysisError::SessionExpired);
    let mut orch = with_documents(backend, RecordingExporter::default(), 2);
    let mut rx = orch.subscribe();

    orch.run_analysis(&mut NoopProgress).await.unwrap();

    let notifications = drain(&mut rx);
    assert_eq!(
        notifications[0].message,
        "Failed to analyze documents: Session expired. Please log in again."
    );
}

#[tokio::test(start_paused = true)]
async fn test_runs_accumulate() {
    let backend = ScriptedBackend::succeeding(Duration::from_millis(500));
    let mut orch = with_documents(backend, RecordingExporter::default(), 2);

    orch.run_analysis(&mut NoopProgress).await.unwrap();
    orch.run_analysis(&mut NoopProgress).await.unwrap();

    assert!(approx(orch.ledger().accumulated_doc_cost(), 0.40));
    assert_eq!(orch.billing_summary().documents_analyzed, 4);
}

// ============================================================================
// Guards
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_guard_rejects_too_few_documents() {
    let backend = ScriptedBackend::succeeding(Duration::ZERO);
    let calls = backend.calls.clone();
    let mut orch = with_documents(backend, RecordingExporter::default(), 1);
    let mut rx = orch.subscribe();

    let err = orch.run_analysis(&mut NoopProgress).await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::DocumentCount {
            count: 1,
            min: 2,
            max: 3
        }
    ));
    assert_eq!(orch.phase(), AnalysisPhase::Idle);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!orch.can_analyze());

    let notifications = drain(&mut rx);
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Warning);
}

#[tokio::test(start_paused = true)]
async fn test_guard_keeps_previous_result() {
    let backend = ScriptedBackend::succeeding(Duration::from_millis(100));
    let mut orch = with_documents(backend, RecordingExporter::default(), 2);
    orch.run_analysis(&mut NoopProgress).await.unwrap();

    let first_id = orch.documents()[0].id;
    assert!(orch.remove_document(first_id));

    let err = orch.run_analysis(&mut NoopProgress).await.unwrap_err();
    assert!(matches!(err, CoreError::DocumentCount { count: 1, .. }));
    assert_eq!(orch.phase(), AnalysisPhase::Completed);
    assert_eq!(orch.result().unwrap().contradictions.len(), 2);
    assert!(approx(orch.ledger().accumulated_doc_cost(), 0.20));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_run_can_be_retried() {
    let backend = ScriptedBackend::succeeding(Duration::from_secs(30));
    let calls = backend.calls.clone();
    let mut orch = with_documents(backend, RecordingExporter::default(), 2);
    let mut rx = orch.subscribe();

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        orch.run_analysis(&mut NoopProgress),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(orch.phase(), AnalysisPhase::Idle);
    assert!(orch.result().is_none());
    assert_eq!(orch.ledger().total(), 0.0);
    assert!(drain(&mut rx).is_empty());

    let phase = orch.run_analysis(&mut NoopProgress).await.unwrap();
    assert_eq!(phase, AnalysisPhase::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(approx(orch.ledger().accumulated_doc_cost(), 0.20));
}

#[test]
fn test_intake_caps_at_three() {
    let backend = ScriptedBackend::succeeding(Duration::ZERO);
    let mut orch = AnalysisOrchestrator::new(backend, RecordingExporter::default());
    let mut rx = orch.subscribe();

    let outcomes = orch.add_documents((1..=5).map(|i| txt(&format!("doc{}.txt", i))));

    assert_eq!(outcomes.len(), 5);
    assert_eq!(orch.documents().len(), 3);
    assert_eq!(outcomes.iter().filter(|(_, r)| r.is_err()).count(), 2);

    let notifications = drain(&mut rx);
    assert_eq!(notifications.len(), 2);
    assert!(notifications
        .iter()
        .all(|n| n.severity == Severity::Warning && n.message == "Maximum 3 documents allowed"));
}

#[test]
fn test_estimate_tracks_current_documents() {
    let backend = ScriptedBackend::succeeding(Duration::ZERO);
    let orch = with_documents(backend, RecordingExporter::default(), 3);

    let estimate = orch.estimate();
    assert_eq!(estimate.document_count, 3);
    assert!(approx(estimate.doc_cost, 0.30));
    assert_eq!(estimate.total, 0.0);
}

// ============================================================================
// Export and reset
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_each_export_is_charged_before_exporting() {
    let exporter = RecordingExporter::default();
    let seen = exporter.seen_totals.clone();
    let backend = ScriptedBackend::succeeding(Duration::from_millis(100));
    let mut orch = with_documents(backend, exporter, 2);
    let mut rx = orch.subscribe();

    orch.run_analysis(&mut NoopProgress).await.unwrap();
    orch.export_report().unwrap();
    orch.export_report().unwrap();

    assert!(approx(orch.ledger().accumulated_report_cost(), 4.00));
    assert!(approx(orch.ledger().total(), 4.20));
    assert_eq!(orch.billing_summary().reports_exported, 2);

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert!(approx(seen[0], 2.20));
    assert!(approx(seen[1], 4.20));

    let successes = drain(&mut rx)
        .into_iter()
        .filter(|n| n.severity == Severity::Success)
        .count();
    assert_eq!(successes, 2);
}

#[tokio::test(start_paused = true)]
async fn test_degraded_result_is_exportable() {
    let backend = ScriptedBackend::failing(
        Duration::ZERO,
        AnalysisError::Network {
            message: "connection refused".into(),
        },
    );
    let mut orch = with_documents(backend, RecordingExporter::default(), 2);
    orch.run_analysis(&mut NoopProgress).await.unwrap();

    assert!(orch.export_report().is_ok());
    assert!(approx(orch.ledger().total(), 2.00));
}

#[test]
fn test_export_without_result_is_not_charged() {
    let exporter = RecordingExporter::default();
    let seen = exporter.seen_totals.clone();
    let backend = ScriptedBackend::succeeding(Duration::ZERO);
    let mut orch = with_documents(backend, exporter, 2);
    let mut rx = orch.subscribe();

    let err = orch.export_report().unwrap_err();

    assert!(matches!(err, CoreError::NoResult));
    assert_eq!(orch.ledger().total(), 0.0);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(drain(&mut rx)[0].severity, Severity::Warning);
}

#[tokio::test(start_paused = true)]
async fn test_failed_export_keeps_charge() {
    let exporter = RecordingExporter {
        fail: true,
        ..Default::default()
    };
    let backend = ScriptedBackend::succeeding(Duration::ZERO);
    let mut orch = with_documents(backend, exporter, 2);
    orch.run_analysis(&mut NoopProgress).await.unwrap();
    let mut rx = orch.subscribe();

    let err = orch.export_report().unwrap_err();

    assert!(matches!(err, CoreError::Export { .. }));
    assert!(err.to_string().contains("disk full"));
    assert!(approx(orch.ledger().accumulated_report_cost(), 2.00));
    assert_eq!(drain(&mut rx)[0].severity, Severity::Error);
}

#[tokio::test(start_paused = true)]
async fn test_reset_starts_a_new_session() {
    let backend = ScriptedBackend::succeeding(Duration::from_millis(100));
    let mut orch = with_documents(backend, RecordingExporter::default(), 3);
    orch.run_analysis(&mut NoopProgress).await.unwrap();
    orch.export_report().unwrap();
    let mut rx = orch.subscribe();

    orch.reset();

    assert_eq!(orch.phase(), AnalysisPhase::Idle);
    assert!(orch.documents().is_empty());
    assert!(orch.result().is_none());
    assert_eq!(orch.ledger().total(), 0.0);
    assert_eq!(orch.ledger().accumulated_doc_cost(), 0.0);
    assert_eq!(orch.ledger().accumulated_report_cost(), 0.0);
    assert!(matches!(orch.export_report(), Err(CoreError::NoResult)));

    let notifications = drain(&mut rx);
    assert_eq!(notifications[0].severity, Severity::Success);
    assert_eq!(
        notifications[0].message,
        "Analysis reset. Ready for new documents."
    );
}
