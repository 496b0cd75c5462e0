//! Analysis results and orchestrator phases

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positions of two documents in the current upload sequence
///
/// Serialized as a two-element array (`[0, 1]`), matching the backend wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocPair(pub usize, pub usize);

impl DocPair {
    /// One-based labels for display ("Document 1" / "Document 2")
    pub fn display_numbers(self) -> (usize, usize) {
        (self.0 + 1, self.1 + 1)
    }
}

impl fmt::Display for DocPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.display_numbers();
        write!(f, "{} ↔ {}", a, b)
    }
}

/// A single detected inconsistency between two documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContradictionFinding {
    /// Which pair of uploaded documents the sentences come from
    pub doc_pair_index: DocPair,

    /// One-based position of the pair group in the backend response,
    /// counting groups that produced no findings
    #[serde(default)]
    pub pair_group: usize,

    /// Entity tag reported by the backend (e.g. "DATE", "temporal")
    pub entity_type: String,

    /// Sentence from the first document of the pair
    pub sentence_a: String,

    /// Sentence from the second document of the pair
    pub sentence_b: String,

    /// Score as returned by the backend (either [-1, 1] or ±100 scale)
    pub raw_score: f64,

    /// Display confidence in [50, 100]
    pub confidence_percent: f64,

    /// Backend explanation of the conflict
    pub explanation: String,
}

/// Canonical result of one analysis run
///
/// A fresh value replaces the previous one on every completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Flattened findings, in backend order
    pub contradictions: Vec<ContradictionFinding>,

    /// Total declared by the backend summary (not reconciled with `contradictions.len()`)
    pub total_contradictions: u64,

    /// Average confidence as returned by the backend
    pub average_confidence_raw: f64,

    /// Display percentage in [50, 100]
    pub average_confidence_percent: f64,

    /// Wall time of the backend call
    pub analysis_elapsed_seconds: f64,

    /// When the result was produced
    pub timestamp: DateTime<Utc>,

    /// True when produced by the failure path (no usable backend data)
    #[serde(default)]
    pub degraded: bool,
}

impl AnalysisResult {
    /// Number of findings actually itemized
    pub fn finding_count(&self) -> usize {
        self.contradictions.len()
    }

    /// Elapsed time formatted like "2.35s"
    pub fn elapsed_display(&self) -> String {
        format!("{:.2}s", self.analysis_elapsed_seconds)
    }
}

/// State of the analysis orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPhase {
    #[default]
    Idle,
    Submitting,
    Running,
    Completed,
    Failed,
}

impl AnalysisPhase {
    /// True while a run is in flight
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Submitting | Self::Running)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
