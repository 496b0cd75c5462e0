//! Backend response normalization
//!
//! Input contract: exactly one shape, the pair-grouped sequence
//!
//! ```text
//! [
//!   { "doc_pair": [0, 1], "contradiction_pairs": [ { ...finding... }, ... ] },
//!   ...,
//!   { "totalContradictions": 3, "averageConfidence": 0.42 }   // summary, always last
//! ]
//! ```
//!
//! Other backend shapes are adapted in [`crate::backend`] before reaching this module.

use crate::error::AnalysisError;
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use smartdoc_types::{AnalysisResult, ContradictionFinding, DocPair};
use std::time::Duration;
use tracing::warn;

/// Entity tag used when the backend omits one
pub const UNKNOWN_ENTITY: &str = "unknown";

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One finding as sent by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFinding {
    /// `[text, label]` of the entity found in the first sentence
    #[serde(default, deserialize_with = "null_as_default")]
    pub entity_doc1: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentence_doc1: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentence_doc2: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentence_contradiction_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,
}

impl RawFinding {
    /// Entity label (second element of `entity_doc1`)
    pub fn entity_type(&self) -> String {
        self.entity_doc1
            .get(1)
            .and_then(Value::as_str)
            .filter(|label| !label.is_empty())
            .unwrap_or(UNKNOWN_ENTITY)
            .to_string()
    }
}

/// Findings for one pair of documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairGroup {
    pub doc_pair: DocPair,
    #[serde(default, deserialize_with = "null_as_default")]
    pub contradiction_pairs: Vec<RawFinding>,
}

/// Trailing summary record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSummary {
    #[serde(
        rename = "totalContradictions",
        default,
        deserialize_with = "null_as_default"
    )]
    pub total_contradictions: u64,
    #[serde(
        rename = "averageConfidence",
        default,
        deserialize_with = "null_as_default"
    )]
    pub average_confidence: f64,
}

/// Canonical backend response: pair groups plus summary
#[derive(Debug, Clone, PartialEq)]
pub struct PairedResponse {
    pub groups: Vec<PairGroup>,
    pub summary: ResponseSummary,
}

impl PairedResponse {
    /// Parse the pair-grouped wire shape
    ///
    /// The last element must be a summary object; every preceding element
    /// must be a pair group.
    pub fn from_json(value: &Value) -> Result<Self, AnalysisError> {
        let items = value
            .as_array()
            .ok_or_else(|| AnalysisError::malformed("expected a JSON array"))?;

        let (last, rest) = items
            .split_last()
            .ok_or_else(|| AnalysisError::malformed("empty response"))?;

        if !last.is_object() {
            return Err(AnalysisError::malformed("missing trailing summary record"));
        }
        let summary: ResponseSummary = serde_json::from_value(last.clone())
            .map_err(|e| AnalysisError::malformed(format!("invalid summary: {}", e)))?;

        let groups = rest
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                serde_json::from_value::<PairGroup>(item.clone()).map_err(|e| {
                    AnalysisError::malformed(format!("invalid document pair #{}: {}", idx, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { groups, summary })
    }
}

/// Map a raw confidence onto the [50, 100] display scale
///
/// Values beyond ±1 are taken as already on a ±100 scale. Negative scores
/// still mean "some confidence of a real contradiction", hence the 50% floor.
pub fn display_percent(raw: f64) -> f64 {
    let mut value = if raw.is_nan() { 0.0 } else { raw };
    if value.abs() > 1.0 {
        value /= 100.0;
    }
    let clamped = value.clamp(-1.0, 1.0);
    50.0 + ((clamped + 1.0) / 2.0) * 50.0
}

/// Flatten a canonical response into an `AnalysisResult`
///
/// Pair order and in-pair finding order are preserved. Each finding keeps
/// the one-based position of its group, so groups without findings still
/// occupy a number. The summary total is reported as-is, even when it
/// disagrees with the itemized count.
pub fn normalize(response: &PairedResponse, elapsed: Duration) -> AnalysisResult {
    let contradictions: Vec<ContradictionFinding> = response
        .groups
        .iter()
        .enumerate()
        .flat_map(|(idx, group)| {
            group
                .contradiction_pairs
                .iter()
                .map(move |raw| ContradictionFinding {
                    doc_pair_index: group.doc_pair,
                    pair_group: idx + 1,
                    entity_type: raw.entity_type(),
                    sentence_a: raw.sentence_doc1.clone(),
                    sentence_b: raw.sentence_doc2.clone(),
                    raw_score: raw.sentence_contradiction_score,
                    confidence_percent: display_percent(raw.sentence_contradiction_score),
                    explanation: raw.explanation.clone(),
                })
        })
        .collect();

    if contradictions.len() as u64 != response.summary.total_contradictions {
        warn!(
            itemized = contradictions.len(),
            declared = response.summary.total_contradictions,
            "Backend total does not match itemized findings"
        );
    }

    AnalysisResult {
        contradictions,
        total_contradictions: response.summary.total_contradictions,
        average_confidence_raw: response.summary.average_confidence,
        average_confidence_percent: display_percent(response.summary.average_confidence),
        analysis_elapsed_seconds: elapsed.as_secs_f64(),
        timestamp: Utc::now(),
        degraded: false,
    }
}

/// Zero result used whenever no usable backend data exists
pub fn degraded_result() -> AnalysisResult {
    AnalysisResult {
        contradictions: Vec::new(),
        total_contradictions: 0,
        average_confidence_raw: 0.0,
        average_confidence_percent: display_percent(0.0),
        analysis_elapsed_seconds: 0.0,
        timestamp: Utc::now(),
        degraded: true,
    }
}
