//! Cost figures exposed by the ledger

use serde::{Deserialize, Serialize};

/// Cost figures shown next to the upload list
///
/// `doc_cost` is what analyzing the current documents would add;
/// `report_cost` and `total` are running, already-accrued amounts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    /// Number of documents the estimate was computed for
    pub document_count: usize,
    /// Per-run analysis cost for `document_count` documents (USD)
    pub doc_cost: f64,
    /// Accrued export cost (USD)
    pub report_cost: f64,
    /// Accrued analysis + export cost (USD)
    pub total: f64,
}

/// Accrued usage for the billing view
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummary {
    /// Documents charged across all completed runs
    pub documents_analyzed: u64,
    /// Export actions charged
    pub reports_exported: u64,
    /// Accrued analysis cost (USD)
    pub doc_cost: f64,
    /// Accrued export cost (USD)
    pub report_cost: f64,
    /// Accrued total (USD)
    pub total: f64,
}

impl BillingSummary {
    /// Format a dollar amount as "$1.23"
    pub fn format_usd(amount: f64) -> String {
        format!("${:.2}", amount)
    }
}
