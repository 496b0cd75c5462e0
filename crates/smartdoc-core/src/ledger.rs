//! Session cost ledger
//!
//! Two independent accumulators (analysis, export) that only grow until an
//! explicit reset. Amounts are held in whole cents so repeated accrual stays exact.
//!
//! The ledger does not deduplicate: each `charge_*` call is one billable event.
//! Calling them exactly once per qualifying event is the orchestrator's job.

use crate::config::PricingConfig;
use smartdoc_types::{BillingSummary, CostEstimate};
use tracing::info;

/// Running cost totals for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostLedger {
    per_document_cents: u64,
    per_export_cents: u64,
    accumulated_doc_cents: u64,
    accumulated_report_cents: u64,
    documents_analyzed: u64,
    reports_exported: u64,
}

impl CostLedger {
    /// Ledger with the standard rates ($0.10 per document, $2.00 per export)
    pub fn new() -> Self {
        Self::with_pricing(&PricingConfig::default())
    }

    pub fn with_pricing(pricing: &PricingConfig) -> Self {
        Self {
            per_document_cents: pricing.per_document_cents(),
            per_export_cents: pricing.per_export_cents(),
            accumulated_doc_cents: 0,
            accumulated_report_cents: 0,
            documents_analyzed: 0,
            reports_exported: 0,
        }
    }

    fn analysis_charge(&self, document_count: usize) -> u64 {
        (document_count as u64).saturating_mul(self.per_document_cents)
    }

    /// Cost figures for `document_count` documents against the current ledger
    ///
    /// Pure: reads ledger state, never changes it.
    pub fn estimate(&self, document_count: usize) -> CostEstimate {
        CostEstimate {
            document_count,
            doc_cost: cents_to_dollars(self.analysis_charge(document_count)),
            report_cost: self.accumulated_report_cost(),
            total: self.total(),
        }
    }

    /// Accrue the cost of one completed analysis run
    pub fn charge_analysis(&mut self, document_count: usize) {
        let charge = self.analysis_charge(document_count);
        self.accumulated_doc_cents = self.accumulated_doc_cents.saturating_add(charge);
        self.documents_analyzed = self.documents_analyzed.saturating_add(document_count as u64);
        info!(
            documents = document_count,
            charge = cents_to_dollars(charge),
            total = self.total(),
            "Charged analysis"
        );
    }

    /// Accrue the flat cost of one export action (free when there are no documents)
    pub fn charge_export(&mut self, document_count: usize) {
        if document_count == 0 {
            return;
        }
        self.accumulated_report_cents = self
            .accumulated_report_cents
            .saturating_add(self.per_export_cents);
        self.reports_exported = self.reports_exported.saturating_add(1);
        info!(
            charge = cents_to_dollars(self.per_export_cents),
            total = self.total(),
            "Charged export"
        );
    }

    /// Zero both accumulators (new session)
    pub fn reset(&mut self) {
        self.accumulated_doc_cents = 0;
        self.accumulated_report_cents = 0;
        self.documents_analyzed = 0;
        self.reports_exported = 0;
        info!("Cost ledger reset");
    }

    pub fn accumulated_doc_cost(&self) -> f64 {
        cents_to_dollars(self.accumulated_doc_cents)
    }

    pub fn accumulated_report_cost(&self) -> f64 {
        cents_to_dollars(self.accumulated_report_cents)
    }

    /// Accrued analysis + export cost
    pub fn total(&self) -> f64 {
        cents_to_dollars(
            self.accumulated_doc_cents
                .saturating_add(self.accumulated_report_cents),
        )
    }

    /// Accrued usage for the billing view
    pub fn summary(&self) -> BillingSummary {
        BillingSummary {
            documents_analyzed: self.documents_analyzed,
            reports_exported: self.reports_exported,
            doc_cost: self.accumulated_doc_cost(),
            report_cost: self.accumulated_report_cost(),
            total: self.total(),
        }
    }
}

impl Default for CostLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn cents_to_dollars(cents: u64) -> f64 {
    cents as f64 / 100.0
}
