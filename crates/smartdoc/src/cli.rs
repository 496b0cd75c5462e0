//! CLI output for analysis, estimate and normalize commands
//!
//! Formatters return strings; main.rs decides where they go.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use indicatif::{ProgressBar, ProgressStyle};
use smartdoc_core::export::numbered_findings;
use smartdoc_core::{Notification, PhaseState, ProgressPhase, ProgressSink};
use smartdoc_types::{AnalysisResult, BillingSummary, CostEstimate, UploadedDocument};

// ============================================================================
// Progress
// ============================================================================

/// Progress bar driven by the analysis animation
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(hidden: bool) -> Result<Self> {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(100)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .context("Invalid progress template")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for BarProgress {
    fn phase_changed(&mut self, _states: &[PhaseState], active: Option<&ProgressPhase>) {
        match active {
            Some(phase) => self.bar.set_message(phase.label),
            None => self.bar.set_message("Waiting for results..."),
        }
    }

    fn percent(&mut self, value: f64) {
        self.bar.set_position(value.round().clamp(0.0, 100.0) as u64);
    }
}

// ============================================================================
// Formatters
// ============================================================================

/// Format findings as table (human) or JSON
pub fn format_findings_table(result: &AnalysisResult, json: bool, no_color: bool) -> String {
    if json {
        return serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string());
    }

    if result.contradictions.is_empty() {
        return "No contradictions detected.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    if no_color {
        table.set_header(vec![
            "#",
            "Type",
            "Confidence",
            "Docs",
            "Statement A",
            "Statement B",
        ]);
    } else {
        table.set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Type").fg(Color::Cyan),
            Cell::new("Confidence").fg(Color::Cyan),
            Cell::new("Docs").fg(Color::Cyan),
            Cell::new("Statement A").fg(Color::Cyan),
            Cell::new("Statement B").fg(Color::Cyan),
        ]);
    }

    for (group, index, finding) in numbered_findings(&result.contradictions) {
        let (doc_a, doc_b) = finding.doc_pair_index.display_numbers();
        table.add_row(Row::from(vec![
            format!("{}.{}", group, index),
            finding.entity_type.to_uppercase(),
            format!("{:.2}%", finding.confidence_percent),
            format!("{} ↔ {}", doc_a, doc_b),
            truncate(&finding.sentence_a, 50),
            truncate(&finding.sentence_b, 50),
        ]));
    }

    table.to_string()
}

/// Headline numbers of a result
pub fn format_result_summary(result: &AnalysisResult) -> String {
    let mut lines = vec![];
    if result.degraded {
        lines.push("Analysis failed; showing an empty result.".to_string());
    }
    lines.push(format!(
        "Contradictions:   {}",
        result.total_contradictions
    ));
    lines.push(format!(
        "Avg confidence:   {:.2}%",
        result.average_confidence_percent
    ));
    lines.push(format!("Analysis time:    {}", result.elapsed_display()));
    lines.push(format!(
        "Completed at:     {}",
        result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.join("\n")
}

/// Uploaded documents as table (human) or JSON
pub fn format_documents_table(documents: &[UploadedDocument], json: bool, no_color: bool) -> String {
    if json {
        return serde_json::to_string_pretty(documents).unwrap_or_else(|_| "[]".to_string());
    }

    if documents.is_empty() {
        return "No documents accepted.".to_string();
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    if no_color {
        table.set_header(vec!["#", "Name", "Type", "Size"]);
    } else {
        table.set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Type").fg(Color::Cyan),
            Cell::new("Size").fg(Color::Cyan),
        ]);
    }

    for (idx, doc) in documents.iter().enumerate() {
        let kind = doc
            .extension()
            .map(|ext| ext.trim_start_matches('.').to_uppercase())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(Row::from(vec![
            (idx + 1).to_string(),
            truncate(&doc.name, 40),
            kind,
            doc.size_display(),
        ]));
    }

    table.to_string()
}

pub fn format_estimate(estimate: &CostEstimate) -> String {
    [
        format!(
            "Analysis cost:    {} ({} documents)",
            BillingSummary::format_usd(estimate.doc_cost),
            estimate.document_count
        ),
        format!(
            "Report cost:      {}",
            BillingSummary::format_usd(estimate.report_cost)
        ),
        format!(
            "Total to date:    {}",
            BillingSummary::format_usd(estimate.total)
        ),
    ]
    .join("\n")
}

pub fn format_billing(summary: &BillingSummary) -> String {
    [
        format!(
            "Documents billed: {} ({})",
            summary.documents_analyzed,
            BillingSummary::format_usd(summary.doc_cost)
        ),
        format!(
            "Reports exported: {} ({})",
            summary.reports_exported,
            BillingSummary::format_usd(summary.report_cost)
        ),
        format!(
            "Total to date:    {}",
            BillingSummary::format_usd(summary.total)
        ),
    ]
    .join("\n")
}

/// One notification line, plus a hint line when there is a suggestion
pub fn format_notification(notification: &Notification) -> String {
    let prefix = notification.severity.as_str();
    match &notification.suggestion {
        Some(hint) => format!("{}: {}\n  hint: {}", prefix, notification.message, hint),
        None => format!("{}: {}", prefix, notification.message),
    }
}

// ============================================================================
// Utilities
// ============================================================================

fn truncate(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).collect::<String>() + "…"
    }
}

// ============================================================================
// Tests
// ============================================================================
