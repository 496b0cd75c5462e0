//! Report export (JSON and Markdown)
//!
//! The orchestrator records the export charge before calling an exporter;
//! exporters only write files.

use crate::config::{ExportConfig, ExportFormat};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use smartdoc_types::{AnalysisResult, BillingSummary, ContradictionFinding, UploadedDocument};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Everything a report is built from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    pub documents: &'a [UploadedDocument],
    pub analysis_result: &'a AnalysisResult,
    pub total_cost_to_date: f64,
    pub generated_at: DateTime<Utc>,
}

/// Produces a persisted report artifact
pub trait ReportExporter {
    /// Write the report and return where it landed
    fn export(&self, report: &Report<'_>) -> Result<PathBuf>;
}

impl<T: ReportExporter + ?Sized> ReportExporter for Box<T> {
    fn export(&self, report: &Report<'_>) -> Result<PathBuf> {
        (**self).export(report)
    }
}

/// Build the exporter selected in the config
pub fn exporter_for(config: &ExportConfig) -> Box<dyn ReportExporter> {
    match config.format {
        ExportFormat::Json => Box::new(JsonReportExporter::new(config.output_dir.clone())),
        ExportFormat::Markdown => Box::new(MarkdownReportExporter::new(config.output_dir.clone())),
    }
}

/// Pretty-printed JSON report
#[derive(Debug, Clone)]
pub struct JsonReportExporter {
    output_dir: PathBuf,
}

impl JsonReportExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl ReportExporter for JsonReportExporter {
    fn export(&self, report: &Report<'_>) -> Result<PathBuf> {
        let (path, file) =
            create_report_file(&self.output_dir, report.generated_at, ExportFormat::Json)?;
        let mut writer = BufWriter::new(file);

        // Serialize to JSON (pretty print)
        serde_json::to_writer_pretty(&mut writer, report).context("Failed to serialize report")?;
        writer.flush().context("Failed to flush JSON writer")?;

        Ok(path)
    }
}

/// Human-readable Markdown report
#[derive(Debug, Clone)]
pub struct MarkdownReportExporter {
    output_dir: PathBuf,
}

impl MarkdownReportExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl ReportExporter for MarkdownReportExporter {
    fn export(&self, report: &Report<'_>) -> Result<PathBuf> {
        let (path, file) =
            create_report_file(&self.output_dir, report.generated_at, ExportFormat::Markdown)?;
        let mut writer = BufWriter::new(file);

        write_markdown(&mut writer, report).context("Failed to write Markdown report")?;
        writer.flush().context("Failed to flush Markdown writer")?;

        Ok(path)
    }
}

fn write_markdown(w: &mut impl Write, report: &Report<'_>) -> std::io::Result<()> {
    let result = report.analysis_result;

    writeln!(w, "# Smart Doc Analysis Report")?;
    writeln!(w)?;
    writeln!(w, "Generated: {}", report.generated_at.to_rfc3339())?;
    writeln!(w)?;

    writeln!(w, "## Executive Summary")?;
    writeln!(w)?;
    writeln!(w, "- Documents Analyzed: {}", report.documents.len())?;
    writeln!(w, "- Contradictions Found: {}", result.total_contradictions)?;
    writeln!(
        w,
        "- Average Confidence: {:.2}%",
        result.average_confidence_percent
    )?;
    writeln!(w, "- Analysis Time: {}", result.elapsed_display())?;
    writeln!(
        w,
        "- Total Cost to Date: {}",
        BillingSummary::format_usd(report.total_cost_to_date)
    )?;
    writeln!(w)?;

    writeln!(w, "## Documents Analyzed")?;
    writeln!(w)?;
    for (idx, doc) in report.documents.iter().enumerate() {
        writeln!(w, "{}. {} ({})", idx + 1, doc.name, doc.size_display())?;
    }
    writeln!(w)?;

    if result.contradictions.is_empty() {
        writeln!(w, "No contradictions detected.")?;
        return Ok(());
    }

    writeln!(w, "## Contradictions Detected")?;
    for (group, index, finding) in numbered_findings(&result.contradictions) {
        let (doc_a, doc_b) = finding.doc_pair_index.display_numbers();
        writeln!(w)?;
        writeln!(
            w,
            "### Contradiction #{}.{} [{}]",
            group,
            index,
            finding.entity_type.to_uppercase()
        )?;
        writeln!(w)?;
        writeln!(w, "Confidence: {:.2}%", finding.confidence_percent)?;
        writeln!(w)?;
        writeln!(w, "**Document {}:** \"{}\"", doc_a, finding.sentence_a)?;
        writeln!(w)?;
        writeln!(w, "**Document {}:** \"{}\"", doc_b, finding.sentence_b)?;
        writeln!(w)?;
        writeln!(w, "> Analysis: {}", finding.explanation)?;
    }

    Ok(())
}

/// Number findings as `#<group>.<index>`
///
/// `group` is the finding's pair group position in the backend response, so
/// a pair that produced nothing still takes up its number. `index` restarts
/// at 1 inside each group.
pub fn numbered_findings(
    findings: &[ContradictionFinding],
) -> Vec<(usize, usize, &ContradictionFinding)> {
    let mut numbered = Vec::with_capacity(findings.len());
    let mut index = 0;
    let mut previous = None;

    for finding in findings {
        if previous != Some(finding.pair_group) {
            index = 0;
            previous = Some(finding.pair_group);
        }
        index += 1;
        numbered.push((finding.pair_group, index, finding));
    }

    numbered
}

/// Create `<dir>/smart-doc-analysis-<millis>.<ext>`, suffixed if that name is taken
///
/// The file is opened with `create_new`, so an existing report is never
/// truncated even when two exports race for the same name.
fn create_report_file(
    dir: &Path,
    generated_at: DateTime<Utc>,
    format: ExportFormat,
) -> Result<(PathBuf, File)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let stem = format!("smart-doc-analysis-{}", generated_at.timestamp_millis());
    let mut path = dir.join(format!("{}.{}", stem, format.extension()));
    let mut suffix = 1;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                path = dir.join(format!("{}-{}.{}", stem, suffix, format.extension()));
                suffix += 1;
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to create report file: {}", path.display()));
            }
        }
    }
}
