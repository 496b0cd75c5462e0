//! Backend analysis call and response-shape adapter
//!
//! Two backend contracts exist in the wild. Both are parsed into
//! [`BackendResponse`] here, and only the canonical pair-grouped shape
//! leaves this module.

use crate::config::BackendConfig;
use crate::error::{AnalysisError, CoreError};
use crate::normalizer::{PairGroup, PairedResponse, RawFinding, ResponseSummary};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use smartdoc_types::{DocPair, UploadedDocument};
use std::future::Future;
use tracing::{debug, error};

/// The real analysis call
pub trait AnalysisBackend {
    /// Submit every document and return the canonical response
    fn analyze(
        &self,
        documents: &[UploadedDocument],
    ) -> impl Future<Output = Result<PairedResponse, AnalysisError>> + Send;
}

// ============================================================================
// Response shapes
// ============================================================================

/// Document reference inside a flat finding
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FlatSnippet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
}

/// Finding in the flat shape
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlatFinding {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub confidence: f64,
    pub document1: FlatSnippet,
    pub document2: FlatSnippet,
    #[serde(default)]
    pub explanation: String,
}

/// `{ "contradictions": [...], "averageConfidence": n }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatResponse {
    #[serde(default)]
    pub contradictions: Vec<FlatFinding>,
    #[serde(default)]
    pub average_confidence: f64,
}

/// Any response shape a backend may return
#[derive(Debug, Clone, PartialEq)]
pub enum BackendResponse {
    /// Per-pair groups followed by a summary record
    PairGrouped(PairedResponse),
    /// Single object with an un-grouped findings list
    Flat(FlatResponse),
}

impl BackendResponse {
    /// Detect the shape of a JSON body and parse it
    pub fn from_json(value: &Value) -> Result<Self, AnalysisError> {
        match value {
            Value::Array(_) => PairedResponse::from_json(value).map(Self::PairGrouped),
            Value::Object(map) if map.contains_key("contradictions") => {
                serde_json::from_value(value.clone())
                    .map(Self::Flat)
                    .map_err(|e| AnalysisError::malformed(format!("invalid flat response: {}", e)))
            }
            _ => Err(AnalysisError::malformed("unrecognized response shape")),
        }
    }

    /// Convert to the canonical shape
    ///
    /// Flat findings are placed into pairs by resolving document names against
    /// `documents`; consecutive findings for the same pair share one group.
    pub fn into_paired(self, documents: &[UploadedDocument]) -> PairedResponse {
        match self {
            Self::PairGrouped(response) => response,
            Self::Flat(flat) => {
                let total = flat.contradictions.len() as u64;
                let mut groups: Vec<PairGroup> = Vec::new();

                for finding in flat.contradictions {
                    let pair = DocPair(
                        position_of(documents, &finding.document1.name).unwrap_or(0),
                        position_of(documents, &finding.document2.name).unwrap_or(1),
                    );
                    let raw = RawFinding {
                        entity_doc1: vec![Value::Null, Value::String(finding.kind)],
                        sentence_doc1: finding.document1.text,
                        sentence_doc2: finding.document2.text,
                        sentence_contradiction_score: finding.confidence,
                        explanation: finding.explanation,
                    };

                    match groups.last_mut() {
                        Some(group) if group.doc_pair == pair => {
                            group.contradiction_pairs.push(raw);
                        }
                        _ => {
                            groups.push(PairGroup {
                                doc_pair: pair,
                                contradiction_pairs: vec![raw],
                            });
                        }
                    }
                }

                PairedResponse {
                    groups,
                    summary: ResponseSummary {
                        total_contradictions: total,
                        average_confidence: flat.average_confidence,
                    },
                }
            }
        }
    }
}

fn position_of(documents: &[UploadedDocument], name: &str) -> Option<usize> {
    documents.iter().position(|doc| doc.name == name)
}

// ============================================================================
// HTTP backend
// ============================================================================

/// Multipart upload to the analyze endpoint
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
    bearer_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, CoreError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| CoreError::InvalidConfig {
            message: format!("Failed to build HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            url: config.url.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post_documents(&self, documents: &[UploadedDocument]) -> Result<Value, AnalysisError> {
        let form = documents
            .iter()
            .fold(Form::new(), |form, doc| form.part("files", file_part(doc)));

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        debug!(url = %self.url, documents = documents.len(), "Submitting analysis request");
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Analysis request failed");
            AnalysisError::Network {
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AnalysisError::SessionExpired);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response.text().await.map_err(|e| AnalysisError::Network {
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                detail: error_detail(status.as_u16(), &body),
            });
        }

        if status == StatusCode::NO_CONTENT || !content_type.contains("application/json") {
            return Err(AnalysisError::malformed("backend returned no JSON body"));
        }

        serde_json::from_str(&body)
            .map_err(|e| AnalysisError::malformed(format!("invalid JSON: {}", e)))
    }
}

impl AnalysisBackend for HttpBackend {
    fn analyze(
        &self,
        documents: &[UploadedDocument],
    ) -> impl Future<Output = Result<PairedResponse, AnalysisError>> + Send {
        async move {
            let body = self.post_documents(documents).await?;
            let response = BackendResponse::from_json(&body)?;
            Ok(response.into_paired(documents))
        }
    }
}

fn file_part(doc: &UploadedDocument) -> Part {
    let part = Part::bytes(doc.payload.clone()).file_name(doc.name.clone());
    if doc.mime_type.is_empty() {
        return part;
    }
    // An unparsable declared type is dropped rather than failing the upload
    part.mime_str(&doc.mime_type)
        .unwrap_or_else(|_| Part::bytes(doc.payload.clone()).file_name(doc.name.clone()))
}

/// Error text for a failed request: the body's `detail` string, else the status
pub fn error_detail(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| format!("Request failed ({})", status))
}
