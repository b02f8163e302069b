//! Application services for the underwriting pipeline: ingest raw policy
//! documents, promote them into typed rows, underwrite the lot, and report.
//! Each service is a thin orchestration over injected repositories and the
//! pure rule engine; none holds state between runs.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use riskline_core::domain::policy::{field_issues, PolicyRecord};
use riskline_core::errors::ApplicationError;
use riskline_core::underwriting::{RunSummary, Underwriter};
use riskline_db::repositories::{
    DecisionRepository, PolicyRepository, RepositoryError, StagingRepository, StoredDecision,
};
use riskline_source::{PolicySource, SourceError};

#[derive(Clone, Debug, Default)]
pub struct IngestReport {
    pub fetched: usize,
    pub staged: usize,
    pub errors: Vec<String>,
}

impl IngestReport {
    pub fn render(&self) -> String {
        let mut text = format!(
            "Fetched {} policies from the source, staged {}.",
            self.fetched, self.staged
        );
        if !self.errors.is_empty() {
            text.push_str(&format!(" Errors: {}.", self.errors.len()));
        }
        text
    }
}

#[derive(Clone, Debug, Default)]
pub struct PromotionReport {
    pub promoted: usize,
    pub validation_warnings: usize,
    pub errors: Vec<String>,
}

impl PromotionReport {
    pub fn render(&self) -> String {
        let mut text = format!("Promoted {} staged policies into the policy store.", self.promoted);
        if self.validation_warnings > 0 {
            text.push_str(&format!(
                " {} documents carried malformed fields and were defaulted.",
                self.validation_warnings
            ));
        }
        if !self.errors.is_empty() {
            text.push_str(&format!(" Errors: {}.", self.errors.len()));
        }
        text
    }
}

/// Pull every policy document the source offers into the staging store.
#[derive(Clone)]
pub struct IngestService {
    source: Arc<dyn PolicySource>,
    staging: Arc<dyn StagingRepository>,
}

impl IngestService {
    pub fn new(source: Arc<dyn PolicySource>, staging: Arc<dyn StagingRepository>) -> Self {
        Self { source, staging }
    }

    pub async fn run(&self) -> Result<IngestReport, ApplicationError> {
        let documents = self.source.fetch_all().await.map_err(integration_error)?;

        let mut report = IngestReport { fetched: documents.len(), ..IngestReport::default() };
        for (index, document) in documents.iter().enumerate() {
            let id = document_id(document, index);
            match self.staging.put_document(&id, document).await {
                Ok(()) => report.staged += 1,
                Err(error) => report.errors.push(format!("policy {id}: {error}")),
            }
        }

        info!(
            event_name = "pipeline.ingest.completed",
            fetched = report.fetched,
            staged = report.staged,
            error_count = report.errors.len(),
            "policy ingest completed"
        );
        Ok(report)
    }
}

/// Normalize staged documents into typed policy rows. Malformed fields are
/// defaulted, counted, and logged; they never fail the promotion.
#[derive(Clone)]
pub struct PromotionService {
    staging: Arc<dyn StagingRepository>,
    policies: Arc<dyn PolicyRepository>,
}

impl PromotionService {
    pub fn new(staging: Arc<dyn StagingRepository>, policies: Arc<dyn PolicyRepository>) -> Self {
        Self { staging, policies }
    }

    pub async fn run(&self) -> Result<PromotionReport, ApplicationError> {
        let staged = self.staging.list_documents().await.map_err(persistence_error)?;
        let reference_year = Utc::now().year();

        let mut report = PromotionReport::default();
        for staged_policy in &staged {
            let issues = field_issues(&staged_policy.document);
            if !issues.is_empty() {
                report.validation_warnings += 1;
                warn!(
                    event_name = "pipeline.promote.malformed_fields",
                    policy_id = %staged_policy.id,
                    issue_count = issues.len(),
                    "document has malformed fields, defaults applied"
                );
            }

            let record = PolicyRecord::from_document(
                &staged_policy.id,
                &staged_policy.document,
                reference_year,
            );
            match self.policies.upsert(&record, &staged_policy.document).await {
                Ok(()) => report.promoted += 1,
                Err(error) => report.errors.push(format!("policy {}: {error}", staged_policy.id)),
            }
        }

        info!(
            event_name = "pipeline.promote.completed",
            promoted = report.promoted,
            validation_warnings = report.validation_warnings,
            error_count = report.errors.len(),
            "policy promotion completed"
        );
        Ok(report)
    }
}

/// Run every stored policy through the configured rule set and persist one
/// decision per policy. Per-policy persistence failures are tallied, never
/// fatal to the run.
#[derive(Clone)]
pub struct UnderwritingService {
    policies: Arc<dyn PolicyRepository>,
    decisions: Arc<dyn DecisionRepository>,
    underwriter: Arc<dyn Underwriter>,
    rules_version: String,
}

impl UnderwritingService {
    pub fn new(
        policies: Arc<dyn PolicyRepository>,
        decisions: Arc<dyn DecisionRepository>,
        underwriter: Arc<dyn Underwriter>,
        rules_version: impl Into<String>,
    ) -> Self {
        Self { policies, decisions, underwriter, rules_version: rules_version.into() }
    }

    pub async fn run(&self) -> Result<RunSummary, ApplicationError> {
        let all_policies = self.policies.list().await.map_err(persistence_error)?;
        let run_id = Uuid::new_v4();

        let mut summary = RunSummary::default();
        for policy in &all_policies {
            let decision = self.underwriter.evaluate(policy);
            let stored = StoredDecision {
                policy_id: policy.id.clone(),
                classification: decision.classification,
                reasoning: decision.narrative.clone(),
                rule_set: self.underwriter.rule_set(),
                rules_version: self.rules_version.clone(),
            };

            match self.decisions.upsert(&stored).await {
                Ok(()) => {
                    summary.record(decision.classification);
                    info!(
                        event_name = "pipeline.underwrite.decision",
                        run_id = %run_id,
                        policy_id = %policy.id.0,
                        classification = decision.classification.as_str(),
                        "policy classified"
                    );
                }
                Err(error) => {
                    summary.record_error(format!("policy {}: {error}", policy.id.0));
                }
            }
        }

        info!(
            event_name = "pipeline.underwrite.completed",
            run_id = %run_id,
            rule_set = self.underwriter.rule_set().as_str(),
            total = summary.total_processed,
            safe = summary.safe_count,
            not_safe = summary.not_safe_count,
            error_count = summary.errors.len(),
            "underwriting run completed"
        );
        Ok(summary)
    }
}

/// Aggregate stored decisions into the operator-facing summary block.
#[derive(Clone)]
pub struct SummaryService {
    decisions: Arc<dyn DecisionRepository>,
}

const SUMMARY_SAMPLE_LIMIT: usize = 10;
const SUMMARY_REASONING_PREVIEW_CHARS: usize = 80;

impl SummaryService {
    pub fn new(decisions: Arc<dyn DecisionRepository>) -> Self {
        Self { decisions }
    }

    pub async fn render(&self) -> Result<String, ApplicationError> {
        let counts = self.decisions.classification_counts().await.map_err(persistence_error)?;
        if counts.total() == 0 {
            return Ok("No underwriting results found. Run underwriting first.".to_string());
        }

        let decisions = self.decisions.list().await.map_err(persistence_error)?;
        let total = counts.total() as f64;

        let mut lines = vec![
            "UNDERWRITING SUMMARY".to_string(),
            "====================".to_string(),
            format!("Total policies: {}", counts.total()),
            format!("SAFE: {} ({:.1}%)", counts.safe, counts.safe as f64 / total * 100.0),
            format!(
                "NOT SAFE: {} ({:.1}%)",
                counts.not_safe,
                counts.not_safe as f64 / total * 100.0
            ),
            String::new(),
            "RESULTS:".to_string(),
        ];

        for decision in decisions.iter().take(SUMMARY_SAMPLE_LIMIT) {
            lines.push(format!(
                "- {} [{}]: {}",
                decision.policy_id.0,
                decision.classification,
                preview(&decision.reasoning)
            ));
        }
        if decisions.len() > SUMMARY_SAMPLE_LIMIT {
            lines.push(format!("... and {} more results", decisions.len() - SUMMARY_SAMPLE_LIMIT));
        }

        Ok(lines.join("\n"))
    }
}

fn preview(reasoning: &str) -> String {
    let flattened = reasoning.replace('\n', " ");
    if flattened.chars().count() <= SUMMARY_REASONING_PREVIEW_CHARS {
        return flattened;
    }
    let truncated: String = flattened.chars().take(SUMMARY_REASONING_PREVIEW_CHARS).collect();
    format!("{truncated}...")
}

fn document_id(document: &Value, index: usize) -> String {
    match document.get("id") {
        Some(Value::String(raw)) if !raw.trim().is_empty() => raw.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => format!("policy_{index}"),
    }
}

fn persistence_error(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn integration_error(error: SourceError) -> ApplicationError {
    ApplicationError::Integration(error.to_string())
}
