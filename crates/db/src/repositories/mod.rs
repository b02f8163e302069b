use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use riskline_core::domain::decision::Classification;
use riskline_core::domain::policy::{PolicyId, PolicyRecord};
use riskline_core::underwriting::RuleSet;

pub mod decision;
pub mod memory;
pub mod policy;
pub mod staging;

pub use decision::SqlDecisionRepository;
pub use memory::{InMemoryDecisionRepository, InMemoryPolicyRepository, InMemoryStagingRepository};
pub use policy::SqlPolicyRepository;
pub use staging::SqlStagingRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A raw policy document as fetched from the source, before normalization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StagedPolicy {
    pub id: String,
    pub document: Value,
}

/// A persisted underwriting decision, keyed by policy id so that
/// re-underwriting a policy replaces its previous classification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredDecision {
    pub policy_id: PolicyId,
    pub classification: Classification,
    pub reasoning: String,
    pub rule_set: RuleSet,
    pub rules_version: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCounts {
    pub safe: i64,
    pub not_safe: i64,
}

impl ClassificationCounts {
    pub fn total(&self) -> i64 {
        self.safe + self.not_safe
    }
}

#[async_trait]
pub trait StagingRepository: Send + Sync {
    async fn put_document(&self, id: &str, document: &Value) -> Result<(), RepositoryError>;
    async fn list_documents(&self) -> Result<Vec<StagedPolicy>, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait PolicyRepository: Send + Sync {
    async fn upsert(&self, record: &PolicyRecord, raw: &Value) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<PolicyRecord>, RepositoryError>;
    async fn list(&self) -> Result<Vec<PolicyRecord>, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait DecisionRepository: Send + Sync {
    async fn upsert(&self, decision: &StoredDecision) -> Result<(), RepositoryError>;
    async fn find_by_policy_id(
        &self,
        id: &PolicyId,
    ) -> Result<Option<StoredDecision>, RepositoryError>;
    async fn list(&self) -> Result<Vec<StoredDecision>, RepositoryError>;
    async fn classification_counts(&self) -> Result<ClassificationCounts, RepositoryError>;
}
