use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::RwLock;

use riskline_core::domain::decision::Classification;
use riskline_core::domain::policy::{PolicyId, PolicyRecord};

use super::{
    ClassificationCounts, DecisionRepository, PolicyRepository, RepositoryError, StagedPolicy,
    StagingRepository, StoredDecision,
};

#[derive(Default)]
pub struct InMemoryStagingRepository {
    documents: RwLock<BTreeMap<String, Value>>,
}

#[async_trait::async_trait]
impl StagingRepository for InMemoryStagingRepository {
    async fn put_document(&self, id: &str, document: &Value) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        documents.insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<StagedPolicy>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .map(|(id, document)| StagedPolicy { id: id.clone(), document: document.clone() })
            .collect())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents.len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryPolicyRepository {
    policies: RwLock<BTreeMap<String, PolicyRecord>>,
}

#[async_trait::async_trait]
impl PolicyRepository for InMemoryPolicyRepository {
    async fn upsert(&self, record: &PolicyRecord, _raw: &Value) -> Result<(), RepositoryError> {
        let mut policies = self.policies.write().await;
        policies.insert(record.id.0.clone(), record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<PolicyRecord>, RepositoryError> {
        let policies = self.policies.read().await;
        Ok(policies.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<PolicyRecord>, RepositoryError> {
        let policies = self.policies.read().await;
        Ok(policies.values().cloned().collect())
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let policies = self.policies.read().await;
        Ok(policies.len() as i64)
    }
}

#[derive(Default)]
pub struct InMemoryDecisionRepository {
    decisions: RwLock<BTreeMap<String, StoredDecision>>,
}

#[async_trait::async_trait]
impl DecisionRepository for InMemoryDecisionRepository {
    async fn upsert(&self, decision: &StoredDecision) -> Result<(), RepositoryError> {
        let mut decisions = self.decisions.write().await;
        decisions.insert(decision.policy_id.0.clone(), decision.clone());
        Ok(())
    }

    async fn find_by_policy_id(
        &self,
        id: &PolicyId,
    ) -> Result<Option<StoredDecision>, RepositoryError> {
        let decisions = self.decisions.read().await;
        Ok(decisions.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<StoredDecision>, RepositoryError> {
        let decisions = self.decisions.read().await;
        Ok(decisions.values().cloned().collect())
    }

    async fn classification_counts(&self) -> Result<ClassificationCounts, RepositoryError> {
        let decisions = self.decisions.read().await;
        let mut counts = ClassificationCounts::default();
        for decision in decisions.values() {
            match decision.classification {
                Classification::Safe => counts.safe += 1,
                Classification::NotSafe => counts.not_safe += 1,
            }
        }
        Ok(counts)
    }
}
