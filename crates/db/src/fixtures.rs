use serde_json::Value;

use crate::repositories::{RepositoryError, SqlStagingRepository, StagingRepository};
use crate::DbPool;

/// Canonical demo policies and their verification contract. One entry per
/// document in the fixture file; ids must match.
const DEMO_POLICY_CONTRACT: &[PolicySeedContract] = &[
    PolicySeedContract {
        id: "P-1001",
        description: "clean new-business property risk in a target state",
    },
    PolicySeedContract { id: "P-1002", description: "renewal submission (declined by hard gate)" },
    PolicySeedContract {
        id: "P-1003",
        description: "pre-1970 frame construction in California",
    },
    PolicySeedContract { id: "P-1004", description: "non-property line of business" },
    PolicySeedContract {
        id: "P-1005",
        description: "oversized TIV with numeric fields delivered as strings",
    },
    PolicySeedContract {
        id: "P-1006",
        description: "sparse document relying on normalization defaults",
    },
];

struct PolicySeedContract {
    id: &'static str,
    description: &'static str,
}

#[derive(Clone, Debug)]
pub struct PolicySeedInfo {
    pub id: &'static str,
    pub description: &'static str,
}

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub policies_staged: Vec<PolicySeedInfo>,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub checks: Vec<(&'static str, bool)>,
    pub all_present: bool,
}

/// Deterministic demo dataset: six raw policy documents staged exactly as
/// the external API would deliver them, covering both rule sets' accept and
/// decline paths.
pub struct DemoPolicyDataset;

impl DemoPolicyDataset {
    /// Fixture content, shipped with the repository.
    pub const JSON: &str = include_str!("../../../config/fixtures/demo_policies.json");

    /// Stage the demo documents. Idempotent: re-running replaces the same
    /// ids in place.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let documents: Vec<Value> = serde_json::from_str(Self::JSON)
            .map_err(|error| RepositoryError::Decode(format!("demo fixture: {error}")))?;

        let staging = SqlStagingRepository::new(pool.clone());
        for (index, document) in documents.iter().enumerate() {
            let id = document
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("policy_{index}"));
            staging.put_document(&id, document).await?;
        }

        let policies_staged = DEMO_POLICY_CONTRACT
            .iter()
            .map(|contract| PolicySeedInfo {
                id: contract.id,
                description: contract.description,
            })
            .collect();

        Ok(SeedResult { policies_staged })
    }

    /// Verify that every contracted document is present in staging.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let staging = SqlStagingRepository::new(pool.clone());
        let staged = staging.list_documents().await?;

        let checks: Vec<(&'static str, bool)> = DEMO_POLICY_CONTRACT
            .iter()
            .map(|contract| {
                (contract.id, staged.iter().any(|policy| policy.id == contract.id))
            })
            .collect();
        let all_present = checks.iter().all(|(_, present)| *present);

        Ok(VerificationResult { checks, all_present })
    }
}

#[cfg(test)]
mod tests {
    use crate::fixtures::DemoPolicyDataset;
    use crate::repositories::{SqlStagingRepository, StagingRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn demo_dataset_loads_and_verifies() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let seeded = DemoPolicyDataset::load(&pool).await.expect("load fixtures");
        assert_eq!(seeded.policies_staged.len(), 6);

        let verification = DemoPolicyDataset::verify(&pool).await.expect("verify fixtures");
        assert!(verification.all_present, "all demo policies should be staged");

        pool.close().await;
    }

    #[tokio::test]
    async fn demo_dataset_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        DemoPolicyDataset::load(&pool).await.expect("first load");
        DemoPolicyDataset::load(&pool).await.expect("second load");

        let staging = SqlStagingRepository::new(pool.clone());
        assert_eq!(staging.count().await.expect("count"), 6);

        pool.close().await;
    }
}
