use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use riskline_core::domain::decision::Classification;
use riskline_core::domain::policy::PolicyId;
use riskline_core::underwriting::RuleSet;

use super::{ClassificationCounts, DecisionRepository, RepositoryError, StoredDecision};
use crate::DbPool;

pub struct SqlDecisionRepository {
    pool: DbPool,
}

impl SqlDecisionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DecisionRepository for SqlDecisionRepository {
    async fn upsert(&self, decision: &StoredDecision) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO underwriting_results (\
                policy_id, classification, reasoning, rule_set, rules_version\
             ) VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(policy_id) DO UPDATE SET \
                classification = excluded.classification, \
                reasoning = excluded.reasoning, \
                rule_set = excluded.rule_set, \
                rules_version = excluded.rules_version, \
                underwritten_at = datetime('now')",
        )
        .bind(&decision.policy_id.0)
        .bind(decision.classification.as_str())
        .bind(&decision.reasoning)
        .bind(decision.rule_set.as_str())
        .bind(&decision.rules_version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_policy_id(
        &self,
        id: &PolicyId,
    ) -> Result<Option<StoredDecision>, RepositoryError> {
        let row = sqlx::query(
            "SELECT policy_id, classification, reasoning, rule_set, rules_version \
             FROM underwriting_results WHERE policy_id = ?1",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_decision_row).transpose()
    }

    async fn list(&self) -> Result<Vec<StoredDecision>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT policy_id, classification, reasoning, rule_set, rules_version \
             FROM underwriting_results ORDER BY policy_id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_decision_row).collect()
    }

    async fn classification_counts(&self) -> Result<ClassificationCounts, RepositoryError> {
        let rows = sqlx::query(
            "SELECT classification, COUNT(1) AS count \
             FROM underwriting_results GROUP BY classification",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = ClassificationCounts::default();
        for row in rows {
            let label = row.try_get::<String, _>("classification")?;
            let count = row.try_get::<i64, _>("count")?;
            match label.parse::<Classification>() {
                Ok(Classification::Safe) => counts.safe = count,
                Ok(Classification::NotSafe) => counts.not_safe = count,
                Err(_) => {
                    return Err(RepositoryError::Decode(format!(
                        "unknown stored classification `{label}`"
                    )))
                }
            }
        }

        Ok(counts)
    }
}

fn decode_decision_row(row: SqliteRow) -> Result<StoredDecision, RepositoryError> {
    let policy_id = row.try_get::<String, _>("policy_id")?;
    let classification_label = row.try_get::<String, _>("classification")?;
    let classification = classification_label.parse::<Classification>().map_err(|_| {
        RepositoryError::Decode(format!(
            "decision for `{policy_id}` has unknown classification `{classification_label}`"
        ))
    })?;
    let rule_set_label = row.try_get::<String, _>("rule_set")?;
    let rule_set = rule_set_label.parse::<RuleSet>().map_err(|_| {
        RepositoryError::Decode(format!(
            "decision for `{policy_id}` has unknown rule set `{rule_set_label}`"
        ))
    })?;

    Ok(StoredDecision {
        policy_id: PolicyId(policy_id),
        classification,
        reasoning: row.try_get("reasoning")?,
        rule_set,
        rules_version: row.try_get("rules_version")?,
    })
}

#[cfg(test)]
mod tests {
    use riskline_core::domain::decision::Classification;
    use riskline_core::domain::policy::PolicyId;
    use riskline_core::underwriting::RuleSet;

    use crate::repositories::{DecisionRepository, SqlDecisionRepository, StoredDecision};
    use crate::{connect_with_settings, migrations};

    async fn repo() -> SqlDecisionRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlDecisionRepository::new(pool)
    }

    fn decision(policy_id: &str, classification: Classification) -> StoredDecision {
        StoredDecision {
            policy_id: PolicyId(policy_id.to_string()),
            classification,
            reasoning: "Policy meets all underwriting criteria:\nNew business submission is acceptable".to_string(),
            rule_set: RuleSet::HardGate,
            rules_version: "v1.0".to_string(),
        }
    }

    #[tokio::test]
    async fn decisions_round_trip() {
        let repo = repo().await;
        let stored = decision("P-1", Classification::Safe);

        repo.upsert(&stored).await.expect("upsert");
        let found = repo.find_by_policy_id(&stored.policy_id).await.expect("find");

        assert_eq!(found, Some(stored));
    }

    #[tokio::test]
    async fn re_underwriting_replaces_the_previous_decision() {
        let repo = repo().await;
        repo.upsert(&decision("P-1", Classification::Safe)).await.expect("first");

        let mut revised = decision("P-1", Classification::NotSafe);
        revised.reasoning = "Renewal business is not acceptable under current guidelines".to_string();
        revised.rules_version = "v1.1".to_string();
        repo.upsert(&revised).await.expect("second");

        let all = repo.list().await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].classification, Classification::NotSafe);
        assert_eq!(all[0].rules_version, "v1.1");
    }

    #[tokio::test]
    async fn counts_group_by_classification() {
        let repo = repo().await;
        repo.upsert(&decision("P-1", Classification::Safe)).await.expect("P-1");
        repo.upsert(&decision("P-2", Classification::Safe)).await.expect("P-2");
        repo.upsert(&decision("P-3", Classification::NotSafe)).await.expect("P-3");

        let counts = repo.classification_counts().await.expect("counts");
        assert_eq!(counts.safe, 2);
        assert_eq!(counts.not_safe, 1);
        assert_eq!(counts.total(), 3);
    }

    #[tokio::test]
    async fn empty_store_counts_zero() {
        let repo = repo().await;
        let counts = repo.classification_counts().await.expect("counts");
        assert_eq!(counts.total(), 0);
    }
}
