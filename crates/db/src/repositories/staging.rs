use serde_json::Value;
use sqlx::Row;

use super::{RepositoryError, StagedPolicy, StagingRepository};
use crate::DbPool;

pub struct SqlStagingRepository {
    pool: DbPool,
}

impl SqlStagingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StagingRepository for SqlStagingRepository {
    async fn put_document(&self, id: &str, document: &Value) -> Result<(), RepositoryError> {
        let serialized = serde_json::to_string(document)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO staging_policies (id, document) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET \
                document = excluded.document, \
                fetched_at = datetime('now')",
        )
        .bind(id)
        .bind(serialized)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<StagedPolicy>, RepositoryError> {
        let rows = sqlx::query("SELECT id, document FROM staging_policies ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let id = row.try_get::<String, _>("id")?;
                let raw = row.try_get::<String, _>("document")?;
                let document = serde_json::from_str(&raw).map_err(|error| {
                    RepositoryError::Decode(format!("staged document `{id}`: {error}"))
                })?;
                Ok(StagedPolicy { id, document })
            })
            .collect()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(1) FROM staging_policies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
