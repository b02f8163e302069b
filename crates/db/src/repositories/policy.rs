use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use riskline_core::domain::policy::{PolicyId, PolicyRecord};

use super::{PolicyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPolicyRepository {
    pool: DbPool,
}

impl SqlPolicyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PolicyRepository for SqlPolicyRepository {
    async fn upsert(&self, record: &PolicyRecord, raw: &Value) -> Result<(), RepositoryError> {
        let raw_data = serde_json::to_string(raw)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO policies (\
                id, tiv, total_premium, line_of_business, construction_type, \
                primary_risk_state, oldest_building, winnability, \
                renewal_or_new_business, loss_value, raw_data\
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT(id) DO UPDATE SET \
                tiv = excluded.tiv, \
                total_premium = excluded.total_premium, \
                line_of_business = excluded.line_of_business, \
                construction_type = excluded.construction_type, \
                primary_risk_state = excluded.primary_risk_state, \
                oldest_building = excluded.oldest_building, \
                winnability = excluded.winnability, \
                renewal_or_new_business = excluded.renewal_or_new_business, \
                loss_value = excluded.loss_value, \
                raw_data = excluded.raw_data",
        )
        .bind(&record.id.0)
        .bind(record.tiv.to_string())
        .bind(record.total_premium.to_string())
        .bind(&record.line_of_business)
        .bind(&record.construction_type)
        .bind(&record.primary_risk_state)
        .bind(i64::from(record.oldest_building))
        .bind(record.winnability)
        .bind(&record.renewal_or_new_business)
        .bind(record.loss_value.to_string())
        .bind(raw_data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PolicyId) -> Result<Option<PolicyRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, tiv, total_premium, line_of_business, construction_type, \
                    primary_risk_state, oldest_building, winnability, \
                    renewal_or_new_business, loss_value \
             FROM policies WHERE id = ?1",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_policy_row).transpose()
    }

    async fn list(&self) -> Result<Vec<PolicyRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, tiv, total_premium, line_of_business, construction_type, \
                    primary_risk_state, oldest_building, winnability, \
                    renewal_or_new_business, loss_value \
             FROM policies ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_policy_row).collect()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar("SELECT COUNT(1) FROM policies").fetch_one(&self.pool).await?;
        Ok(count)
    }
}

fn decode_policy_row(row: SqliteRow) -> Result<PolicyRecord, RepositoryError> {
    let id = row.try_get::<String, _>("id")?;
    Ok(PolicyRecord {
        tiv: decode_amount(&row, "tiv", &id)?,
        total_premium: decode_amount(&row, "total_premium", &id)?,
        line_of_business: row.try_get("line_of_business")?,
        construction_type: row.try_get("construction_type")?,
        primary_risk_state: row.try_get("primary_risk_state")?,
        oldest_building: row.try_get::<i64, _>("oldest_building")? as i32,
        winnability: row.try_get("winnability")?,
        renewal_or_new_business: row.try_get("renewal_or_new_business")?,
        loss_value: decode_amount(&row, "loss_value", &id)?,
        id: PolicyId(id),
    })
}

// Monetary columns are TEXT: SQLite has no decimal type and REAL would lose
// exactness on the way back out.
fn decode_amount(row: &SqliteRow, column: &str, id: &str) -> Result<Decimal, RepositoryError> {
    let raw = row.try_get::<String, _>(column)?;
    raw.parse().map_err(|_| {
        RepositoryError::Decode(format!("policy `{id}` column `{column}`: `{raw}`"))
    })
}
