use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::collateral::ItemStatus;
use crate::error::{EngineError, EngineResult};

/// Collateral item repository
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Set the item status, stamping `updated_at` with `at`
    async fn update_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
        at: DateTime<Utc>,
    ) -> EngineResult<()>;
}

#[derive(Clone)]
pub struct PgItemStore {
    db_pool: PgPool,
}

impl PgItemStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn update_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let result = sqlx::query("UPDATE items SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status)
            .bind(at)
            .bind(item_id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!(
                "Item with ID {} not found",
                item_id
            )));
        }

        Ok(())
    }
}
