//! Customer lookup used by the notifier

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Customer model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Customer repository
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn get_by_id(&self, customer_id: Uuid) -> EngineResult<Customer>;
}

#[derive(Clone)]
pub struct PgCustomerStore {
    db_pool: PgPool,
}

impl PgCustomerStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn get_by_id(&self, customer_id: Uuid) -> EngineResult<Customer> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Customer {} not found", customer_id)))?;

        Ok(customer)
    }
}
