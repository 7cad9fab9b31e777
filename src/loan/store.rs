//! Loan persistence - the store contract the processors read and write through

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::loan::{Loan, LoanFilter, LoanStatus, PaginatedResponse};

/// Position in the `(due_date, id)` ordering of overdue candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanCursor {
    pub due_date: DateTime<Utc>,
    pub id: Uuid,
}

impl LoanCursor {
    pub fn after(loan: &Loan) -> Self {
        Self {
            due_date: loan.due_date,
            id: loan.id,
        }
    }
}

/// Loan repository keyed by loan ID
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// One page of non-terminal loans due before `as_of`, ordered by `(due_date, id)`
    /// and starting strictly after `after`. `branch_id == 0` means all branches.
    async fn get_overdue_loans(
        &self,
        branch_id: i64,
        as_of: DateTime<Utc>,
        after: Option<LoanCursor>,
    ) -> EngineResult<Vec<Loan>>;

    /// Filtered, paged listing
    async fn list(&self, filter: &LoanFilter) -> EngineResult<PaginatedResponse<Loan>>;

    /// Move a loan from `from` to `to`, stamping `updated_at` with `at`.
    /// Returns `false` without writing when the loan is no longer in `from`.
    async fn update_status(
        &self,
        loan_id: Uuid,
        from: LoanStatus,
        to: LoanStatus,
        at: DateTime<Utc>,
    ) -> EngineResult<bool>;

    /// Persist the fee and interest fields of `loan`, along with its `updated_at`
    async fn update(&self, loan: &Loan) -> EngineResult<()>;
}

/// PostgreSQL-backed loan store
#[derive(Clone)]
pub struct PgLoanStore {
    db_pool: PgPool,
    page_size: i64,
}

impl PgLoanStore {
    /// `page_size` caps every query this store issues
    pub fn new(db_pool: PgPool, page_size: i64) -> Self {
        Self {
            db_pool,
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl LoanStore for PgLoanStore {
    async fn get_overdue_loans(
        &self,
        branch_id: i64,
        as_of: DateTime<Utc>,
        after: Option<LoanCursor>,
    ) -> EngineResult<Vec<Loan>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
            "SELECT * FROM loans WHERE status IN ('active', 'overdue') AND due_date < ",
        );
        query_builder.push_bind(as_of);

        if branch_id != 0 {
            query_builder.push(" AND branch_id = ");
            query_builder.push_bind(branch_id);
        }

        if let Some(cursor) = after {
            query_builder.push(" AND (due_date, id) > (");
            query_builder.push_bind(cursor.due_date);
            query_builder.push(", ");
            query_builder.push_bind(cursor.id);
            query_builder.push(")");
        }

        query_builder.push(" ORDER BY due_date ASC, id ASC LIMIT ");
        query_builder.push_bind(self.page_size);

        let loans = query_builder
            .build_query_as::<Loan>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(loans)
    }

    async fn list(&self, filter: &LoanFilter) -> EngineResult<PaginatedResponse<Loan>> {
        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter.limit.unwrap_or(self.page_size).clamp(1, self.page_size);
        let offset = (page - 1) * limit;

        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM loans WHERE 1=1");
        let mut count_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT COUNT(*) FROM loans WHERE 1=1");

        if let Some(status) = filter.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
            count_builder.push(" AND status = ");
            count_builder.push_bind(status);
        }
        if let Some(branch_id) = filter.branch_id.filter(|b| *b != 0) {
            query_builder.push(" AND branch_id = ");
            query_builder.push_bind(branch_id);
            count_builder.push(" AND branch_id = ");
            count_builder.push_bind(branch_id);
        }
        if let Some(customer_id) = filter.customer_id {
            query_builder.push(" AND customer_id = ");
            query_builder.push_bind(customer_id);
            count_builder.push(" AND customer_id = ");
            count_builder.push_bind(customer_id);
        }

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.db_pool)
            .await?;

        query_builder.push(" ORDER BY due_date ASC, id ASC LIMIT ");
        query_builder.push_bind(limit);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(offset);

        let loans = query_builder
            .build_query_as::<Loan>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(PaginatedResponse {
            data: loans,
            total,
            page,
            limit,
        })
    }

    async fn update_status(
        &self,
        loan_id: Uuid,
        from: LoanStatus,
        to: LoanStatus,
        at: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let result = sqlx::query(
            "UPDATE loans SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
        )
        .bind(to)
        .bind(at)
        .bind(loan_id)
        .bind(from)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update(&self, loan: &Loan) -> EngineResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET interest_amount = $1,
                interest_remaining = $2,
                late_fee_amount = $3,
                late_fee_remaining = $4,
                interest_accrued_through = $5,
                updated_at = $6
            WHERE id = $7
            "#,
        )
        .bind(loan.interest_amount)
        .bind(loan.interest_remaining)
        .bind(loan.late_fee_amount)
        .bind(loan.late_fee_remaining)
        .bind(loan.interest_accrued_through)
        .bind(loan.updated_at)
        .bind(loan.id)
        .execute(&self.db_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("Loan {} not found", loan.id)));
        }

        Ok(())
    }
}
