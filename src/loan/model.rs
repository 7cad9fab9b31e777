//! Loan models for the pawnshop engine
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// Loan status enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Overdue,
    Paid,
    Renewed,
    Confiscated,
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Paid => "paid",
            LoanStatus::Renewed => "renewed",
            LoanStatus::Confiscated => "confiscated",
            LoanStatus::Defaulted => "defaulted",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loan model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    pub id: Uuid,
    pub loan_number: String,
    pub branch_id: i64,
    pub customer_id: Uuid,
    pub item_id: Uuid,

    /// Original principal
    pub loan_amount: f64,
    /// Percent, applied per month by the daily accrual job
    pub interest_rate: f64,
    pub interest_amount: f64,
    /// Percent of the principal charged per day overdue
    pub late_fee_rate: f64,
    /// Total late fee ever assessed
    pub late_fee_amount: f64,
    /// Unpaid part of `late_fee_amount`
    pub late_fee_remaining: f64,
    pub principal_remaining: f64,
    pub interest_remaining: f64,
    pub amount_paid: f64,

    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub grace_period_days: i32,
    pub status: LoanStatus,

    /// Last local day already covered by interest accrual
    pub interest_accrued_through: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// What the customer still owes across principal, interest and late fees
    pub fn total_owed(&self) -> f64 {
        self.principal_remaining + self.interest_remaining + self.late_fee_remaining
    }
}

/// Filter for listing loans
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoanFilter {
    /// 0 or None means every branch
    pub branch_id: Option<i64>,
    pub customer_id: Option<Uuid>,
    pub status: Option<LoanStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl LoanFilter {
    pub fn with_status(status: LoanStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn branch(mut self, branch_id: i64) -> Self {
        self.branch_id = (branch_id != 0).then_some(branch_id);
        self
    }

    pub fn page(mut self, page: i64, limit: i64) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl<T> PaginatedResponse<T> {
    /// Whether pages after this one hold more rows
    pub fn has_more(&self) -> bool {
        self.page * self.limit < self.total
    }
}
