//! Late-fee accrual
//!
//! The fee is simple interest on the original principal: `rate% x principal x
//! days overdue`. `late_fee_amount` is always replaced by the recomputed total,
//! while `late_fee_remaining` only ever moves by the difference so partial fee
//! payments recorded elsewhere are kept.
//!
//! Only loans whose status is exactly `overdue` accrue. Statuses are kept fresh by
//! the overdue processor, which runs first inside the maintenance job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::JobContext;
use crate::clock::Clock;
use crate::error::EngineResult;
use crate::loan::{state, Loan, LoanFilter, LoanStatus, LoanStore};

/// Changes smaller than this are float noise, not a new fee
pub const FEE_EPSILON: f64 = 0.01;

/// Fee owed after `days_overdue` full days
pub fn compute_late_fee(late_fee_rate: f64, loan_amount: f64, days_overdue: i64) -> f64 {
    (late_fee_rate / 100.0) * loan_amount * days_overdue as f64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeAdjustment {
    pub days_overdue: i64,
    pub new_total: f64,
    pub increment: f64,
}

/// Fee change due for `loan` at `now`, if any
pub fn late_fee_adjustment(loan: &Loan, now: DateTime<Utc>) -> Option<FeeAdjustment> {
    if loan.status != LoanStatus::Overdue {
        return None;
    }

    let days_overdue = state::days_overdue(loan.due_date, now);
    if days_overdue <= 0 {
        return None;
    }

    let computed = compute_late_fee(loan.late_fee_rate, loan.loan_amount, days_overdue);
    if computed <= loan.late_fee_amount + FEE_EPSILON {
        return None;
    }

    Some(FeeAdjustment {
        days_overdue,
        new_total: computed,
        increment: computed - loan.late_fee_amount,
    })
}

impl FeeAdjustment {
    pub fn apply(&self, loan: &mut Loan) {
        loan.late_fee_amount = self.new_total;
        loan.late_fee_remaining += self.increment;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LateFeeRunSummary {
    pub scanned: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub fees_assessed: f64,
    pub cancelled: bool,
}

pub struct LateFeeEngine {
    loans: Arc<dyn LoanStore>,
    clock: Arc<dyn Clock>,
    branch_id: i64,
    page_size: i64,
}

impl LateFeeEngine {
    pub fn new(loans: Arc<dyn LoanStore>, clock: Arc<dyn Clock>, branch_id: i64, page_size: i64) -> Self {
        Self {
            loans,
            clock,
            branch_id,
            page_size: page_size.max(1),
        }
    }

    pub async fn calculate_late_fees(&self, ctx: &JobContext) -> EngineResult<LateFeeRunSummary> {
        let now = self.clock.now();
        let mut summary = LateFeeRunSummary::default();
        let mut page = 1;

        'pages: loop {
            let filter = LoanFilter::with_status(LoanStatus::Overdue)
                .branch(self.branch_id)
                .page(page, self.page_size);
            let batch = self.loans.list(&filter).await?;

            for mut loan in batch.data.iter().cloned() {
                if ctx.is_cancelled() {
                    tracing::warn!(job = ctx.job_name(), "Shutdown requested, abandoning late-fee batch");
                    summary.cancelled = true;
                    break 'pages;
                }
                summary.scanned += 1;

                let Some(adjustment) = late_fee_adjustment(&loan, now) else {
                    summary.skipped += 1;
                    continue;
                };

                adjustment.apply(&mut loan);
                loan.updated_at = now;
                match self.loans.update(&loan).await {
                    Ok(()) => {
                        summary.updated += 1;
                        summary.fees_assessed += adjustment.increment;
                        tracing::info!(
                            loan_id = %loan.id,
                            loan_number = %loan.loan_number,
                            days_overdue = adjustment.days_overdue,
                            late_fee_amount = loan.late_fee_amount,
                            late_fee_remaining = loan.late_fee_remaining,
                            "Late fee updated"
                        );
                    }
                    Err(e) => {
                        summary.failed += 1;
                        tracing::error!(
                            loan_id = %loan.id,
                            loan_number = %loan.loan_number,
                            operation = "update_late_fee",
                            error = %e,
                            "Failed to persist late fee"
                        );
                    }
                }
            }

            if batch.data.is_empty() || !batch.has_more() {
                break;
            }
            page += 1;
        }

        tracing::info!(
            scanned = summary.scanned,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            fees_assessed = summary.fees_assessed,
            "Late fee calculation finished"
        );

        Ok(summary)
    }
}
