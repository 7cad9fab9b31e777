//! Daily interest accrual
//!
//! Registered but disabled by default: the simple-interest product fixes interest
//! at origination. When enabled, `interest_rate` is read as a monthly rate spread
//! over 30 days and applied to the remaining principal for every local calendar
//! day not yet covered by `interest_accrued_through`.

use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;
use std::sync::Arc;

use super::JobContext;
use crate::clock::Clock;
use crate::error::EngineResult;
use crate::loan::{Loan, LoanFilter, LoanStatus, LoanStore};

const DAYS_PER_RATE_PERIOD: f64 = 30.0;

/// Interest due for the days between the last accrual and `today`
pub fn interest_due(loan: &Loan, today: NaiveDate, offset: FixedOffset) -> Option<(i64, f64)> {
    let from = loan
        .interest_accrued_through
        .unwrap_or_else(|| loan.start_date.with_timezone(&offset).date_naive());
    let days = (today - from).num_days();
    if days <= 0 {
        return None;
    }

    let daily = loan.principal_remaining * (loan.interest_rate / 100.0) / DAYS_PER_RATE_PERIOD;
    if daily <= 0.0 {
        return None;
    }

    Some((days, daily * days as f64))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterestRunSummary {
    pub scanned: u32,
    pub accrued: u32,
    pub skipped: u32,
    pub failed: u32,
    pub interest_accrued: f64,
    pub cancelled: bool,
}

pub struct InterestAccrual {
    loans: Arc<dyn LoanStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    branch_id: i64,
    page_size: i64,
}

impl InterestAccrual {
    pub fn new(
        loans: Arc<dyn LoanStore>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        branch_id: i64,
        page_size: i64,
    ) -> Self {
        Self {
            loans,
            clock,
            offset,
            branch_id,
            page_size: page_size.max(1),
        }
    }

    pub async fn accrue_daily_interest(&self, ctx: &JobContext) -> EngineResult<InterestRunSummary> {
        let now = self.clock.now();
        let today = now.with_timezone(&self.offset).date_naive();
        let mut summary = InterestRunSummary::default();

        'statuses: for status in [LoanStatus::Active, LoanStatus::Overdue] {
            let mut page = 1;
            loop {
                let filter = LoanFilter::with_status(status)
                    .branch(self.branch_id)
                    .page(page, self.page_size);
                let batch = self.loans.list(&filter).await?;

                for mut loan in batch.data.iter().cloned() {
                    if ctx.is_cancelled() {
                        summary.cancelled = true;
                        break 'statuses;
                    }
                    summary.scanned += 1;

                    let Some((days, amount)) = interest_due(&loan, today, self.offset) else {
                        summary.skipped += 1;
                        continue;
                    };

                    loan.interest_amount += amount;
                    loan.interest_remaining += amount;
                    loan.interest_accrued_through = Some(today);
                    loan.updated_at = now;

                    match self.loans.update(&loan).await {
                        Ok(()) => {
                            summary.accrued += 1;
                            summary.interest_accrued += amount;
                            tracing::debug!(
                                loan_id = %loan.id,
                                loan_number = %loan.loan_number,
                                days,
                                amount,
                                "Interest accrued"
                            );
                        }
                        Err(e) => {
                            summary.failed += 1;
                            tracing::error!(
                                loan_id = %loan.id,
                                loan_number = %loan.loan_number,
                                operation = "accrue_interest",
                                error = %e,
                                "Failed to persist accrued interest"
                            );
                        }
                    }
                }

                if batch.data.is_empty() || !batch.has_more() {
                    break;
                }
                page += 1;
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            accrued = summary.accrued,
            failed = summary.failed,
            interest_accrued = summary.interest_accrued,
            "Daily interest accrual finished"
        );

        Ok(summary)
    }
}
