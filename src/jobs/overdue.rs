//! Overdue & confiscation processor
//!
//! Walks every non-terminal loan whose due date has passed and applies the
//! lifecycle transitions. A loan that becomes overdue in this pass can be
//! confiscated in the same pass only when its grace period already ended.
//!
//! Confiscation is two writes: the loan status (authoritative) and then the
//! item status. If the item write fails the loan stays confiscated and the item
//! keeps its old status until it is reconciled; that window is visible in the
//! run summary as `item_update_failures`.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::JobContext;
use crate::clock::Clock;
use crate::collateral::{ItemStatus, ItemStore};
use crate::error::EngineResult;
use crate::loan::{state, Loan, LoanCursor, LoanStore, Transition};

/// Counters for one processor run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverdueRunSummary {
    pub scanned: u32,
    pub marked_overdue: u32,
    pub confiscated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub item_update_failures: u32,
    pub cancelled: bool,
}

pub struct OverdueProcessor {
    loans: Arc<dyn LoanStore>,
    items: Arc<dyn ItemStore>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    branch_id: i64,
}

impl OverdueProcessor {
    pub fn new(
        loans: Arc<dyn LoanStore>,
        items: Arc<dyn ItemStore>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        branch_id: i64,
    ) -> Self {
        Self {
            loans,
            items,
            clock,
            offset,
            branch_id,
        }
    }

    /// Re-evaluate every past-due loan, page by page. Fails only when a page cannot be read.
    pub async fn process_overdue_loans(&self, ctx: &JobContext) -> EngineResult<OverdueRunSummary> {
        let now = self.clock.now();
        let mut summary = OverdueRunSummary::default();
        let mut cursor = None;

        'pages: loop {
            let page = self
                .loans
                .get_overdue_loans(self.branch_id, now, cursor)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(LoanCursor::after(last));

            for loan in &page {
                if ctx.is_cancelled() {
                    tracing::warn!(job = ctx.job_name(), "Shutdown requested, abandoning overdue batch");
                    summary.cancelled = true;
                    break 'pages;
                }

                summary.scanned += 1;
                self.process_loan(loan, now, &mut summary).await;
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            marked_overdue = summary.marked_overdue,
            confiscated = summary.confiscated,
            skipped = summary.skipped,
            failed = summary.failed,
            item_update_failures = summary.item_update_failures,
            "Overdue processing finished"
        );

        Ok(summary)
    }

    async fn process_loan(
        &self,
        loan: &Loan,
        now: DateTime<Utc>,
        summary: &mut OverdueRunSummary,
    ) {
        if loan.status.is_terminal() {
            summary.skipped += 1;
            return;
        }

        let mut status = loan.status;
        let mut changed = false;

        while let Some(transition) =
            state::next_transition(status, loan.due_date, loan.grace_period_days, now, self.offset)
        {
            let target = transition.target();
            if !state::can_transition(status, target) {
                tracing::warn!(
                    loan_id = %loan.id,
                    loan_number = %loan.loan_number,
                    from = %status,
                    to = %target,
                    "Refusing illegal status change"
                );
                break;
            }

            match self.loans.update_status(loan.id, status, target, now).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::info!(
                        loan_id = %loan.id,
                        loan_number = %loan.loan_number,
                        expected = %status,
                        to = %target,
                        "Loan status changed since it was read, leaving it"
                    );
                    if !changed {
                        summary.skipped += 1;
                    }
                    return;
                }
                Err(e) => {
                    tracing::error!(
                        loan_id = %loan.id,
                        loan_number = %loan.loan_number,
                        operation = "update_status",
                        to = %target,
                        error = %e,
                        "Failed to persist loan status"
                    );
                    summary.failed += 1;
                    return;
                }
            }

            status = target;
            changed = true;

            match transition {
                Transition::MarkOverdue => {
                    summary.marked_overdue += 1;
                    tracing::info!(
                        loan_id = %loan.id,
                        loan_number = %loan.loan_number,
                        due_date = %loan.due_date,
                        "Loan marked overdue"
                    );
                }
                Transition::Confiscate => {
                    summary.confiscated += 1;
                    tracing::info!(
                        loan_id = %loan.id,
                        loan_number = %loan.loan_number,
                        grace_period_days = loan.grace_period_days,
                        "Loan confiscated"
                    );
                    self.release_collateral(loan, now, summary).await;
                }
            }
        }

        if !changed {
            summary.skipped += 1;
        }
    }

    /// Best-effort follow-up: move the collateral into sellable inventory
    async fn release_collateral(
        &self,
        loan: &Loan,
        now: DateTime<Utc>,
        summary: &mut OverdueRunSummary,
    ) {
        if let Err(e) = self
            .items
            .update_status(loan.item_id, ItemStatus::ForSale, now)
            .await
        {
            summary.item_update_failures += 1;
            tracing::error!(
                loan_id = %loan.id,
                loan_number = %loan.loan_number,
                item_id = %loan.item_id,
                operation = "item_update_status",
                error = %e,
                "Loan confiscated but item status not updated, needs reconciliation"
            );
            return;
        }

        tracing::info!(
            loan_id = %loan.id,
            item_id = %loan.item_id,
            status = ItemStatus::ForSale.as_str(),
            "Collateral moved to sale inventory"
        );
    }
}
