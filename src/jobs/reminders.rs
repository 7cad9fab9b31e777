//! Due-date reminders and overdue escalation
//!
//! Reminders fire only when a loan is exactly 1, 3 or 7 whole days from its due
//! date. A job cadence slower than daily can miss a window and one faster than
//! daily can repeat it; deduplication is left to the notification service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::JobContext;
use crate::clock::Clock;
use crate::customer::{Customer, CustomerStore};
use crate::error::EngineResult;
use crate::loan::{state, Loan, LoanFilter, LoanStatus, LoanStore};
use crate::notification::{
    CustomerNotification, NotificationChannel, NotificationSender, NotificationType, ReferenceType,
};

/// Days before the due date that trigger a reminder
pub const REMINDER_DAYS: [i64; 3] = [1, 3, 7];

pub fn is_reminder_day(days_until_due: i64) -> bool {
    REMINDER_DAYS.contains(&days_until_due)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationRunSummary {
    pub scanned: u32,
    pub sent: u32,
    pub skipped: u32,
    pub failed: u32,
    pub cancelled: bool,
}

pub struct ReminderNotifier {
    loans: Arc<dyn LoanStore>,
    customers: Arc<dyn CustomerStore>,
    sender: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    channel: NotificationChannel,
    branch_id: i64,
    page_size: i64,
}

impl ReminderNotifier {
    pub fn new(
        loans: Arc<dyn LoanStore>,
        customers: Arc<dyn CustomerStore>,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        channel: NotificationChannel,
        branch_id: i64,
        page_size: i64,
    ) -> Self {
        Self {
            loans,
            customers,
            sender,
            clock,
            channel,
            branch_id,
            page_size: page_size.max(1),
        }
    }

    /// Remind customers of active loans due in exactly 1, 3 or 7 days
    pub async fn send_due_reminders(&self, ctx: &JobContext) -> EngineResult<NotificationRunSummary> {
        let now = self.clock.now();
        let summary = self
            .for_each_loan(
                ctx,
                LoanStatus::Active,
                |loan| {
                    let days = state::days_until_due(loan.due_date, now);
                    is_reminder_day(days).then_some(days)
                },
                |loan, customer, days| self.reminder(loan, customer, days),
            )
            .await?;

        tracing::info!(
            scanned = summary.scanned,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "Due-date reminders finished"
        );
        Ok(summary)
    }

    /// Warn customers of overdue loans, urgently once the grace period is used up
    pub async fn send_overdue_escalations(
        &self,
        ctx: &JobContext,
    ) -> EngineResult<NotificationRunSummary> {
        let now = self.clock.now();
        let summary = self
            .for_each_loan(
                ctx,
                LoanStatus::Overdue,
                |_| Some(now),
                |loan, customer, now| self.escalation(loan, customer, now),
            )
            .await?;

        tracing::info!(
            scanned = summary.scanned,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "Overdue escalations finished"
        );
        Ok(summary)
    }

    /// Pages through loans in `status`; `select` picks the ones to notify and
    /// `compose` builds the message once the customer is resolved
    async fn for_each_loan<T, S, C>(
        &self,
        ctx: &JobContext,
        status: LoanStatus,
        select: S,
        compose: C,
    ) -> EngineResult<NotificationRunSummary>
    where
        S: Fn(&Loan) -> Option<T>,
        C: Fn(&Loan, &Customer, T) -> CustomerNotification,
    {
        let mut summary = NotificationRunSummary::default();
        let mut page = 1;

        'pages: loop {
            let filter = LoanFilter::with_status(status)
                .branch(self.branch_id)
                .page(page, self.page_size);
            let batch = self.loans.list(&filter).await?;

            for loan in &batch.data {
                if ctx.is_cancelled() {
                    tracing::warn!(job = ctx.job_name(), "Shutdown requested, abandoning notification batch");
                    summary.cancelled = true;
                    break 'pages;
                }
                summary.scanned += 1;

                if loan.status != status {
                    summary.skipped += 1;
                    continue;
                }
                let Some(selected) = select(loan) else {
                    summary.skipped += 1;
                    continue;
                };

                let customer = match self.customers.get_by_id(loan.customer_id).await {
                    Ok(customer) => customer,
                    Err(e) => {
                        summary.skipped += 1;
                        tracing::warn!(
                            loan_id = %loan.id,
                            loan_number = %loan.loan_number,
                            customer_id = %loan.customer_id,
                            error = %e,
                            "Customer not resolvable, skipping notification"
                        );
                        continue;
                    }
                };

                let notification = compose(loan, &customer, selected);
                match self.sender.send_to_customer(&notification).await {
                    Ok(result) => {
                        summary.sent += 1;
                        tracing::info!(
                            loan_id = %loan.id,
                            loan_number = %loan.loan_number,
                            notification_id = %result.notification_id,
                            kind = ?notification.notification_type,
                            "Notification sent"
                        );
                    }
                    Err(e) => {
                        summary.failed += 1;
                        tracing::error!(
                            loan_id = %loan.id,
                            loan_number = %loan.loan_number,
                            operation = "send_to_customer",
                            kind = ?notification.notification_type,
                            error = %e,
                            "Failed to send notification"
                        );
                    }
                }
            }

            if batch.data.is_empty() || !batch.has_more() {
                break;
            }
            page += 1;
        }

        Ok(summary)
    }

    fn reminder(&self, loan: &Loan, customer: &Customer, days_until_due: i64) -> CustomerNotification {
        let when = if days_until_due == 1 {
            "tomorrow".to_string()
        } else {
            format!("in {} days", days_until_due)
        };

        CustomerNotification {
            customer_id: customer.id,
            notification_type: NotificationType::PaymentReminder,
            title: "Payment reminder".to_string(),
            message: format!(
                "Hello {}, your loan {} is due {} ({}). Amount due: {:.2}.",
                customer.full_name(),
                loan.loan_number,
                when,
                loan.due_date.format("%Y-%m-%d"),
                loan.total_owed()
            ),
            channel: self.channel,
            reference_type: ReferenceType::Loan,
            reference_id: loan.id,
        }
    }

    fn escalation(&self, loan: &Loan, customer: &Customer, now: DateTime<Utc>) -> CustomerNotification {
        let days_overdue = state::days_overdue(loan.due_date, now);
        let days_left = state::days_until_confiscation(loan.due_date, loan.grace_period_days, now);

        let (notification_type, title, message) = if days_left > 0 {
            (
                NotificationType::OverdueWarning,
                "Loan overdue".to_string(),
                format!(
                    "Hello {}, your loan {} is {} day(s) overdue. You have {} day(s) left to pay {:.2} before your item is moved to sale.",
                    customer.full_name(),
                    loan.loan_number,
                    days_overdue,
                    days_left,
                    loan.total_owed()
                ),
            )
        } else {
            (
                NotificationType::ConfiscationWarning,
                "Final notice: item confiscation today".to_string(),
                format!(
                    "URGENT {}: your loan {} is {} day(s) overdue and its grace period ends today. Pay {:.2} today or your item will be moved to sale.",
                    customer.full_name(),
                    loan.loan_number,
                    days_overdue,
                    loan.total_owed()
                ),
            )
        };

        CustomerNotification {
            customer_id: customer.id,
            notification_type,
            title,
            message,
            channel: self.channel,
            reference_type: ReferenceType::Loan,
            reference_id: loan.id,
        }
    }
}
