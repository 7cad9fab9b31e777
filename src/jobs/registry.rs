//! Wiring of the loan processors into scheduled jobs

use async_trait::async_trait;
use chrono::FixedOffset;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    InterestAccrual, Job, JobContext, LateFeeEngine, OverdueProcessor, ReminderNotifier, Scheduler,
};
use crate::clock::Clock;
use crate::collateral::ItemStore;
use crate::config::{Config, JobsConfig};
use crate::customer::CustomerStore;
use crate::error::EngineResult;
use crate::loan::LoanStore;
use crate::notification::{NotificationChannel, NotificationSender};

pub const LOAN_MAINTENANCE_JOB: &str = "loan-maintenance";
pub const DUE_REMINDER_JOB: &str = "due-date-reminders";
pub const OVERDUE_ESCALATION_JOB: &str = "overdue-escalation";
pub const DAILY_INTEREST_JOB: &str = "daily-interest";

/// Collaborators shared by every processor
#[derive(Clone)]
pub struct EngineDeps {
    pub loans: Arc<dyn LoanStore>,
    pub items: Arc<dyn ItemStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub sender: Arc<dyn NotificationSender>,
    pub clock: Arc<dyn Clock>,
}

/// Processor settings taken from [`Config`]
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub branch_id: i64,
    pub page_size: i64,
    pub offset: FixedOffset,
    pub channel: NotificationChannel,
    pub jobs: JobsConfig,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            branch_id: config.branch_id,
            page_size: config.loan_page_size,
            offset: config.business_utc_offset,
            channel: config.notification_channel,
            jobs: config.jobs.clone(),
        }
    }
}

/// Overdue/confiscation pass, then late fees, under the ledger lock.
///
/// Fees only accrue on loans already marked overdue, so running both passes in
/// this order keeps a freshly overdue loan from waiting a full cycle for its fee.
pub struct LoanMaintenanceJob {
    overdue: OverdueProcessor,
    late_fees: LateFeeEngine,
    ledger: Arc<Mutex<()>>,
}

#[async_trait]
impl Job for LoanMaintenanceJob {
    async fn run(&self, ctx: JobContext) -> EngineResult<Value> {
        let _guard = self.ledger.lock().await;

        let overdue = self.overdue.process_overdue_loans(&ctx).await;
        if let Err(e) = &overdue {
            tracing::error!(job = ctx.job_name(), error = %e, "Overdue pass aborted, loan list unavailable");
        }

        if ctx.is_cancelled() {
            let overdue = overdue?;
            return Ok(json!({ "overdue": overdue, "late_fees": null }));
        }

        let late_fees = self.late_fees.calculate_late_fees(&ctx).await;

        match (overdue, late_fees) {
            (Ok(overdue), Ok(late_fees)) => Ok(json!({ "overdue": overdue, "late_fees": late_fees })),
            (Err(e), Ok(late_fees)) => {
                tracing::info!(job = ctx.job_name(), late_fees = ?late_fees, "Late fees applied despite overdue pass failure");
                Err(e)
            }
            (_, Err(e)) => Err(e),
        }
    }
}

pub struct DueReminderJob {
    notifier: Arc<ReminderNotifier>,
}

#[async_trait]
impl Job for DueReminderJob {
    async fn run(&self, ctx: JobContext) -> EngineResult<Value> {
        let summary = self.notifier.send_due_reminders(&ctx).await?;
        Ok(json!(summary))
    }
}

pub struct OverdueEscalationJob {
    notifier: Arc<ReminderNotifier>,
}

#[async_trait]
impl Job for OverdueEscalationJob {
    async fn run(&self, ctx: JobContext) -> EngineResult<Value> {
        let summary = self.notifier.send_overdue_escalations(&ctx).await?;
        Ok(json!(summary))
    }
}

/// Shares the ledger lock with maintenance: both rewrite the loan's money fields
pub struct DailyInterestJob {
    accrual: InterestAccrual,
    ledger: Arc<Mutex<()>>,
}

#[async_trait]
impl Job for DailyInterestJob {
    async fn run(&self, ctx: JobContext) -> EngineResult<Value> {
        let _guard = self.ledger.lock().await;
        let summary = self.accrual.accrue_daily_interest(&ctx).await?;
        Ok(json!(summary))
    }
}

/// Register the four engine jobs on `scheduler`
pub async fn register_engine_jobs(
    scheduler: &mut Scheduler,
    deps: &EngineDeps,
    settings: &EngineSettings,
) -> EngineResult<()> {
    let ledger = Arc::new(Mutex::new(()));

    let maintenance = LoanMaintenanceJob {
        overdue: OverdueProcessor::new(
            deps.loans.clone(),
            deps.items.clone(),
            deps.clock.clone(),
            settings.offset,
            settings.branch_id,
        ),
        late_fees: LateFeeEngine::new(
            deps.loans.clone(),
            deps.clock.clone(),
            settings.branch_id,
            settings.page_size,
        ),
        ledger: ledger.clone(),
    };

    let notifier = Arc::new(ReminderNotifier::new(
        deps.loans.clone(),
        deps.customers.clone(),
        deps.sender.clone(),
        deps.clock.clone(),
        settings.channel,
        settings.branch_id,
        settings.page_size,
    ));

    let interest = DailyInterestJob {
        accrual: InterestAccrual::new(
            deps.loans.clone(),
            deps.clock.clone(),
            settings.offset,
            settings.branch_id,
            settings.page_size,
        ),
        ledger,
    };

    let jobs = &settings.jobs;
    scheduler
        .register(
            LOAN_MAINTENANCE_JOB,
            jobs.loan_maintenance_schedule,
            Arc::new(maintenance),
            true,
        )
        .await?;
    scheduler
        .register(
            DUE_REMINDER_JOB,
            jobs.reminder_schedule,
            Arc::new(DueReminderJob {
                notifier: notifier.clone(),
            }),
            jobs.reminders_enabled,
        )
        .await?;
    scheduler
        .register(
            OVERDUE_ESCALATION_JOB,
            jobs.overdue_escalation_schedule,
            Arc::new(OverdueEscalationJob { notifier }),
            jobs.reminders_enabled,
        )
        .await?;
    scheduler
        .register(
            DAILY_INTEREST_JOB,
            jobs.daily_interest_schedule,
            Arc::new(interest),
            jobs.daily_interest_enabled,
        )
        .await?;

    Ok(())
}
