//! Background jobs driving the loan lifecycle

pub mod interest;
pub mod late_fee;
pub mod overdue;
mod registry;
pub mod reminders;
mod schedule;
mod scheduler;

pub use interest::{InterestAccrual, InterestRunSummary};
pub use late_fee::{LateFeeEngine, LateFeeRunSummary};
pub use overdue::{OverdueProcessor, OverdueRunSummary};
pub use registry::{
    register_engine_jobs, DailyInterestJob, DueReminderJob, EngineDeps, EngineSettings,
    LoanMaintenanceJob, OverdueEscalationJob, DAILY_INTEREST_JOB, DUE_REMINDER_JOB,
    LOAN_MAINTENANCE_JOB, OVERDUE_ESCALATION_JOB,
};
pub use reminders::{NotificationRunSummary, ReminderNotifier};
pub use schedule::Schedule;
pub use scheduler::{
    job_fn, FnJob, Job, JobContext, JobRunInfo, JobStatusBoard, ScheduledJob, Scheduler,
};
