//! Loan lifecycle state machine
//!
//! Pure decision functions shared by every processor. A loan moves forward
//! through `active -> overdue -> confiscated`, and can leave that chain through
//! `paid` or `renewed` before confiscation. `paid` and `confiscated` are terminal:
//! no processor touches a loan in either state.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

use super::model::LoanStatus;

/// Status change the engine may apply on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    MarkOverdue,
    Confiscate,
}

impl Transition {
    pub fn target(&self) -> LoanStatus {
        match self {
            Transition::MarkOverdue => LoanStatus::Overdue,
            Transition::Confiscate => LoanStatus::Confiscated,
        }
    }
}

impl LoanStatus {
    /// Terminal for this engine: never re-evaluated, never accrues fees
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Paid | LoanStatus::Confiscated)
    }
}

/// Whether `from -> to` is a legal status change
pub fn can_transition(from: LoanStatus, to: LoanStatus) -> bool {
    use LoanStatus::*;

    matches!(
        (from, to),
        (Active, Overdue)
            | (Active, Paid)
            | (Active, Renewed)
            | (Overdue, Confiscated)
            | (Overdue, Paid)
            | (Overdue, Renewed)
    )
}

/// Last instant of the grace period: local 23:59:59 on `due_date + grace_period_days`
pub fn grace_period_end(
    due_date: DateTime<Utc>,
    grace_period_days: i32,
    offset: FixedOffset,
) -> DateTime<Utc> {
    let local_due = due_date.with_timezone(&offset).date_naive();
    let last_day = local_due + Duration::days(i64::from(grace_period_days.max(0)));
    let end_of_day = last_day.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN));

    // A fixed offset has exactly one mapping for every local time
    match offset.from_local_datetime(&end_of_day).single() {
        Some(local) => local.with_timezone(&Utc),
        None => end_of_day.and_utc() - Duration::seconds(i64::from(offset.local_minus_utc())),
    }
}

/// `active -> overdue` once the due date has passed
pub fn should_mark_overdue(status: LoanStatus, due_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    status == LoanStatus::Active && now > due_date
}

/// `overdue -> confiscated` once the end-of-day grace boundary is reached.
///
/// Never applies to an `active` loan, so the overdue state is always recorded first.
pub fn should_confiscate(
    status: LoanStatus,
    due_date: DateTime<Utc>,
    grace_period_days: i32,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> bool {
    status == LoanStatus::Overdue && now >= grace_period_end(due_date, grace_period_days, offset)
}

/// Next transition for a loan in `status`, if any
pub fn next_transition(
    status: LoanStatus,
    due_date: DateTime<Utc>,
    grace_period_days: i32,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Option<Transition> {
    if status.is_terminal() {
        return None;
    }

    if should_mark_overdue(status, due_date, now) {
        return Some(Transition::MarkOverdue);
    }

    if should_confiscate(status, due_date, grace_period_days, now, offset) {
        return Some(Transition::Confiscate);
    }

    None
}

/// Whole days elapsed since the due date (0 or negative before it)
pub fn days_overdue(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - due_date).num_days()
}

/// Whole days left until the due date
pub fn days_until_due(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (due_date - now).num_days()
}

/// Whole days left until `due_date + grace_period_days`
pub fn days_until_confiscation(
    due_date: DateTime<Utc>,
    grace_period_days: i32,
    now: DateTime<Utc>,
) -> i64 {
    (due_date + Duration::days(i64::from(grace_period_days)) - now).num_days()
}
