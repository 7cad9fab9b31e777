//! Reminder and escalation notifications

mod common;

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use pawnshop_server::jobs::{JobContext, ReminderNotifier};
    use pawnshop_server::loan::{Loan, LoanStatus};
    use pawnshop_server::notification::{NotificationChannel, NotificationType, ReferenceType};

    use crate::common::*;

    fn notifier(
        loans: Vec<Loan>,
        now: DateTime<Utc>,
    ) -> (ReminderNotifier, Arc<RecordingSender>) {
        let customers = MemoryCustomerStore::for_loans(&loans);
        let sender = Arc::new(RecordingSender::default());
        let notifier = ReminderNotifier::new(
            MemoryLoanStore::with_loans(loans),
            customers,
            sender.clone(),
            clock_at(now),
            NotificationChannel::Sms,
            0,
            50,
        );
        (notifier, sender)
    }

    fn ctx() -> JobContext {
        JobContext::background("due-date-reminders")
    }

    #[tokio::test]
    async fn test_reminders_only_on_one_three_and_seven_days() {
        let now = at(2026, 4, 1, 8, 0, 0);
        let loans: Vec<Loan> = [1, 2, 3, 5, 7, 8]
            .into_iter()
            .map(|d| loan(now + Duration::days(d) + Duration::hours(1), 5, LoanStatus::Active))
            .collect();
        let expected: Vec<_> = [0, 2, 4].iter().map(|&i| loans[i].id).collect();

        let (notifier, sender) = notifier(loans, now);
        let summary = notifier.send_due_reminders(&ctx()).await.unwrap();

        let mut reminded: Vec<_> = sender.sent().iter().map(|n| n.reference_id).collect();
        reminded.sort();
        let mut expected = expected;
        expected.sort();
        assert_eq!(reminded, expected);
        assert_eq!(summary.sent, 3);
        assert_eq!(summary.skipped, 3);
    }

    #[tokio::test]
    async fn test_reminder_payload() {
        let now = at(2026, 4, 1, 8, 0, 0);
        let l = loan(now + Duration::days(3) + Duration::hours(2), 5, LoanStatus::Active);
        let (loan_id, customer_id, number) = (l.id, l.customer_id, l.loan_number.clone());

        let (notifier, sender) = notifier(vec![l], now);
        notifier.send_due_reminders(&ctx()).await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        let n = &sent[0];
        assert_eq!(n.customer_id, customer_id);
        assert_eq!(n.notification_type, NotificationType::PaymentReminder);
        assert_eq!(n.channel, NotificationChannel::Sms);
        assert_eq!(n.reference_type, ReferenceType::Loan);
        assert_eq!(n.reference_id, loan_id);
        assert!(n.message.contains(&number));
        assert!(n.message.contains("in 3 days"));
    }

    #[tokio::test]
    async fn test_overdue_loans_get_no_due_reminder() {
        let now = at(2026, 4, 1, 8, 0, 0);
        let l = loan(now + Duration::days(3) + Duration::hours(2), 5, LoanStatus::Overdue);

        let (notifier, sender) = notifier(vec![l], now);
        notifier.send_due_reminders(&ctx()).await.unwrap();

        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_escalation_inside_grace_window_is_a_warning() {
        let now = at(2026, 4, 10, 8, 0, 0);
        let l = loan(now - Duration::days(2) - Duration::hours(1), 7, LoanStatus::Overdue);

        let (notifier, sender) = notifier(vec![l], now);
        let summary = notifier.send_overdue_escalations(&ctx()).await.unwrap();

        let sent = sender.sent();
        assert_eq!(summary.sent, 1);
        assert_eq!(sent[0].notification_type, NotificationType::OverdueWarning);
        assert!(sent[0].message.contains("2 day(s) overdue"));
        assert!(sent[0].message.contains("4 day(s) left"));
    }

    #[tokio::test]
    async fn test_escalation_on_last_grace_day_is_urgent() {
        let now = at(2026, 4, 10, 8, 0, 0);
        let l = loan(now - Duration::days(3) - Duration::hours(1), 3, LoanStatus::Overdue);

        let (notifier, sender) = notifier(vec![l], now);
        notifier.send_overdue_escalations(&ctx()).await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent[0].notification_type, NotificationType::ConfiscationWarning);
        assert!(sent[0].message.starts_with("URGENT"));
    }

    #[tokio::test]
    async fn test_escalation_ignores_active_loans() {
        let now = at(2026, 4, 10, 8, 0, 0);
        let l = loan(now - Duration::days(2), 3, LoanStatus::Active);

        let (notifier, sender) = notifier(vec![l], now);
        notifier.send_overdue_escalations(&ctx()).await.unwrap();

        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_customer_is_skipped() {
        let now = at(2026, 4, 1, 8, 0, 0);
        let known = loan(now + Duration::days(1) + Duration::hours(1), 5, LoanStatus::Active);
        let orphan = loan(now + Duration::days(1) + Duration::hours(1), 5, LoanStatus::Active);
        let known_id = known.id;

        let customers = MemoryCustomerStore::for_loans([&known]);
        let sender = Arc::new(RecordingSender::default());
        let notifier = ReminderNotifier::new(
            MemoryLoanStore::with_loans([known, orphan]),
            customers,
            sender.clone(),
            clock_at(now),
            NotificationChannel::Email,
            0,
            50,
        );

        let summary = notifier.send_due_reminders(&ctx()).await.unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(sender.sent()[0].reference_id, known_id);
    }

    #[tokio::test]
    async fn test_send_failure_is_counted_not_fatal() {
        let now = at(2026, 4, 10, 8, 0, 0);
        let loans = vec![
            loan(now - Duration::days(2), 7, LoanStatus::Overdue),
            loan(now - Duration::days(1), 7, LoanStatus::Overdue),
        ];

        let (notifier, sender) = notifier(loans, now);
        sender.fail.store(true, Ordering::SeqCst);

        let summary = notifier.send_overdue_escalations(&ctx()).await.unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.sent, 0);
    }
}
