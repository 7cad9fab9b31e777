//! In-memory stores and a recording sender for engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use pawnshop_server::clock::FixedClock;
use pawnshop_server::collateral::{ItemStatus, ItemStore};
use pawnshop_server::customer::{Customer, CustomerStore};
use pawnshop_server::error::{EngineError, EngineResult};
use pawnshop_server::loan::{Loan, LoanCursor, LoanFilter, LoanStatus, LoanStore, PaginatedResponse};
use pawnshop_server::notification::{CustomerNotification, NotificationSender, SendResult};

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

pub fn clock_at(now: DateTime<Utc>) -> Arc<FixedClock> {
    Arc::new(FixedClock::new(now))
}

/// Loan of 1000 at 10% interest and 2% daily late fee
pub fn loan(due_date: DateTime<Utc>, grace_period_days: i32, status: LoanStatus) -> Loan {
    let start = due_date - Duration::days(30);
    Loan {
        id: Uuid::new_v4(),
        loan_number: format!("LN-{}", &Uuid::new_v4().simple().to_string()[..6]),
        branch_id: 1,
        customer_id: Uuid::new_v4(),
        item_id: Uuid::new_v4(),
        loan_amount: 1000.0,
        interest_rate: 10.0,
        interest_amount: 100.0,
        late_fee_rate: 2.0,
        late_fee_amount: 0.0,
        late_fee_remaining: 0.0,
        principal_remaining: 1000.0,
        interest_remaining: 100.0,
        amount_paid: 0.0,
        start_date: start,
        due_date,
        grace_period_days,
        status,
        interest_accrued_through: None,
        created_at: start,
        updated_at: start,
    }
}

pub fn customer(id: Uuid, first_name: &str) -> Customer {
    Customer {
        id,
        first_name: first_name.to_string(),
        last_name: "Diaz".to_string(),
        phone: Some("+15550100".to_string()),
        email: None,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct MemoryLoanStore {
    loans: Mutex<HashMap<Uuid, Loan>>,
    status_writes: Mutex<Vec<(Uuid, LoanStatus)>>,
    pub fail_reads: AtomicBool,
    fail_status_for: Mutex<HashSet<Uuid>>,
    fail_update_for: Mutex<HashSet<Uuid>>,
    paid_before_write: Mutex<HashSet<Uuid>>,
    overdue_page_size: Option<usize>,
    overdue_reads: AtomicUsize,
}

impl MemoryLoanStore {
    pub fn with_loans(loans: impl IntoIterator<Item = Loan>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.loans.lock().unwrap();
            for loan in loans {
                map.insert(loan.id, loan);
            }
        }
        Arc::new(store)
    }

    /// Like `with_loans`, but overdue reads return at most `page_size` rows like the SQL `LIMIT`
    pub fn paged(loans: impl IntoIterator<Item = Loan>, page_size: usize) -> Arc<Self> {
        let store = Self {
            overdue_page_size: Some(page_size),
            ..Self::default()
        };
        {
            let mut map = store.loans.lock().unwrap();
            for loan in loans {
                map.insert(loan.id, loan);
            }
        }
        Arc::new(store)
    }

    pub fn get(&self, id: Uuid) -> Loan {
        self.loans.lock().unwrap().get(&id).cloned().expect("loan exists")
    }

    pub fn status_writes(&self) -> Vec<(Uuid, LoanStatus)> {
        self.status_writes.lock().unwrap().clone()
    }

    pub fn fail_status_update(&self, id: Uuid) {
        self.fail_status_for.lock().unwrap().insert(id);
    }

    pub fn fail_update(&self, id: Uuid) {
        self.fail_update_for.lock().unwrap().insert(id);
    }

    /// Simulate a payment landing between the engine's read and its status write
    pub fn pay_before_write(&self, id: Uuid) {
        self.paid_before_write.lock().unwrap().insert(id);
    }

    pub fn overdue_reads(&self) -> usize {
        self.overdue_reads.load(Ordering::SeqCst)
    }

    fn sorted(&self) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self.loans.lock().unwrap().values().cloned().collect();
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        loans
    }
}

#[async_trait]
impl LoanStore for MemoryLoanStore {
    async fn get_overdue_loans(
        &self,
        branch_id: i64,
        as_of: DateTime<Utc>,
        after: Option<LoanCursor>,
    ) -> EngineResult<Vec<Loan>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(EngineError::DatabaseError("connection refused".to_string()));
        }
        self.overdue_reads.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .sorted()
            .into_iter()
            .filter(|l| matches!(l.status, LoanStatus::Active | LoanStatus::Overdue))
            .filter(|l| l.due_date < as_of)
            .filter(|l| branch_id == 0 || l.branch_id == branch_id)
            .filter(|l| after.map_or(true, |c| (l.due_date, l.id) > (c.due_date, c.id)))
            .take(self.overdue_page_size.unwrap_or(usize::MAX))
            .collect())
    }

    async fn list(&self, filter: &LoanFilter) -> EngineResult<PaginatedResponse<Loan>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(EngineError::DatabaseError("connection refused".to_string()));
        }

        let matching: Vec<Loan> = self
            .sorted()
            .into_iter()
            .filter(|l| filter.status.map_or(true, |s| l.status == s))
            .filter(|l| filter.branch_id.map_or(true, |b| l.branch_id == b))
            .filter(|l| filter.customer_id.map_or(true, |c| l.customer_id == c))
            .collect();

        let page = filter.page.unwrap_or(1).max(1);
        let limit = filter.limit.unwrap_or(100).max(1);
        let data = matching
            .iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(PaginatedResponse {
            data,
            total: matching.len() as i64,
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
        if self.fail_status_for.lock().unwrap().contains(&loan_id) {
            return Err(EngineError::DatabaseError("write timed out".to_string()));
        }

        let mut loans = self.loans.lock().unwrap();
        let Some(loan) = loans.get_mut(&loan_id) else {
            return Ok(false);
        };
        if self.paid_before_write.lock().unwrap().remove(&loan_id) {
            loan.status = LoanStatus::Paid;
        }
        if loan.status != from {
            return Ok(false);
        }
        loan.status = to;
        loan.updated_at = at;
        self.status_writes.lock().unwrap().push((loan_id, to));
        Ok(true)
    }

    async fn update(&self, loan: &Loan) -> EngineResult<()> {
        if self.fail_update_for.lock().unwrap().contains(&loan.id) {
            return Err(EngineError::DatabaseError("write timed out".to_string()));
        }

        let mut loans = self.loans.lock().unwrap();
        let stored = loans
            .get_mut(&loan.id)
            .ok_or_else(|| EngineError::NotFound(format!("Loan {} not found", loan.id)))?;
        stored.interest_amount = loan.interest_amount;
        stored.interest_remaining = loan.interest_remaining;
        stored.late_fee_amount = loan.late_fee_amount;
        stored.late_fee_remaining = loan.late_fee_remaining;
        stored.interest_accrued_through = loan.interest_accrued_through;
        stored.updated_at = loan.updated_at;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryItemStore {
    statuses: Mutex<HashMap<Uuid, (ItemStatus, DateTime<Utc>)>>,
    pub fail: AtomicBool,
}

impl MemoryItemStore {
    pub fn status(&self, item_id: Uuid) -> Option<ItemStatus> {
        self.statuses.lock().unwrap().get(&item_id).map(|(s, _)| *s)
    }

    pub fn updated_at(&self, item_id: Uuid) -> Option<DateTime<Utc>> {
        self.statuses.lock().unwrap().get(&item_id).map(|(_, at)| *at)
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn update_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::DatabaseError("items table locked".to_string()));
        }
        self.statuses.lock().unwrap().insert(item_id, (status, at));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCustomerStore {
    customers: Mutex<HashMap<Uuid, Customer>>,
}

impl MemoryCustomerStore {
    /// One customer per loan, named after its loan number
    pub fn for_loans<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.customers.lock().unwrap();
            for loan in loans {
                map.insert(loan.customer_id, customer(loan.customer_id, "Ana"));
            }
        }
        Arc::new(store)
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomerStore {
    async fn get_by_id(&self, customer_id: Uuid) -> EngineResult<Customer> {
        self.customers
            .lock()
            .unwrap()
            .get(&customer_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("Customer {} not found", customer_id)))
    }
}

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<CustomerNotification>>,
    pub fail: AtomicBool,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<CustomerNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send_to_customer(&self, notification: &CustomerNotification) -> EngineResult<SendResult> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::ExternalServiceError(
                "Notification service returned 503: unavailable".to_string(),
            ));
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(notification.clone());
        Ok(SendResult {
            notification_id: format!("ntf-{}", sent.len()),
            status: "queued".to_string(),
        })
    }
}
