#![allow(dead_code)]

use async_trait::async_trait;
use barakah_ledger::ledger::model::{NewFundingRequest, NewTransaction, RequestUpdate};
use barakah_ledger::ledger::{
    BusinessProfile, FundingRequest, NewBusiness, RequestStatus, RetryPolicy, StoreError,
    Transaction, TransactionStatus, TransactionType, UserProfile,
};
use barakah_ledger::store::{LedgerStore, LedgerTxn, MemoryStore, RequestFilter, TransactionFilter};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

pub const BORROWER: &str = "borrower-1";

/// Retry budget small enough to keep conflict tests fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        max_elapsed: Duration::from_millis(150),
    }
}

pub fn dollars(amount: i64) -> Decimal {
    Decimal::from(amount)
}

pub fn request_fixture(goal: i64, raised: i64, status: RequestStatus) -> FundingRequest {
    FundingRequest {
        id: Uuid::new_v4(),
        business_id: Uuid::new_v4(),
        owner_id: BORROWER.to_string(),
        display_name: "Yusuf's Eid Bakery".to_string(),
        breakdown: None,
        funding_goal: dollars(goal),
        raised: dollars(raised),
        repaid: Decimal::ZERO,
        status,
        created_at: Utc::now(),
        deadline: None,
        funded_at: None,
    }
}

pub fn transaction_fixture(
    request_id: Uuid,
    kind: TransactionType,
    amount: i64,
    contributor: Option<&str>,
    at: DateTime<Utc>,
) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        funding_request_id: request_id,
        amount: dollars(amount),
        kind,
        contributor_id: contributor.map(str::to_string),
        borrower_id: Some(BORROWER.to_string()),
        status: TransactionStatus::Completed,
        created_at: at,
    }
}

/// Switches for [`FaultyStore`].
#[derive(Default)]
pub struct Faults {
    pub fail_update: bool,
    pub fail_insert: bool,
    pub fail_commit: bool,
    pub fail_name_lookup: bool,
    /// Commits rejected as conflicts before one is let through; `u32::MAX` means always.
    pub conflicts: AtomicU32,
    pub begins: AtomicU32,
}

impl Faults {
    pub fn begins(&self) -> u32 {
        self.begins.load(Ordering::SeqCst)
    }
}

/// Wraps a [`MemoryStore`] and fails chosen steps of the write path.
#[derive(Clone)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub faults: Arc<Faults>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore, faults: Faults) -> Self {
        Self { inner, faults: Arc::new(faults) }
    }
}

fn injected() -> StoreError {
    StoreError::Unavailable("injected failure".to_string())
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTxn>, StoreError> {
        self.faults.begins.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.begin().await?;
        Ok(Box::new(FaultyTxn { inner, faults: self.faults.clone() }))
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<FundingRequest>, StoreError> {
        self.inner.get_request(id).await
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<FundingRequest>, StoreError> {
        self.inner.list_requests(filter).await
    }

    async fn insert_request(&self, request: NewFundingRequest) -> Result<FundingRequest, StoreError> {
        self.inner.insert_request(request).await
    }

    async fn get_business(&self, id: Uuid) -> Result<Option<BusinessProfile>, StoreError> {
        self.inner.get_business(id).await
    }

    async fn list_businesses(&self, owner_id: &str) -> Result<Vec<BusinessProfile>, StoreError> {
        self.inner.list_businesses(owner_id).await
    }

    async fn insert_business(&self, business: NewBusiness) -> Result<BusinessProfile, StoreError> {
        self.inner.insert_business(business).await
    }

    async fn user_display_name(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        if self.faults.fail_name_lookup {
            return Err(injected());
        }
        self.inner.user_display_name(user_id).await
    }

    async fn upsert_user(&self, user: UserProfile) -> Result<(), StoreError> {
        self.inner.upsert_user(user).await
    }

    async fn query_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        self.inner.query_transactions(filter).await
    }
}

struct FaultyTxn {
    inner: Box<dyn LedgerTxn>,
    faults: Arc<Faults>,
}

#[async_trait]
impl LedgerTxn for FaultyTxn {
    async fn read_request_for_update(&mut self, id: Uuid) -> Result<Option<FundingRequest>, StoreError> {
        self.inner.read_request_for_update(id).await
    }

    async fn update_request(&mut self, update: RequestUpdate) -> Result<(), StoreError> {
        if self.faults.fail_update {
            return Err(injected());
        }
        self.inner.update_request(update).await
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction, StoreError> {
        if self.faults.fail_insert {
            return Err(injected());
        }
        self.inner.insert_transaction(tx).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.faults.fail_commit {
            return Err(injected());
        }
        let remaining = self.faults.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.faults.conflicts.fetch_sub(1, Ordering::SeqCst);
            }
            return Err(StoreError::Conflict("could not serialize access".to_string()));
        }
        self.inner.commit().await
    }
}
