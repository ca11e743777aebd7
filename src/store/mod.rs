//! Storage seam for the ledger.
//!
//! The recorder and the aggregation engine only ever talk to an injected
//! `Arc<dyn LedgerStore>`. Writes that touch a request's cached totals go
//! through [`LedgerTxn`], which commits all staged changes together or none of
//! them: dropping a transaction without calling `commit` discards it.

pub mod memory;
pub mod sea;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ledger::error::StoreError;
use crate::ledger::model::{
    BusinessProfile, FundingRequest, NewBusiness, NewFundingRequest, NewTransaction,
    RequestUpdate, Transaction, TransactionType, UserProfile,
};

pub use memory::MemoryStore;
pub use sea::SeaOrmStore;

/// Scan over the transactions of every request. Empty filter means the whole ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub funding_request_id: Option<Uuid>,
    pub contributor_id: Option<String>,
    pub borrower_id: Option<String>,
    pub kind: Option<TransactionType>,
    /// Inclusive lower bound on `created_at`
    pub since: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn for_request(id: Uuid) -> Self {
        Self { funding_request_id: Some(id), ..Default::default() }
    }

    pub fn for_contributor(id: &str) -> Self {
        Self { contributor_id: Some(id.to_string()), ..Default::default() }
    }

    pub fn since(at: DateTime<Utc>) -> Self {
        Self { since: Some(at), ..Default::default() }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.funding_request_id.map_or(true, |id| tx.funding_request_id == id)
            && self
                .contributor_id
                .as_deref()
                .map_or(true, |id| tx.contributor_id.as_deref() == Some(id))
            && self
                .borrower_id
                .as_deref()
                .map_or(true, |id| tx.borrower_id.as_deref() == Some(id))
            && self.kind.map_or(true, |kind| tx.kind == kind)
            && self.since.map_or(true, |since| tx.created_at >= since)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestFilter {
    pub owner_id: Option<String>,
    pub business_id: Option<Uuid>,
}

impl RequestFilter {
    pub fn matches(&self, request: &FundingRequest) -> bool {
        self.owner_id.as_deref().map_or(true, |id| request.owner_id == id)
            && self.business_id.map_or(true, |id| request.business_id == id)
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Starts an atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn LedgerTxn>, StoreError>;

    async fn get_request(&self, id: Uuid) -> Result<Option<FundingRequest>, StoreError>;

    /// Requests matching `filter`, newest first.
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<FundingRequest>, StoreError>;

    async fn insert_request(&self, request: NewFundingRequest) -> Result<FundingRequest, StoreError>;

    async fn get_business(&self, id: Uuid) -> Result<Option<BusinessProfile>, StoreError>;

    async fn list_businesses(&self, owner_id: &str) -> Result<Vec<BusinessProfile>, StoreError>;

    async fn insert_business(&self, business: NewBusiness) -> Result<BusinessProfile, StoreError>;

    /// Display name registered for an identity, if any.
    async fn user_display_name(&self, user_id: &str) -> Result<Option<String>, StoreError>;

    async fn upsert_user(&self, user: UserProfile) -> Result<(), StoreError>;

    /// Transactions matching `filter` across all requests, newest first.
    async fn query_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError>;
}

/// An open atomic unit of work against one store.
///
/// Reads through `read_request_for_update` lock the request until the unit
/// ends, so two units touching the same request run one after the other.
#[async_trait]
pub trait LedgerTxn: Send {
    async fn read_request_for_update(&mut self, id: Uuid) -> Result<Option<FundingRequest>, StoreError>;

    async fn update_request(&mut self, update: RequestUpdate) -> Result<(), StoreError>;

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
