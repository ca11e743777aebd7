use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{LedgerStore, LedgerTxn, RequestFilter, TransactionFilter};
use crate::ledger::error::StoreError;
use crate::ledger::lifecycle::RequestStatus;
use crate::ledger::model::{
    BusinessProfile, FundingRequest, NewBusiness, NewFundingRequest, NewTransaction,
    RequestUpdate, Transaction, UserProfile,
};
use rust_decimal::Decimal;

/// In-process ledger store.
///
/// Used when no `DATABASE_URL` is configured and throughout the tests. Each
/// request has its own async lock, taken by `read_request_for_update` and held
/// until the unit of work ends, so recorders on the same request serialize
/// while different requests proceed in parallel. Staged writes are applied in
/// one step on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: RwLock<State>,
    request_locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

#[derive(Default)]
struct State {
    requests: HashMap<Uuid, FundingRequest>,
    businesses: HashMap<Uuid, BusinessProfile>,
    users: HashMap<String, Option<String>>,
    transactions: Vec<Transaction>,
}

impl Inner {
    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn request_lock(&self, id: Uuid) -> Result<Arc<AsyncMutex<()>>, StoreError> {
        let mut locks = self
            .request_locks
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(locks.entry(id).or_default().clone())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a request as-is, replacing any request with the same id.
    /// Fixture and seeding hook; recorder writes never go through here.
    pub fn put_request(&self, request: FundingRequest) -> Result<(), StoreError> {
        self.inner.write()?.requests.insert(request.id, request);
        Ok(())
    }

    /// Appends an already-built transaction without touching request totals.
    /// Used to load historical ledgers.
    pub fn put_transaction(&self, tx: Transaction) -> Result<(), StoreError> {
        self.inner.write()?.transactions.push(tx);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTxn>, StoreError> {
        Ok(Box::new(MemoryTxn {
            inner: self.inner.clone(),
            held: HashMap::new(),
            updates: Vec::new(),
            inserts: Vec::new(),
        }))
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<FundingRequest>, StoreError> {
        Ok(self.inner.read()?.requests.get(&id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<FundingRequest>, StoreError> {
        let mut requests: Vec<FundingRequest> = self
            .inner
            .read()?
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn insert_request(&self, request: NewFundingRequest) -> Result<FundingRequest, StoreError> {
        let stored = FundingRequest {
            id: Uuid::new_v4(),
            business_id: request.business_id,
            owner_id: request.owner_id,
            display_name: request.display_name,
            breakdown: request.breakdown,
            funding_goal: request.funding_goal,
            raised: Decimal::ZERO,
            repaid: Decimal::ZERO,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            deadline: request.deadline,
            funded_at: None,
        };
        self.inner.write()?.requests.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_business(&self, id: Uuid) -> Result<Option<BusinessProfile>, StoreError> {
        Ok(self.inner.read()?.businesses.get(&id).cloned())
    }

    async fn list_businesses(&self, owner_id: &str) -> Result<Vec<BusinessProfile>, StoreError> {
        let mut businesses: Vec<BusinessProfile> = self
            .inner
            .read()?
            .businesses
            .values()
            .filter(|b| b.owner_id == owner_id)
            .cloned()
            .collect();
        businesses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(businesses)
    }

    async fn insert_business(&self, business: NewBusiness) -> Result<BusinessProfile, StoreError> {
        let stored = BusinessProfile {
            id: Uuid::new_v4(),
            owner_id: business.owner_id,
            name: business.name,
            category: business.category,
            description: business.description,
            location: business.location,
            created_at: Utc::now(),
        };
        self.inner.write()?.businesses.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn user_display_name(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.read()?.users.get(user_id).cloned().flatten())
    }

    async fn upsert_user(&self, user: UserProfile) -> Result<(), StoreError> {
        self.inner.write()?.users.insert(user.id, user.display_name);
        Ok(())
    }

    async fn query_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        // Reverse insertion order first so equal timestamps still come out newest first.
        let mut found: Vec<Transaction> = self
            .inner
            .read()?
            .transactions
            .iter()
            .rev()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

struct MemoryTxn {
    inner: Arc<Inner>,
    held: HashMap<Uuid, OwnedMutexGuard<()>>,
    updates: Vec<RequestUpdate>,
    inserts: Vec<Transaction>,
}

#[async_trait]
impl LedgerTxn for MemoryTxn {
    async fn read_request_for_update(&mut self, id: Uuid) -> Result<Option<FundingRequest>, StoreError> {
        if !self.held.contains_key(&id) {
            let lock = self.inner.request_lock(id)?;
            let guard = lock.lock_owned().await;
            self.held.insert(id, guard);
        }

        let mut request = match self.inner.read()?.requests.get(&id).cloned() {
            Some(request) => request,
            None => return Ok(None),
        };
        // Read-your-writes within the unit
        if let Some(update) = self.updates.iter().rev().find(|u| u.id == id) {
            request.raised = update.raised;
            request.repaid = update.repaid;
            request.status = update.status;
            request.funded_at = update.funded_at;
        }
        Ok(Some(request))
    }

    async fn update_request(&mut self, update: RequestUpdate) -> Result<(), StoreError> {
        if !self.held.contains_key(&update.id) {
            return Err(StoreError::Unavailable(format!(
                "request {} updated without being read for update",
                update.id
            )));
        }
        self.updates.push(update);
        Ok(())
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction, StoreError> {
        let stored = Transaction {
            id: Uuid::new_v4(),
            funding_request_id: tx.funding_request_id,
            amount: tx.amount,
            kind: tx.kind,
            contributor_id: tx.contributor_id,
            borrower_id: tx.borrower_id,
            status: tx.status,
            created_at: tx.created_at,
        };
        self.inserts.push(stored.clone());
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTxn { inner, held, updates, inserts } = *self;
        {
            let mut state = inner.write()?;

            let missing = updates
                .iter()
                .map(|u| u.id)
                .chain(inserts.iter().map(|tx| tx.funding_request_id))
                .find(|id| !state.requests.contains_key(id));
            if let Some(id) = missing {
                return Err(StoreError::Unavailable(format!("request {} vanished before commit", id)));
            }

            for update in updates {
                if let Some(request) = state.requests.get_mut(&update.id) {
                    request.raised = update.raised;
                    request.repaid = update.repaid;
                    request.status = update.status;
                    request.funded_at = update.funded_at;
                }
            }
            state.transactions.extend(inserts);
        }
        drop(held);
        Ok(())
    }
}
