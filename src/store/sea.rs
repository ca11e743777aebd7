use async_trait::async_trait;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, ConnectOptions, Database,
    DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{LedgerStore, LedgerTxn, RequestFilter, TransactionFilter};
use crate::entities::{business, funding_request, transaction, user};
use crate::ledger::error::StoreError;
use crate::ledger::lifecycle::RequestStatus;
use crate::ledger::model::{
    from_minor_units, to_minor_units, BusinessProfile, FundingRequest, NewBusiness,
    NewFundingRequest, NewTransaction, RequestUpdate, Transaction, TransactionStatus,
    TransactionType, UserProfile,
};

/// Relational ledger store backed by sea-orm (PostgreSQL in production, SQLite in tests).
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let mut options = ConnectOptions::new(url.to_string());
        options.max_connections(max_connections).sqlx_logging(false);
        let db = Database::connect(options).await.map_err(classify)?;
        Ok(Self::new(db))
    }

    /// Applies pending schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        Migrator::up(&self.db, None).await.map_err(classify)
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Maps driver errors onto the ledger's taxonomy. Serialization failures,
/// deadlocks and SQLite lock contention are retryable conflicts.
fn classify(err: DbErr) -> StoreError {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("could not serialize")
        || lower.contains("40001")
        || lower.contains("deadlock")
        || lower.contains("database is locked")
        || lower.contains("database table is locked")
    {
        StoreError::Conflict(msg)
    } else {
        StoreError::Unavailable(msg)
    }
}

fn minor(amount: Decimal, field: &str) -> Result<i64, StoreError> {
    to_minor_units(amount).ok_or_else(|| StoreError::Corrupt(format!("{} out of range: {}", field, amount)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// --- Read boundary: every row leaves the store through one of these ---

fn request_from_model(m: funding_request::Model) -> FundingRequest {
    let status = RequestStatus::parse(&m.status).unwrap_or_else(|| {
        tracing::warn!(request_id = %m.id, status = %m.status, "unknown request status, reading as Pending");
        RequestStatus::Pending
    });
    FundingRequest {
        id: m.id,
        business_id: m.business_id,
        owner_id: m.owner_id,
        display_name: m.business_name,
        breakdown: non_empty(m.breakdown),
        funding_goal: from_minor_units(Some(m.funding_goal_minor)),
        raised: from_minor_units(m.raised_minor),
        repaid: from_minor_units(m.repaid_minor),
        status,
        created_at: m.created_at,
        deadline: m.deadline,
        funded_at: m.funded_at,
    }
}

fn transaction_from_model(m: transaction::Model) -> Transaction {
    let kind = TransactionType::parse(&m.kind).unwrap_or_else(|| {
        tracing::warn!(transaction_id = %m.id, kind = %m.kind, "unknown transaction type, reading as Contribution");
        TransactionType::Contribution
    });
    let status = TransactionStatus::parse(&m.status).unwrap_or_else(|| {
        tracing::warn!(transaction_id = %m.id, status = %m.status, "unknown transaction status, reading as Pending");
        TransactionStatus::Pending
    });
    if m.amount_minor.map_or(true, |cents| cents < 0) {
        tracing::warn!(transaction_id = %m.id, "missing or negative amount, reading as zero");
    }
    Transaction {
        id: m.id,
        funding_request_id: m.funding_request_id,
        amount: from_minor_units(m.amount_minor),
        kind,
        contributor_id: non_empty(m.contributor_id),
        borrower_id: non_empty(m.borrower_id),
        status,
        created_at: m.created_at,
    }
}

fn business_from_model(m: business::Model) -> BusinessProfile {
    BusinessProfile {
        id: m.id,
        owner_id: m.owner_id,
        name: m.name,
        category: non_empty(m.category),
        description: non_empty(m.description),
        location: non_empty(m.location),
        created_at: m.created_at,
    }
}

#[async_trait]
impl LedgerStore for SeaOrmStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTxn>, StoreError> {
        let txn = self.db.begin().await.map_err(classify)?;
        Ok(Box::new(SeaTxn { txn }))
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<FundingRequest>, StoreError> {
        let found = funding_request::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(classify)?;
        Ok(found.map(request_from_model))
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<FundingRequest>, StoreError> {
        let mut query = funding_request::Entity::find();
        if let Some(owner_id) = &filter.owner_id {
            query = query.filter(funding_request::Column::OwnerId.eq(owner_id.as_str()));
        }
        if let Some(business_id) = filter.business_id {
            query = query.filter(funding_request::Column::BusinessId.eq(business_id));
        }
        let rows = query
            .order_by_desc(funding_request::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(request_from_model).collect())
    }

    async fn insert_request(&self, request: NewFundingRequest) -> Result<FundingRequest, StoreError> {
        let am = funding_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            business_id: Set(request.business_id),
            owner_id: Set(request.owner_id),
            business_name: Set(request.display_name),
            breakdown: Set(request.breakdown),
            funding_goal_minor: Set(minor(request.funding_goal, "funding goal")?),
            raised_minor: Set(Some(0)),
            repaid_minor: Set(Some(0)),
            status: Set(RequestStatus::Pending.as_str().to_string()),
            created_at: Set(Utc::now()),
            deadline: Set(request.deadline),
            funded_at: Set(None),
        };
        let model = am.insert(&self.db).await.map_err(classify)?;
        Ok(request_from_model(model))
    }

    async fn get_business(&self, id: Uuid) -> Result<Option<BusinessProfile>, StoreError> {
        let found = business::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(classify)?;
        Ok(found.map(business_from_model))
    }

    async fn list_businesses(&self, owner_id: &str) -> Result<Vec<BusinessProfile>, StoreError> {
        let rows = business::Entity::find()
            .filter(business::Column::OwnerId.eq(owner_id))
            .order_by_desc(business::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(business_from_model).collect())
    }

    async fn insert_business(&self, new: NewBusiness) -> Result<BusinessProfile, StoreError> {
        let am = business::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(new.owner_id),
            name: Set(new.name),
            category: Set(new.category),
            description: Set(new.description),
            location: Set(new.location),
            created_at: Set(Utc::now()),
        };
        let model = am.insert(&self.db).await.map_err(classify)?;
        Ok(business_from_model(model))
    }

    async fn user_display_name(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let found = user::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await
            .map_err(classify)?;
        Ok(found.and_then(|u| non_empty(u.display_name)))
    }

    async fn upsert_user(&self, profile: UserProfile) -> Result<(), StoreError> {
        let am = user::ActiveModel {
            id: Set(profile.id),
            display_name: Set(profile.display_name),
            created_at: Set(Utc::now()),
        };
        user::Entity::insert(am)
            .on_conflict(
                OnConflict::column(user::Column::Id)
                    .update_column(user::Column::DisplayName)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn query_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StoreError> {
        let mut query = transaction::Entity::find();
        if let Some(request_id) = filter.funding_request_id {
            query = query.filter(transaction::Column::FundingRequestId.eq(request_id));
        }
        if let Some(contributor_id) = &filter.contributor_id {
            query = query.filter(transaction::Column::ContributorId.eq(contributor_id.as_str()));
        }
        if let Some(borrower_id) = &filter.borrower_id {
            query = query.filter(transaction::Column::BorrowerId.eq(borrower_id.as_str()));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transaction::Column::Kind.eq(kind.as_str()));
        }
        if let Some(since) = filter.since {
            query = query.filter(transaction::Column::CreatedAt.gte(since));
        }
        let rows = query
            .order_by_desc(transaction::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(classify)?;
        Ok(rows.into_iter().map(transaction_from_model).collect())
    }
}

struct SeaTxn {
    txn: DatabaseTransaction,
}

#[async_trait]
impl LedgerTxn for SeaTxn {
    async fn read_request_for_update(&mut self, id: Uuid) -> Result<Option<FundingRequest>, StoreError> {
        // FOR UPDATE on PostgreSQL; SQLite serializes writers on its own
        let found = funding_request::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(classify)?;
        Ok(found.map(request_from_model))
    }

    async fn update_request(&mut self, update: RequestUpdate) -> Result<(), StoreError> {
        let am = funding_request::ActiveModel {
            id: Unchanged(update.id),
            raised_minor: Set(Some(minor(update.raised, "raised")?)),
            repaid_minor: Set(Some(minor(update.repaid, "repaid")?)),
            status: Set(update.status.as_str().to_string()),
            funded_at: Set(update.funded_at),
            ..Default::default()
        };
        am.update(&self.txn).await.map_err(classify)?;
        Ok(())
    }

    async fn insert_transaction(&mut self, tx: NewTransaction) -> Result<Transaction, StoreError> {
        let am = transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            funding_request_id: Set(tx.funding_request_id),
            amount_minor: Set(Some(minor(tx.amount, "amount")?)),
            kind: Set(tx.kind.as_str().to_string()),
            contributor_id: Set(tx.contributor_id),
            borrower_id: Set(tx.borrower_id),
            status: Set(tx.status.as_str().to_string()),
            created_at: Set(tx.created_at),
        };
        let model = am.insert(&self.txn).await.map_err(classify)?;
        Ok(transaction_from_model(model))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let SeaTxn { txn } = *self;
        txn.commit().await.map_err(classify)
    }
}
