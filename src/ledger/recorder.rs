//! Write path of the ledger.

use backoff::future::retry_notify;
use backoff::Error as BackoffError;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::error::{LedgerError, StoreError};
use super::lifecycle::{self, RequestStatus};
use super::model::{
    normalize_amount, to_minor_units, BusinessProfile, FundingRequest, NewBusiness, NewFundingRequest,
    NewTransaction, Transaction, TransactionStatus, TransactionType, UserProfile,
};
use crate::store::LedgerStore;

/// How long the recorder keeps retrying conflicting writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(25),
            max_interval: Duration::from_millis(500),
            max_elapsed: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build()
    }
}

/// A single funding event as submitted by an authenticated caller.
#[derive(Debug, Clone)]
pub struct RecordTransaction {
    pub funding_request_id: Uuid,
    pub contributor_id: String,
    /// Defaults to the owner of the request.
    pub borrower_id: Option<String>,
    pub amount: Decimal,
    pub kind: TransactionType,
}

/// Records transactions and owns every write to a request's cached totals.
pub struct TransactionRecorder {
    store: Arc<dyn LedgerStore>,
    retry: RetryPolicy,
}

impl TransactionRecorder {
    pub fn new(store: Arc<dyn LedgerStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Appends one transaction and updates the parent request in the same atomic unit.
    ///
    /// The amount is validated before the store is touched. Conflicting writes
    /// are retried with exponential backoff; when the budget runs out the call
    /// fails with [`LedgerError::ConflictRetryExhausted`] and nothing is recorded.
    #[tracing::instrument(skip(self, cmd), fields(request_id = %cmd.funding_request_id, kind = %cmd.kind))]
    pub async fn record_transaction(&self, cmd: RecordTransaction) -> Result<Transaction, LedgerError> {
        let amount = validate_amount(cmd.amount)?;
        let attempts = AtomicU32::new(0);

        let cmd = &cmd;
        let attempts_ref = &attempts;
        let result = retry_notify(
            self.retry.backoff(),
            || async move {
                attempts_ref.fetch_add(1, Ordering::Relaxed);
                self.attempt(cmd, amount).await
            },
            |err: LedgerError, wait: Duration| {
                tracing::warn!(
                    "Write conflict: {}. Retrying in {:.3}s...",
                    err,
                    wait.as_secs_f32()
                );
            },
        )
        .await;

        match &result {
            Ok(tx) => tracing::debug!(transaction_id = %tx.id, "transaction recorded"),
            Err(LedgerError::ConflictRetryExhausted(_)) => tracing::error!(
                attempts = attempts.load(Ordering::Relaxed),
                "giving up on conflicting write"
            ),
            Err(e) => tracing::warn!("transaction not recorded: {}", e),
        }
        result
    }

    /// One pass of read, compute, update, insert, commit. Any early return
    /// drops the unit of work, which discards everything staged in it.
    async fn attempt(
        &self,
        cmd: &RecordTransaction,
        amount: Decimal,
    ) -> Result<Transaction, BackoffError<LedgerError>> {
        let mut txn = self.store.begin().await.map_err(classify)?;

        let request = txn
            .read_request_for_update(cmd.funding_request_id)
            .await
            .map_err(classify)?
            .ok_or_else(|| BackoffError::permanent(LedgerError::RequestNotFound(cmd.funding_request_id)))?;

        if cmd.kind == TransactionType::Repayment && cmd.contributor_id != request.owner_id {
            return Err(BackoffError::permanent(LedgerError::InvalidRequest(
                "only the borrower may record a repayment".to_string(),
            )));
        }
        let borrower_id = cmd.borrower_id.clone().unwrap_or_else(|| request.owner_id.clone());

        let now = Utc::now();
        let update =
            lifecycle::apply_transaction(&request, cmd.kind, amount, now).map_err(BackoffError::permanent)?;
        let transitioned = request.status == RequestStatus::Pending && update.status == RequestStatus::Funded;
        txn.update_request(update.clone()).await.map_err(classify)?;

        let recorded = txn
            .insert_transaction(NewTransaction {
                funding_request_id: request.id,
                amount,
                kind: cmd.kind,
                contributor_id: Some(cmd.contributor_id.clone()),
                borrower_id: Some(borrower_id),
                status: TransactionStatus::Completed,
                created_at: now,
            })
            .await
            .map_err(classify)?;

        txn.commit().await.map_err(classify)?;

        if transitioned {
            tracing::info!(
                request_id = %request.id,
                raised = %update.raised,
                goal = %request.funding_goal,
                "funding request reached its goal"
            );
        }
        Ok(recorded)
    }

    /// Registers a business profile for a borrower.
    pub async fn create_business(&self, business: NewBusiness) -> Result<BusinessProfile, LedgerError> {
        if business.name.trim().is_empty() {
            return Err(LedgerError::InvalidRequest("business name must not be empty".to_string()));
        }
        Ok(self.store.insert_business(business).await?)
    }

    /// Publishes a new funding request against one of the owner's businesses.
    /// Starts `Pending` with nothing raised.
    pub async fn create_funding_request(
        &self,
        owner_id: &str,
        business_id: Uuid,
        funding_goal: Decimal,
        breakdown: Option<String>,
        deadline: Option<chrono::DateTime<Utc>>,
    ) -> Result<FundingRequest, LedgerError> {
        let funding_goal = validate_amount(funding_goal)?;
        let business = self
            .store
            .get_business(business_id)
            .await?
            .ok_or(LedgerError::BusinessNotFound(business_id))?;
        if business.owner_id != owner_id {
            return Err(LedgerError::InvalidRequest(format!(
                "business {} is not owned by the caller",
                business_id
            )));
        }
        if let Some(deadline) = deadline {
            if deadline <= Utc::now() {
                return Err(LedgerError::InvalidRequest("deadline must be in the future".to_string()));
            }
        }

        let request = self
            .store
            .insert_request(NewFundingRequest {
                business_id,
                owner_id: owner_id.to_string(),
                display_name: business.name,
                breakdown,
                funding_goal,
                deadline,
            })
            .await?;
        tracing::info!(request_id = %request.id, goal = %request.funding_goal, "funding request created");
        Ok(request)
    }

    /// Mirrors an identity's display name from the identity provider.
    pub async fn register_user(&self, user: UserProfile) -> Result<(), LedgerError> {
        if user.id.trim().is_empty() {
            return Err(LedgerError::InvalidRequest("user id must not be empty".to_string()));
        }
        Ok(self.store.upsert_user(user).await?)
    }
}

/// Rounds to cents and rejects anything that is not strictly positive afterwards,
/// or that does not fit the ledger's cent range.
pub fn validate_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    let amount = normalize_amount(amount);
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!("amount must be positive, got {}", amount)));
    }
    if to_minor_units(amount).is_none() {
        return Err(LedgerError::InvalidAmount(format!("amount is too large, got {}", amount)));
    }
    Ok(amount)
}

fn classify(err: StoreError) -> BackoffError<LedgerError> {
    match err {
        StoreError::Conflict(msg) => BackoffError::transient(LedgerError::ConflictRetryExhausted(msg)),
        other => BackoffError::permanent(other.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(matches!(validate_amount(Decimal::ZERO), Err(LedgerError::InvalidAmount(_))));
        assert!(matches!(validate_amount(Decimal::from(-5)), Err(LedgerError::InvalidAmount(_))));
        // Rounds to zero cents
        assert!(matches!(validate_amount(Decimal::new(4, 3)), Err(LedgerError::InvalidAmount(_))));
        assert_eq!(validate_amount(Decimal::new(15005, 2)).unwrap(), Decimal::new(15005, 2));
    }

    #[test]
    fn amounts_outside_the_cent_range_are_rejected() {
        assert!(matches!(validate_amount(Decimal::MAX), Err(LedgerError::InvalidAmount(_))));
        assert!(matches!(
            validate_amount(Decimal::from(1_000_000_000_000_000_000i64)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(validate_amount(Decimal::new(i64::MAX, 2)).is_ok());
    }

    #[test]
    fn only_conflicts_are_transient() {
        assert!(matches!(
            classify(StoreError::Conflict("busy".into())),
            BackoffError::Transient { .. }
        ));
        assert!(matches!(
            classify(StoreError::Unavailable("down".into())),
            BackoffError::Permanent(LedgerError::StoreUnavailable(_))
        ));
    }
}
