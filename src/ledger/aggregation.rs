//! Read side of the ledger. Every view is recomputed from the transaction log.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::LedgerError;
use super::lifecycle::RequestStatus;
use super::lookup::{Lookups, PLATFORM, UNKNOWN_BUSINESS};
use super::model::{BusinessProfile, FundingRequest, Transaction, TransactionType};
use crate::store::{LedgerStore, RequestFilter, TransactionFilter};

/// Per-type sums over the completed transactions of one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RequestTotals {
    pub loans_raised: Decimal,
    pub donations_raised: Decimal,
    pub contributions_raised: Decimal,
    /// Loans + donations + contributions
    pub total_raised: Decimal,
    pub repaid: Decimal,
    pub transaction_count: usize,
}

impl RequestTotals {
    pub fn from_transactions<'t>(transactions: impl IntoIterator<Item = &'t Transaction>) -> Self {
        let mut totals = RequestTotals::default();
        for tx in transactions.into_iter().filter(|tx| tx.is_completed()) {
            match tx.kind {
                TransactionType::Loan => totals.loans_raised += tx.amount,
                TransactionType::Donation => totals.donations_raised += tx.amount,
                TransactionType::Contribution => totals.contributions_raised += tx.amount,
                TransactionType::Repayment => totals.repaid += tx.amount,
            }
            totals.transaction_count += 1;
        }
        totals.total_raised = totals.loans_raised + totals.donations_raised + totals.contributions_raised;
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RequestSummary {
    pub request: FundingRequest,
    pub totals: RequestTotals,
    /// Share of the goal raised so far; exceeds 100 when over-funded
    pub progress_percent: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ContributorStats {
    /// Completed funding only
    pub total_contributed: Decimal,
    /// Completed funding transactions. Pending ones are listed on the
    /// dashboard but not counted, so this can be below `contributions.len()`.
    pub contribution_count: usize,
    pub active_loans: Decimal,
    pub active_loan_count: usize,
    /// One point per whole currency unit contributed
    pub barakah_points: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContributionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub business_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ContributorData {
    pub contributions: Vec<ContributionView>,
    pub stats: ContributorStats,
}

/// A transaction as shown on the public ledger. Carries no raw identity ids.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PublicLedgerEntry {
    pub transaction_id: Uuid,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct BusinessTrackRecord {
    pub funding_request_id: Uuid,
    pub loans: Vec<Transaction>,
    pub donations: Vec<Transaction>,
    pub contributions: Vec<Transaction>,
    pub repayments: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RankedContributor {
    pub name: String,
    pub contribution: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CommunityProgress {
    pub window_days: u32,
    pub funded_count: usize,
    pub target: u32,
    pub progress_percent: Decimal,
    pub top_contributors: Vec<RankedContributor>,
    pub recent_activities: Vec<String>,
}

/// Shape of the community goal view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommunitySettings {
    pub window_days: u32,
    pub target: u32,
    pub top_contributors: usize,
    pub recent_activities: usize,
}

impl Default for CommunitySettings {
    fn default() -> Self {
        Self {
            window_days: 30,
            target: 5,
            top_contributors: 4,
            recent_activities: 4,
        }
    }
}

/// A request as listed on the discover page, joined with its business profile.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DiscoverCard {
    pub request_id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub funding_goal: Decimal,
    pub funding_raised: Decimal,
    pub status: RequestStatus,
    pub description: String,
    pub category: String,
    pub location: String,
}

const NO_DESCRIPTION: &str = "No description available.";
const UNCATEGORIZED: &str = "Uncategorized";
const NO_LOCATION: &str = "No location set.";

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
}

fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Human-readable line for the community activity feed.
pub fn describe_activity(tx: &Transaction, contributor: &str, business: &str) -> String {
    let amount = tx.amount.round_dp(2);
    match tx.kind {
        TransactionType::Donation => {
            format!("{} made a donation of ${:.2} to {}.", contributor, amount, business)
        }
        TransactionType::Repayment => format!("{} repaid ${:.2}.", business, amount),
        TransactionType::Loan | TransactionType::Contribution => {
            format!("{} contributed ${:.2} to {}.", contributor, amount, business)
        }
    }
}

pub struct AggregationEngine {
    store: Arc<dyn LedgerStore>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    async fn require_request(&self, id: Uuid) -> Result<FundingRequest, LedgerError> {
        self.store
            .get_request(id)
            .await?
            .ok_or(LedgerError::RequestNotFound(id))
    }

    pub async fn request_totals(&self, request_id: Uuid) -> Result<RequestTotals, LedgerError> {
        let transactions = self
            .store
            .query_transactions(&TransactionFilter::for_request(request_id))
            .await?;
        Ok(RequestTotals::from_transactions(&transactions))
    }

    #[tracing::instrument(skip(self))]
    pub async fn request_summary(&self, request_id: Uuid) -> Result<RequestSummary, LedgerError> {
        let request = self.require_request(request_id).await?;
        let totals = self.request_totals(request_id).await?;
        if totals.total_raised != request.raised {
            tracing::warn!(
                cached = %request.raised,
                derived = %totals.total_raised,
                "cached raised total differs from the transaction log"
            );
        }
        let progress_percent = percent(totals.total_raised, request.funding_goal);
        Ok(RequestSummary { request, totals, progress_percent })
    }

    /// Dashboard data for one contributor. Repayments are not contributions
    /// and are left out. Every funding transaction is listed, whatever its
    /// status, but only completed ones count towards the stats.
    #[tracing::instrument(skip(self))]
    pub async fn contributor_data(&self, contributor_id: &str) -> Result<ContributorData, LedgerError> {
        if contributor_id.trim().is_empty() {
            return Ok(ContributorData::default());
        }

        let mut transactions = self
            .store
            .query_transactions(&TransactionFilter::for_contributor(contributor_id))
            .await?;
        transactions.retain(|tx| tx.kind.is_funding());
        sort_newest_first(&mut transactions);

        let mut lookups = Lookups::new(self.store.as_ref());
        let mut stats = ContributorStats::default();
        let mut contributions = Vec::with_capacity(transactions.len());

        for tx in transactions {
            let parent = lookups.request(tx.funding_request_id).await;
            let business_name = parent
                .as_ref()
                .map(|r| r.display_name.clone())
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_BUSINESS.to_string());

            if tx.is_completed() {
                stats.total_contributed += tx.amount;
                stats.contribution_count += 1;
                // A parent we cannot see is treated as still open
                let closed = parent.as_ref().map_or(false, |r| r.status.is_closed());
                if tx.kind == TransactionType::Loan && !closed {
                    stats.active_loans += tx.amount;
                    stats.active_loan_count += 1;
                }
            }
            contributions.push(ContributionView { transaction: tx, business_name });
        }
        stats.barakah_points = stats.total_contributed.floor().to_i64().unwrap_or(i64::MAX);

        Ok(ContributorData { contributions, stats })
    }

    /// Repayments made by a borrower, newest first.
    pub async fn borrower_repayments(&self, borrower_id: &str) -> Result<Vec<Transaction>, LedgerError> {
        if borrower_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        let filter = TransactionFilter {
            borrower_id: Some(borrower_id.to_string()),
            kind: Some(TransactionType::Repayment),
            ..Default::default()
        };
        let mut repayments = self.store.query_transactions(&filter).await?;
        sort_newest_first(&mut repayments);
        Ok(repayments)
    }

    pub async fn borrower_requests(&self, owner_id: &str) -> Result<Vec<FundingRequest>, LedgerError> {
        if owner_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        let filter = RequestFilter { owner_id: Some(owner_id.to_string()), ..Default::default() };
        Ok(self.store.list_requests(&filter).await?)
    }

    pub async fn borrower_businesses(&self, owner_id: &str) -> Result<Vec<BusinessProfile>, LedgerError> {
        if owner_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.store.list_businesses(owner_id).await?)
    }

    /// Every transaction in the system, resolved to display names. Public.
    #[tracing::instrument(skip(self))]
    pub async fn public_ledger(&self) -> Result<Vec<PublicLedgerEntry>, LedgerError> {
        let mut transactions = self.store.query_transactions(&TransactionFilter::default()).await?;
        sort_newest_first(&mut transactions);

        let mut lookups = Lookups::new(self.store.as_ref());
        let mut entries = Vec::with_capacity(transactions.len());
        for tx in transactions {
            let business = lookups.ledger_business_name(tx.funding_request_id).await;
            let (from, to) = if tx.kind == TransactionType::Repayment {
                (business, PLATFORM.to_string())
            } else {
                (lookups.display_name(tx.contributor_id.as_deref()).await, business)
            };
            entries.push(PublicLedgerEntry {
                transaction_id: tx.id,
                date: tx.created_at,
                kind: tx.kind,
                from,
                to,
                amount: tx.amount,
                status: tx.status.to_string(),
            });
        }
        Ok(entries)
    }

    /// A request's transactions split by type, each list newest first.
    pub async fn business_track_record(&self, request_id: Uuid) -> Result<BusinessTrackRecord, LedgerError> {
        self.require_request(request_id).await?;
        let mut transactions = self
            .store
            .query_transactions(&TransactionFilter::for_request(request_id))
            .await?;
        sort_newest_first(&mut transactions);

        let mut record = BusinessTrackRecord { funding_request_id: request_id, ..Default::default() };
        for tx in transactions {
            match tx.kind {
                TransactionType::Loan => record.loans.push(tx),
                TransactionType::Donation => record.donations.push(tx),
                TransactionType::Contribution => record.contributions.push(tx),
                TransactionType::Repayment => record.repayments.push(tx),
            }
        }
        Ok(record)
    }

    /// Progress of the community goal over the trailing window ending now.
    pub async fn community_progress(&self, settings: CommunitySettings) -> Result<CommunityProgress, LedgerError> {
        self.community_progress_at(settings, Utc::now()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn community_progress_at(
        &self,
        settings: CommunitySettings,
        now: DateTime<Utc>,
    ) -> Result<CommunityProgress, LedgerError> {
        let since = now - Duration::days(i64::from(settings.window_days));

        let funded_count = self
            .store
            .list_requests(&RequestFilter::default())
            .await?
            .iter()
            .filter(|r| r.status.has_reached_goal())
            .filter(|r| r.funded_at.map_or(false, |at| at >= since && at <= now))
            .count();

        let mut window = self.store.query_transactions(&TransactionFilter::since(since)).await?;
        window.retain(|tx| tx.created_at <= now && tx.is_completed());
        sort_newest_first(&mut window);

        let mut lookups = Lookups::new(self.store.as_ref());

        let mut per_contributor: HashMap<&str, Decimal> = HashMap::new();
        for tx in window.iter().filter(|tx| tx.kind.is_funding()) {
            if let Some(id) = tx.contributor_id.as_deref() {
                *per_contributor.entry(id).or_default() += tx.amount;
            }
        }
        let mut top_contributors = Vec::with_capacity(per_contributor.len());
        for (id, contribution) in per_contributor {
            let name = lookups.display_name(Some(id)).await;
            top_contributors.push(RankedContributor { name, contribution });
        }
        top_contributors.sort_by(|a, b| b.contribution.cmp(&a.contribution).then_with(|| a.name.cmp(&b.name)));
        top_contributors.truncate(settings.top_contributors);

        let mut recent_activities = Vec::with_capacity(settings.recent_activities);
        for tx in window.iter().take(settings.recent_activities) {
            let business = match lookups.request(tx.funding_request_id).await {
                Some(request) if !request.display_name.trim().is_empty() => request.display_name,
                _ => UNKNOWN_BUSINESS.to_string(),
            };
            let contributor = lookups.display_name(tx.contributor_id.as_deref()).await;
            recent_activities.push(describe_activity(tx, &contributor, &business));
        }

        Ok(CommunityProgress {
            window_days: settings.window_days,
            funded_count,
            target: settings.target,
            progress_percent: percent(Decimal::from(funded_count as u64), Decimal::from(settings.target)),
            top_contributors,
            recent_activities,
        })
    }

    /// Every request joined with its business profile, newest first.
    pub async fn discover(&self) -> Result<Vec<DiscoverCard>, LedgerError> {
        let requests = self.store.list_requests(&RequestFilter::default()).await?;
        let mut lookups = Lookups::new(self.store.as_ref());
        let mut cards = Vec::with_capacity(requests.len());
        for request in requests {
            let business = lookups.business(request.business_id).await;
            let (description, category, location) = match business {
                Some(b) => (b.description, b.category, b.location),
                None => (None, None, None),
            };
            cards.push(DiscoverCard {
                request_id: request.id,
                business_id: request.business_id,
                name: request.display_name,
                funding_goal: request.funding_goal,
                funding_raised: request.raised,
                status: request.status,
                description: description.unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                category: category.unwrap_or_else(|| UNCATEGORIZED.to_string()),
                location: location.unwrap_or_else(|| NO_LOCATION.to_string()),
            });
        }
        Ok(cards)
    }
}
