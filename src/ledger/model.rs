use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use super::lifecycle::RequestStatus;

/// Money is kept to cents everywhere in the ledger.
pub const MONEY_SCALE: u32 = 2;

/// Rounds an amount to the ledger's precision.
pub fn normalize_amount(amount: Decimal) -> Decimal {
    amount.round_dp(MONEY_SCALE)
}

/// Converts an amount into minor units (cents). `None` when it does not fit an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    normalize_amount(amount).checked_mul(Decimal::ONE_HUNDRED)?.to_i64()
}

/// Reads a stored minor-unit amount. Missing or negative values are treated as zero.
pub fn from_minor_units(raw: Option<i64>) -> Decimal {
    match raw {
        Some(cents) if cents >= 0 => Decimal::new(cents, MONEY_SCALE),
        _ => Decimal::ZERO,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TransactionType {
    Loan,
    Donation,
    Repayment,
    Contribution,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Loan => "Loan",
            TransactionType::Donation => "Donation",
            TransactionType::Repayment => "Repayment",
            TransactionType::Contribution => "Contribution",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "loan" => Some(TransactionType::Loan),
            "donation" => Some(TransactionType::Donation),
            "repayment" => Some(TransactionType::Repayment),
            "contribution" => Some(TransactionType::Contribution),
            _ => None,
        }
    }

    /// Funding types move money towards the goal; repayments flow back out.
    pub fn is_funding(&self) -> bool {
        !matches!(self, TransactionType::Repayment)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Failed => "Failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "completed" => Some(TransactionStatus::Completed),
            "pending" => Some(TransactionStatus::Pending),
            "failed" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A borrower's published ask for a monetary goal tied to one business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FundingRequest {
    pub id: Uuid,
    pub business_id: Uuid,
    pub owner_id: String,
    /// Business display name, copied onto the request when it is created
    pub display_name: String,
    pub breakdown: Option<String>,
    pub funding_goal: Decimal,
    /// Cached sum of completed funding transactions
    pub raised: Decimal,
    /// Cached sum of completed repayments
    pub repaid: Decimal,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub funded_at: Option<DateTime<Utc>>,
}

/// One immutable entry of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub funding_request_id: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub contributor_id: Option<String>,
    pub borrower_id: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BusinessProfile {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub owner_id: String,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewFundingRequest {
    pub business_id: Uuid,
    pub owner_id: String,
    pub display_name: String,
    pub breakdown: Option<String>,
    pub funding_goal: Decimal,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub funding_request_id: Uuid,
    pub amount: Decimal,
    pub kind: TransactionType,
    pub contributor_id: Option<String>,
    pub borrower_id: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// The fields of a request the recorder is allowed to write.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestUpdate {
    pub id: Uuid,
    pub raised: Decimal,
    pub repaid: Decimal,
    pub status: RequestStatus,
    pub funded_at: Option<DateTime<Utc>>,
}
