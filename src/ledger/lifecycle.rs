//! Status state machine for funding requests.
//!
//! `Pending -> Funded` is the only transition the ledger performs, and it is
//! applied inside the recorder's atomic write. `Completed` (loans fully repaid)
//! is set by the servicing workflow outside this crate and is only read here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::error::LedgerError;
use super::model::{to_minor_units, FundingRequest, RequestUpdate, TransactionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum RequestStatus {
    Pending,
    Funded,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Funded => "Funded",
            RequestStatus::Completed => "Completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(RequestStatus::Pending),
            "funded" => Some(RequestStatus::Funded),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }

    /// True once the goal has been reached, whether or not loans are repaid yet.
    pub fn has_reached_goal(&self) -> bool {
        matches!(self, RequestStatus::Funded | RequestStatus::Completed)
    }

    /// Loans against a completed request no longer count as active.
    pub fn is_closed(&self) -> bool {
        matches!(self, RequestStatus::Completed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status after the request's raised total becomes `raised`. Never moves backwards.
pub fn next_status(current: RequestStatus, raised: Decimal, goal: Decimal) -> RequestStatus {
    match current {
        RequestStatus::Pending if raised >= goal => RequestStatus::Funded,
        other => other,
    }
}

/// Computes the request fields written alongside a new transaction.
/// Fails when the new running total no longer fits the ledger's cent range.
pub fn apply_transaction(
    request: &FundingRequest,
    kind: TransactionType,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<RequestUpdate, LedgerError> {
    let (raised, repaid) = if kind.is_funding() {
        (add_within_range(request.raised, amount)?, request.repaid)
    } else {
        (request.raised, add_within_range(request.repaid, amount)?)
    };

    let status = next_status(request.status, raised, request.funding_goal);
    let funded_at = match (request.status, status) {
        (RequestStatus::Pending, RequestStatus::Funded) => Some(now),
        _ => request.funded_at,
    };

    Ok(RequestUpdate {
        id: request.id,
        raised,
        repaid,
        status,
        funded_at,
    })
}

fn add_within_range(total: Decimal, amount: Decimal) -> Result<Decimal, LedgerError> {
    total
        .checked_add(amount)
        .filter(|sum| to_minor_units(*sum).is_some())
        .ok_or_else(|| LedgerError::InvalidAmount(format!("total would exceed the supported range after adding {}", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request(goal: i64, raised: i64, status: RequestStatus) -> FundingRequest {
        FundingRequest {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            owner_id: "borrower".to_string(),
            display_name: "Amina's Artisanal Coffee".to_string(),
            breakdown: None,
            funding_goal: Decimal::from(goal),
            raised: Decimal::from(raised),
            repaid: Decimal::ZERO,
            status,
            created_at: Utc::now(),
            deadline: None,
            funded_at: None,
        }
    }

    #[test]
    fn crossing_the_goal_marks_request_funded() {
        let now = Utc::now();
        let update = apply_transaction(
            &request(1000, 900, RequestStatus::Pending),
            TransactionType::Loan,
            Decimal::from(150),
            now,
        )
        .unwrap();
        assert_eq!(update.raised, Decimal::from(1050));
        assert_eq!(update.status, RequestStatus::Funded);
        assert_eq!(update.funded_at, Some(now));
    }

    #[test]
    fn reaching_the_goal_exactly_is_enough() {
        assert_eq!(
            next_status(RequestStatus::Pending, Decimal::from(800), Decimal::from(800)),
            RequestStatus::Funded
        );
        assert_eq!(
            next_status(RequestStatus::Pending, Decimal::from(799), Decimal::from(800)),
            RequestStatus::Pending
        );
    }

    #[test]
    fn status_never_moves_backwards() {
        assert_eq!(
            next_status(RequestStatus::Funded, Decimal::ZERO, Decimal::from(800)),
            RequestStatus::Funded
        );
        assert_eq!(
            next_status(RequestStatus::Completed, Decimal::from(10_000), Decimal::from(800)),
            RequestStatus::Completed
        );
    }

    #[test]
    fn repayments_leave_raised_and_status_alone() {
        let mut funded = request(500, 500, RequestStatus::Funded);
        let funded_at = Utc::now();
        funded.funded_at = Some(funded_at);

        let update = apply_transaction(&funded, TransactionType::Repayment, Decimal::from(40), Utc::now()).unwrap();
        assert_eq!(update.raised, Decimal::from(500));
        assert_eq!(update.repaid, Decimal::from(40));
        assert_eq!(update.status, RequestStatus::Funded);
        assert_eq!(update.funded_at, Some(funded_at));
    }

    #[test]
    fn totals_past_the_cent_range_are_rejected() {
        let mut nearly_full = request(1000, 0, RequestStatus::Pending);
        nearly_full.raised = Decimal::new(i64::MAX, 2);

        let err = apply_transaction(&nearly_full, TransactionType::Loan, Decimal::ONE, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert!(apply_transaction(&nearly_full, TransactionType::Repayment, Decimal::ONE, Utc::now()).is_ok());
    }
}
