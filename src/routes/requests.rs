use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{parse_amount, ActingUser};
use crate::error::AppError;
use crate::ledger::{
    BusinessTrackRecord, DiscoverCard, FundingRequest, LedgerError, RecordTransaction,
    RequestSummary, Transaction, TransactionType,
};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRequestBody {
    pub business_id: Uuid,
    /// Target amount, a number or numeric string
    #[schema(value_type = f64)]
    pub funding_goal: Value,
    /// Free-text explanation of how the money will be used
    #[serde(default)]
    pub breakdown: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordTransactionBody {
    /// Positive amount, a number or numeric string
    #[schema(value_type = f64)]
    pub amount: Value,
    /// Loan, Donation, Contribution or Repayment
    #[serde(rename = "type")]
    pub kind: String,
}

/// Publish a funding request for one of the caller's businesses
#[utoipa::path(
    post,
    path = "/requests",
    request_body = CreateRequestBody,
    params(("x-user-id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 201, description = "Funding request created", body = FundingRequest),
        (status = 400, description = "Business not owned by caller or deadline in the past"),
        (status = 401, description = "No authenticated user"),
        (status = 404, description = "Business not found"),
        (status = 422, description = "Funding goal is not a positive amount")
    )
)]
#[tracing::instrument(skip(state, body), fields(owner = %user.0, business_id = %body.business_id))]
pub async fn create_request(
    State(state): State<AppState>,
    user: ActingUser,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<FundingRequest>), AppError> {
    let funding_goal = parse_amount(&body.funding_goal)?;
    let breakdown = body.breakdown.map(|b| b.trim().to_string()).filter(|b| !b.is_empty());
    let request = state
        .recorder
        .create_funding_request(&user.0, body.business_id, funding_goal, breakdown, body.deadline)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// List every funding request with its business profile
#[utoipa::path(
    get,
    path = "/requests",
    responses(
        (status = 200, description = "Funding requests, newest first", body = Vec<DiscoverCard>)
    )
)]
pub async fn discover_requests(State(state): State<AppState>) -> Result<Json<Vec<DiscoverCard>>, AppError> {
    Ok(Json(state.views.discover().await?))
}

/// A funding request with per-type totals derived from its transactions
#[utoipa::path(
    get,
    path = "/requests/{id}",
    params(("id" = Uuid, Path, description = "Funding request id")),
    responses(
        (status = 200, description = "Request summary", body = RequestSummary),
        (status = 404, description = "Funding request not found")
    )
)]
pub async fn request_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestSummary>, AppError> {
    Ok(Json(state.views.request_summary(id).await?))
}

/// A request's transactions grouped by type
#[utoipa::path(
    get,
    path = "/requests/{id}/transactions",
    params(("id" = Uuid, Path, description = "Funding request id")),
    responses(
        (status = 200, description = "Track record", body = BusinessTrackRecord),
        (status = 404, description = "Funding request not found")
    )
)]
pub async fn track_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BusinessTrackRecord>, AppError> {
    Ok(Json(state.views.business_track_record(id).await?))
}

/// Record a loan, donation, contribution or repayment against a request
#[utoipa::path(
    post,
    path = "/requests/{id}/transactions",
    request_body = RecordTransactionBody,
    params(
        ("id" = Uuid, Path, description = "Funding request id"),
        ("x-user-id" = String, Header, description = "Authenticated user id")
    ),
    responses(
        (status = 201, description = "Transaction recorded", body = Transaction),
        (status = 400, description = "Unknown transaction type"),
        (status = 401, description = "No authenticated user"),
        (status = 404, description = "Funding request not found"),
        (status = 409, description = "Concurrent writes kept conflicting; safe to retry"),
        (status = 422, description = "Amount is not a positive number"),
        (status = 503, description = "Ledger store unavailable; safe to retry")
    )
)]
#[tracing::instrument(skip(state, body), fields(contributor = %user.0))]
pub async fn record_transaction(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RecordTransactionBody>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let amount = parse_amount(&body.amount)?;
    let kind = TransactionType::parse(&body.kind)
        .ok_or_else(|| AppError::InvalidRequest(format!("unknown transaction type: {}", body.kind)))?;

    let cmd = RecordTransaction {
        funding_request_id: id,
        contributor_id: user.0,
        borrower_id: None,
        amount,
        kind,
    };
    match state.recorder.record_transaction(cmd).await {
        Ok(tx) => Ok((StatusCode::CREATED, Json(tx))),
        Err(LedgerError::RequestNotFound(_)) => {
            Err(AppError::NotFound("this project no longer accepts funding".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
