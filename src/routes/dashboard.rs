//! Per-viewer dashboards for contributors and borrowers.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppError;
use crate::ledger::{ContributorData, FundingRequest, Transaction};
use crate::AppState;

/// A contributor's contributions and stats
#[utoipa::path(
    get,
    path = "/contributors/{id}/dashboard",
    params(("id" = String, Path, description = "Contributor user id")),
    responses(
        (status = 200, description = "Contributions newest first, with stats", body = ContributorData),
        (status = 503, description = "Ledger store unavailable")
    )
)]
pub async fn contributor_dashboard(
    State(state): State<AppState>,
    Path(contributor_id): Path<String>,
) -> Result<Json<ContributorData>, AppError> {
    Ok(Json(state.views.contributor_data(&contributor_id).await?))
}

/// Repayments made by a borrower
#[utoipa::path(
    get,
    path = "/borrowers/{id}/repayments",
    params(("id" = String, Path, description = "Borrower user id")),
    responses(
        (status = 200, description = "Repayments, newest first", body = Vec<Transaction>)
    )
)]
pub async fn borrower_repayments(
    State(state): State<AppState>,
    Path(borrower_id): Path<String>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    Ok(Json(state.views.borrower_repayments(&borrower_id).await?))
}

/// Funding requests published by a borrower
#[utoipa::path(
    get,
    path = "/borrowers/{id}/requests",
    params(("id" = String, Path, description = "Borrower user id")),
    responses(
        (status = 200, description = "Requests, newest first", body = Vec<FundingRequest>)
    )
)]
pub async fn borrower_requests(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Vec<FundingRequest>>, AppError> {
    Ok(Json(state.views.borrower_requests(&owner_id).await?))
}
