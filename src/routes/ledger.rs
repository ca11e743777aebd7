use axum::{extract::State, Json};

use crate::error::AppError;
use crate::ledger::PublicLedgerEntry;
use crate::AppState;

/// Every transaction on the platform with display names in place of ids
#[utoipa::path(
    get,
    path = "/ledger",
    responses(
        (status = 200, description = "Public ledger, newest first", body = Vec<PublicLedgerEntry>),
        (status = 503, description = "Ledger store unavailable")
    ),
    description = "Public view of the ledger. Repayments flow from the business to the platform; every other transaction flows from the contributor to the business."
)]
pub async fn public_ledger(State(state): State<AppState>) -> Result<Json<Vec<PublicLedgerEntry>>, AppError> {
    let entries = state.views.public_ledger().await?;
    tracing::debug!(entries = entries.len(), "public ledger served");
    Ok(Json(entries))
}
