use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use super::community::generator;
use crate::error::AppError;
use crate::guidance::{self, FraudAnalysisInput, FraudAnalysisOutput};
use crate::store::{RequestFilter, TransactionFilter};
use crate::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FraudAnalysisBody {
    /// Log of user actions to review alongside the ledger
    #[serde(default)]
    pub user_actions: String,
}

/// Ask the text generator to flag suspicious activity across the ledger
#[utoipa::path(
    post,
    path = "/admin/fraud-analysis",
    request_body = FraudAnalysisBody,
    responses(
        (status = 200, description = "Summary of flagged activity; empty when nothing was flagged", body = FraudAnalysisOutput),
        (status = 502, description = "Text generation failed"),
        (status = 503, description = "Text generation not configured or store unavailable")
    )
)]
#[tracing::instrument(skip(state, body))]
pub async fn fraud_analysis(
    State(state): State<AppState>,
    Json(body): Json<FraudAnalysisBody>,
) -> Result<Json<FraudAnalysisOutput>, AppError> {
    let generator = generator(&state)?;

    let request_filter = RequestFilter::default();
    let transaction_filter = TransactionFilter::default();
    let (requests, transactions) = futures::try_join!(
        state.store.list_requests(&request_filter),
        state.store.query_transactions(&transaction_filter),
    )
    .map_err(crate::ledger::LedgerError::from)?;

    let input = FraudAnalysisInput {
        user_actions: body.user_actions,
        funding_requests: guidance::summarize_requests(&requests),
        transactions: guidance::summarize_transactions(&transactions),
    };
    let output = guidance::fraud_analysis(generator.as_ref(), &input).await?;
    if !output.flagged_activities.is_empty() {
        tracing::warn!("fraud analysis flagged activity");
    }
    Ok(Json(output))
}
