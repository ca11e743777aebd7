use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::AppError;
use crate::guidance::{self, GuidanceError, GuidanceInput, GuidanceOutput, TextGenerator};
use crate::ledger::CommunityProgress;
use crate::AppState;

pub(crate) fn generator(state: &AppState) -> Result<Arc<dyn TextGenerator>, AppError> {
    state
        .guidance
        .clone()
        .ok_or_else(|| GuidanceError::NotConfigured.into())
}

/// Progress of the community funding goal over the trailing window
#[utoipa::path(
    get,
    path = "/community/progress",
    responses(
        (status = 200, description = "Funded count, top contributors and recent activity", body = CommunityProgress)
    )
)]
pub async fn community_progress(State(state): State<AppState>) -> Result<Json<CommunityProgress>, AppError> {
    Ok(Json(state.views.community_progress(state.community).await?))
}

/// Suggestions for how members can help reach the community goal
#[utoipa::path(
    post,
    path = "/community/guidance",
    request_body = GuidanceInput,
    responses(
        (status = 200, description = "Generated guidance", body = GuidanceOutput),
        (status = 400, description = "Empty goal description"),
        (status = 502, description = "Text generation failed"),
        (status = 503, description = "Text generation not configured")
    )
)]
#[tracing::instrument(skip(state, input))]
pub async fn contribution_guidance(
    State(state): State<AppState>,
    Json(input): Json<GuidanceInput>,
) -> Result<Json<GuidanceOutput>, AppError> {
    let generator = generator(&state)?;
    let output = guidance::contribution_guidance(generator.as_ref(), &input).await?;
    Ok(Json(output))
}
