use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::ActingUser;
use crate::error::AppError;
use crate::ledger::{BusinessProfile, NewBusiness};
use crate::AppState;

/// Business profile submitted by a borrower
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBusinessBody {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Register a business owned by the calling user
#[utoipa::path(
    post,
    path = "/businesses",
    request_body = CreateBusinessBody,
    params(("x-user-id" = String, Header, description = "Authenticated user id")),
    responses(
        (status = 201, description = "Business created", body = BusinessProfile),
        (status = 400, description = "Missing business name"),
        (status = 401, description = "No authenticated user")
    )
)]
#[tracing::instrument(skip(state, body), fields(owner = %user.0))]
pub async fn create_business(
    State(state): State<AppState>,
    user: ActingUser,
    Json(body): Json<CreateBusinessBody>,
) -> Result<(StatusCode, Json<BusinessProfile>), AppError> {
    let business = state
        .recorder
        .create_business(NewBusiness {
            owner_id: user.0,
            name: body.name.trim().to_string(),
            category: non_blank(body.category),
            description: non_blank(body.description),
            location: non_blank(body.location),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(business)))
}

/// List the businesses owned by a borrower
#[utoipa::path(
    get,
    path = "/borrowers/{id}/businesses",
    params(("id" = String, Path, description = "Borrower user id")),
    responses(
        (status = 200, description = "Businesses owned by the borrower", body = Vec<BusinessProfile>)
    )
)]
pub async fn borrower_businesses(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<Vec<BusinessProfile>>, AppError> {
    Ok(Json(state.views.borrower_businesses(&owner_id).await?))
}
