use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::ActingUser;
use crate::error::AppError;
use crate::ledger::UserProfile;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUserBody {
    /// Name shown on the public ledger; blank clears it
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Register or update the display name for the calling user
#[utoipa::path(
    put,
    path = "/users/{id}",
    request_body = RegisterUserBody,
    params(
        ("id" = String, Path, description = "User id"),
        ("x-user-id" = String, Header, description = "Authenticated user id; must match the path")
    ),
    responses(
        (status = 200, description = "Profile stored", body = UserProfile),
        (status = 401, description = "No authenticated user or a different user")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    user: ActingUser,
    Path(id): Path<String>,
    Json(body): Json<RegisterUserBody>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    if user.0 != id {
        return Err(AppError::Unauthorized("cannot update another user's profile".to_string()));
    }
    let profile = UserProfile {
        id,
        display_name: body.display_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
    };
    state.recorder.register_user(profile.clone()).await?;
    Ok((StatusCode::OK, Json(profile)))
}
