use axum::{extract::State, routing::get, Json, Router};
use tracing::{error, instrument, warn};

use super::dto::ProfileResponse;
use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile))
}

#[instrument(skip_all, fields(user_id = %identity.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = match state.users.find_by_id(identity.id).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("token refers to a missing user");
            return Err(ApiError::NotFound("User not found.".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_id failed");
            return Err(ApiError::Internal("Internal server error.".into()));
        }
    };

    Ok(Json(ProfileResponse {
        message: format!("Welcome, {}!", identity.email),
        user_id: identity.id,
        role: identity.role,
        balance: user.balance,
        account_status: user.status,
        referral_code: user.referral_code,
    }))
}
