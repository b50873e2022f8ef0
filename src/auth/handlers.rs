use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::Identity,
        dto::{present, AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        referral::{self, GATE_CODE},
        repo::StoreError,
        repo_types::{NewUser, User, DEFAULT_ROLE},
    },
    error::ApiError,
    state::AppState,
};

const REGISTER_MISSING: &str = "Email, password, and referral code are required.";
const REGISTER_FAILED: &str = "Internal server error during registration.";
const LOGIN_MISSING: &str = "Email and password are required.";
const LOGIN_FAILED: &str = "Internal server error during login.";
const INVALID_CREDENTIALS: &str = "Invalid credentials.";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

fn internal(message: &str, step: &str, e: impl std::fmt::Display) -> ApiError {
    error!(error = %e, step, "request failed");
    ApiError::Internal(message.into())
}

fn identity_of(user: &User) -> Identity {
    Identity {
        id: user.id,
        email: user.email.clone(),
        role: user.role.clone(),
    }
}

fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "unreadable register body");
        ApiError::BadRequest(REGISTER_MISSING.into())
    })?;

    let (Some(email), Some(password), Some(referred_by)) = (
        present(payload.email),
        present(payload.password),
        present(payload.referral_code),
    ) else {
        warn!("register missing fields");
        return Err(ApiError::BadRequest(REGISTER_MISSING.into()));
    };

    // Every registration must carry the global gate code; it is not checked
    // against any existing user's own referral code.
    if referred_by != GATE_CODE {
        warn!(email = %email, "invalid global referral code");
        return Err(ApiError::BadRequest("Invalid global referral code.".into()));
    }

    match state.users.find_by_email(&email).await {
        Ok(Some(_)) => {
            warn!(email = %email, "email already registered");
            return Err(ApiError::Conflict("User with this email already exists.".into()));
        }
        Ok(None) => {}
        Err(e) => return Err(internal(REGISTER_FAILED, "find_by_email", e)),
    }

    let password_hash = state
        .hasher
        .hash_async(password)
        .await
        .map_err(|e| internal(REGISTER_FAILED, "hash_password", e))?;

    let referral_code = referral::generate_unique(state.users.as_ref())
        .await
        .map_err(|e| internal(REGISTER_FAILED, "generate_referral_code", e))?;

    let user = state
        .users
        .create(NewUser {
            id: Uuid::new_v4(),
            email,
            password_hash,
            role: DEFAULT_ROLE.into(),
            referral_code,
            referred_by: Some(referred_by),
            created_at: now_millis(),
        })
        .await
        .map_err(|e| match e {
            StoreError::DuplicateEmail => {
                warn!("email claimed by a concurrent registration");
                ApiError::Conflict("User with this email already exists.".into())
            }
            StoreError::DuplicateReferralCode => {
                warn!("referral code claimed by a concurrent registration");
                ApiError::Conflict("Referral code collision, please retry.".into())
            }
            other => internal(REGISTER_FAILED, "create_user", other),
        })?;

    let token = state
        .jwt
        .issue(&identity_of(&user))
        .map_err(|e| internal(REGISTER_FAILED, "jwt_sign", e))?;

    info!(user_id = %user.id, email = %user.email, referral_code = %user.referral_code, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful.".into(),
            token,
            user: PublicUser::with_referral_code(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        warn!(error = %e, "unreadable login body");
        ApiError::BadRequest(LOGIN_MISSING.into())
    })?;

    let (Some(email), Some(password)) = (present(payload.email), present(payload.password)) else {
        warn!("login missing fields");
        return Err(ApiError::BadRequest(LOGIN_MISSING.into()));
    };

    let user = match state.users.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        Err(e) => return Err(internal(LOGIN_FAILED, "find_by_email", e)),
    };

    let ok = state
        .hasher
        .verify_async(password, user.password_hash.clone())
        .await
        .map_err(|e| internal(LOGIN_FAILED, "verify_password", e))?;

    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let token = state
        .jwt
        .issue(&identity_of(&user))
        .map_err(|e| internal(LOGIN_FAILED, "jwt_sign", e))?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful.".into(),
        token,
        user: PublicUser::from(&user),
    }))
}
