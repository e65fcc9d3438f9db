use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AppState;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest, TokenResponse};
use crate::services::{AuthService, RefreshTokenService};

const REFRESH_COOKIE: &str = "refresh_token";
const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

/// Acknowledgement for logout and registration
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/register", post(register))
}

fn refresh_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .path(REFRESH_COOKIE_PATH)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(max_age_seconds))
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .path(REFRESH_COOKIE_PATH)
        .build()
}

/// Email/password login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; refresh cookie set", body = LoginResponse),
        (status = 401, description = "Wrong email or password"),
        (status = 422, description = "Malformed email")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let account = AuthService::get_account_by_email(&state.pool, &payload.email).await?;

    if !AuthService::verify_password(&payload.password, &account.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let auth_service = AuthService::new(state.config.clone());
    let access_token = auth_service.generate_access_token(&account)?;
    let refresh_token =
        RefreshTokenService::issue(&state.pool, account.id, state.config.refresh_token_ttl)
            .await?;

    let user = AuthService::build_user_detail(&state.pool, &account).await?;

    let jar = jar.add(refresh_cookie(
        refresh_token,
        state.config.refresh_token_ttl,
        state.config.cookie_secure,
    ));

    Ok((
        jar,
        Json(LoginResponse {
            token: access_token,
            user,
        }),
    ))
}

/// Rotate the refresh token and mint a new access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "New access token; rotated refresh cookie set", body = TokenResponse),
        (status = 401, description = "Refresh cookie missing, expired or already rotated")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<TokenResponse>)> {
    let old_token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    // Rotation invalidates the presented token; it is single-use
    let rotation =
        RefreshTokenService::rotate(&state.pool, &old_token, state.config.refresh_token_ttl)
            .await?;

    let account = AuthService::get_account_by_id(&state.pool, rotation.account_id).await?;
    let access_token = AuthService::new(state.config.clone()).generate_access_token(&account)?;

    let jar = jar.add(refresh_cookie(
        rotation.token,
        state.config.refresh_token_ttl,
        state.config.cookie_secure,
    ));

    Ok((jar, Json(TokenResponse { token: access_token })))
}

/// Log out: revoke the refresh token and clear the cookie
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Value>)> {
    // Revocation is idempotent: a stale or already-rotated cookie is fine
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        RefreshTokenService::revoke(&state.pool, cookie.value()).await?;
    }

    let jar = jar.remove(removal_cookie());

    Ok((
        jar,
        Json(json!({
            "success": true,
            "message": "Logged out"
        })),
    ))
}

/// Self-service account registration for an existing resident record
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Resident data mismatch"),
        (status = 404, description = "Unknown resident code"),
        (status = 409, description = "Account or email already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    AuthService::register(&state.pool, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account registered"
        })),
    ))
}
