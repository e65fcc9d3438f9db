use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{is_admin, AppState, AuthUser};
use crate::models::{Fee, FeeRequest};
use crate::services::FeeService;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_fees).post(create_fee))
        .route("/:id", get(get_fee).put(update_fee).delete(delete_fee))
}

/// Fee catalog
#[utoipa::path(
    get,
    path = "/api/v1/fees",
    tag = "fees",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Fee catalog", body = Vec<Fee>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_fees(
    State(state): State<AppState>,
    _auth_user: AuthUser,
) -> AppResult<Json<Vec<Fee>>> {
    let fees = FeeService::list(&state.pool).await?;
    Ok(Json(fees))
}

/// Single fee
#[utoipa::path(
    get,
    path = "/api/v1/fees/{id}",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Fee ID")),
    responses(
        (status = 200, description = "Fee", body = Fee),
        (status = 404, description = "Fee not found")
    )
)]
pub async fn get_fee(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Fee>> {
    let fee = FeeService::get(&state.pool, id).await?;
    Ok(Json(fee))
}

/// Create a fee type
#[utoipa::path(
    post,
    path = "/api/v1/fees",
    tag = "fees",
    security(("bearer_auth" = [])),
    request_body = FeeRequest,
    responses(
        (status = 200, description = "Fee created", body = Fee),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Fee name already exists")
    )
)]
pub async fn create_fee(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<FeeRequest>,
) -> AppResult<Json<Fee>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let fee = FeeService::create(&state.pool, payload).await?;
    Ok(Json(fee))
}

/// Update a fee type. The new unit price only affects invoices created
/// (or lines edited) afterwards.
#[utoipa::path(
    put,
    path = "/api/v1/fees/{id}",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Fee ID")),
    request_body = FeeRequest,
    responses(
        (status = 200, description = "Fee updated", body = Fee),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Fee not found"),
        (status = 409, description = "Fee name already in use")
    )
)]
pub async fn update_fee(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeeRequest>,
) -> AppResult<Json<Fee>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let fee = FeeService::update(&state.pool, id, payload).await?;
    Ok(Json(fee))
}

/// Delete a fee type that has never been billed
#[utoipa::path(
    delete,
    path = "/api/v1/fees/{id}",
    tag = "fees",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Fee ID")),
    responses(
        (status = 200, description = "Fee deleted"),
        (status = 400, description = "Fee is used by existing invoices"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Fee not found")
    )
)]
pub async fn delete_fee(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    FeeService::delete(&state.pool, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Fee deleted"
    })))
}
