use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{is_admin, AppState, AuthUser};
use crate::models::{ResidentResponse, ResidentsQuery, UpdateMemberRequest};
use crate::services::HouseholdService;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_residents))
        .route("/:id", put(update_member).delete(delete_resident))
}

/// Paged search across all residents
#[utoipa::path(
    get,
    path = "/api/v1/residents",
    tag = "residents",
    security(("bearer_auth" = [])),
    params(ResidentsQuery),
    responses(
        (status = 200, description = "Residents", body = Vec<ResidentResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_residents(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ResidentsQuery>,
) -> AppResult<Json<Vec<ResidentResponse>>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let residents = HouseholdService::list_residents(&state.pool, &query).await?;
    Ok(Json(residents))
}

/// Update a resident: personal fields, residency, host flag, transfer
#[utoipa::path(
    put,
    path = "/api/v1/residents/{id}",
    tag = "residents",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Resident ID")),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Resident updated", body = ResidentResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Resident or target apartment not found")
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMemberRequest>,
) -> AppResult<Json<ResidentResponse>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let resident = HouseholdService::update_member(&state.pool, id, payload).await?;
    Ok(Json(resident))
}

/// Delete a resident (hosts only once their apartment owes nothing)
#[utoipa::path(
    delete,
    path = "/api/v1/residents/{id}",
    tag = "residents",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Resident ID")),
    responses(
        (status = 200, description = "Resident removed"),
        (status = 400, description = "Host with unpaid invoices"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Resident not found")
    )
)]
pub async fn delete_resident(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    HouseholdService::delete_resident(&state.pool, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Resident deleted"
    })))
}
