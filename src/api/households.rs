use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{is_admin, AppState, AuthUser};
use crate::models::{
    AddMemberRequest, HouseholdRequest, HouseholdResponse, HouseholdsQuery, ResidentResponse,
};
use crate::services::{AuthService, HouseholdService};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_households).post(create_household))
        .route(
            "/:id",
            get(get_household)
                .put(update_household)
                .delete(delete_household),
        )
        .route("/:id/members", get(get_members).post(add_member))
}

/// Residents may only look at their own household
async fn ensure_own_household(
    state: &AppState,
    auth_user: &AuthUser,
    apartment_id: Uuid,
) -> AppResult<()> {
    if is_admin(&auth_user.role) {
        return Ok(());
    }
    let own = AuthService::resolve_own_apartment(&state.pool, auth_user.account_id).await?;
    if own != Some(apartment_id) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// List households, optionally filtered by apartment number or host name
#[utoipa::path(
    get,
    path = "/api/v1/households",
    tag = "households",
    security(("bearer_auth" = [])),
    params(HouseholdsQuery),
    responses(
        (status = 200, description = "Household list", body = Vec<HouseholdResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_households(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<HouseholdsQuery>,
) -> AppResult<Json<Vec<HouseholdResponse>>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let households = HouseholdService::get_households(&state.pool, query.search).await?;
    Ok(Json(households))
}

/// Create a household: the apartment plus its host resident
#[utoipa::path(
    post,
    path = "/api/v1/households",
    tag = "households",
    security(("bearer_auth" = [])),
    request_body = HouseholdRequest,
    responses(
        (status = 200, description = "Household created", body = HouseholdResponse),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Apartment number already exists")
    )
)]
pub async fn create_household(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<HouseholdRequest>,
) -> AppResult<Json<HouseholdResponse>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let household = HouseholdService::create_household(&state.pool, payload).await?;
    Ok(Json(household))
}

/// Household detail
#[utoipa::path(
    get,
    path = "/api/v1/households/{id}",
    tag = "households",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Household ID")),
    responses(
        (status = 200, description = "Household", body = HouseholdResponse),
        (status = 403, description = "Not your household"),
        (status = 404, description = "Household not found")
    )
)]
pub async fn get_household(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<HouseholdResponse>> {
    ensure_own_household(&state, &auth_user, id).await?;

    let household = HouseholdService::get_household(&state.pool, id).await?;
    Ok(Json(household))
}

/// Update apartment attributes and the host's contact details
#[utoipa::path(
    put,
    path = "/api/v1/households/{id}",
    tag = "households",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Household ID")),
    request_body = HouseholdRequest,
    responses(
        (status = 200, description = "Household updated", body = HouseholdResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Household or host missing"),
        (status = 409, description = "New room number already in use")
    )
)]
pub async fn update_household(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<HouseholdRequest>,
) -> AppResult<Json<HouseholdResponse>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let household = HouseholdService::update_household(&state.pool, id, payload).await?;
    Ok(Json(household))
}

/// Delete a household and everything that depends on it
#[utoipa::path(
    delete,
    path = "/api/v1/households/{id}",
    tag = "households",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Household ID")),
    responses(
        (status = 200, description = "Household, residents and accounts removed"),
        (status = 400, description = "Invoice history exists"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Household not found")
    )
)]
pub async fn delete_household(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    HouseholdService::delete_household(&state.pool, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Household deleted"
    })))
}

/// Roster of a household
#[utoipa::path(
    get,
    path = "/api/v1/households/{id}/members",
    tag = "households",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Household ID")),
    responses(
        (status = 200, description = "Members", body = Vec<ResidentResponse>),
        (status = 403, description = "Not your household"),
        (status = 404, description = "Household not found")
    )
)]
pub async fn get_members(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ResidentResponse>>> {
    ensure_own_household(&state, &auth_user, id).await?;

    let members = HouseholdService::get_members(&state.pool, id).await?;
    Ok(Json(members))
}

/// Add a member to a household
#[utoipa::path(
    post,
    path = "/api/v1/households/{id}/members",
    tag = "households",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Household ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 200, description = "Member added", body = ResidentResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Household not found")
    )
)]
pub async fn add_member(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> AppResult<Json<ResidentResponse>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let member = HouseholdService::add_member(&state.pool, id, payload).await?;
    Ok(Json(member))
}
