use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{is_admin, AppState, AuthUser};
use crate::models::{
    ApplyPaymentRequest, CreateInvoiceRequest, InvoiceResponse, InvoicesQuery, PaymentResponse,
    UpdateDetailRequest, UpdateInvoiceRequest,
};
use crate::services::{AuthService, InvoiceService};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route(
            "/:id",
            get(get_invoice).put(update_invoice).delete(delete_invoice),
        )
        .route("/:id/payments", post(apply_payment))
        .route(
            "/details/:detail_id",
            put(update_invoice_detail).delete(delete_invoice_detail),
        )
}

/// Non-admin callers only ever see or settle invoices of the apartment
/// their own resident record belongs to.
async fn ensure_own_invoice(
    state: &AppState,
    auth_user: &AuthUser,
    invoice_id: Uuid,
) -> AppResult<()> {
    if is_admin(&auth_user.role) {
        return Ok(());
    }

    let row: Option<(Uuid,)> = sqlx::query_as("SELECT apartment_id FROM invoices WHERE id = $1")
        .bind(invoice_id)
        .fetch_optional(&state.pool)
        .await?;
    let apartment_id = row
        .map(|(id,)| id)
        .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice_id)))?;

    let own = AuthService::resolve_own_apartment(&state.pool, auth_user.account_id).await?;
    if own != Some(apartment_id) {
        return Err(AppError::Forbidden);
    }

    Ok(())
}

/// Filtered invoice listing. Residents are pinned to their own apartment.
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(InvoicesQuery),
    responses(
        (status = 200, description = "Invoices", body = Vec<InvoiceResponse>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<InvoicesQuery>,
) -> AppResult<Json<Vec<InvoiceResponse>>> {
    let apartment_filter = if is_admin(&auth_user.role) {
        query.apartment_id
    } else {
        // The caller's own apartment is mandatory here; any apartment_id
        // they supplied themselves is discarded
        match AuthService::resolve_own_apartment(&state.pool, auth_user.account_id).await? {
            Some(own) => Some(own),
            // Not attached to any household yet
            None => return Ok(Json(Vec::new())),
        }
    };

    let invoices = InvoiceService::list_invoices(&state.pool, apartment_filter, &query).await?;
    Ok(Json(invoices))
}

/// Create an invoice from fee selections
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    tag = "invoices",
    security(("bearer_auth" = [])),
    request_body = CreateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice created", body = InvoiceResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Apartment or fee not found"),
        (status = 409, description = "Invoice for this month already exists")
    )
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<CreateInvoiceRequest>,
) -> AppResult<Json<InvoiceResponse>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let invoice = InvoiceService::create_invoice(&state.pool, payload).await?;
    Ok(Json(invoice))
}

/// Invoice detail with its fee lines
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice", body = InvoiceResponse),
        (status = 403, description = "Not your invoice"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InvoiceResponse>> {
    ensure_own_invoice(&state, &auth_user, id).await?;

    let invoice = InvoiceService::get_invoice(&state.pool, id).await?;
    Ok(Json(invoice))
}

/// Change the due date
#[utoipa::path(
    put,
    path = "/api/v1/invoices/{id}",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = UpdateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice updated", body = InvoiceResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> AppResult<Json<InvoiceResponse>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let invoice = InvoiceService::update_invoice(&state.pool, id, payload).await?;
    Ok(Json(invoice))
}

/// Delete an invoice that is still fully unpaid and has no payment rows
#[utoipa::path(
    delete,
    path = "/api/v1/invoices/{id}",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice deleted"),
        (status = 400, description = "Invoice is partially or fully paid"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn delete_invoice(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    InvoiceService::delete_invoice(&state.pool, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Invoice deleted"
    })))
}

/// Record a settlement against an invoice
#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/payments",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Invoice ID")),
    request_body = ApplyPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Already paid, or amount exceeds the remaining balance"),
        (status = 403, description = "Not your invoice"),
        (status = 404, description = "Invoice not found")
    )
)]
pub async fn apply_payment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApplyPaymentRequest>,
) -> AppResult<Json<PaymentResponse>> {
    ensure_own_invoice(&state, &auth_user, id).await?;

    let payment = InvoiceService::apply_payment(&state.pool, id, payload).await?;
    Ok(Json(payment))
}

/// Change a line's quantity; re-snapshots the fee's current price
#[utoipa::path(
    put,
    path = "/api/v1/invoices/details/{detail_id}",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(("detail_id" = Uuid, Path, description = "Invoice detail ID")),
    request_body = UpdateDetailRequest,
    responses(
        (status = 200, description = "Line updated, totals recomputed", body = InvoiceResponse),
        (status = 400, description = "Invoice already settled"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Detail not found")
    )
)]
pub async fn update_invoice_detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(detail_id): Path<Uuid>,
    Json(payload): Json<UpdateDetailRequest>,
) -> AppResult<Json<InvoiceResponse>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let invoice =
        InvoiceService::update_invoice_detail(&state.pool, detail_id, payload.quantity).await?;
    Ok(Json(invoice))
}

/// Remove a line; the parent total is recomputed (empty sum is zero)
#[utoipa::path(
    delete,
    path = "/api/v1/invoices/details/{detail_id}",
    tag = "invoices",
    security(("bearer_auth" = [])),
    params(("detail_id" = Uuid, Path, description = "Invoice detail ID")),
    responses(
        (status = 200, description = "Line removed, totals recomputed", body = InvoiceResponse),
        (status = 400, description = "Invoice already settled"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Detail not found")
    )
)]
pub async fn delete_invoice_detail(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(detail_id): Path<Uuid>,
) -> AppResult<Json<InvoiceResponse>> {
    if !is_admin(&auth_user.role) {
        return Err(AppError::Forbidden);
    }

    let invoice = InvoiceService::delete_invoice_detail(&state.pool, detail_id).await?;
    Ok(Json(invoice))
}
