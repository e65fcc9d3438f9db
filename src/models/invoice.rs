use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Other,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        Self::Cash
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Success,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    pub apartment_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub due_date: Option<NaiveDate>,
    /// Cached sum of detail amounts; maintained by the ledger recompute.
    pub total_amount: Decimal,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InvoiceDetail {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub fee_id: Uuid,
    pub quantity: Decimal,
    /// Unit price snapshot at creation (or last edit) times quantity.
    pub amount: Decimal,
}

/// Append-only settlement record; never edited or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount_paid: Decimal,
    pub paid_at: DateTime<Utc>,
    pub method: PaymentMethod,
    pub transaction_status: TransactionStatus,
    pub external_tx_id: Option<String>,
}

// DTOs
#[derive(Debug, Deserialize, ToSchema)]
pub struct FeeItemRequest {
    pub fee_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    pub apartment_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<FeeItemRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInvoiceRequest {
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDetailRequest {
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApplyPaymentRequest {
    /// Omitted means "pay the remaining balance in full".
    pub amount: Option<Decimal>,
    pub method: Option<PaymentMethod>,
    pub external_tx_id: Option<String>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct InvoiceDetailResponse {
    pub id: Uuid,
    pub fee_name: String,
    pub unit_price: Decimal,
    pub unit: Option<String>,
    pub quantity: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub title: String,
    pub room_number: String,
    pub month: i32,
    pub year: i32,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    pub total_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<InvoiceDetailResponse>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount_paid: Decimal,
    pub paid_at: DateTime<Utc>,
    pub method: PaymentMethod,
    pub transaction_status: TransactionStatus,
    /// Invoice status after this payment was applied.
    pub invoice_status: InvoiceStatus,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct InvoicesQuery {
    pub apartment_id: Option<Uuid>,
    pub month: Option<i32>,
    pub year: Option<i32>,
    pub status: Option<InvoiceStatus>,
    /// Substring match on apartment number.
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
