use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Reference catalog entry. Unit price is snapshotted into invoice lines,
/// so later edits only affect future invoices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fee {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub unit: Option<String>,
    pub billing_cycle: Option<String>,
    pub is_mandatory: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FeeRequest {
    pub name: String,
    pub description: Option<String>,
    pub unit_price: Decimal,
    pub unit: Option<String>,
    pub billing_cycle: Option<String>,
    #[serde(default)]
    pub is_mandatory: bool,
}
