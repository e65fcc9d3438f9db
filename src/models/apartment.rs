use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "apartment_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApartmentStatus {
    Empty,
    Occupied,
    Maintenance,
}

impl Default for ApartmentStatus {
    fn default() -> Self {
        Self::Occupied
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "apartment_type", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApartmentType {
    Normal,
    Penthouse,
    Kiot,
    Office,
}

impl Default for ApartmentType {
    fn default() -> Self {
        Self::Normal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Apartment {
    pub id: Uuid,
    pub number: String,
    pub building: Option<String>,
    pub floor: Option<i32>,
    pub area: Option<Decimal>,
    pub status: ApartmentStatus,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub apartment_type: ApartmentType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload for a household (apartment + its host).
#[derive(Debug, Deserialize, ToSchema)]
pub struct HouseholdRequest {
    pub room_number: String,
    pub owner_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub area: Option<Decimal>,
    pub building: Option<String>,
    pub floor: Option<i32>,
    pub status: Option<ApartmentStatus>,
    #[serde(rename = "type")]
    pub apartment_type: Option<ApartmentType>,
}

/// Household projection: apartment attributes plus its host resident.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct HouseholdResponse {
    pub id: Uuid,
    pub room_number: String,
    pub owner_name: Option<String>,
    pub phone_number: Option<String>,
    pub area: Option<Decimal>,
    pub member_count: i64,
    pub building: Option<String>,
    pub floor: Option<i32>,
    pub status: ApartmentStatus,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub apartment_type: ApartmentType,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct HouseholdsQuery {
    /// Substring match on apartment number or host name.
    pub search: Option<String>,
}
