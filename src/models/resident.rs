use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "resident_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResidentStatus {
    Permanent,
    TemporaryResident,
    TemporaryAbsent,
    MovedOut,
}

impl Default for ResidentStatus {
    fn default() -> Self {
        Self::Permanent
    }
}

/// A residency record. One person can appear as several rows, one per
/// apartment they live in or co-own.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Resident {
    pub id: Uuid,
    pub apartment_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub dob: Option<NaiveDate>,
    pub national_id: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub status: ResidentStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub relationship: String,
    pub is_host: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub dob: Option<NaiveDate>,
    pub national_id: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub relationship: Option<String>,
    pub status: Option<ResidentStatus>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMemberRequest {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub dob: Option<NaiveDate>,
    pub national_id: Option<String>,
    pub avatar: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub status: Option<ResidentStatus>,
    pub relationship: Option<String>,
    /// Explicit host flag. `Some(true)` demotes the target apartment's
    /// current host before promoting this resident.
    pub is_host: Option<bool>,
    /// Transfer target. Must name an existing apartment when set.
    pub new_room_number: Option<String>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ResidentResponse {
    pub id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub dob: Option<NaiveDate>,
    pub national_id: Option<String>,
    pub relationship: String,
    pub is_host: bool,
    pub status: ResidentStatus,
    pub room_number: String,
    pub building: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ResidentsQuery {
    /// Substring match on name, phone or apartment number.
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
