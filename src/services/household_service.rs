use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    AddMemberRequest, Apartment, HouseholdRequest, HouseholdResponse, Resident, ResidentResponse,
    ResidentStatus, ResidentsQuery, UpdateMemberRequest,
};
use crate::services::InvoiceService;

/// Relationship labels managed automatically by host promotion/demotion.
/// Custom labels entered by operators are never rewritten.
pub const HOST_RELATIONSHIP: &str = "host";
pub const MEMBER_RELATIONSHIP: &str = "member";

/// Replacement label for a demoted host. `None` keeps the current label.
fn demoted_relationship(current: &str) -> Option<&'static str> {
    (current == HOST_RELATIONSHIP).then_some(MEMBER_RELATIONSHIP)
}

const HOUSEHOLD_PROJECTION: &str = r#"
    SELECT a.id, a.number AS room_number, h.name AS owner_name, h.phone AS phone_number,
           a.area, a.building, a.floor, a.status, a.type,
           (SELECT COUNT(*) FROM residents r WHERE r.apartment_id = a.id) AS member_count
    FROM apartments a
    LEFT JOIN residents h ON h.apartment_id = a.id AND h.is_host
"#;

pub struct HouseholdService;

impl HouseholdService {
    /// Oldest resident row carrying this phone number, if the person is
    /// already known to the system.
    async fn find_profile_by_phone(
        tx: &mut Transaction<'_, Postgres>,
        phone: &str,
    ) -> AppResult<Option<Resident>> {
        let resident = sqlx::query_as::<_, Resident>(
            "SELECT * FROM residents WHERE phone = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(resident)
    }

    pub async fn get_households(
        pool: &PgPool,
        search: Option<String>,
    ) -> AppResult<Vec<HouseholdResponse>> {
        let sql = format!(
            r#"{HOUSEHOLD_PROJECTION}
            WHERE $1::text IS NULL OR $1 = ''
               OR a.number ILIKE '%' || $1 || '%'
               OR h.name ILIKE '%' || $1 || '%'
            ORDER BY a.number
            "#
        );

        let households = sqlx::query_as::<_, HouseholdResponse>(&sql)
            .bind(search)
            .fetch_all(pool)
            .await?;

        Ok(households)
    }

    pub async fn get_household(pool: &PgPool, id: Uuid) -> AppResult<HouseholdResponse> {
        let sql = format!("{HOUSEHOLD_PROJECTION} WHERE a.id = $1");

        sqlx::query_as::<_, HouseholdResponse>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Household {} not found", id)))
    }

    pub async fn create_household(
        pool: &PgPool,
        req: HouseholdRequest,
    ) -> AppResult<HouseholdResponse> {
        let mut tx = pool.begin().await?;

        let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM apartments WHERE number = $1")
            .bind(&req.room_number)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict(format!(
                "Apartment {} already exists",
                req.room_number
            )));
        }

        let apartment = sqlx::query_as::<_, Apartment>(
            r#"
            INSERT INTO apartments (number, building, floor, area, status, type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&req.room_number)
        .bind(&req.building)
        .bind(req.floor)
        .bind(req.area)
        .bind(req.status.clone().unwrap_or_default())
        .bind(req.apartment_type.clone().unwrap_or_default())
        .fetch_one(&mut *tx)
        .await?;

        // Host resolution: a phone number already in the system means this
        // person exists elsewhere (multi-property owner). Their personal
        // profile is copied into a fresh apartment-scoped row; residents
        // are per-apartment facts, not globally unique people.
        let prior = Self::find_profile_by_phone(&mut tx, &req.phone_number).await?;

        let host = match prior {
            Some(prior) => {
                let (prior_room,): (String,) =
                    sqlx::query_as("SELECT number FROM apartments WHERE id = $1")
                        .bind(prior.apartment_id)
                        .fetch_one(&mut *tx)
                        .await?;

                sqlx::query_as::<_, Resident>(
                    r#"
                    INSERT INTO residents
                        (apartment_id, name, phone, email, dob, national_id, avatar, address,
                         note, status, start_date, relationship, is_host)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, CURRENT_DATE, $11, TRUE)
                    RETURNING *
                    "#,
                )
                .bind(apartment.id)
                .bind(&prior.name)
                .bind(&req.phone_number)
                .bind(&prior.email)
                .bind(prior.dob)
                .bind(&prior.national_id)
                .bind(&prior.avatar)
                .bind(&prior.address)
                .bind(format!("Co-owner of apartment {}", prior_room))
                .bind(ResidentStatus::Permanent)
                .bind(HOST_RELATIONSHIP)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, Resident>(
                    r#"
                    INSERT INTO residents
                        (apartment_id, name, phone, email, status, start_date, relationship, is_host)
                    VALUES ($1, $2, $3, $4, $5, CURRENT_DATE, $6, TRUE)
                    RETURNING *
                    "#,
                )
                .bind(apartment.id)
                .bind(&req.owner_name)
                .bind(&req.phone_number)
                .bind(&req.email)
                .bind(ResidentStatus::Permanent)
                .bind(HOST_RELATIONSHIP)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        Ok(HouseholdResponse {
            id: apartment.id,
            room_number: apartment.number,
            owner_name: Some(host.name),
            phone_number: Some(host.phone),
            area: apartment.area,
            member_count: 1,
            building: apartment.building,
            floor: apartment.floor,
            status: apartment.status,
            apartment_type: apartment.apartment_type,
        })
    }

    pub async fn update_household(
        pool: &PgPool,
        id: Uuid,
        req: HouseholdRequest,
    ) -> AppResult<HouseholdResponse> {
        let mut tx = pool.begin().await?;

        let apartment = sqlx::query_as::<_, Apartment>("SELECT * FROM apartments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Apartment {} not found", id)))?;

        // Room number uniqueness is only re-checked when it actually changes
        if apartment.number != req.room_number {
            let taken: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM apartments WHERE number = $1")
                    .bind(&req.room_number)
                    .fetch_optional(&mut *tx)
                    .await?;
            if taken.is_some() {
                return Err(AppError::Conflict(format!(
                    "Room number {} is already in use by another apartment",
                    req.room_number
                )));
            }
        }

        let apartment = sqlx::query_as::<_, Apartment>(
            r#"
            UPDATE apartments
            SET number = $2,
                area = $3,
                building = COALESCE($4, building),
                floor = COALESCE($5, floor),
                status = COALESCE($6, status),
                type = COALESCE($7, type),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.room_number)
        .bind(req.area)
        .bind(&req.building)
        .bind(req.floor)
        .bind(req.status.clone())
        .bind(req.apartment_type.clone())
        .fetch_one(&mut *tx)
        .await?;

        // A household with no host row is corrupt data. It is surfaced as
        // an error, never silently repaired.
        let host = sqlx::query_as::<_, Resident>(
            "SELECT * FROM residents WHERE apartment_id = $1 AND is_host",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Data integrity fault: apartment {} has no host resident",
                apartment.number
            ))
        })?;

        let host = sqlx::query_as::<_, Resident>(
            r#"
            UPDATE residents
            SET name = $2, phone = $3, email = COALESCE($4, email)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(host.id)
        .bind(&req.owner_name)
        .bind(&req.phone_number)
        .bind(&req.email)
        .fetch_one(&mut *tx)
        .await?;

        let (member_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM residents WHERE apartment_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(HouseholdResponse {
            id: apartment.id,
            room_number: apartment.number,
            owner_name: Some(host.name),
            phone_number: Some(host.phone),
            area: apartment.area,
            member_count,
            building: apartment.building,
            floor: apartment.floor,
            status: apartment.status,
            apartment_type: apartment.apartment_type,
        })
    }

    /// Deleting a household cascades over its residents and their login
    /// accounts. Refused outright once any invoice exists: financial
    /// history must survive the apartment record.
    pub async fn delete_household(pool: &PgPool, id: Uuid) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM apartments WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Apartment {} not found", id)));
        }

        if InvoiceService::has_invoices(&mut tx, id).await? {
            return Err(AppError::BadRequest(
                "Cannot delete this apartment: invoices have been issued for it. \
                 Mark it as empty instead of deleting."
                    .to_string(),
            ));
        }

        sqlx::query(
            "DELETE FROM user_accounts WHERE resident_id IN \
             (SELECT id FROM residents WHERE apartment_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM residents WHERE apartment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM apartments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn get_members(
        pool: &PgPool,
        apartment_id: Uuid,
    ) -> AppResult<Vec<ResidentResponse>> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM apartments WHERE id = $1")
            .bind(apartment_id)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Household {} not found",
                apartment_id
            )));
        }

        let members = sqlx::query_as::<_, ResidentResponse>(
            r#"
            SELECT r.id, r.name, r.phone AS phone_number, r.email, r.dob, r.national_id,
                   r.relationship, r.is_host, r.status, a.number AS room_number, a.building
            FROM residents r
            JOIN apartments a ON a.id = r.apartment_id
            WHERE r.apartment_id = $1
            ORDER BY r.is_host DESC, r.name
            "#,
        )
        .bind(apartment_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    pub async fn add_member(
        pool: &PgPool,
        apartment_id: Uuid,
        req: AddMemberRequest,
    ) -> AppResult<ResidentResponse> {
        let mut tx = pool.begin().await?;

        let apartment = sqlx::query_as::<_, Apartment>("SELECT * FROM apartments WHERE id = $1")
            .bind(apartment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Apartment {} not found", apartment_id)))?;

        // Same profile-reuse rule as household creation, but never a host
        let prior = Self::find_profile_by_phone(&mut tx, &req.phone_number).await?;

        let relationship = req
            .relationship
            .unwrap_or_else(|| MEMBER_RELATIONSHIP.to_string());
        let status = req.status.unwrap_or_default();

        let member = match prior {
            Some(prior) => {
                sqlx::query_as::<_, Resident>(
                    r#"
                    INSERT INTO residents
                        (apartment_id, name, phone, email, dob, national_id, avatar, address,
                         note, status, start_date, relationship, is_host)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, CURRENT_DATE, $11, FALSE)
                    RETURNING *
                    "#,
                )
                .bind(apartment.id)
                .bind(&prior.name)
                .bind(&req.phone_number)
                .bind(&prior.email)
                .bind(prior.dob)
                .bind(&prior.national_id)
                .bind(&prior.avatar)
                .bind(&prior.address)
                .bind(&req.note)
                .bind(status)
                .bind(&relationship)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, Resident>(
                    r#"
                    INSERT INTO residents
                        (apartment_id, name, phone, email, dob, national_id, avatar, address,
                         note, status, start_date, relationship, is_host)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, CURRENT_DATE, $11, FALSE)
                    RETURNING *
                    "#,
                )
                .bind(apartment.id)
                .bind(&req.name)
                .bind(&req.phone_number)
                .bind(&req.email)
                .bind(req.dob)
                .bind(&req.national_id)
                .bind(&req.avatar)
                .bind(&req.address)
                .bind(&req.note)
                .bind(status)
                .bind(&relationship)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;

        Ok(ResidentResponse {
            id: member.id,
            name: member.name,
            phone_number: member.phone,
            email: member.email,
            dob: member.dob,
            national_id: member.national_id,
            relationship: member.relationship,
            is_host: member.is_host,
            status: member.status,
            room_number: apartment.number,
            building: apartment.building,
        })
    }

    /// The richest transition in the registry: optional apartment transfer
    /// and optional host reassignment, atomically. The target apartment
    /// never ends the call with two hosts because the old host is demoted
    /// before the promotion is written, inside the same transaction.
    pub async fn update_member(
        pool: &PgPool,
        resident_id: Uuid,
        req: UpdateMemberRequest,
    ) -> AppResult<ResidentResponse> {
        let mut tx = pool.begin().await?;

        let mut resident = sqlx::query_as::<_, Resident>("SELECT * FROM residents WHERE id = $1")
            .bind(resident_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resident {} not found", resident_id)))?;

        let current_apartment =
            sqlx::query_as::<_, Apartment>("SELECT * FROM apartments WHERE id = $1")
                .bind(resident.apartment_id)
                .fetch_one(&mut *tx)
                .await?;

        // Resolve the target: the current home unless a different, existing
        // apartment is named
        let target_id = match &req.new_room_number {
            Some(number) if !number.is_empty() && *number != current_apartment.number => {
                let row: Option<(Uuid,)> =
                    sqlx::query_as("SELECT id FROM apartments WHERE number = $1")
                        .bind(number)
                        .fetch_optional(&mut *tx)
                        .await?;
                row.map(|(id,)| id).ok_or_else(|| {
                    AppError::NotFound(format!("Target apartment {} does not exist", number))
                })?
            }
            _ => current_apartment.id,
        };

        // Serialize concurrent host promotions on the same apartment
        sqlx::query("SELECT id FROM apartments WHERE id = $1 FOR UPDATE")
            .bind(target_id)
            .execute(&mut *tx)
            .await?;

        if req.is_host == Some(true) {
            // Promotion overwrites any relationship supplied in this call
            resident.is_host = true;
            resident.relationship = HOST_RELATIONSHIP.to_string();
        } else if req.is_host == Some(false) {
            // Honored unconditionally; no substitute host is appointed
            resident.is_host = false;
        }

        if let Some(name) = req.name {
            resident.name = name;
        }
        if let Some(phone) = req.phone_number {
            resident.phone = phone;
        }
        if let Some(email) = req.email {
            resident.email = Some(email);
        }
        if let Some(dob) = req.dob {
            resident.dob = Some(dob);
        }
        if let Some(national_id) = req.national_id {
            resident.national_id = Some(national_id);
        }
        if let Some(avatar) = req.avatar {
            resident.avatar = Some(avatar);
        }
        if let Some(address) = req.address {
            resident.address = Some(address);
        }
        if let Some(note) = req.note {
            resident.note = Some(note);
        }
        if let Some(status) = req.status {
            resident.status = status;
        }
        // A supplied relationship loses to the promotion's forced "host"
        if req.is_host != Some(true) {
            if let Some(relationship) = req.relationship {
                resident.relationship = relationship;
            }
        }

        // A transfer is a fresh residency, not a continuation
        if resident.apartment_id != target_id {
            resident.apartment_id = target_id;
            resident.start_date = Utc::now().date_naive();
            // Host status is apartment-scoped: it does not follow a
            // resident into a new apartment unless this same call
            // explicitly promotes them there
            if req.is_host != Some(true) && resident.is_host {
                resident.is_host = false;
                if let Some(label) = demoted_relationship(&resident.relationship) {
                    resident.relationship = label.to_string();
                }
            }
        }

        // Whether through explicit promotion or a host moving home, the
        // target apartment must not end the call with two hosts. The
        // incumbent is demoted before the promotion is written: the
        // automatic "host" label becomes "member", a custom label stays
        // untouched.
        if resident.is_host {
            let incumbent = sqlx::query_as::<_, Resident>(
                "SELECT * FROM residents WHERE apartment_id = $1 AND is_host",
            )
            .bind(resident.apartment_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(incumbent) = incumbent {
                if incumbent.id != resident.id {
                    sqlx::query(
                        "UPDATE residents SET is_host = FALSE, \
                         relationship = COALESCE($2, relationship) WHERE id = $1",
                    )
                    .bind(incumbent.id)
                    .bind(demoted_relationship(&incumbent.relationship))
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        let saved = sqlx::query_as::<_, Resident>(
            r#"
            UPDATE residents
            SET apartment_id = $2, name = $3, phone = $4, email = $5, dob = $6,
                national_id = $7, avatar = $8, address = $9, note = $10, status = $11,
                start_date = $12, relationship = $13, is_host = $14
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(resident.id)
        .bind(resident.apartment_id)
        .bind(&resident.name)
        .bind(&resident.phone)
        .bind(&resident.email)
        .bind(resident.dob)
        .bind(&resident.national_id)
        .bind(&resident.avatar)
        .bind(&resident.address)
        .bind(&resident.note)
        .bind(resident.status.clone())
        .bind(resident.start_date)
        .bind(&resident.relationship)
        .bind(resident.is_host)
        .fetch_one(&mut *tx)
        .await?;

        let (room_number, building): (String, Option<String>) =
            sqlx::query_as("SELECT number, building FROM apartments WHERE id = $1")
                .bind(saved.apartment_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(ResidentResponse {
            id: saved.id,
            name: saved.name,
            phone_number: saved.phone,
            email: saved.email,
            dob: saved.dob,
            national_id: saved.national_id,
            relationship: saved.relationship,
            is_host: saved.is_host,
            status: saved.status,
            room_number,
            building,
        })
    }

    pub async fn delete_resident(pool: &PgPool, resident_id: Uuid) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        let resident = sqlx::query_as::<_, Resident>("SELECT * FROM residents WHERE id = $1")
            .bind(resident_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resident {} not found", resident_id)))?;

        // The accountable party cannot be discarded while debt is open
        if resident.is_host
            && InvoiceService::has_outstanding_invoices(&mut tx, resident.apartment_id).await?
        {
            return Err(AppError::BadRequest(
                "Cannot delete this host: their apartment still has unpaid invoices".to_string(),
            ));
        }

        sqlx::query("DELETE FROM user_accounts WHERE resident_id = $1")
            .bind(resident.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM residents WHERE id = $1")
            .bind(resident.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn list_residents(
        pool: &PgPool,
        query: &ResidentsQuery,
    ) -> AppResult<Vec<ResidentResponse>> {
        let limit = query.limit.unwrap_or(10).min(100);
        let offset = query.page.unwrap_or(0).max(0) * limit;

        let residents = sqlx::query_as::<_, ResidentResponse>(
            r#"
            SELECT r.id, r.name, r.phone AS phone_number, r.email, r.dob, r.national_id,
                   r.relationship, r.is_host, r.status, a.number AS room_number, a.building
            FROM residents r
            JOIN apartments a ON a.id = r.apartment_id
            WHERE $1::text IS NULL OR $1 = ''
               OR r.name ILIKE '%' || $1 || '%'
               OR r.phone ILIKE '%' || $1 || '%'
               OR a.number ILIKE '%' || $1 || '%'
            ORDER BY a.number, r.is_host DESC, r.name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&query.keyword)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(residents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demoted_relationship_rewrites_only_the_host_label() {
        assert_eq!(demoted_relationship("host"), Some("member"));
        // Custom labels survive demotion untouched
        assert_eq!(demoted_relationship("grandmother"), None);
        assert_eq!(demoted_relationship("member"), None);
        // Case-sensitive: only the exact automatic label is rewritten
        assert_eq!(demoted_relationship("Host"), None);
    }
}
