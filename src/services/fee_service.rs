use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Fee, FeeRequest};

pub struct FeeService;

impl FeeService {
    pub async fn list(pool: &PgPool) -> AppResult<Vec<Fee>> {
        let fees = sqlx::query_as::<_, Fee>("SELECT * FROM fees ORDER BY name")
            .fetch_all(pool)
            .await?;
        Ok(fees)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> AppResult<Fee> {
        sqlx::query_as::<_, Fee>("SELECT * FROM fees WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fee {} not found", id)))
    }

    pub async fn create(pool: &PgPool, req: FeeRequest) -> AppResult<Fee> {
        if req.unit_price < Decimal::ZERO {
            return Err(AppError::Validation(
                "Unit price cannot be negative".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM fees WHERE name = $1")
            .bind(&req.name)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict(format!(
                "Fee '{}' already exists",
                req.name
            )));
        }

        let fee = sqlx::query_as::<_, Fee>(
            r#"
            INSERT INTO fees (name, description, unit_price, unit, billing_cycle, is_mandatory)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.unit_price)
        .bind(&req.unit)
        .bind(&req.billing_cycle)
        .bind(req.is_mandatory)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(fee)
    }

    /// Price edits only affect future snapshots; existing invoice lines
    /// keep the amount they were created with.
    pub async fn update(pool: &PgPool, id: Uuid, req: FeeRequest) -> AppResult<Fee> {
        if req.unit_price < Decimal::ZERO {
            return Err(AppError::Validation(
                "Unit price cannot be negative".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM fees WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Fee {} not found", id)));
        }

        let taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM fees WHERE name = $1 AND id <> $2")
                .bind(&req.name)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(AppError::Conflict(format!(
                "Fee name '{}' is already in use",
                req.name
            )));
        }

        let fee = sqlx::query_as::<_, Fee>(
            r#"
            UPDATE fees
            SET name = $2, description = $3, unit_price = $4, unit = $5,
                billing_cycle = $6, is_mandatory = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.unit_price)
        .bind(&req.unit)
        .bind(&req.billing_cycle)
        .bind(req.is_mandatory)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(fee)
    }

    /// A fee that was ever billed is part of financial history and cannot
    /// be removed, only renamed or retired.
    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM fees WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Fee {} not found", id)));
        }

        let (used,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM invoice_details WHERE fee_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if used {
            return Err(AppError::BadRequest(
                "This fee is referenced by existing invoices and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM fees WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}
