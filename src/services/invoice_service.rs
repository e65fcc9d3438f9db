use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Apartment, ApplyPaymentRequest, CreateInvoiceRequest, Fee, Invoice, InvoiceDetail,
    InvoiceDetailResponse, InvoiceResponse, InvoiceStatus, InvoicesQuery, Payment, PaymentResponse,
    TransactionStatus, UpdateInvoiceRequest,
};

/// One line's amount: unit price at snapshot time times quantity.
pub fn line_amount(unit_price: Decimal, quantity: Decimal) -> Decimal {
    (unit_price * quantity).round_dp(2)
}

/// Invoice status as a pure function of the successful-payment sum against
/// the total. A zero-total invoice with no payments is still unpaid.
pub fn derive_status(total: Decimal, paid: Decimal) -> InvoiceStatus {
    if paid <= Decimal::ZERO {
        InvoiceStatus::Unpaid
    } else if paid >= total {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    }
}

#[derive(FromRow)]
struct InvoiceRow {
    id: Uuid,
    month: i32,
    year: i32,
    due_date: Option<NaiveDate>,
    total_amount: Decimal,
    status: InvoiceStatus,
    room_number: String,
}

fn invoice_title(month: i32, year: i32) -> String {
    format!("Invoice {}/{}", month, year)
}

pub struct InvoiceService;

impl InvoiceService {
    /// Whether any invoice was ever issued for the apartment. Consulted by
    /// the household registry before a household deletion.
    pub async fn has_invoices(
        tx: &mut Transaction<'_, Postgres>,
        apartment_id: Uuid,
    ) -> AppResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM invoices WHERE apartment_id = $1)")
                .bind(apartment_id)
                .fetch_one(&mut **tx)
                .await?;
        Ok(exists)
    }

    /// Whether the apartment still owes anything. Partial invoices count:
    /// they carry an unpaid remainder.
    pub async fn has_outstanding_invoices(
        tx: &mut Transaction<'_, Postgres>,
        apartment_id: Uuid,
    ) -> AppResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM invoices WHERE apartment_id = $1 AND status <> $2)",
        )
        .bind(apartment_id)
        .bind(InvoiceStatus::Paid)
        .fetch_one(&mut **tx)
        .await?;
        Ok(exists)
    }

    async fn paid_sum(tx: &mut Transaction<'_, Postgres>, invoice_id: Uuid) -> AppResult<Decimal> {
        let (paid,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount_paid), 0) FROM payments \
             WHERE invoice_id = $1 AND transaction_status = $2",
        )
        .bind(invoice_id)
        .bind(TransactionStatus::Success)
        .fetch_one(&mut **tx)
        .await?;
        Ok(paid)
    }

    /// The single source of truth for cached totals and status: total is
    /// the sum over current details (empty sum is zero), status is derived
    /// from the successful-payment sum. Runs at the end of every mutating
    /// ledger operation.
    async fn recompute(
        tx: &mut Transaction<'_, Postgres>,
        invoice_id: Uuid,
    ) -> AppResult<(Decimal, InvoiceStatus)> {
        let (total,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0) FROM invoice_details WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_one(&mut **tx)
        .await?;

        let paid = Self::paid_sum(tx, invoice_id).await?;
        let status = derive_status(total, paid);

        sqlx::query("UPDATE invoices SET total_amount = $2, status = $3 WHERE id = $1")
            .bind(invoice_id)
            .bind(total)
            .bind(status)
            .execute(&mut **tx)
            .await?;

        Ok((total, status))
    }

    pub async fn create_invoice(
        pool: &PgPool,
        req: CreateInvoiceRequest,
    ) -> AppResult<InvoiceResponse> {
        if !(1..=12).contains(&req.month) {
            return Err(AppError::Validation(
                "Month must be between 1 and 12".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let (duplicate,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM invoices \
             WHERE apartment_id = $1 AND month = $2 AND year = $3)",
        )
        .bind(req.apartment_id)
        .bind(req.month)
        .bind(req.year)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(AppError::Conflict(format!(
                "An invoice for {}/{} already exists for this apartment",
                req.month, req.year
            )));
        }

        let apartment = sqlx::query_as::<_, Apartment>("SELECT * FROM apartments WHERE id = $1")
            .bind(req.apartment_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Apartment {} not found", req.apartment_id))
            })?;

        // Even a zero-amount invoice starts unpaid
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (apartment_id, month, year, due_date, total_amount, status)
            VALUES ($1, $2, $3, $4, 0, $5)
            RETURNING *
            "#,
        )
        .bind(apartment.id)
        .bind(req.month)
        .bind(req.year)
        .bind(req.due_date)
        .bind(InvoiceStatus::Unpaid)
        .fetch_one(&mut *tx)
        .await?;

        let mut details = Vec::new();
        for item in &req.items {
            let fee = sqlx::query_as::<_, Fee>("SELECT * FROM fees WHERE id = $1")
                .bind(item.fee_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Fee {} does not exist", item.fee_id)))?;

            // Snapshot pricing: later fee edits never touch this line
            let amount = line_amount(fee.unit_price, item.quantity);

            let detail = sqlx::query_as::<_, InvoiceDetail>(
                r#"
                INSERT INTO invoice_details (invoice_id, fee_id, quantity, amount)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(invoice.id)
            .bind(fee.id)
            .bind(item.quantity)
            .bind(amount)
            .fetch_one(&mut *tx)
            .await?;

            details.push(InvoiceDetailResponse {
                id: detail.id,
                fee_name: fee.name,
                unit_price: fee.unit_price,
                unit: fee.unit,
                quantity: detail.quantity,
                amount: detail.amount,
            });
        }

        let (total, status) = Self::recompute(&mut tx, invoice.id).await?;

        tx.commit().await?;

        Ok(InvoiceResponse {
            id: invoice.id,
            title: invoice_title(invoice.month, invoice.year),
            room_number: apartment.number,
            month: invoice.month,
            year: invoice.year,
            due_date: invoice.due_date,
            status,
            total_amount: total,
            details: Some(details),
        })
    }

    pub async fn get_invoice(pool: &PgPool, id: Uuid) -> AppResult<InvoiceResponse> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", id)))?;

        let (room_number,): (String,) =
            sqlx::query_as("SELECT number FROM apartments WHERE id = $1")
                .bind(invoice.apartment_id)
                .fetch_one(pool)
                .await?;

        let details = sqlx::query_as::<_, InvoiceDetailResponse>(
            r#"
            SELECT d.id, f.name AS fee_name, f.unit_price, f.unit, d.quantity, d.amount
            FROM invoice_details d
            JOIN fees f ON f.id = d.fee_id
            WHERE d.invoice_id = $1
            ORDER BY f.name
            "#,
        )
        .bind(invoice.id)
        .fetch_all(pool)
        .await?;

        Ok(InvoiceResponse {
            id: invoice.id,
            title: invoice_title(invoice.month, invoice.year),
            room_number,
            month: invoice.month,
            year: invoice.year,
            due_date: invoice.due_date,
            status: invoice.status,
            total_amount: invoice.total_amount,
            details: Some(details),
        })
    }

    /// Filtered, paged listing. `apartment_id` arrives already resolved by
    /// the caller's authorization context; for non-admins it is mandatory
    /// and any conflicting caller-supplied filter has been discarded.
    pub async fn list_invoices(
        pool: &PgPool,
        apartment_id: Option<Uuid>,
        query: &InvoicesQuery,
    ) -> AppResult<Vec<InvoiceResponse>> {
        let limit = query.limit.unwrap_or(10).min(100);
        let offset = query.page.unwrap_or(0).max(0) * limit;

        let rows = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT i.id, i.month, i.year, i.due_date, i.total_amount, i.status,
                   a.number AS room_number
            FROM invoices i
            JOIN apartments a ON a.id = i.apartment_id
            WHERE ($1::uuid IS NULL OR i.apartment_id = $1)
              AND ($2::int IS NULL OR i.month = $2)
              AND ($3::int IS NULL OR i.year = $3)
              AND ($4::invoice_status IS NULL OR i.status = $4)
              AND ($5::text IS NULL OR $5 = '' OR a.number ILIKE '%' || $5 || '%')
            ORDER BY i.year DESC, i.month DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(apartment_id)
        .bind(query.month)
        .bind(query.year)
        .bind(query.status)
        .bind(&query.keyword)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvoiceResponse {
                id: row.id,
                title: invoice_title(row.month, row.year),
                room_number: row.room_number,
                month: row.month,
                year: row.year,
                due_date: row.due_date,
                status: row.status,
                total_amount: row.total_amount,
                details: None,
            })
            .collect())
    }

    pub async fn update_invoice(
        pool: &PgPool,
        id: Uuid,
        req: UpdateInvoiceRequest,
    ) -> AppResult<InvoiceResponse> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!("Invoice {} not found", id)));
        }

        if let Some(due_date) = req.due_date {
            sqlx::query("UPDATE invoices SET due_date = $2 WHERE id = $1")
                .bind(id)
                .bind(due_date)
                .execute(pool)
                .await?;
        }

        Self::get_invoice(pool, id).await
    }

    /// Re-snapshots the line against the fee's *current* unit price, then
    /// recomputes the parent totals.
    pub async fn update_invoice_detail(
        pool: &PgPool,
        detail_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<InvoiceResponse> {
        if quantity < Decimal::ZERO {
            return Err(AppError::Validation(
                "Quantity cannot be negative".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let detail =
            sqlx::query_as::<_, InvoiceDetail>("SELECT * FROM invoice_details WHERE id = $1")
                .bind(detail_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Invoice detail {} not found", detail_id))
                })?;

        let invoice =
            sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
                .bind(detail.invoice_id)
                .fetch_one(&mut *tx)
                .await?;

        if invoice.status == InvoiceStatus::Paid {
            return Err(AppError::BadRequest(
                "A settled invoice can no longer be modified".to_string(),
            ));
        }

        let fee = sqlx::query_as::<_, Fee>("SELECT * FROM fees WHERE id = $1")
            .bind(detail.fee_id)
            .fetch_one(&mut *tx)
            .await?;

        let amount = line_amount(fee.unit_price, quantity);

        sqlx::query("UPDATE invoice_details SET quantity = $2, amount = $3 WHERE id = $1")
            .bind(detail.id)
            .bind(quantity)
            .bind(amount)
            .execute(&mut *tx)
            .await?;

        Self::recompute(&mut tx, invoice.id).await?;

        tx.commit().await?;

        Self::get_invoice(pool, invoice.id).await
    }

    pub async fn delete_invoice_detail(
        pool: &PgPool,
        detail_id: Uuid,
    ) -> AppResult<InvoiceResponse> {
        let mut tx = pool.begin().await?;

        let detail =
            sqlx::query_as::<_, InvoiceDetail>("SELECT * FROM invoice_details WHERE id = $1")
                .bind(detail_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Invoice detail {} not found", detail_id))
                })?;

        let invoice =
            sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
                .bind(detail.invoice_id)
                .fetch_one(&mut *tx)
                .await?;

        if invoice.status == InvoiceStatus::Paid {
            return Err(AppError::BadRequest(
                "A settled invoice can no longer be modified".to_string(),
            ));
        }

        sqlx::query("DELETE FROM invoice_details WHERE id = $1")
            .bind(detail.id)
            .execute(&mut *tx)
            .await?;

        Self::recompute(&mut tx, invoice.id).await?;

        tx.commit().await?;

        Self::get_invoice(pool, invoice.id).await
    }

    pub async fn delete_invoice(pool: &PgPool, invoice_id: Uuid) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        let invoice =
            sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
                .bind(invoice_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        if invoice.status != InvoiceStatus::Unpaid {
            return Err(AppError::BadRequest(
                "Only fully unpaid invoices can be deleted".to_string(),
            ));
        }

        // Status and the payment table are updated in separate steps and
        // could in principle diverge, so both are checked
        let (has_payments,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM payments WHERE invoice_id = $1)")
                .bind(invoice.id)
                .fetch_one(&mut *tx)
                .await?;
        if has_payments {
            return Err(AppError::BadRequest(
                "This invoice has payment history and cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM invoice_details WHERE invoice_id = $1")
            .bind(invoice.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(invoice.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Settles part or all of the remaining balance. This ledger models an
    /// always-succeeding settlement, so the payment row is recorded with
    /// transaction_status = success; it is never an interface to a real
    /// payment gateway.
    pub async fn apply_payment(
        pool: &PgPool,
        invoice_id: Uuid,
        req: ApplyPaymentRequest,
    ) -> AppResult<PaymentResponse> {
        let mut tx = pool.begin().await?;

        // Row lock: two concurrent settlements must not both read the same
        // remaining balance
        let invoice =
            sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
                .bind(invoice_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        if invoice.status == InvoiceStatus::Paid {
            return Err(AppError::BadRequest(
                "Invoice is already fully paid".to_string(),
            ));
        }

        let paid = Self::paid_sum(&mut tx, invoice.id).await?;
        let remaining = invoice.total_amount - paid;

        let amount = match req.amount {
            Some(amount) => {
                if amount <= Decimal::ZERO {
                    return Err(AppError::Validation(
                        "Payment amount must be positive".to_string(),
                    ));
                }
                // Overpayment is a hard error, never clamped or credited
                if amount > remaining {
                    return Err(AppError::BadRequest(format!(
                        "Payment of {} exceeds the remaining balance of {}",
                        amount, remaining
                    )));
                }
                amount
            }
            None => remaining,
        };

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (invoice_id, amount_paid, method, transaction_status, external_tx_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(amount)
        .bind(req.method.unwrap_or_default())
        .bind(TransactionStatus::Success)
        .bind(&req.external_tx_id)
        .fetch_one(&mut *tx)
        .await?;

        let (_, status) = Self::recompute(&mut tx, invoice.id).await?;

        tx.commit().await?;

        Ok(PaymentResponse {
            id: payment.id,
            invoice_id: payment.invoice_id,
            amount_paid: payment.amount_paid,
            paid_at: payment.paid_at,
            method: payment.method,
            transaction_status: payment.transaction_status,
            invoice_status: status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_amount_snapshots_price_times_quantity() {
        assert_eq!(dec!(50000) * dec!(100), line_amount(dec!(50000), dec!(100)));
        assert_eq!(dec!(5000000), line_amount(dec!(50000), dec!(100)));
        assert_eq!(dec!(0), line_amount(dec!(50000), dec!(0)));
    }

    #[test]
    fn test_line_amount_rounds_to_currency_precision() {
        assert_eq!(dec!(33.33), line_amount(dec!(9.999), dec!(3.3334)));
    }

    #[test]
    fn test_derive_status_is_a_pure_function_of_the_sums() {
        let total = dec!(5000000);

        assert_eq!(InvoiceStatus::Unpaid, derive_status(total, dec!(0)));
        assert_eq!(InvoiceStatus::Partial, derive_status(total, dec!(1)));
        assert_eq!(InvoiceStatus::Partial, derive_status(total, dec!(4999999)));
        assert_eq!(InvoiceStatus::Paid, derive_status(total, dec!(5000000)));
        assert_eq!(InvoiceStatus::Paid, derive_status(total, dec!(6000000)));
    }

    #[test]
    fn test_zero_total_invoice_starts_unpaid() {
        assert_eq!(InvoiceStatus::Unpaid, derive_status(dec!(0), dec!(0)));
    }

    #[test]
    fn test_settlement_scenario() {
        // Invoice 12/2025: one fee, unit price 50 000, quantity 100
        let total = line_amount(dec!(50000), dec!(100));
        assert_eq!(dec!(5000000), total);
        assert_eq!(InvoiceStatus::Unpaid, derive_status(total, dec!(0)));

        // First payment of 3 000 000 leaves a 2 000 000 remainder
        let paid = dec!(3000000);
        assert_eq!(InvoiceStatus::Partial, derive_status(total, paid));
        let remaining = total - paid;
        assert_eq!(dec!(2000000), remaining);

        // An omitted amount settles exactly the remainder
        let paid = paid + remaining;
        assert_eq!(InvoiceStatus::Paid, derive_status(total, paid));

        // Any further amount would exceed the (now zero) remainder
        assert!(dec!(1) > total - paid);
    }
}
