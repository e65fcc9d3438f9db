use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::RefreshToken;

/// Result of rotating a refresh token: the replacement value plus the
/// identity of the account it belongs to.
#[derive(Debug)]
pub struct RotationResult {
    pub token: String,
    pub account_id: Uuid,
}

pub struct RefreshTokenService;

impl RefreshTokenService {
    fn new_token_value() -> String {
        Uuid::new_v4().to_string()
    }

    pub(crate) fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        expires_at < now
    }

    async fn issue_in(
        tx: &mut Transaction<'_, Postgres>,
        account_id: Uuid,
        ttl_seconds: i64,
    ) -> AppResult<String> {
        // One live token per account: drop any old row before inserting
        sqlx::query("DELETE FROM refresh_tokens WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut **tx)
            .await?;

        let token = Self::new_token_value();
        let expires_at = Utc::now() + Duration::seconds(ttl_seconds);

        sqlx::query(
            "INSERT INTO refresh_tokens (account_id, token, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(account_id)
        .bind(&token)
        .bind(expires_at)
        .execute(&mut **tx)
        .await?;

        Ok(token)
    }

    pub async fn issue(pool: &PgPool, account_id: Uuid, ttl_seconds: i64) -> AppResult<String> {
        let mut tx = pool.begin().await?;
        let token = Self::issue_in(&mut tx, account_id, ttl_seconds).await?;
        tx.commit().await?;
        Ok(token)
    }

    /// Single-use rotation: the presented token is invalidated and replaced
    /// within one transaction. Expired rows are swept lazily here; there is
    /// no background reaper.
    pub async fn rotate(
        pool: &PgPool,
        old_token: &str,
        ttl_seconds: i64,
    ) -> AppResult<RotationResult> {
        let mut tx = pool.begin().await?;

        let row = sqlx::query_as::<_, RefreshToken>(
            "SELECT * FROM refresh_tokens WHERE token = $1 FOR UPDATE",
        )
        .bind(old_token)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::Unauthorized)?;

        if Self::is_expired(row.expires_at, Utc::now()) {
            sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Err(AppError::Unauthorized);
        }

        let token = Self::issue_in(&mut tx, row.account_id, ttl_seconds).await?;
        tx.commit().await?;

        Ok(RotationResult {
            token,
            account_id: row.account_id,
        })
    }

    /// Idempotent: revoking an unknown or already-rotated token succeeds,
    /// so logout never fails on a stale cookie.
    pub async fn revoke(pool: &PgPool, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_values_are_unique_and_opaque() {
        let first = RefreshTokenService::new_token_value();
        let second = RefreshTokenService::new_token_value();
        assert_ne!(first, second);
        // Opaque UUID strings, not JWTs
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        assert!(RefreshTokenService::is_expired(
            now - Duration::seconds(1),
            now
        ));
        assert!(!RefreshTokenService::is_expired(
            now + Duration::seconds(1),
            now
        ));
        // A token expiring exactly now is still accepted
        assert!(!RefreshTokenService::is_expired(now, now));
    }
}
