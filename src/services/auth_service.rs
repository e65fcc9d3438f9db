use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{RegisterRequest, Resident, UserAccount, UserDetail, UserRole};
use crate::utils::validators::validate_phone;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account_id
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String,
}

pub struct AuthService {
    config: Config,
}

impl AuthService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn generate_access_token(&self, account: &UserAccount) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.jwt_access_expiry);

        let claims = Claims {
            sub: account.id.to_string(),
            role: account.role.as_claim().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: "access".to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(AppError::from)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::Internal(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }

    pub async fn get_account_by_email(pool: &PgPool, email: &str) -> AppResult<UserAccount> {
        sqlx::query_as::<_, UserAccount>("SELECT * FROM user_accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    pub async fn get_account_by_id(pool: &PgPool, account_id: Uuid) -> AppResult<UserAccount> {
        sqlx::query_as::<_, UserAccount>("SELECT * FROM user_accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    /// Apartment the caller's linked resident row belongs to, if any.
    /// Used to pin non-admin invoice queries to their own household.
    pub async fn resolve_own_apartment(pool: &PgPool, account_id: Uuid) -> AppResult<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT r.apartment_id
            FROM user_accounts u
            JOIN residents r ON r.id = u.resident_id
            WHERE u.id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    pub async fn build_user_detail(pool: &PgPool, account: &UserAccount) -> AppResult<UserDetail> {
        // Defaults for accounts with no resident record (system admins)
        let mut email = account.email.clone();
        let mut full_name = "System User".to_string();
        let mut avatar = None;
        let mut household_id = None;

        if let Some(resident_id) = account.resident_id {
            let resident = sqlx::query_as::<_, Resident>("SELECT * FROM residents WHERE id = $1")
                .bind(resident_id)
                .fetch_optional(pool)
                .await?;

            if let Some(resident) = resident {
                if let Some(res_email) = resident.email {
                    email = res_email;
                }
                full_name = resident.name;
                avatar = resident.avatar;
                household_id = Some(resident.apartment_id);
            }
        }

        Ok(UserDetail {
            id: account.id,
            email,
            full_name,
            role: account.role,
            avatar,
            household_id,
        })
    }

    /// Self-service registration: a resident claims the record the
    /// management board created for them. Phone and email must match.
    pub async fn register(pool: &PgPool, req: RegisterRequest) -> AppResult<()> {
        let resident_id = Uuid::parse_str(&req.resident_code)
            .map_err(|_| AppError::BadRequest("Invalid resident code".to_string()))?;

        if !validate_phone(&req.phone_number) {
            return Err(AppError::Validation("Invalid phone number".to_string()));
        }

        let mut tx = pool.begin().await?;

        let resident = sqlx::query_as::<_, Resident>("SELECT * FROM residents WHERE id = $1")
            .bind(resident_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No resident found with code {}", resident_id))
            })?;

        if resident.phone != req.phone_number {
            return Err(AppError::BadRequest(
                "Phone number does not match the resident record".to_string(),
            ));
        }

        if let Some(res_email) = &resident.email {
            if !res_email.eq_ignore_ascii_case(&req.email) {
                return Err(AppError::BadRequest(
                    "Email does not match the resident record".to_string(),
                ));
            }
        }

        let has_account: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM user_accounts WHERE resident_id = $1")
                .bind(resident.id)
                .fetch_optional(&mut *tx)
                .await?;
        if has_account.is_some() {
            return Err(AppError::Conflict(
                "This resident already has an account".to_string(),
            ));
        }

        let email_taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM user_accounts WHERE email = $1")
                .bind(&req.email)
                .fetch_optional(&mut *tx)
                .await?;
        if email_taken.is_some() {
            return Err(AppError::Conflict(
                "This email is already registered".to_string(),
            ));
        }

        let password_hash = Self::hash_password(&req.password)?;

        sqlx::query(
            r#"
            INSERT INTO user_accounts (email, password_hash, role, resident_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&req.email)
        .bind(&password_hash)
        .bind(UserRole::Resident)
        .bind(resident.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn test_account() -> UserAccount {
        UserAccount {
            id: Uuid::new_v4(),
            email: "admin@bluemoon.vn".to_string(),
            password_hash: String::new(),
            role: UserRole::Admin,
            resident_id: None,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    fn test_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            jwt_access_expiry: 900,
            refresh_token_ttl: 604800,
            cookie_secure: false,
        }
    }

    #[test]
    fn test_access_token_round_trip() {
        let service = AuthService::new(test_config());
        let account = test_account();

        let token = service.generate_access_token(&account).unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.sub, account.id.to_string());
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.token_type, "access");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_token_rejects_wrong_secret() {
        let service = AuthService::new(test_config());
        let token = service.generate_access_token(&test_account()).unwrap();

        let mut other_config = test_config();
        other_config.jwt_secret = "other-secret".to_string();
        let other = AuthService::new(other_config);

        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_password_hash_and_verify() {
        let hash = AuthService::hash_password("s3cret-pass").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(AuthService::verify_password("s3cret-pass", &hash).unwrap());
        assert!(!AuthService::verify_password("wrong-pass", &hash).unwrap());
    }

    #[test]
    fn test_password_hashes_are_salted() {
        let first = AuthService::hash_password("same-pass").unwrap();
        let second = AuthService::hash_password("same-pass").unwrap();
        assert_ne!(first, second);
    }
}
