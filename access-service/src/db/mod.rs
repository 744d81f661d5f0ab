//! PostgreSQL store: pool bootstrap with bounded backoff, idempotent schema
//! creation, and the `CodeStore` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::DatabaseSettings;
use crate::error::AppError;
use crate::models::{Code, NewAccessLog, SessionIdentity};
use crate::services::store::CodeStore;

/// Connect to PostgreSQL, retrying with exponential backoff.
///
/// Reconnection policy is reserved for store bootstrap; per-request store
/// errors fail fast without retry.
pub async fn connect_with_retry(settings: &DatabaseSettings) -> Result<PgPool, AppError> {
    let attempts = settings.connect_attempts.max(1);
    let mut delay = Duration::from_secs(settings.connect_initial_backoff_secs.max(1));

    for attempt in 1..=attempts {
        tracing::info!(attempt, attempts, "Connecting to PostgreSQL");

        let result = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(settings.url.expose_secret())
            .await;

        match result {
            Ok(pool) => {
                tracing::info!("Database connection successful");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    error = %e,
                    backoff_ms = delay.as_millis() as u64,
                    "Database connection failed, retrying after backoff"
                );
                sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                tracing::error!(attempt, error = %e, "Database connection failed, giving up");
                return Err(AppError::StoreUnavailable(anyhow::Error::new(e)));
            }
        }
    }

    unreachable!("connection loop returns on the final attempt")
}

/// Create the three tables idempotently. No migration machinery; the schema
/// is small and additive.
pub async fn init_schema(pool: &PgPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS codes (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            code TEXT UNIQUE NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            tariff TEXT,
            is_used BOOLEAN NOT NULL DEFAULT FALSE,
            session_id TEXT,
            needs_refresh BOOLEAN NOT NULL DEFAULT FALSE,
            last_used_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS access_logs (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            code TEXT NOT NULL,
            ip_address TEXT NOT NULL,
            user_agent TEXT,
            login_time TIMESTAMPTZ NOT NULL,
            logout_time TIMESTAMPTZ,
            session_id TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            external_id BIGINT UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS codes_session_lookup ON codes (user_id, session_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database schema initialized");
    Ok(())
}

#[derive(Clone)]
pub struct PgCodeStore {
    pool: PgPool,
}

impl PgCodeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CODE_COLUMNS: &str = "id, user_id, code, expires_at, tariff, is_used, \
     session_id, needs_refresh, last_used_at, created_at";

#[async_trait]
impl CodeStore for PgCodeStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Code>, AppError> {
        let row = sqlx::query_as::<_, Code>(&format!(
            "SELECT {CODE_COLUMNS} FROM codes WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn activate_code(
        &self,
        code: &str,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        // The `is_used = FALSE` predicate is the single-redemption guarantee:
        // two racing activations cannot both match.
        let result = sqlx::query(
            r#"
            UPDATE codes
            SET is_used = TRUE,
                session_id = $1,
                needs_refresh = FALSE,
                last_used_at = $2
            WHERE code = $3 AND is_used = FALSE
            "#,
        )
        .bind(session_id)
        .bind(now)
        .bind(code)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_active_session(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<Code>, AppError> {
        let row = sqlx::query_as::<_, Code>(&format!(
            "SELECT {CODE_COLUMNS} FROM codes \
             WHERE user_id = $1 AND session_id = $2 AND is_used = TRUE"
        ))
        .bind(identity.user_id)
        .bind(&identity.session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn invalidate_session(
        &self,
        identity: &SessionIdentity,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE codes
            SET is_used = FALSE, session_id = NULL
            WHERE user_id = $1 AND session_id = $2 AND is_used = TRUE
            "#,
        )
        .bind(identity.user_id)
        .bind(&identity.session_id)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            UPDATE access_logs
            SET logout_time = $1
            WHERE user_id = $2 AND session_id = $3 AND logout_time IS NULL
            "#,
        )
        .bind(now)
        .bind(identity.user_id)
        .bind(&identity.session_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_refresh_flag(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            UPDATE codes
            SET needs_refresh = FALSE
            WHERE user_id = $1 AND session_id = $2
              AND is_used = TRUE AND needs_refresh = TRUE
            RETURNING expires_at
            "#,
        )
        .bind(identity.user_id)
        .bind(&identity.session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(expires_at,)| expires_at))
    }

    async fn record_login(&self, entry: NewAccessLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO access_logs
                (user_id, code, ip_address, user_agent, login_time, session_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.user_id)
        .bind(&entry.code)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.login_time)
        .bind(&entry.session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
