use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{Code, NewAccessLog, SessionIdentity};

/// Durable store contract for code and access-log state.
///
/// The store exclusively owns persisted state; every privileged operation
/// cross-checks against it. `activate_code` is the one method with a strict
/// atomicity contract (conditional update keyed on `is_used = false`); the
/// remaining operations are idempotent or self-correcting on the next check.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Exact (byte-for-byte) lookup of a code row.
    async fn find_by_code(&self, code: &str) -> Result<Option<Code>, AppError>;

    /// Compare-and-swap activation: set `is_used`, `session_id` and
    /// `last_used_at`, clear `needs_refresh` - only if the row is still
    /// unredeemed. Returns false when another activation won the race.
    async fn activate_code(
        &self,
        code: &str,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// The row backing a live session: matching `user_id`, `session_id`,
    /// and `is_used = true`.
    async fn find_active_session(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<Code>, AppError>;

    /// Clear a session (`is_used = false`, `session_id = NULL`) and close its
    /// access-log entry. Used by the lazy expiry sweep and explicit logout.
    async fn invalidate_session(
        &self,
        identity: &SessionIdentity,
        now: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Atomically clear a pending `needs_refresh` flag on a live session.
    /// Returns the session deadline when a flag was consumed, `None` when
    /// there was no live session or no pending flag.
    async fn consume_refresh_flag(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<DateTime<Utc>>, AppError>;

    /// Append one login event.
    async fn record_login(&self, entry: NewAccessLog) -> Result<(), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
