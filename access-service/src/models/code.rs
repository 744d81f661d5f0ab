//! Access code entity - a one-time token redeemable into a session.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A persisted access code row.
///
/// `session_id` is non-null exactly when `is_used` is true; the store's
/// conditional update on `is_used = false` is the only path that sets it.
#[derive(Debug, Clone, FromRow)]
pub struct Code {
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    /// Absolute deadline for the code and any session derived from it.
    /// Fixed at creation; activation does not change it.
    pub expires_at: DateTime<Utc>,
    /// Opaque plan label, informational only.
    pub tariff: Option<String>,
    pub is_used: bool,
    pub session_id: Option<String>,
    /// Set by an out-of-band writer when the backing credential should be
    /// renewed; consumed and cleared by the refresh endpoint.
    pub needs_refresh: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Code {
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds()
    }
}
