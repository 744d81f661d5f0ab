//! Session validator: confirms an identity still maps to an active,
//! non-expired code row, sweeping dead rows lazily.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::SessionIdentity;
use crate::services::store::CodeStore;

/// Sessions this close to their deadline carry an advisory warning.
pub const ENDING_SOON_WINDOW_SECS: i64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Active {
        expires_at: DateTime<Utc>,
        remaining_seconds: i64,
        ending_soon: bool,
    },
    /// Matched a row but the deadline has passed; the row was cleared as a
    /// side effect, so the next check with the same identity is `Invalid`.
    Expired,
    /// No matching active row: never activated, wrong session id, or already
    /// cleared.
    Invalid,
}

#[derive(Clone)]
pub struct SessionValidator {
    store: Arc<dyn CodeStore>,
}

impl SessionValidator {
    pub fn new(store: Arc<dyn CodeStore>) -> Self {
        Self { store }
    }

    /// Origin-agnostic check: the identity may come from a verified bearer
    /// token, the cookie session, or plain headers.
    ///
    /// Expiry is enforced here, lazily, rather than by a background sweeper;
    /// a dead row persists only until the next check touches it.
    pub async fn check(
        &self,
        identity: &SessionIdentity,
        now: DateTime<Utc>,
    ) -> Result<SessionStatus, AppError> {
        let Some(row) = self.store.find_active_session(identity).await? else {
            return Ok(SessionStatus::Invalid);
        };

        if row.expires_at <= now {
            self.store.invalidate_session(identity, now).await?;
            tracing::info!(user_id = identity.user_id, "Expired session swept");
            return Ok(SessionStatus::Expired);
        }

        let remaining_seconds = row.remaining_seconds(now);
        Ok(SessionStatus::Active {
            expires_at: row.expires_at,
            remaining_seconds,
            ending_soon: remaining_seconds < ENDING_SOON_WINDOW_SECS,
        })
    }
}
