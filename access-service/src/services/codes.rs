//! Code lifecycle manager: one-time redemption of an access code into a
//! live session.

use chrono::{DateTime, Utc};
use rand::RngCore;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{ClientInfo, NewAccessLog};
use crate::services::store::CodeStore;

/// Codes are exactly this many characters; anything else is rejected before
/// the store is consulted.
pub const CODE_LENGTH: usize = 8;

/// The session identity minted by a successful activation. `expires_at` is
/// the code's own deadline, unchanged by activation.
#[derive(Debug, Clone)]
pub struct ActivatedSession {
    pub user_id: i64,
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CodeLifecycle {
    store: Arc<dyn CodeStore>,
}

impl CodeLifecycle {
    pub fn new(store: Arc<dyn CodeStore>) -> Self {
        Self { store }
    }

    /// Validate a presented code and atomically transition it into an active
    /// session.
    ///
    /// Rejections (`FormatInvalid`, `CodeNotFound`, `CodeAlreadyUsed`,
    /// `CodeExpired`) are terminal; retrying cannot change their outcome.
    /// The activation itself is a conditional update keyed on
    /// `is_used = false`, so two racing redemptions of the same code yield
    /// exactly one success.
    pub async fn validate_and_activate(
        &self,
        raw_code: &str,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<ActivatedSession, AppError> {
        let code = raw_code.trim();
        if code.len() != CODE_LENGTH {
            tracing::warn!(length = code.len(), "Rejected code with invalid format");
            return Err(AppError::FormatInvalid);
        }

        let row = self
            .store
            .find_by_code(code)
            .await?
            .ok_or(AppError::CodeNotFound)?;

        if row.is_used {
            tracing::warn!(user_id = row.user_id, "Attempt to reuse an activated code");
            return Err(AppError::CodeAlreadyUsed);
        }
        if row.expires_at < now {
            tracing::warn!(user_id = row.user_id, "Attempt to use an expired code");
            return Err(AppError::CodeExpired);
        }

        let session_id = new_session_id();
        if !self.store.activate_code(code, &session_id, now).await? {
            // Lost the conditional update to a concurrent activation.
            tracing::warn!(user_id = row.user_id, "Concurrent activation won the race");
            return Err(AppError::CodeAlreadyUsed);
        }

        // The log is append-mostly and informational; a failed append must
        // not undo an activation that already took effect.
        if let Err(e) = self
            .store
            .record_login(NewAccessLog {
                user_id: row.user_id,
                code: code.to_string(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
                login_time: now,
                session_id: session_id.clone(),
            })
            .await
        {
            tracing::error!(user_id = row.user_id, error = %e, "Failed to append access log");
        }

        tracing::info!(user_id = row.user_id, "Code activated into session");

        Ok(ActivatedSession {
            user_id: row.user_id,
            session_id,
            expires_at: row.expires_at,
        })
    }
}

/// 128 bits of entropy, hex-encoded.
fn new_session_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_long_and_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
