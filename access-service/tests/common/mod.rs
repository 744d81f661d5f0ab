#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Utc};
use secrecy::Secret;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use access_service::AppState;
use access_service::build_router;
use access_service::config::{
    AuthSettings, DatabaseSettings, GateSettings, ServerSettings, Settings,
};
use access_service::error::AppError;
use access_service::models::{ClientInfo, Code, NewAccessLog, SessionIdentity};
use access_service::services::CodeStore;

/// One recorded login event and its (at most one) logout.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub entry: NewAccessLog,
    pub logout_time: Option<DateTime<Utc>>,
}

/// In-memory `CodeStore` with the same conditional-update semantics as the
/// PostgreSQL implementation: the mutex makes `activate_code` an atomic
/// check-and-set, so racing activations cannot both succeed.
#[derive(Default)]
pub struct MemoryCodeStore {
    codes: Mutex<Vec<Code>>,
    logs: Mutex<Vec<LogRecord>>,
    lookups: AtomicUsize,
}

impl MemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, code: Code) {
        self.codes.lock().unwrap().push(code);
    }

    /// Number of `find_by_code` calls, for asserting that format rejection
    /// happens before any store lookup.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self, code: &str) -> Option<Code> {
        self.codes
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.code == code)
            .cloned()
    }

    pub fn log_records(&self) -> Vec<LogRecord> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn find_by_code(&self, code: &str) -> Result<Option<Code>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot(code))
    }

    async fn activate_code(
        &self,
        code: &str,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut codes = self.codes.lock().unwrap();
        match codes.iter_mut().find(|row| row.code == code && !row.is_used) {
            Some(row) => {
                row.is_used = true;
                row.session_id = Some(session_id.to_string());
                row.needs_refresh = false;
                row.last_used_at = Some(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_active_session(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<Code>, AppError> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .iter()
            .find(|row| {
                row.user_id == identity.user_id
                    && row.is_used
                    && row.session_id.as_deref() == Some(identity.session_id.as_str())
            })
            .cloned())
    }

    async fn invalidate_session(
        &self,
        identity: &SessionIdentity,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        {
            let mut codes = self.codes.lock().unwrap();
            for row in codes.iter_mut() {
                if row.user_id == identity.user_id
                    && row.is_used
                    && row.session_id.as_deref() == Some(identity.session_id.as_str())
                {
                    row.is_used = false;
                    row.session_id = None;
                }
            }
        }
        let mut logs = self.logs.lock().unwrap();
        for record in logs.iter_mut() {
            if record.entry.user_id == identity.user_id
                && record.entry.session_id == identity.session_id
                && record.logout_time.is_none()
            {
                record.logout_time = Some(now);
            }
        }
        Ok(())
    }

    async fn consume_refresh_flag(
        &self,
        identity: &SessionIdentity,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let mut codes = self.codes.lock().unwrap();
        match codes.iter_mut().find(|row| {
            row.user_id == identity.user_id
                && row.is_used
                && row.session_id.as_deref() == Some(identity.session_id.as_str())
                && row.needs_refresh
        }) {
            Some(row) => {
                row.needs_refresh = false;
                Ok(Some(row.expires_at))
            }
            None => Ok(None),
        }
    }

    async fn record_login(&self, entry: NewAccessLog) -> Result<(), AppError> {
        self.logs.lock().unwrap().push(LogRecord {
            entry,
            logout_time: None,
        });
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn make_code(id: i64, user_id: i64, code: &str, expires_at: DateTime<Utc>) -> Code {
    Code {
        id,
        user_id,
        code: code.to_string(),
        expires_at,
        tariff: Some("standard".to_string()),
        is_used: false,
        session_id: None,
        needs_refresh: false,
        last_used_at: None,
        created_at: Utc::now(),
    }
}

pub fn make_active_code(
    id: i64,
    user_id: i64,
    code: &str,
    session_id: &str,
    expires_at: DateTime<Utc>,
) -> Code {
    Code {
        is_used: true,
        session_id: Some(session_id.to_string()),
        last_used_at: Some(Utc::now()),
        ..make_code(id, user_id, code, expires_at)
    }
}

pub fn test_client() -> ClientInfo {
    ClientInfo {
        ip_address: "127.0.0.1".to_string(),
        user_agent: Some("integration-tests".to_string()),
    }
}

pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings::default(),
        database: DatabaseSettings {
            url: Secret::new("postgres://localhost/access_test".to_string()),
            max_connections: 5,
            min_connections: 1,
            connect_attempts: 1,
            connect_initial_backoff_secs: 1,
        },
        auth: AuthSettings {
            token_secret: Secret::new("integration-test-signing-secret".to_string()),
            token_ttl_hours: 24,
            issuer: "access-service".to_string(),
        },
        gate: GateSettings {
            // Zero interval disables the cooldown so every request hits the
            // store; the cooldown itself is covered by unit tests.
            min_check_interval_secs: 0,
            throttle_capacity: 64,
        },
        log_level: "info".to_string(),
    }
}

pub fn test_state(store: Arc<MemoryCodeStore>) -> AppState {
    AppState::new(test_settings(), store)
}

pub fn test_app(store: Arc<MemoryCodeStore>) -> Router {
    build_router(test_state(store))
}
