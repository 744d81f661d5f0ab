use chrono::{DateTime, Utc};

/// One login event, appended when a code is activated. `logout_time` is set
/// at most once, on explicit logout or when the lazy expiry sweep clears the
/// session.
#[derive(Debug, Clone)]
pub struct NewAccessLog {
    pub user_id: i64,
    pub code: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub login_time: DateTime<Utc>,
    pub session_id: String,
}
