use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Form body of the browser redemption path.
#[derive(Debug, Deserialize)]
pub struct RedeemForm {
    pub code: String,
}

/// JSON body of the token redemption path.
#[derive(Debug, Deserialize)]
pub struct ApiLoginRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: String,
}

/// Fields are optional so their absence maps to a 400 rather than a body
/// rejection; both are required.
#[derive(Debug, Deserialize)]
pub struct SessionUpdatedRequest {
    pub user_id: Option<i64>,
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActiveSessionResponse {
    pub status: &'static str,
    pub expires_at: String,
    pub remaining_seconds: i64,
    pub check_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct SessionRejection {
    pub status: &'static str,
    pub reason: &'static str,
    pub check_time: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub no_redirect: Option<String>,
}

/// Wall-clock rendering used in session payloads.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
