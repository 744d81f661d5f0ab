use axum::http::HeaderMap;

/// The pair a client must present to prove continued access. Sourced from a
/// verified bearer token, the cookie session, or plain headers; the session
/// validator cross-checks it against the store regardless of origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: i64,
    pub session_id: String,
}

/// Requesting network identity, recorded in the access log.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Best-effort extraction from proxy headers. The log is informational;
    /// `unknown` is acceptable when no proxy header is present.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        Self {
            ip_address,
            user_agent,
        }
    }
}
