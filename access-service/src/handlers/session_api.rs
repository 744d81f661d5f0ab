//! Programmatic session endpoints: token redemption, session status polling,
//! and the refresh-flag handshake.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;

use crate::AppState;
use crate::dtos::session::{
    ActiveSessionResponse, ApiLoginRequest, SessionRejection, SessionUpdatedRequest, TokenResponse,
    format_timestamp,
};
use crate::error::AppError;
use crate::models::{ClientInfo, SessionIdentity};
use crate::services::SessionStatus;

/// Token redemption: activate the code, mint a bearer token, and mirror it
/// into an HttpOnly cookie for PWA clients that cannot hold the token
/// themselves.
pub async fn api_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<ApiLoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let now = Utc::now();
    let client = ClientInfo::from_headers(&headers);
    let activated = state
        .lifecycle
        .validate_and_activate(&req.code, &client, now)
        .await?;

    let token = state
        .tokens
        .issue(activated.user_id, &activated.session_id, now)?;

    let cookie = Cookie::build(("auth_token", token.clone()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(state.tokens.ttl().num_seconds()))
        .build();

    Ok((
        jar.add(cookie),
        Json(TokenResponse {
            token,
            expires_at: format_timestamp(activated.expires_at),
        }),
    ))
}

/// Session status poll. Identity comes from a verified bearer token when one
/// is presented, otherwise from the plain `X-User-Id` / `X-Session-Id`
/// headers - a weaker path that is still cross-checked against the store.
pub async fn check_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let now = Utc::now();
    let check_time = format_timestamp(now);

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let identity = if let Some(token) = bearer {
        match state.tokens.verify(token) {
            Ok(identity) => identity,
            Err(_) => {
                return Ok(rejection("invalid", "invalid_token", check_time));
            }
        }
    } else {
        let user_id = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok());
        let session_id = headers
            .get("x-session-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        match (user_id, session_id) {
            (Some(user_id), Some(session_id)) => SessionIdentity {
                user_id,
                session_id,
            },
            _ => {
                return Ok(rejection("invalid", "missing_credentials", check_time));
            }
        }
    };

    match state.validator.check(&identity, now).await? {
        SessionStatus::Active {
            expires_at,
            remaining_seconds,
            ending_soon,
        } => Ok(Json(ActiveSessionResponse {
            status: "active",
            expires_at: format_timestamp(expires_at),
            remaining_seconds,
            check_time,
            warning: ending_soon.then_some("session_ending_soon"),
        })
        .into_response()),
        SessionStatus::Expired => Ok(rejection("expired", "time_expired", check_time)),
        SessionStatus::Invalid => Ok(rejection("invalid", "no_active_session", check_time)),
    }
}

fn rejection(status: &'static str, reason: &'static str, check_time: String) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(SessionRejection {
            status,
            reason,
            check_time,
        }),
    )
        .into_response()
}

/// Refresh-flag handshake: a client acknowledges a pending credential
/// refresh, consuming the `needs_refresh` flag.
pub async fn session_updated(
    State(state): State<AppState>,
    Json(req): Json<SessionUpdatedRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(user_id), Some(session_id)) = (req.user_id, req.session_id) else {
        return Err(AppError::MalformedRequest(
            "Missing required fields".to_string(),
        ));
    };

    let identity = SessionIdentity {
        user_id,
        session_id,
    };

    match state.store.consume_refresh_flag(&identity).await? {
        Some(expires_at) => Ok(Json(serde_json::json!({
            "status": "updated",
            "expires_at": format_timestamp(expires_at),
        }))),
        None => Ok(Json(serde_json::json!({
            "status": "no_update_needed",
        }))),
    }
}
