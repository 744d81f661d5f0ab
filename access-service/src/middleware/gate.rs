//! Access gate: the interception policy every protected operation passes
//! through.
//!
//! Requests in the `/api` namespace, and any request presenting a bearer
//! credential, take the token path and fail with structured 401 JSON.
//! Browser requests without a bearer take the cookie path and are redirected
//! to the entry page instead of receiving a raw error.

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::AppState;
use crate::error::AppError;
use crate::models::SessionIdentity;
use crate::services::SessionStatus;

pub const SESSION_USER_ID_KEY: &str = "user_id";
pub const SESSION_ID_KEY: &str = "session_id";

pub async fn access_gate(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Response {
    let token_style = req.uri().path().starts_with("/api");

    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.to_string());

    if let Some(token) = bearer {
        let identity = match state.tokens.verify(&token) {
            Ok(identity) => identity,
            Err(e) => return e.into_response(),
        };
        if let Err(e) = ensure_active(&state, &identity).await {
            return e.into_response();
        }
        req.extensions_mut().insert(identity);
        return next.run(req).await;
    }

    if token_style {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Missing bearer credential",
                "reason": "missing_credentials",
            })),
        )
            .into_response();
    }

    // Cookie path. The cookie session is a transient capability referencing
    // (user_id, session_id); it is cross-checked against the store, never
    // trusted standalone.
    match session_identity(&session).await {
        Some(identity) => match ensure_active(&state, &identity).await {
            Ok(()) => {
                req.extensions_mut().insert(identity);
                next.run(req).await
            }
            Err(e @ (AppError::SessionExpired | AppError::SessionInvalid)) => {
                tracing::info!(user_id = identity.user_id, reason = ?e.reason(), "Cookie session rejected");
                session.clear().await;
                Redirect::to("/login?no_redirect=1").into_response()
            }
            Err(e) => e.into_response(),
        },
        None => Redirect::to("/login").into_response(),
    }
}

pub async fn session_identity(session: &Session) -> Option<SessionIdentity> {
    let user_id = session
        .get::<i64>(SESSION_USER_ID_KEY)
        .await
        .unwrap_or(None)?;
    let session_id = session.get::<String>(SESSION_ID_KEY).await.unwrap_or(None)?;
    Some(SessionIdentity {
        user_id,
        session_id,
    })
}

/// Store-backed re-check, suppressed within the per-identity cooldown.
async fn ensure_active(state: &AppState, identity: &SessionIdentity) -> Result<(), AppError> {
    if state.throttle.recently_passed(identity) {
        return Ok(());
    }

    match state.validator.check(identity, Utc::now()).await? {
        SessionStatus::Active { .. } => {
            state.throttle.record_pass(identity);
            Ok(())
        }
        SessionStatus::Expired => Err(AppError::SessionExpired),
        SessionStatus::Invalid => Err(AppError::SessionInvalid),
    }
}
