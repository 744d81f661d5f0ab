//! Browser-facing pages: entry page, form redemption, dashboard, logout.

use askama::Template;
use axum::{
    Extension, Form,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::AppState;
use crate::dtos::session::{LoginPageQuery, RedeemForm, format_timestamp};
use crate::error::AppError;
use crate::middleware::gate::{SESSION_ID_KEY, SESSION_USER_ID_KEY, session_identity};
use crate::models::{ClientInfo, SessionIdentity};
use crate::services::SessionStatus;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub user_id: i64,
    pub expires_at: String,
}

/// Entry page. A browser that already holds a live session is sent straight
/// to the dashboard unless `no_redirect` is set (which breaks the redirect
/// cycle after a failed dashboard check).
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginPageQuery>,
) -> Result<Response, AppError> {
    if query.no_redirect.is_none() {
        if let Some(identity) = session_identity(&session).await {
            if let SessionStatus::Active { .. } = state.validator.check(&identity, Utc::now()).await? {
                return Ok(Redirect::to("/dashboard").into_response());
            }
        }
    }

    Ok(LoginTemplate {}.into_response())
}

/// Browser redemption: activate the code and establish the cookie session.
pub async fn web_login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RedeemForm>,
) -> Result<Response, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let activated = state
        .lifecycle
        .validate_and_activate(&form.code, &client, Utc::now())
        .await?;

    session.insert(SESSION_USER_ID_KEY, activated.user_id).await?;
    session
        .insert(SESSION_ID_KEY, activated.session_id.clone())
        .await?;

    Ok(Redirect::to("/dashboard").into_response())
}

/// Protected page behind the access gate. The gate already confirmed the
/// session, but the deadline is re-read here so the page shows it; losing
/// the race to a concurrent sweep just falls back to the entry page.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<SessionIdentity>,
) -> Result<Response, AppError> {
    let Some(row) = state.store.find_active_session(&identity).await? else {
        return Ok(Redirect::to("/login?no_redirect=1").into_response());
    };

    Ok(DashboardTemplate {
        user_id: identity.user_id,
        expires_at: format_timestamp(row.expires_at),
    }
    .into_response())
}

/// Explicit session end: clear the store row, close the access-log entry,
/// and drop the cookie session.
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    if let Some(identity) = session_identity(&session).await {
        state.store.invalidate_session(&identity, Utc::now()).await?;
        state.throttle.forget(&identity);
        tracing::info!(user_id = identity.user_id, "User logged out");
    }

    session.flush().await?;
    Ok(Redirect::to("/login").into_response())
}
