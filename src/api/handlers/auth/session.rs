use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::{debug, error};

use super::types::{LogoutResponse, SessionResponse};
use crate::{api::state::AppState, negotiate::relay};

#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session cookie present", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap) -> impl IntoResponse {
    // Presence only; the upstream is the authority on whether the token is valid.
    if relay::has_session(&headers) {
        Json(SessionResponse {
            authenticated: true,
        })
        .into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookies cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout(state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let mut response_headers = HeaderMap::new();
    match state.cookies().clear() {
        Ok(cookies) => {
            for cookie in cookies {
                response_headers.append(SET_COOKIE, cookie);
            }
        }
        Err(err) => error!("Failed to build logout cookies: {err}"),
    }
    response_headers.insert(
        HeaderName::from_static("clear-site-data"),
        HeaderValue::from_static("\"cookies\", \"storage\""),
    );
    debug!("session cleared");

    (response_headers, Json(LogoutResponse { ok: true }))
}
