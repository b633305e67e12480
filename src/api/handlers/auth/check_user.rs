use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{debug, instrument};

use super::types::{CheckUserQuery, CheckUserResponse, Credential};
use crate::{
    api::{error::ApiError, state::AppState},
    negotiate::{MismatchRule, NegotiationError, Plan},
};

pub(crate) fn plan(state: &AppState, credential: &Credential) -> Plan {
    Plan::get("check-user", state.config().paths().check_user.as_str())
        .with_query("method", credential.method.as_str())
        .with_query("phone", credential.phone.as_str())
        .with_query("email", credential.email.as_str())
}

#[utoipa::path(
    get,
    path = "/api/auth/check-user",
    params(CheckUserQuery),
    responses(
        (status = 200, description = "User exists", body = CheckUserResponse),
        (status = 400, description = "Missing or invalid identifier", body = crate::api::error::ErrorBody),
        (status = 404, description = "Upstream does not know the user")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn check_user(
    Query(query): Query<CheckUserQuery>,
    state: Extension<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let credential = Credential::resolve(query.identifier.as_deref(), query.method.as_deref())?;
    debug!(method = credential.method.as_str(), "checking user");

    match state
        .caller()
        .negotiate(&plan(&state, &credential), &MismatchRule::default())
        .await
    {
        Ok(negotiated) => Ok(Json(CheckUserResponse {
            ok: true,
            data: negotiated.body,
            message: "User exists".to_string(),
        })
        .into_response()),
        // The dashboard reads `data` to tell an unknown user from a failure.
        Err(NegotiationError::Upstream { status, body, .. }) => {
            let status = if status.is_client_error() || status.is_server_error() {
                status
            } else {
                StatusCode::BAD_GATEWAY
            };
            Ok((
                status,
                Json(json!({ "error": "check-user failed", "data": body })),
            )
                .into_response())
        }
        Err(err) => Err(ApiError::upstream("check-user failed", err)),
    }
}
