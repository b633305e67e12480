use std::sync::Arc;

use axum::{
    extract::{Extension, Json},
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::types::{VerifyOtpRequest, VerifyOtpResponse};
use crate::{
    api::{
        error::ApiError,
        handlers::{json_payload, request_origin},
        state::AppState,
    },
    negotiate::{relay, Dimension, Encoding, MismatchRule, Plan},
};

/// Field names the upstream has used for the one-time code, best guess first.
const CODE_FIELDS: [&str; 5] = ["otp", "code", "otp_code", "token", "otpCode"];

pub(crate) fn plan(state: &AppState, session_id: &str, otp: &str, origin: &str) -> Plan {
    Plan::post("verify-otp", state.config().paths().verify_otp.as_str())
        .with_body(json!({ "session_id": session_id }))
        .with_dimension(Dimension::field_name("code", &json!(otp), &CODE_FIELDS))
        .with_dimension(Dimension::encodings(&[Encoding::Json, Encoding::Form]))
        .with_dimension(Dimension::origin(origin))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Session established; cookies set", body = VerifyOtpResponse),
        (status = 400, description = "Missing session id or code", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream rejected every request shape or returned no token", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_otp(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Result<Response, ApiError> {
    let request = json_payload(payload)?;
    let (Some(session_id), Some(otp)) = (request.session_id(), request.otp()) else {
        return Err(ApiError::BadRequest(
            "sessionId/session_id and otp are required".to_string(),
        ));
    };
    let origin = request_origin(&headers, state.config());

    let negotiated = state
        .caller()
        .negotiate(
            &plan(&state, &session_id, &otp, &origin),
            &MismatchRule::verify_otp(),
        )
        .await
        .map_err(|err| ApiError::upstream("verify-otp failed", err))?;

    let token = relay::require_token(&negotiated.body)
        .map_err(|err| ApiError::upstream("verify-otp failed", err))?;

    let cookies = state
        .cookies()
        .issue(token.expose_secret())
        .map_err(|err| ApiError::Internal(format!("session cookie: {err}")))?;
    let mut response_headers = HeaderMap::new();
    for cookie in cookies {
        response_headers.append(SET_COOKIE, cookie);
    }

    info!(variant = %negotiated.variant.label, attempts = negotiated.attempts.len(), "OTP verified");

    let body = VerifyOtpResponse {
        ok: true,
        user: negotiated.body.get("user").cloned().unwrap_or(Value::Null),
        message: relay::extract_message(&negotiated.body, "OTP verified"),
        variant: negotiated.variant.label,
    };

    Ok((response_headers, Json(body)).into_response())
}
