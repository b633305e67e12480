use std::sync::Arc;

use axum::{
    extract::{Extension, Json},
    http::HeaderMap,
};
use serde_json::json;
use tracing::{info, instrument};

use super::types::{Credential, SendOtpRequest, SendOtpResponse};
use crate::{
    api::{
        error::ApiError,
        handlers::{json_payload, request_origin},
        state::AppState,
    },
    negotiate::{relay, Dimension, MismatchRule, Plan},
};

pub(crate) fn plan(state: &AppState, credential: &Credential, origin: &str) -> Plan {
    let config = state.config();
    Plan::post("send-otp", config.paths().send_otp.as_str())
        .with_body(json!({
            "consumer": config.consumer(),
            "method": credential.method.as_str(),
            "email": credential.email,
            "phone": credential.phone,
            "retry": config.default_retry(),
        }))
        .with_dimension(Dimension::origin(origin))
}

#[utoipa::path(
    post,
    path = "/api/auth/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP dispatched", body = SendOtpResponse),
        (status = 400, description = "Missing or invalid identifier", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream unreachable", body = crate::api::error::ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn send_otp(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SendOtpRequest>>,
) -> Result<Json<SendOtpResponse>, ApiError> {
    let request = json_payload(payload)?;
    let credential = Credential::resolve(request.identifier.as_deref(), request.method.as_deref())?;
    let origin = request_origin(&headers, state.config());

    let negotiated = state
        .caller()
        .negotiate(
            &plan(&state, &credential, &origin),
            &MismatchRule::default(),
        )
        .await
        .map_err(|err| ApiError::upstream("send-otp failed", err))?;

    let session_id = relay::extract_session_id(&negotiated.body);
    info!(
        method = credential.method.as_str(),
        variant = %negotiated.variant.label,
        has_session = session_id.is_some(),
        "OTP requested"
    );

    Ok(Json(SendOtpResponse {
        ok: true,
        message: relay::extract_message(&negotiated.body, "OTP sent"),
        session_id,
        upstream: negotiated.body,
    }))
}
