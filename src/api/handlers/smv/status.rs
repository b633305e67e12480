use std::sync::Arc;

use axum::{
    extract::{Extension, Json},
    http::HeaderMap,
};
use chrono::{SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, instrument};

use super::{
    types::{BulkUpdateRequest, BulkUpdateResponse, StatusUpdateRequest, StatusUpdateResponse},
    upstream_token,
};
use crate::{
    api::{error::ApiError, handlers::json_payload, state::AppState},
    negotiate::{relay, Dimension, MismatchRule, Plan, UpstreamConfig},
};

/// Auth scheme mismatches advance to the next variant.
fn update_rule() -> MismatchRule {
    MismatchRule::default()
        .with_subjects(&["authorization", "bearer", "token"])
        .with_requirements(&["invalid format", "malformed"])
}

pub(crate) fn status_plan(
    config: &UpstreamConfig,
    order_id: &str,
    status: &str,
    note: &str,
    at: &str,
    token: Option<&SecretString>,
) -> Plan {
    let plan = Plan::post("status-update", config.paths().update_status.as_str()).with_body(json!({
        "order_id": order_id,
        "status": status,
        "note": note,
        "at": at,
    }));
    match token {
        Some(token) => plan.with_dimension(Dimension::authorization(token.expose_secret())),
        None => plan,
    }
}

pub(crate) fn bulk_plan(
    config: &UpstreamConfig,
    ids: &[String],
    status: &str,
    token: &SecretString,
) -> Plan {
    let origin = config.origin().trim_end_matches('/');
    Plan::post("bulk-update", config.paths().bulk_update.as_str())
        .with_body(json!({ "ids": ids, "status": status }))
        .with_header("Origin", origin)
        .with_header("Referer", format!("{origin}/"))
        .with_header("x-consumer", config.consumer())
        .with_dimension(Dimension::authorization(token.expose_secret()))
}

#[utoipa::path(
    post,
    path = "/api/smv/status-update",
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status recorded upstream", body = StatusUpdateResponse),
        (status = 400, description = "Missing order id or status", body = crate::api::error::ErrorBody)
    ),
    tag = "smv"
)]
#[instrument(skip_all)]
pub async fn status_update(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<StatusUpdateRequest>>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    let request = json_payload(payload)?;
    let (order_id, status) = request
        .required()
        .ok_or_else(|| ApiError::BadRequest("orderId and status required".to_string()))?;
    let note = request.note.as_deref().unwrap_or_default();
    let at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let token = upstream_token(&headers, state.config());

    let plan = status_plan(state.config(), &order_id, &status, note, &at, token.as_ref());
    let negotiated = state
        .caller()
        .negotiate(&plan, &update_rule())
        .await
        .map_err(|err| ApiError::upstream("status update failed", err))?;

    info!(order_id = %order_id, status = %status, "status updated");

    Ok(Json(StatusUpdateResponse {
        ok: true,
        result: negotiated.body,
        variant: negotiated.variant.label,
    }))
}

#[utoipa::path(
    post,
    path = "/api/smv/logistics/bulk-update",
    request_body = BulkUpdateRequest,
    responses(
        (status = 200, description = "Statuses updated", body = BulkUpdateResponse),
        (status = 400, description = "Missing ids or status", body = crate::api::error::ErrorBody),
        (status = 401, description = "No session cookie", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream rejected the update", body = crate::api::error::ErrorBody)
    ),
    tag = "smv"
)]
#[instrument(skip_all)]
pub async fn bulk_update(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<BulkUpdateRequest>>,
) -> Result<Json<BulkUpdateResponse>, ApiError> {
    let request = json_payload(payload)?;
    let ids = request.ids();
    let status = request.status();
    let Some(status) = status.filter(|_| !ids.is_empty()) else {
        return Err(ApiError::BadRequest(
            "ids[] and status are required".to_string(),
        ));
    };
    let token = relay::session_token(&headers).ok_or_else(|| {
        ApiError::Unauthorized("Not authenticated. Missing smv_token cookie.".to_string())
    })?;

    let plan = bulk_plan(state.config(), &ids, &status, &token);
    let negotiated = state
        .caller()
        .negotiate(&plan, &update_rule())
        .await
        .map_err(|err| ApiError::gateway("bulk-update failed", err))?;

    info!(count = ids.len(), status = %status, "bulk update accepted");

    Ok(Json(BulkUpdateResponse {
        ok: true,
        updated: relay::extract_updated(&negotiated.body),
        upstream: negotiated.body,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_plan_without_token_is_single_variant() {
        let config = UpstreamConfig::default();
        let variants = status_plan(
            &config,
            "ORD-1",
            "PICKED",
            "",
            "2026-01-02T03:04:05.000Z",
            None,
        )
        .variants();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].label, "default");
        assert_eq!(
            variants[0].body,
            Some(json!({
                "order_id": "ORD-1",
                "status": "PICKED",
                "note": "",
                "at": "2026-01-02T03:04:05.000Z"
            }))
        );
        assert!(variants[0].header("Authorization").is_none());
    }

    #[test]
    fn bulk_plan_carries_consumer_and_auth_schemes() {
        let config = UpstreamConfig::default().with_consumer("nucleus".to_string());
        let token = SecretString::from("tok-9");
        let variants = bulk_plan(&config, &["a".to_string()], "DISPATCHED", &token).variants();
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].header("x-consumer"), Some("nucleus"));
        assert_eq!(variants[0].header("Authorization"), Some("Bearer tok-9"));
        assert_eq!(variants[1].header("Authorization"), Some("tok-9"));
        assert_eq!(
            variants[0].header("Origin"),
            Some(config.origin().trim_end_matches('/'))
        );
    }

    #[test]
    fn update_rule_advances_on_auth_format_complaints() {
        assert!(update_rule().matches("Authorization header must use the Bearer scheme"));
        assert!(!update_rule().matches("jwt expired"));
    }
}
