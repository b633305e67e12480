use std::sync::Arc;

use axum::{
    extract::{Extension, Json},
    http::HeaderMap,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{
    types::{OrderSearchRequest, PassportSearchRequest, SearchQuery, SearchRequest, SearchResponse},
    upstream_token,
};
use crate::{
    api::{
        error::ApiError,
        handlers::{json_payload, request_origin},
        state::AppState,
    },
    negotiate::{relay, Dimension, MismatchRule, Plan},
};

/// Sort syntaxes the logistics search has accepted, best guess first.
fn search_sorts() -> Vec<(&'static str, Value)> {
    vec![
        ("hash", json!(["created_at#!#-1"])),
        ("object", json!([{"field": "created_at", "order": "desc"}])),
        ("prefix", json!(["-created_at"])),
    ]
}

/// Sort syntaxes for the orders search.
fn order_sorts() -> Vec<(&'static str, Value)> {
    vec![
        ("updated-object", json!([{"field": "updated_at", "order": "desc"}])),
        ("created-object", json!([{"field": "created_at", "order": "desc"}])),
        ("updated-prefix", json!(["-updated_at"])),
        ("created-prefix", json!(["-created_at"])),
    ]
}

/// The mismatch subjects also cover the auth scheme, since an explicit sort
/// leaves only the header dimensions to negotiate.
fn search_rule() -> MismatchRule {
    MismatchRule::default().with_subjects(&["authorization"])
}

pub(crate) fn plan(
    state: &AppState,
    query: &SearchQuery,
    token: Option<&SecretString>,
    origin: &str,
) -> Plan {
    let mut plan = Plan::post("search", state.config().paths().search.as_str()).with_body(query.body());
    if let Some(token) = token {
        plan = plan.with_dimension(Dimension::authorization(token.expose_secret()));
    }
    plan = plan.with_dimension(Dimension::origin(origin));
    // Last dimension turns fastest: a sort complaint moves on to the next syntax.
    if query.sort.is_none() {
        plan = plan.with_dimension(Dimension::field_value("sort", "sort", search_sorts()));
    }
    plan
}

pub(crate) fn orders_plan(operation: &str, path: &str, filter: Value, origin: &str) -> Plan {
    let origin = origin.trim_end_matches('/');
    Plan::post(operation, path)
        .with_body(json!({ "query": filter, "limit": 20, "page": 1 }))
        .with_header("Origin", origin)
        .with_header("Referer", format!("{origin}/"))
        .with_dimension(Dimension::field_value("sort", "sort", order_sorts()))
}

/// Negotiate one normalized search. Shared with the bulk fan-out.
pub(crate) async fn run_search(
    state: &AppState,
    query: &SearchQuery,
    token: Option<&SecretString>,
    origin: &str,
) -> Result<Value, ApiError> {
    let negotiated = state
        .caller()
        .negotiate(&plan(state, query, token, origin), &search_rule())
        .await
        .map_err(|err| ApiError::upstream("logistics search failed", err))?;

    info!(variant = %negotiated.variant.label, "logistics search accepted");
    Ok(relay::search_envelope(&negotiated))
}

#[utoipa::path(
    post,
    path = "/api/smv/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Upstream search result", body = SearchResponse),
        (status = 400, description = "No search text", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream rejected every request shape", body = crate::api::error::ErrorBody)
    ),
    tag = "smv"
)]
#[instrument(skip_all)]
pub async fn search(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SearchRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = json_payload(payload)?;
    let query = request.normalize()?;
    let token = upstream_token(&headers, state.config());
    let origin = request_origin(&headers, state.config());

    run_search(&state, &query, token.as_ref(), &origin)
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/api/smv/search-order",
    request_body = OrderSearchRequest,
    responses(
        (status = 200, description = "Upstream order search result", body = SearchResponse),
        (status = 400, description = "No order id", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream rejected every sort syntax", body = crate::api::error::ErrorBody)
    ),
    tag = "smv"
)]
#[instrument(skip_all)]
pub async fn search_order(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<OrderSearchRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = json_payload(payload)?;
    let order_id = request
        .order_id()
        .ok_or_else(|| ApiError::BadRequest("orderId is required".to_string()))?;
    let origin = request_origin(&headers, state.config());
    let plan = orders_plan(
        "search-order",
        &state.config().paths().search_order,
        json!({ "order_id": order_id, "orderId": order_id }),
        &origin,
    );

    let negotiated = state
        .caller()
        .negotiate(&plan, &MismatchRule::default())
        .await
        .map_err(|err| ApiError::upstream("order search failed", err))?;

    Ok(Json(relay::search_envelope(&negotiated)))
}

#[utoipa::path(
    post,
    path = "/api/smv/search-passport",
    request_body = PassportSearchRequest,
    responses(
        (status = 200, description = "Upstream passport search result", body = SearchResponse),
        (status = 400, description = "No passport number", body = crate::api::error::ErrorBody),
        (status = 502, description = "Upstream rejected every sort syntax", body = crate::api::error::ErrorBody)
    ),
    tag = "smv"
)]
#[instrument(skip_all)]
pub async fn search_passport(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<PassportSearchRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = json_payload(payload)?;
    let passport = request
        .passport()
        .ok_or_else(|| ApiError::BadRequest("passport is required".to_string()))?;
    let origin = request_origin(&headers, state.config());
    let plan = orders_plan(
        "search-passport",
        &state.config().paths().search_passport,
        json!({ "passport": passport, "passport_number": passport }),
        &origin,
    );

    let negotiated = state
        .caller()
        .negotiate(&plan, &MismatchRule::default())
        .await
        .map_err(|err| ApiError::upstream("passport search failed", err))?;

    Ok(Json(relay::search_envelope(&negotiated)))
}
