use std::sync::Arc;

use axum::{
    extract::{Extension, Json},
    http::HeaderMap,
};
use serde_json::Value;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{error, info, instrument};

use super::{
    search::run_search,
    types::{BulkSearchItem, BulkSearchRequest, BulkSearchResponse},
    upstream_token,
};
use crate::api::{
    error::ApiError,
    handlers::{json_payload, request_origin},
    state::AppState,
};

fn item(index: usize, outcome: Result<Value, ApiError>) -> BulkSearchItem {
    match outcome {
        Ok(result) => BulkSearchItem {
            index,
            ok: true,
            result: Some(result),
            status: None,
            error: None,
        },
        Err(err) => {
            let (status, body) = err.into_parts();
            BulkSearchItem {
                index,
                ok: false,
                result: None,
                status: Some(status.as_u16()),
                error: Some(body),
            }
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/smv/bulk-search",
    request_body = BulkSearchRequest,
    responses(
        (status = 200, description = "One result per query, in request order", body = BulkSearchResponse),
        (status = 400, description = "Empty or oversized batch", body = crate::api::error::ErrorBody)
    ),
    tag = "smv"
)]
#[instrument(skip_all)]
pub async fn bulk_search(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<BulkSearchRequest>>,
) -> Result<Json<BulkSearchResponse>, ApiError> {
    let request = json_payload(payload)?;
    let total = request.queries.len();
    if total == 0 {
        return Err(ApiError::BadRequest("queries[] is required".to_string()));
    }
    if total > state.bulk_max_queries() {
        return Err(ApiError::BadRequest(format!(
            "at most {} queries per batch",
            state.bulk_max_queries()
        )));
    }

    let concurrency = request
        .concurrency
        .unwrap_or_else(|| state.bulk_concurrency())
        .clamp(1, state.bulk_concurrency());
    let token = upstream_token(&headers, state.config());
    let origin = request_origin(&headers, state.config());
    info!(queries = total, concurrency, "bulk search");

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut results: Vec<Option<BulkSearchItem>> = vec![None; total];
    let mut tasks = JoinSet::new();

    for (index, request) in request.queries.iter().enumerate() {
        let query = match request.normalize() {
            Ok(query) => query,
            Err(err) => {
                results[index] = Some(item(index, Err(err)));
                continue;
            }
        };

        let state = Arc::clone(&state.0);
        let semaphore = Arc::clone(&semaphore);
        let token = token.clone();
        let origin = origin.clone();

        tasks.spawn(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => run_search(&state, &query, token.as_ref(), &origin).await,
                Err(err) => Err(ApiError::Internal(format!("bulk search closed: {err}"))),
            };
            (index, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => results[index] = Some(item(index, outcome)),
            Err(err) => error!("bulk search task failed: {err}"),
        }
    }

    let results = results
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                item(
                    index,
                    Err(ApiError::Internal("search task did not complete".to_string())),
                )
            })
        })
        .collect();

    Ok(Json(BulkSearchResponse { ok: true, results }))
}
