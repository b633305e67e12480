//! Request/response types for the logistics endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::super::{first_text, loose_i64, loose_text};
use crate::api::error::ApiError;

pub const DEFAULT_LIMIT: i64 = 10;
pub const DEFAULT_SKIP: i64 = 0;
pub const DEFAULT_SORT: &str = "created_at#!#-1";
pub const DEFAULT_STATUS: &str = "UNASSIGNED";
pub const DEFAULT_FILTER: &str = "unassigned";

/// Search input as the dashboard sends it. Free text may arrive under any of
/// the alias keys; numbers may be strings.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[schema(value_type = Option<String>)]
    pub search_text: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub passport: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub passport_number: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub order_id: Option<Value>,
    #[serde(rename = "order_id")]
    #[schema(value_type = Option<String>)]
    pub order_id_snake: Option<Value>,
    #[schema(value_type = Option<i64>)]
    pub limit: Option<Value>,
    #[schema(value_type = Option<i64>)]
    pub skip: Option<Value>,
    /// A directive string or a list; omitted means the sort syntax is negotiated.
    #[schema(value_type = Option<Vec<String>>)]
    pub sort: Option<Value>,
    #[serde(rename = "type")]
    #[schema(value_type = Option<Vec<String>>)]
    pub kind: Option<Value>,
    #[schema(value_type = Option<Vec<String>>)]
    pub status: Option<Value>,
    #[schema(value_type = Option<Vec<String>>)]
    pub filters: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub current_task: Option<Value>,
}

/// A search with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub search_text: String,
    pub limit: i64,
    pub skip: i64,
    /// `None` when the caller did not pick a sort.
    pub sort: Option<Vec<Value>>,
    pub kind: Vec<Value>,
    pub status: Vec<Value>,
    pub filters: Vec<Value>,
    pub current_task: Value,
}

impl SearchRequest {
    /// Apply alias resolution and defaults.
    ///
    /// # Errors
    /// Returns `BadRequest` when none of the free-text aliases has a value.
    pub fn normalize(&self) -> Result<SearchQuery, ApiError> {
        let search_text = first_text(&[
            self.search_text.as_ref(),
            self.passport.as_ref(),
            self.passport_number.as_ref(),
            self.order_id.as_ref(),
            self.order_id_snake.as_ref(),
        ])
        .ok_or_else(|| ApiError::BadRequest("Provide searchText or passport/orderId".to_string()))?;

        let sort = match &self.sort {
            Some(Value::String(directive)) if !directive.trim().is_empty() => {
                Some(vec![Value::String(directive.trim().to_string())])
            }
            Some(Value::Array(directives)) if !directives.is_empty() => Some(directives.clone()),
            // Anything else counts as "no sort given".
            _ => None,
        };

        Ok(SearchQuery {
            search_text,
            limit: loose_i64(self.limit.as_ref()).unwrap_or(DEFAULT_LIMIT),
            skip: loose_i64(self.skip.as_ref()).unwrap_or(DEFAULT_SKIP),
            sort,
            kind: list_or(self.kind.as_ref(), Vec::new()),
            status: list_or(self.status.as_ref(), vec![json!(DEFAULT_STATUS)]),
            filters: list_or(self.filters.as_ref(), vec![json!(DEFAULT_FILTER)]),
            current_task: self.current_task.clone().unwrap_or(Value::Null),
        })
    }
}

fn list_or(value: Option<&Value>, default: Vec<Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => default,
    }
}

impl SearchQuery {
    /// Upstream body. `sort` is only present when the caller chose one.
    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = json!({
            "searchText": self.search_text,
            "limit": self.limit,
            "skip": self.skip,
            "type": self.kind,
            "status": self.status,
            "filters": self.filters,
            "currentTask": self.current_task,
        });
        if let (Some(sort), Some(object)) = (&self.sort, body.as_object_mut()) {
            object.insert("sort".to_string(), Value::Array(sort.clone()));
        }
        body
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct OrderSearchRequest {
    #[serde(rename = "orderId")]
    #[schema(value_type = Option<String>)]
    pub order_id_camel: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub order_id: Option<Value>,
}

impl OrderSearchRequest {
    #[must_use]
    pub fn order_id(&self) -> Option<String> {
        first_text(&[self.order_id_camel.as_ref(), self.order_id.as_ref()])
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PassportSearchRequest {
    #[schema(value_type = Option<String>)]
    pub passport: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub passport_number: Option<Value>,
}

impl PassportSearchRequest {
    #[must_use]
    pub fn passport(&self) -> Option<String> {
        first_text(&[self.passport.as_ref(), self.passport_number.as_ref()])
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SearchResponse {
    pub ok: bool,
    /// Upstream body, rows untouched.
    #[schema(value_type = Object)]
    pub result: Value,
    /// The request body the upstream accepted.
    #[schema(value_type = Object)]
    pub sent: Value,
    pub variant: String,
    pub attempts: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct BulkSearchRequest {
    #[serde(default)]
    pub queries: Vec<SearchRequest>,
    /// Parallel upstream searches, capped by the server setting.
    pub concurrency: Option<usize>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BulkSearchItem {
    /// Position of the query in the request.
    pub index: usize,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub error: Option<Value>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct BulkSearchResponse {
    pub ok: bool,
    pub results: Vec<BulkSearchItem>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct StatusUpdateRequest {
    #[serde(rename = "orderId")]
    #[schema(value_type = Option<String>)]
    pub order_id: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub status: Option<Value>,
    pub note: Option<String>,
}

impl StatusUpdateRequest {
    /// `(order_id, status)` when both are present.
    #[must_use]
    pub fn required(&self) -> Option<(String, String)> {
        Some((
            loose_text(self.order_id.as_ref())?,
            loose_text(self.status.as_ref())?,
        ))
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct StatusUpdateResponse {
    pub ok: bool,
    #[schema(value_type = Object)]
    pub result: Value,
    pub variant: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct BulkUpdateRequest {
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub ids: Vec<Value>,
    #[schema(value_type = Option<String>)]
    pub status: Option<Value>,
}

impl BulkUpdateRequest {
    /// Ids as strings, blanks dropped.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.ids.iter().filter_map(|id| loose_text(Some(id))).collect()
    }

    #[must_use]
    pub fn status(&self) -> Option<String> {
        loose_text(self.status.as_ref())
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct BulkUpdateResponse {
    pub ok: bool,
    #[schema(value_type = Vec<String>)]
    pub updated: Value,
    #[schema(value_type = Object)]
    pub upstream: Value,
}
