//! Candidate request construction.
//!
//! A [`Plan`] is a base request plus an ordered list of [`Dimension`]s. Each
//! dimension lists the known alternatives for one uncertain aspect of the
//! upstream contract (a field name, the sort syntax, the body encoding, a
//! header scheme). [`Plan::variants`] expands the Cartesian product with the
//! first dimension as the most significant digit, so element 0 is always the
//! best guess and the order is reproducible.

use reqwest::Method;
use serde_json::{Map, Value};
use url::form_urlencoded;

/// Body serialization sent to the upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    Form,
}

impl Encoding {
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Form => "application/x-www-form-urlencoded",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Form => "form",
        }
    }
}

/// One transformation applied to the base request.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Set a body field; dotted paths (`query.order_id`) create nested objects.
    SetField { path: String, value: Value },
    RemoveField { path: String },
    /// Header names are matched case-insensitively.
    SetHeader { name: String, value: String },
    RemoveHeader { name: String },
    Encoding(Encoding),
}

/// A labelled alternative within a [`Dimension`].
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    label: String,
    patches: Vec<Patch>,
}

impl Choice {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            patches: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, patch: Patch) -> Self {
        self.patches.push(patch);
        self
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }
}

/// An uncertain aspect of the upstream contract and its known alternatives,
/// in trial order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    name: String,
    choices: Vec<Choice>,
}

impl Dimension {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            choices: Vec::new(),
        }
    }

    #[must_use]
    pub fn choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// The same value sent under each of the candidate keys.
    #[must_use]
    pub fn field_name(name: impl Into<String>, value: &Value, keys: &[&str]) -> Self {
        keys.iter().fold(Self::new(name), |dimension, key| {
            dimension.choice(Choice::new(*key).with(Patch::SetField {
                path: (*key).to_string(),
                value: value.clone(),
            }))
        })
    }

    /// One field, several candidate values.
    #[must_use]
    pub fn field_value(name: impl Into<String>, path: &str, values: Vec<(&str, Value)>) -> Self {
        values
            .into_iter()
            .fold(Self::new(name), |dimension, (label, value)| {
                dimension.choice(Choice::new(label).with(Patch::SetField {
                    path: path.to_string(),
                    value,
                }))
            })
    }

    #[must_use]
    pub fn encodings(encodings: &[Encoding]) -> Self {
        encodings.iter().fold(Self::new("encoding"), |dimension, encoding| {
            dimension.choice(Choice::new(encoding.as_str()).with(Patch::Encoding(*encoding)))
        })
    }

    /// Browser-like `Origin`/`Referer` headers first, then none at all.
    #[must_use]
    pub fn origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self::new("origin")
            .choice(
                Choice::new("with")
                    .with(Patch::SetHeader {
                        name: "Origin".to_string(),
                        value: origin.to_string(),
                    })
                    .with(Patch::SetHeader {
                        name: "Referer".to_string(),
                        value: format!("{origin}/"),
                    }),
            )
            .choice(
                Choice::new("without")
                    .with(Patch::RemoveHeader {
                        name: "Origin".to_string(),
                    })
                    .with(Patch::RemoveHeader {
                        name: "Referer".to_string(),
                    }),
            )
    }

    /// `Authorization: Bearer <token>` first, then the raw token.
    #[must_use]
    pub fn authorization(token: &str) -> Self {
        Self::new("auth")
            .choice(Choice::new("bearer").with(Patch::SetHeader {
                name: "Authorization".to_string(),
                value: format!("Bearer {token}"),
            }))
            .choice(Choice::new("raw").with(Patch::SetHeader {
                name: "Authorization".to_string(),
                value: token.to_string(),
            }))
    }
}

/// A fully resolved candidate request.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub label: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub encoding: Encoding,
}

impl Variant {
    /// Serialized body, if the variant carries one.
    #[must_use]
    pub fn encoded_body(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        match self.encoding {
            Encoding::Json => Some(body.to_string()),
            Encoding::Form => Some(form_encode(body)),
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// One logical upstream operation and the dimensions to negotiate.
#[derive(Debug, Clone)]
pub struct Plan {
    operation: String,
    method: Method,
    path: String,
    body: Option<Value>,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    encoding: Encoding,
    dimensions: Vec<Dimension>,
}

impl Plan {
    #[must_use]
    pub fn post(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(operation, Method::POST, path, Some(Value::Object(Map::new())))
    }

    #[must_use]
    pub fn get(operation: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(operation, Method::GET, path, None)
    }

    fn new(
        operation: impl Into<String>,
        method: Method,
        path: impl Into<String>,
        body: Option<Value>,
    ) -> Self {
        Self {
            operation: operation.into(),
            method,
            path: path.into(),
            body,
            headers: Vec::new(),
            query: Vec::new(),
            encoding: Encoding::Json,
            dimensions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Expand the plan into its candidates, best guess first.
    ///
    /// Never empty: a plan without (non-empty) dimensions yields the base
    /// request as its single `default` variant.
    #[must_use]
    pub fn variants(&self) -> Vec<Variant> {
        let dimensions: Vec<&Dimension> = self
            .dimensions
            .iter()
            .filter(|dimension| !dimension.choices.is_empty())
            .collect();
        let mut indices = vec![0_usize; dimensions.len()];
        let mut variants = Vec::new();

        loop {
            variants.push(self.resolve(&dimensions, &indices));

            // Odometer: the last dimension turns fastest.
            let mut position = dimensions.len();
            loop {
                if position == 0 {
                    return variants;
                }
                position -= 1;
                indices[position] += 1;
                if indices[position] < dimensions[position].choices.len() {
                    break;
                }
                indices[position] = 0;
            }
        }
    }

    fn resolve(&self, dimensions: &[&Dimension], indices: &[usize]) -> Variant {
        let mut body = self.body.clone();
        let mut headers = self.headers.clone();
        let mut encoding = self.encoding;
        let mut labels = Vec::with_capacity(dimensions.len());

        for (dimension, index) in dimensions.iter().zip(indices) {
            let choice = &dimension.choices[*index];
            labels.push(format!("{}={}", dimension.name, choice.label));

            for patch in &choice.patches {
                match patch {
                    Patch::SetField { path, value } => {
                        let target = body.get_or_insert_with(|| Value::Object(Map::new()));
                        let segments: Vec<&str> = path.split('.').collect();
                        set_path(target, &segments, value.clone());
                    }
                    Patch::RemoveField { path } => {
                        if let Some(target) = body.as_mut() {
                            let segments: Vec<&str> = path.split('.').collect();
                            remove_path(target, &segments);
                        }
                    }
                    Patch::SetHeader { name, value } => {
                        set_header(&mut headers, name.clone(), value.clone());
                    }
                    Patch::RemoveHeader { name } => {
                        headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
                    }
                    Patch::Encoding(selected) => encoding = *selected,
                }
            }
        }

        let label = if labels.is_empty() {
            "default".to_string()
        } else {
            labels.join(",")
        };

        Variant {
            label,
            method: self.method.clone(),
            headers,
            query: self.query.clone(),
            body,
            encoding,
        }
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    if let Some(slot) = headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(&name))
    {
        slot.1 = value;
    } else {
        headers.push((name, value));
    }
}

fn set_path(target: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry((*head).to_string()).or_insert(Value::Null);
        set_path(slot, rest, value);
    }
}

fn remove_path(target: &mut Value, segments: &[&str]) {
    match segments {
        [] => {}
        [last] => {
            if let Value::Object(map) = target {
                map.remove(*last);
            }
        }
        [head, rest @ ..] => {
            if let Some(child) = target.get_mut(*head) {
                remove_path(child, rest);
            }
        }
    }
}

// Form bodies are flat: nested values are sent as their JSON text.
fn form_encode(body: &Value) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if let Value::Object(map) = body {
        for (key, value) in map {
            match value {
                Value::String(text) => serializer.append_pair(key, text),
                Value::Null => serializer.append_pair(key, ""),
                other => serializer.append_pair(key, &other.to_string()),
            };
        }
    }
    serializer.finish()
}
