//! Request/response types for auth endpoints.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use super::super::{loose_text, valid_email};
use crate::api::error::ApiError;

/// How the upstream should deliver the one-time password.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoginMethod {
    Email,
    Phone,
}

impl LoginMethod {
    /// Anything with an `@` is an email address.
    #[must_use]
    pub fn classify(identifier: &str) -> Self {
        if identifier.contains('@') {
            Self::Email
        } else {
            Self::Phone
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EMAIL" => Some(Self::Email),
            "PHONE" => Some(Self::Phone),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
        }
    }
}

/// A login identifier split into the `email`/`phone` pair the upstream expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub method: LoginMethod,
    pub email: String,
    pub phone: String,
}

impl Credential {
    /// Resolve the login method (explicit wins over the guess) and normalize
    /// the identifier.
    ///
    /// # Errors
    /// Returns `BadRequest` when the identifier is empty, the method is unknown
    /// or the identifier does not fit the method.
    pub fn resolve(identifier: Option<&str>, method: Option<&str>) -> Result<Self, ApiError> {
        let identifier = identifier
            .map(str::trim)
            .filter(|identifier| !identifier.is_empty())
            .ok_or_else(|| ApiError::BadRequest("identifier required".to_string()))?;

        let method = match method.map(str::trim).filter(|method| !method.is_empty()) {
            Some(method) => LoginMethod::parse(method).ok_or_else(|| {
                ApiError::BadRequest(format!("unsupported method: {method}"))
            })?,
            None => LoginMethod::classify(identifier),
        };

        match method {
            LoginMethod::Email => {
                if !valid_email(identifier) {
                    return Err(ApiError::BadRequest(format!(
                        "invalid email address: {identifier}"
                    )));
                }
                Ok(Self {
                    method,
                    email: identifier.to_string(),
                    phone: String::new(),
                })
            }
            LoginMethod::Phone => {
                let phone = normalize_phone(identifier);
                if phone.is_empty() {
                    return Err(ApiError::BadRequest(format!(
                        "invalid phone number: {identifier}"
                    )));
                }
                Ok(Self {
                    method,
                    email: String::new(),
                    phone,
                })
            }
        }
    }
}

static PHONE_SEPARATORS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[\s\-().]").ok());

/// Drop the separators people type into phone numbers; keep digits and a
/// leading `+`.
#[must_use]
pub fn normalize_phone(phone: &str) -> String {
    PHONE_SEPARATORS.as_ref().map_or_else(
        || phone.trim().to_string(),
        |re| re.replace_all(phone.trim(), "").into_owned(),
    )
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckUserQuery {
    /// Email address or phone number.
    pub identifier: Option<String>,
    /// `EMAIL` or `PHONE`; guessed from the identifier when absent.
    pub method: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CheckUserResponse {
    pub ok: bool,
    #[schema(value_type = Object)]
    pub data: Value,
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct SendOtpRequest {
    pub identifier: Option<String>,
    pub method: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub ok: bool,
    pub message: String,
    pub session_id: Option<String>,
    #[schema(value_type = Object)]
    pub upstream: Value,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct VerifyOtpRequest {
    #[serde(rename = "sessionId")]
    #[schema(value_type = Option<String>)]
    pub session_id_camel: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub session_id: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub otp: Option<Value>,
}

impl VerifyOtpRequest {
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        loose_text(self.session_id_camel.as_ref()).or_else(|| loose_text(self.session_id.as_ref()))
    }

    #[must_use]
    pub fn otp(&self) -> Option<String> {
        loose_text(self.otp.as_ref())
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpResponse {
    pub ok: bool,
    #[schema(value_type = Object)]
    pub user: Value,
    pub message: String,
    /// Label of the request shape the upstream accepted.
    pub variant: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub authenticated: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutResponse {
    pub ok: bool,
}
