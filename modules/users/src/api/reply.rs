use http::StatusCode;
use serde_json::{Value, json};

use crate::domain::error::DomainError;

/// Response body as produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

impl Payload {
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text(_) => "text/plain; charset=utf-8",
            Self::Json(_) => "application/json",
        }
    }

    /// Wire form of the body.
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Json(v) => v.to_string(),
        }
    }
}

/// Handler outcome, independent of any transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok(Payload),
    ValidationError(String),
    NotFound,
    StoreError {
        detail: String,
        /// Request body echoed back to the caller, when the operation had one.
        echo: Option<Value>,
    },
}

impl Reply {
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::Ok(Payload::Text(body.into()))
    }

    #[must_use]
    pub fn json(body: Value) -> Self {
        Self::Ok(Payload::Json(body))
    }

    /// Map a domain failure; `echo` is attached to store faults only.
    #[must_use]
    pub fn from_domain(err: DomainError, echo: Option<Value>) -> Self {
        match err {
            DomainError::Validation { detail } => Self::ValidationError(detail),
            DomainError::NotFound { .. } => Self::NotFound,
            e @ (DomainError::Store { .. } | DomainError::Timeout { .. }) => Self::StoreError {
                detail: e.to_string(),
                echo,
            },
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ok(_) => StatusCode::OK,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::StoreError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn into_response(self) -> NormalizedResponse {
        let status = self.status();
        let body = match self {
            Self::Ok(payload) => payload,
            Self::ValidationError(msg) => Payload::Json(json!({ "error": msg })),
            Self::NotFound => Payload::Text(NOT_FOUND_BODY.to_owned()),
            Self::StoreError { detail, echo } => {
                let mut body = json!({ "error": detail });
                if let Some(echo) = echo {
                    body["body"] = echo;
                }
                Payload::Json(body)
            }
        };
        NormalizedResponse { status, body }
    }
}

pub(crate) const NOT_FOUND_BODY: &str = "not found";

/// Transport-neutral response handed to a binder.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub status: StatusCode,
    pub body: Payload,
}

impl NormalizedResponse {
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            body: Payload::Text("method not allowed".to_owned()),
        }
    }
}
