//! API error handling: structured responses with HTTP status codes and
//! request tracking.

use crate::errors::{LedgerError, OracleError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (BAD_REQUEST, UNAUTHORIZED, CONFLICT, ...).
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    InternalError(String),
}

impl ApiError {
    pub fn bad_request(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest(message),
            request_id,
        }
    }

    pub fn not_found(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::NotFound(message),
            request_id,
        }
    }

    pub fn internal_error(request_id: String, message: String) -> Self {
        Self {
            kind: ApiErrorKind::InternalError(message),
            request_id,
        }
    }

    /// Map the crate error taxonomy onto HTTP semantics.
    ///
    /// Authorization and validation failures are client errors with no
    /// side effects; provider exhaustion is an upstream fault; contract
    /// reverts and settlement races are conflicts the caller can react to.
    pub fn from_oracle(request_id: String, error: OracleError) -> Self {
        let kind = match error {
            OracleError::Unauthorized => ApiErrorKind::Unauthorized(error.to_string()),
            OracleError::Validation(_) => ApiErrorKind::BadRequest(error.to_string()),
            OracleError::Ledger(LedgerError::InvalidAmount(_))
            | OracleError::Ledger(LedgerError::InsufficientBalance { .. }) => {
                ApiErrorKind::BadRequest(error.to_string())
            }
            OracleError::Ledger(LedgerError::ClaimNotFound(_)) => {
                ApiErrorKind::NotFound(error.to_string())
            }
            OracleError::Provider(_) => ApiErrorKind::BadGateway(error.to_string()),
            OracleError::ContractRevert(_)
            | OracleError::NotResolvable(_)
            | OracleError::SettlementInProgress(_) => ApiErrorKind::Conflict(error.to_string()),
            OracleError::Configuration(_)
            | OracleError::Store(_)
            | OracleError::Signing(_) => ApiErrorKind::InternalError(error.to_string()),
        };
        Self { kind, request_id }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::BadRequest(msg) => write!(f, "[{}] Bad Request: {}", self.request_id, msg),
            ApiErrorKind::Unauthorized(msg) => write!(f, "[{}] Unauthorized: {}", self.request_id, msg),
            ApiErrorKind::NotFound(msg) => write!(f, "[{}] Not Found: {}", self.request_id, msg),
            ApiErrorKind::Conflict(msg) => write!(f, "[{}] Conflict: {}", self.request_id, msg),
            ApiErrorKind::BadGateway(msg) => write!(f, "[{}] Bad Gateway: {}", self.request_id, msg),
            ApiErrorKind::InternalError(msg) => write!(f, "[{}] Internal Error: {}", self.request_id, msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.kind {
            ApiErrorKind::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiErrorKind::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiErrorKind::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiErrorKind::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiErrorKind::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg.clone()),
            ApiErrorKind::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = Json(ErrorResponse {
            request_id: self.request_id.clone(),
            error: ErrorBody {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
