use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use storefront_auth::{AuthzError, JwtError, PasswordError};
use storefront_core::DomainError;
use storefront_infra::{StorageError, StoreError};
use storefront_payments::GatewayError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure a handler can report, mapped onto one HTTP status each.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::InsufficientStock(_) => (StatusCode::BAD_REQUEST, "insufficient_stock"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation"),
            ApiError::BadGateway(_) => (StatusCode::BAD_GATEWAY, "gateway_error"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        let message = match self {
            // Internal details stay in the logs.
            ApiError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        json_error(status, code, message)
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::InvalidId(msg) => ApiError::Validation(format!("invalid identifier: {msg}")),
            e @ DomainError::InsufficientStock { .. } => ApiError::InsufficientStock(e.to_string()),
            DomainError::InvariantViolation(msg) => ApiError::Unprocessable(msg),
            DomainError::NotFound(what) => ApiError::not_found(what),
            DomainError::Conflict(msg) => ApiError::Conflict(msg),
            DomainError::Unauthorized => ApiError::Unauthorized("unauthorized".to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::not_found(what),
            StoreError::Conflict(msg) => ApiError::Conflict(msg),
            StoreError::Domain(e) => e.into(),
            StoreError::Database(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Encode(e) => ApiError::Internal(format!("token encoding failed: {e}")),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::BadGateway(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(key) => ApiError::Validation(format!("invalid object key: {key}")),
            StorageError::NotFound(key) => ApiError::NotFound(format!("object {key} not found")),
            StorageError::Backend(msg) => ApiError::BadGateway(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .next()
                    .unwrap_or_else(|| errs.first().map(|e| e.code.to_string()).unwrap_or_default());
                format!("{field}: {detail}")
            })
            .collect();
        fields.sort();
        ApiError::Validation(fields.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (DomainError::insufficient_stock("Mug", 3, 1), StatusCode::BAD_REQUEST),
            (DomainError::invariant("x"), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::not_found("order"), StatusCode::NOT_FOUND),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
            (DomainError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).parts().0, status);
        }
    }

    #[test]
    fn database_errors_are_internal() {
        let err = ApiError::from(StoreError::Database("boom".into()));
        assert_eq!(err.parts().0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn gateway_errors_are_bad_gateway() {
        let err = ApiError::from(GatewayError::Api {
            status: 500,
            body: "oops".into(),
        });
        assert_eq!(err.parts(), (StatusCode::BAD_GATEWAY, "gateway_error"));
    }
}
