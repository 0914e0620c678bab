use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain::services::{AuthError, LinkError, StoreError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid pairing code")]
    InvalidCode,

    #[error("Pairing code has expired")]
    ExpiredCode,

    #[error("A link request is already pending for this guardian")]
    AlreadyPending,

    #[error("Already linked to this guardian")]
    AlreadyLinked,

    #[error("Already linked to another guardian")]
    AlreadyLinkedElsewhere,

    #[error("Alert is already resolved")]
    AlertAlreadyResolved,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::InvalidCode => (
                StatusCode::NOT_FOUND,
                "invalid_code",
                "No pairing code matches. Check the code with the guardian.".into(),
            ),
            ApiError::ExpiredCode => (
                StatusCode::CONFLICT,
                "expired_code",
                "This pairing code has expired. Ask the guardian for a new one.".into(),
            ),
            ApiError::AlreadyPending => (
                StatusCode::CONFLICT,
                "already_pending",
                "A link request for this guardian is already awaiting approval.".into(),
            ),
            ApiError::AlreadyLinked => (
                StatusCode::CONFLICT,
                "already_linked",
                "This account is already linked to this guardian.".into(),
            ),
            ApiError::AlreadyLinkedElsewhere => (
                StatusCode::CONFLICT,
                "already_linked_elsewhere",
                "This account is already linked to another guardian.".into(),
            ),
            ApiError::AlertAlreadyResolved => (
                StatusCode::CONFLICT,
                "alert_already_resolved",
                "This alert has already been resolved.".into(),
            ),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests. Please try again later.".into(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg.clone(),
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::MalformedCode => ApiError::Validation(err.to_string()),
            LinkError::InvalidCode => ApiError::InvalidCode,
            LinkError::ExpiredCode => ApiError::ExpiredCode,
            LinkError::AlreadyPending => ApiError::AlreadyPending,
            LinkError::AlreadyLinked => ApiError::AlreadyLinked,
            LinkError::AlreadyLinkedElsewhere => ApiError::AlreadyLinkedElsewhere,
            LinkError::NotFound => ApiError::NotFound("No matching link record".into()),
            LinkError::Auth(e) => e.into(),
            LinkError::Store(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::RoleViolation { .. } | AuthError::Denied => {
                ApiError::Forbidden(err.to_string())
            }
            AuthError::Store(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::Conflict("Resource already exists".into()),
            StoreError::Unavailable(msg) => ApiError::ServiceUnavailable(msg),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => ApiError::Conflict("Resource already exists".into()),
                        "23503" => ApiError::NotFound("Referenced resource not found".into()),
                        _ => ApiError::Internal(format!("Database error: {}", db_err)),
                    }
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message.clone().map(|m| m.to_string()).unwrap_or_default()
                    )
                })
            })
            .collect();

        ApiError::Validation(messages.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_api_error_statuses() {
        let cases = [
            (
                ApiError::Unauthorized("t".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ApiError::Forbidden("t".into()), StatusCode::FORBIDDEN),
            (ApiError::NotFound("t".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("t".into()), StatusCode::CONFLICT),
            (ApiError::InvalidCode, StatusCode::NOT_FOUND),
            (ApiError::ExpiredCode, StatusCode::CONFLICT),
            (ApiError::AlreadyPending, StatusCode::CONFLICT),
            (ApiError::AlreadyLinked, StatusCode::CONFLICT),
            (ApiError::AlreadyLinkedElsewhere, StatusCode::CONFLICT),
            (ApiError::AlertAlreadyResolved, StatusCode::CONFLICT),
            (ApiError::Validation("t".into()), StatusCode::BAD_REQUEST),
            (ApiError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (
                ApiError::Internal("t".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::ServiceUnavailable("t".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, expected) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_link_error_conversion() {
        assert!(matches!(
            ApiError::from(LinkError::InvalidCode),
            ApiError::InvalidCode
        ));
        assert!(matches!(
            ApiError::from(LinkError::ExpiredCode),
            ApiError::ExpiredCode
        ));
        assert!(matches!(
            ApiError::from(LinkError::AlreadyPending),
            ApiError::AlreadyPending
        ));
        assert!(matches!(
            ApiError::from(LinkError::MalformedCode),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn test_auth_error_is_forbidden_never_downgraded() {
        let error = ApiError::from(AuthError::Denied);
        assert!(matches!(error, ApiError::Forbidden(_)));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(
            ApiError::from(StoreError::Duplicate),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::Unavailable("down".into())),
            ApiError::ServiceUnavailable(_)
        ));
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, ApiError::NotFound(_)));
    }
}
