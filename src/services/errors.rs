//! Error taxonomy returned by services and rendered by the HTTP layer.

use actix_web::http::StatusCode;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::auth::AuthError;
use crate::domain::RuleViolation;
use crate::domain::types::TypeConstraintError;
use crate::forms::FormError;
use crate::rate_limit::RateLimited;
use crate::repository::errors::RepositoryError;
use crate::tasks::TaskError;

/// One field-level problem inside an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub field: Option<String>,
    pub message: String,
    pub code: Option<String>,
}

impl ErrorDetail {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
            code: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Form(String),
    /// Field validation failures collected from a payload.
    #[error("Invalid input.")]
    Validation(Vec<ErrorDetail>),
    #[error("{0}")]
    TypeConstraint(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BusinessRule(String),
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited { retry_after: u64 },
    #[error("repository error: {0}")]
    Repository(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(resource: &str) -> Self {
        ServiceError::NotFound(format!("{resource} not found."))
    }

    pub fn forbidden() -> Self {
        ServiceError::Forbidden("You do not have permission to perform this action.".into())
    }

    /// Machine readable code placed under `error`.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized(_) => "AUTHENTICATION_ERROR",
            ServiceError::Forbidden(_) => "AUTHORIZATION_ERROR",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Form(_)
            | ServiceError::Validation(_)
            | ServiceError::TypeConstraint(_) => "VALIDATION_ERROR",
            ServiceError::Conflict(_) => "CONFLICT_ERROR",
            ServiceError::BusinessRule(_) => "BUSINESS_LOGIC_ERROR",
            ServiceError::RateLimited { .. } => "RATE_LIMIT_ERROR",
            ServiceError::Repository(_) => "DATABASE_ERROR",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to API clients.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Repository(_) => "A database error occurred.".to_string(),
            ServiceError::Internal(_) => "An unexpected error occurred.".to_string(),
            other => other.to_string(),
        }
    }

    /// Serializes to `{error, message, details, context}`.
    pub fn to_body(&self) -> Value {
        let details = match self {
            ServiceError::Validation(details) => details.clone(),
            _ => Vec::new(),
        };
        let mut context = Map::new();
        if let ServiceError::RateLimited { retry_after } = self {
            context.insert("retry_after".into(), json!(retry_after));
        }
        json!({
            "error": self.code(),
            "message": self.public_message(),
            "details": details,
            "context": context,
        })
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Form(_)
            | ServiceError::Validation(_)
            | ServiceError::TypeConstraint(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Repository(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("{self}");
        }
        let mut response = HttpResponse::build(self.status_code());
        if let ServiceError::RateLimited { retry_after } = self {
            response.insert_header((header::RETRY_AFTER, HeaderValue::from(*retry_after)));
        }
        response.json(self.to_body())
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::NotFound("Not found.".into()),
            RepositoryError::ConstraintViolation(msg) => ServiceError::Conflict(msg),
            RepositoryError::ValidationError(msg) => ServiceError::TypeConstraint(msg),
            other => ServiceError::Repository(other.to_string()),
        }
    }
}

impl From<TypeConstraintError> for ServiceError {
    fn from(err: TypeConstraintError) -> Self {
        ServiceError::TypeConstraint(err.to_string())
    }
}

impl From<RuleViolation> for ServiceError {
    fn from(err: RuleViolation) -> Self {
        ServiceError::BusinessRule(err.to_string())
    }
}

impl From<FormError> for ServiceError {
    fn from(err: FormError) -> Self {
        ServiceError::Validation(err.details())
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Issue(_) | AuthError::Hashing(_) => ServiceError::Internal(err.to_string()),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl From<RateLimited> for ServiceError {
    fn from(err: RateLimited) -> Self {
        ServiceError::RateLimited {
            retry_after: err.retry_after,
        }
    }
}

impl From<TaskError> for ServiceError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Repository(e) => e.into(),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}
