//! Unified error handling for the services and the HTTP gateway.
//!
//! Provides a single error type that carries enough context for callers
//! (offending input, conflicting values, missing ids) and converts into
//! Axum HTTP responses with internal details hidden.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::{DomainError, User};
use serde::Serialize;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration
    #[error("Configuration error: {0}")]
    Config(String),

    // Validation
    #[error("Input cannot be converted into {target}: {}", summarize(.errors))]
    ValidationFailed {
        input: serde_json::Value,
        target: &'static str,
        errors: Vec<FieldError>,
    },

    #[error("Order field '{field}' does not exist on {entity}")]
    UnknownOrderField { field: String, entity: &'static str },

    #[error("No id given to identify the {0} to act on")]
    MissingId(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    // Resource errors
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Username '{0}' is taken")]
    UsernameExists(String),

    #[error("Email '{0}' is used by another user")]
    EmailExists(String),

    // Authentication & Authorization
    #[error("User with username or email not found: {0}")]
    UserNotFound(String),

    #[error("Invalid password used for user {}", .user.username)]
    IncorrectPassword { user: Box<User>, attempt: Redacted },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    // Import
    #[error("File type info is not provided")]
    FileTypeNotProvided,

    #[error("Unknown file extension '{extension}', from file name '{file_name}'")]
    UnknownFileExtension {
        file_name: String,
        extension: String,
    },

    #[error("Unknown content type '{content_type}', file name '{file_name}'")]
    UnknownContentType {
        file_name: String,
        content_type: String,
    },

    // External errors
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "jwt")]
    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[cfg(feature = "import")]
    #[error("Malformed tabular data: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// One field-level cause of a failed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Flatten validator output into dotted field paths, sorted by field.
    pub fn from_validation(errors: &ValidationErrors) -> Vec<FieldError> {
        let mut out = Vec::new();
        collect_validation("", errors, &mut out);
        out.sort_by(|a, b| a.field.cmp(&b.field));
        out
    }

    /// Structural decoding failures are reported against the whole body.
    pub fn from_serde(err: &serde_json::Error) -> FieldError {
        FieldError::new("body", err.to_string())
    }
}

fn collect_validation(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                for e in errs {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", e.code));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_validation(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// A secret value kept for the caller but never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Redacted(String);

impl Redacted {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<FieldError>,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::ValidationFailed { .. } | AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::UnknownOrderField { .. } => "UNKNOWN_ORDER_FIELD",
            AppError::MissingId(_) => "MISSING_ID",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::UsernameExists(_) => "USERNAME_EXISTS",
            AppError::EmailExists(_) => "EMAIL_EXISTS",
            AppError::UserNotFound(_) | AppError::IncorrectPassword { .. } => {
                "INVALID_CREDENTIALS"
            }
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::FileTypeNotProvided
            | AppError::UnknownFileExtension { .. }
            | AppError::UnknownContentType { .. } => "UNSUPPORTED_FILE",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => "AUTH_ERROR",
            #[cfg(feature = "import")]
            AppError::Csv(_) => "IMPORT_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationFailed { .. }
            | AppError::Validation(_)
            | AppError::UnknownOrderField { .. }
            | AppError::MissingId(_)
            | AppError::BadRequest(_)
            | AppError::FileTypeNotProvided
            | AppError::UnknownFileExtension { .. }
            | AppError::UnknownContentType { .. } => StatusCode::BAD_REQUEST,
            AppError::UsernameExists(_) | AppError::EmailExists(_) => StatusCode::CONFLICT,
            AppError::UserNotFound(_)
            | AppError::IncorrectPassword { .. }
            | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Credentials: never tell which half was wrong
            AppError::UserNotFound(_) | AppError::IncorrectPassword { .. } => {
                "Invalid username, email or password".to_string()
            }

            // Hide details for internal/security errors
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                "The service is misconfigured".to_string()
            }
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            #[cfg(feature = "jwt")]
            AppError::Jwt(e) => {
                tracing::debug!("JWT error: {:?}", e);
                "Invalid or expired token".to_string()
            }
            #[cfg(feature = "import")]
            AppError::Csv(e) => {
                tracing::error!("Import error: {:?}", e);
                "The uploaded file could not be read".to_string()
            }
            AppError::Io(e) => {
                tracing::error!("I/O error: {:?}", e);
                "An internal error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }

    /// Field-level causes, if any.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AppError::ValidationFailed { errors, .. } => errors,
            _ => &[],
        }
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
                details: self.field_errors().to_vec(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Password(msg) => AppError::Internal(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &'static str, id: impl ToString) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &'static str, id: impl ToString) -> AppResult<T> {
        self.ok_or_else(|| AppError::not_found(entity, id))
    }
}

/// Convenience constructors
impl AppError {
    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Inner {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
    }

    #[derive(Validate)]
    struct Outer {
        #[validate(email)]
        email: String,
        #[validate(nested)]
        inner: Inner,
    }

    #[test]
    fn test_field_errors_are_flattened_with_paths() {
        let value = Outer {
            email: "nope".to_string(),
            inner: Inner {
                name: String::new(),
            },
        };
        let errors = FieldError::from_validation(&value.validate().unwrap_err());

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "email");
        assert_eq!(errors[1], FieldError::new("inner.name", "must not be empty"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::UsernameExists("alice".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::UserNotFound("alice".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::not_found("JobListing", "42").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::MissingId("User".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::config("DB_HOST is not set").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_conflict_messages_name_the_value() {
        assert_eq!(
            AppError::UsernameExists("alice".into()).to_string(),
            "Username 'alice' is taken"
        );
        assert_eq!(
            AppError::EmailExists("a@x.com".into()).to_string(),
            "Email 'a@x.com' is used by another user"
        );
    }

    #[test]
    fn test_incorrect_password_hides_attempt() {
        let err = AppError::IncorrectPassword {
            user: Box::new(User {
                id: None,
                username: "alice".into(),
                email: "alice@x.com".into(),
                password: "hash".into(),
            }),
            attempt: Redacted::new("hunter22"),
        };

        assert!(!format!("{:?}", err).contains("hunter22"));
        assert!(err.to_string().contains("alice"));
        assert_eq!(err.user_message(), "Invalid username, email or password");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::internal("connection pool exhausted");
        assert_eq!(err.user_message(), "An internal error occurred");
    }

    #[test]
    fn test_option_ext() {
        let missing: Option<u8> = None;
        let err = missing.ok_or_not_found("User", 7).unwrap_err();
        assert_eq!(err.to_string(), "User with id 7 not found");
    }
}
