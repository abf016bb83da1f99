use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

/// Error taxonomy of the auth surface. Internal detail never reaches the
/// response body; it is logged at the boundary and replaced with a generic
/// message.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Request payload failed schema validation.
    #[error("{0}")]
    Validation(String),

    /// Malformed or unknown user input (bad id, missing field past validation).
    #[error("{0}")]
    UserInput(String),

    /// Failed authentication attempt. The message is deliberately generic so
    /// callers cannot tell which factor was wrong.
    #[error("{0}")]
    AuthFailed(String),

    /// Missing, invalid or expired bearer token, or a gate the current user
    /// does not pass.
    #[error("{0}")]
    Unauthorized(String),

    /// The request contradicts existing account state.
    #[error("{0}")]
    Conflict(String),

    #[error("Server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn internal(message: impl Into<String>) -> Self {
        AuthError::Internal(anyhow::anyhow!(message.into()))
    }
}

impl From<ValidationErrors> for AuthError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid"))
                })
            })
            .collect();
        messages.sort();
        AuthError::Validation(messages.join(", "))
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(error: sqlx::Error) -> Self {
        AuthError::Internal(error.into())
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::UserInput(_)
            | AuthError::AuthFailed(_)
            | AuthError::Conflict(_) => StatusCode::BAD_REQUEST,
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AuthError::Internal(source) = self {
            tracing::error!(error = ?source, "internal error while handling request");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Maps a storage-layer unique violation to the given conflict, leaving any
/// other failure as an internal error. The partial unique indexes on
/// users(email) and oauth2_tokens(provider, provider_user_id) close the
/// check-then-create race under concurrent registrations.
pub fn unique_violation_to_conflict(error: sqlx::Error, conflict: &str) -> AuthError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AuthError::Conflict(conflict.to_string())
        }
        _ => AuthError::Internal(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_hides_detail() {
        let error = AuthError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"));
        assert_eq!(error.to_string(), "Server error");
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_and_auth_failures_map_to_bad_request() {
        assert_eq!(
            AuthError::Conflict("Email already exists".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::AuthFailed("Email and password not matched".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Unauthorized("Token is expired".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
