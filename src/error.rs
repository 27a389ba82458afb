// src/error.rs
//! Ошибки клиентского слоя данных

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    NetworkFailure(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Forbidden(String),
    ValidationError(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::NetworkFailure(msg) => write!(f, "Network Failure: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

// Специфичные ошибки для HMS
impl ApiError {
    pub fn reservation_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Reservation with ID '{}' not found", id))
    }

    pub fn user_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("User with ID '{}' not found", id))
    }

    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("Invalid email or password".to_string())
    }

    pub fn email_already_registered(email: &str) -> Self {
        ApiError::Conflict(format!("User with email '{}' already exists", email))
    }

    pub fn fetch_failed(detail: &str) -> Self {
        ApiError::NetworkFailure(format!("Request failed: {}", detail))
    }

    pub fn stay_too_short() -> Self {
        ApiError::ValidationError("Check-out must be at least one day after check-in".to_string())
    }

    pub fn status_change_forbidden(from: &str, to: &str) -> Self {
        ApiError::Forbidden(format!("Status change '{}' -> '{}' is not allowed", from, to))
    }

    pub fn no_pending_confirmation() -> Self {
        ApiError::BadRequest("No confirmation is pending for this action".to_string())
    }

    pub fn validation_failed(field: &str) -> Self {
        ApiError::ValidationError(format!("Validation failed for field: {}", field))
    }

    /// Повторять имеет смысл только сетевые сбои
    pub fn is_retriable(&self) -> bool {
        matches!(self, ApiError::NetworkFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = ApiError::reservation_not_found("42");
        assert_eq!(err.to_string(), "Not Found: Reservation with ID '42' not found");
    }

    #[test]
    fn test_only_network_failures_are_retriable() {
        assert!(ApiError::fetch_failed("timeout").is_retriable());
        assert!(!ApiError::invalid_credentials().is_retriable());
        assert!(!ApiError::reservation_not_found("1").is_retriable());
    }
}
