// src/errors.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Application not found")]
    ApplicationNotFound,

    #[error("Document not found")]
    DocumentNotFound,

    #[error("Duplicate key error")]
    DuplicateKey,

    #[error("Paystack error: {0}")]
    PaystackError(String),

    #[error("Payment not successful: {0}")]
    PaymentNotSuccessful(String),

    #[error("Authentication error")]
    AuthError,

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Invalid document format")]
    InvalidDocumentFormat,

    #[error("Document too large")]
    DocumentTooLarge,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Cloudinary error: {0}")]
    CloudinaryError(String),

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Service error: {0}")]
    ServiceError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MongoDB(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string()),
            AppError::Multipart(_) => (StatusCode::BAD_REQUEST, "Invalid multipart data".to_string()),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO error".to_string()),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "Validation failed".to_string()),
            AppError::ApplicationNotFound => (StatusCode::NOT_FOUND, "Application not found".to_string()),
            AppError::DocumentNotFound => (StatusCode::NOT_FOUND, "Document not found".to_string()),
            AppError::DuplicateKey => (StatusCode::CONFLICT, "Duplicate entry".to_string()),
            // Gateway failures surface to the caller as a plain 400; the
            // webhook side relies on Paystack's own retry policy instead
            AppError::PaystackError(_) => (StatusCode::BAD_REQUEST, "Paystack error".to_string()),
            AppError::PaymentNotSuccessful(_) => (StatusCode::BAD_REQUEST, "Payment not successful".to_string()),
            AppError::AuthError => (StatusCode::UNAUTHORIZED, "Authentication failed".to_string()),
            AppError::Unauthorized => (StatusCode::FORBIDDEN, "Unauthorized access".to_string()),
            AppError::InvalidDocumentFormat => (StatusCode::BAD_REQUEST, "Invalid document format".to_string()),
            AppError::DocumentTooLarge => (StatusCode::BAD_REQUEST, "Document too large".to_string()),
            AppError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable".to_string()),
            AppError::ExternalApi(_) => (StatusCode::BAD_GATEWAY, "External API error".to_string()),
            AppError::CloudinaryError(_) => (StatusCode::BAD_GATEWAY, "Cloudinary error".to_string()),
            AppError::EmailError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Email error".to_string()),
            AppError::ConfigurationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error".to_string()),
            AppError::ServiceError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Service error".to_string()),
        };

        let body = Json(json!({
            "error": error_message,
            "message": self.to_string(),
            "success": false,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

// Manual From implementations
impl From<axum_extra::extract::multipart::MultipartError> for AppError {
    fn from(err: axum_extra::extract::multipart::MultipartError) -> Self {
        AppError::Multipart(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(format!("JSON parsing error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi(format!("HTTP request failed: {}", err))
    }
}

impl From<mongodb::bson::oid::Error> for AppError {
    fn from(err: mongodb::bson::oid::Error) -> Self {
        AppError::ValidationError(format!("Invalid ID format: {}", err))
    }
}

// Helper conversion functions
impl AppError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn paystack(msg: impl Into<String>) -> Self {
        AppError::PaystackError(msg.into())
    }

    pub fn external_api(msg: impl Into<String>) -> Self {
        AppError::ExternalApi(msg.into())
    }

    pub fn cloudinary(msg: impl Into<String>) -> Self {
        AppError::CloudinaryError(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AppError::ConfigurationError(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        AppError::ServiceError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_maps_to_401() {
        let response = AppError::AuthError.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_validation_error_maps_to_400() {
        let response = AppError::ValidationError("missing field".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_payment_not_successful_maps_to_400() {
        let response = AppError::PaymentNotSuccessful("declined".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_paystack_error_maps_to_400() {
        let response = AppError::PaystackError("invalid amount".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_application_not_found_maps_to_404() {
        let response = AppError::ApplicationNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
