use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum CoaError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Export error: {message}")]
    Export { message: String },
}

impl CoaError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Authentication { .. } => "AUTHENTICATION_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Export { .. } => "EXPORT_ERROR",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Database { .. } => 500,
            Self::Validation { .. } => 400,
            Self::Storage { .. } => 502,
            Self::Authentication { .. } => 401,
            Self::ExternalService { .. } => 502,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Export { .. } => 500,
        }
    }
}

pub type CoaResult<T> = Result<T, CoaError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl From<CoaError> for ErrorResponse {
    fn from(error: CoaError) -> Self {
        let message = match &error {
            CoaError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self {
            error: error.to_string(),
            code: error.error_code().to_string(),
            message,
            details: None,
        }
    }
}

impl IntoResponse for CoaError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

// Conversion from common error types
impl From<sqlx::Error> for CoaError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::not_found("row"),
            other => Self::database(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for CoaError {
    fn from(error: reqwest::Error) -> Self {
        Self::external_service("HTTP Client", error.to_string())
    }
}

impl From<serde_json::Error> for CoaError {
    fn from(error: serde_json::Error) -> Self {
        Self::validation("JSON", error.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for CoaError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        Self::export(error.to_string())
    }
}

impl From<std::io::Error> for CoaError {
    fn from(error: std::io::Error) -> Self {
        Self::storage(error.to_string())
    }
}
