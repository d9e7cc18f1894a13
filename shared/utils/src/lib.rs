pub mod config;
pub mod logging;
pub mod error;
pub mod validation;
pub mod insights;
pub mod table;
pub mod export;

pub use config::*;
pub use logging::*;
pub use error::*;
pub use validation::*;
pub use table::*;
pub use export::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.bucket, "coa-bucket");
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.auth.session_ttl_hours, 24);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_config_load_fills_builtin_defaults() {
        let config = AppConfig::load().unwrap();
        assert_eq!(config.storage.bucket, "coa-bucket");
        assert!(config.auth.require_tenant_claim);
    }

    #[test]
    fn test_error_handling() {
        let error = CoaError::validation("test_field", "test message");
        assert_eq!(error.error_code(), "VALIDATION_ERROR");
        assert_eq!(error.http_status_code(), 400);

        let response = ErrorResponse::from(error);
        assert_eq!(response.code, "VALIDATION_ERROR");
        assert_eq!(response.message, "test message");
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(CoaError::authentication("no session").http_status_code(), 401);
        assert_eq!(CoaError::not_found("attachment").http_status_code(), 404);
        assert_eq!(CoaError::storage("bucket down").http_status_code(), 502);
        assert_eq!(CoaError::export("bad sheet").error_code(), "EXPORT_ERROR");
    }

    #[test]
    fn test_error_into_response_status() {
        use axum::response::IntoResponse;

        let response = CoaError::Conflict {
            message: "object exists".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), axum::http::StatusCode::CONFLICT);
    }
}
