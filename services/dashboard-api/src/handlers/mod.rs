pub mod attachments;
pub mod auth;
pub mod health;
pub mod insights;
pub mod records;

pub use attachments::*;
pub use auth::*;
pub use health::*;
pub use insights::*;
pub use records::*;

use clearcoa_database::StorageError;
use clearcoa_utils::CoaError;

const DATABASE_ERROR_MESSAGE: &str = "Failed to load data";

/// Repository failures are logged with their full context chain; the client
/// only sees a generic message.
pub(crate) fn database_error(error: anyhow::Error) -> CoaError {
    clearcoa_utils::log_error!(format!("{:#}", error), "Repository call failed");
    CoaError::database(DATABASE_ERROR_MESSAGE)
}

pub(crate) fn storage_error(error: StorageError) -> CoaError {
    match error {
        StorageError::InvalidPath(path) => {
            CoaError::validation("file", format!("Invalid object path: {}", path))
        }
        StorageError::Http { status: 409, message } => CoaError::Conflict { message },
        other => CoaError::storage(other.to_string()),
    }
}
