use crate::error::{CoaError, CoaResult};
use validator::{Validate, ValidationErrors};

pub fn validate_model<T: Validate>(model: &T) -> CoaResult<()> {
    match model.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let error_messages = format_validation_errors(&errors);
            Err(CoaError::validation("model", error_messages))
        }
    }
}

pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            let message = match (&error.message, &error.code) {
                (Some(message), _) => message.to_string(),
                (None, code) if code == "email" => "Invalid email format".to_string(),
                (None, code) if code == "length" => {
                    format!("Length validation failed for field '{}'", field)
                }
                (None, code) => format!("Validation failed for field '{}': {}", field, code),
            };
            messages.push(message);
        }
    }

    messages.sort();
    messages.join(", ")
}

/// Reduce a client-supplied file name to a safe object-key component.
///
/// Directory parts (either separator) are dropped; control characters are
/// rejected along with names that end up empty or are only dots.
pub fn sanitize_upload_file_name(raw: &str) -> CoaResult<String> {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base.chars().all(|c| c == '.') {
        return Err(CoaError::validation("file", "File name is required"));
    }
    if base.chars().any(char::is_control) {
        return Err(CoaError::validation(
            "file",
            "File name contains control characters",
        ));
    }
    if base.len() > 255 {
        return Err(CoaError::validation(
            "file",
            "File name must be at most 255 bytes",
        ));
    }

    Ok(base.to_string())
}

pub fn validate_file_size(file_size: u64, max_size: u64) -> CoaResult<()> {
    if file_size == 0 {
        return Err(CoaError::validation("file_size", "File is empty"));
    }
    if file_size > max_size {
        return Err(CoaError::validation(
            "file_size",
            format!(
                "File size {} bytes exceeds maximum allowed size {} bytes",
                file_size, max_size
            ),
        ));
    }

    Ok(())
}

pub fn validate_uuid(field: &str, uuid_str: &str) -> CoaResult<uuid::Uuid> {
    uuid::Uuid::parse_str(uuid_str.trim())
        .map_err(|_| CoaError::validation(field, "Invalid UUID format"))
}
