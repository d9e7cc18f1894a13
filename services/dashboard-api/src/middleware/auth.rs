use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use clearcoa_utils::CoaError;
use uuid::Uuid;

use crate::AppState;

/// Resolve the bearer session and attach it to the request.
///
/// Handlers behind this layer take `Extension<SessionContext>`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, CoaError> {
    let auth_header = headers
        .get("authorization")
        .and_then(|header| header.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => header[7..].trim(),
        Some(_) => {
            return Err(CoaError::authentication(
                "Invalid authorization header format",
            ))
        }
        None => return Err(CoaError::authentication("Missing authorization header")),
    };

    let session_id = Uuid::parse_str(token)
        .map_err(|_| CoaError::authentication("Invalid session token"))?;

    let session = state
        .sessions
        .validate(session_id)
        .await
        .ok_or_else(|| CoaError::authentication("Session expired or not found"))?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
