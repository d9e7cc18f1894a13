//! Sign-in, sign-out and session lookup.
//!
//! Sign-in is called by the identity provider callback with claims it has
//! already verified. The callback proves itself with the shared
//! `auth.identity_secret`; anything else is turned away before the claims
//! are read. Accepted claims provision the tenant's organization and the
//! user on first sight.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use clearcoa_database::{OrganizationRepository, UserRepository};
use clearcoa_models::{organization_name_for_email, IdentityClaims};
use clearcoa_utils::{log_info, log_warn, validate_model, CoaError, CoaResult};
use serde::Serialize;
use uuid::Uuid;

use super::database_error;
use crate::session::SessionContext;
use crate::AppState;

pub const IDENTITY_SECRET_HEADER: &str = "x-identity-secret";

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
    pub tenant_id: String,
    pub organization_id: Uuid,
    pub organization_name: Option<String>,
    pub organization_created: bool,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub signed_out: bool,
    pub views_unmounted: usize,
}

/// POST /api/v1/auth/sign-in
pub async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut claims): Json<IdentityClaims>,
) -> CoaResult<(StatusCode, Json<SignInResponse>)> {
    verify_identity_provider(&headers, state.config.auth.identity_secret.as_deref())?;

    claims.tenant_id = claims.tenant_id.trim().to_string();
    if claims.tenant_id.is_empty() && !state.config.auth.require_tenant_claim {
        // Single-tenant deployments key the organization on the email domain
        if let Some(domain) = organization_name_for_email(&claims.email) {
            claims.tenant_id = domain;
        }
    }
    validate_model(&claims)?;

    let organization_name = organization_name_for_email(&claims.email);
    let (organization, organization_created) = OrganizationRepository::new(state.pool.clone())
        .find_or_create_for_tenant(&claims.tenant_id, organization_name.as_deref())
        .await
        .map_err(database_error)?;

    let user = UserRepository::new(state.pool.clone())
        .find_or_create(&claims, organization.id)
        .await
        .map_err(database_error)?;

    let session = state
        .sessions
        .create(&claims.tenant_id, organization.id, user.id, &user.user_email)
        .await;
    state.metrics.sign_ins.inc();
    log_info!(
        "User signed in",
        organization_id = %organization.id,
        user_id = %user.id,
        organization_created
    );

    Ok((
        StatusCode::CREATED,
        Json(SignInResponse {
            token: session.session_id,
            expires_at: session.expires_at,
            tenant_id: session.tenant_id,
            organization_id: organization.id,
            organization_name: organization.organization_name,
            organization_created,
            user_id: user.id,
        }),
    ))
}

fn verify_identity_provider(headers: &HeaderMap, expected: Option<&str>) -> CoaResult<()> {
    let Some(expected) = expected.filter(|secret| !secret.is_empty()) else {
        log_warn!("Sign-in refused", reason = "auth.identity_secret is not configured");
        return Err(CoaError::authentication("Sign-in is not configured"));
    };

    let presented = headers
        .get(IDENTITY_SECRET_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();
    if !constant_time_eq(presented, expected.as_bytes()) {
        return Err(CoaError::authentication("Sign-in must come from the identity provider"));
    }
    Ok(())
}

/// Byte comparison without an early exit on the first mismatch.
fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// POST /api/v1/auth/sign-out
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> CoaResult<Json<SignOutResponse>> {
    let views_unmounted = state.views.unmount_session(session.session_id).await;
    if !state.sessions.revoke(session.session_id).await {
        return Err(CoaError::authentication("Session already ended"));
    }

    Ok(Json(SignOutResponse {
        signed_out: true,
        views_unmounted,
    }))
}

/// GET /api/v1/auth/session
pub async fn current_session(Extension(session): Extension<SessionContext>) -> Json<SessionContext> {
    Json(session)
}
