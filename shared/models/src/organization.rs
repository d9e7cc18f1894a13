//! Tenant and user models.
//!
//! An organization is provisioned per identity-provider tenant the first time
//! anyone from that tenant signs in; users are keyed by email within their
//! organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Organization {
    pub id: Uuid,
    pub tenant_id: String,
    pub organization_name: Option<String>,
    pub permissions_granted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub user_email: String,
    pub user_name: Option<String>,
    pub azure_oid: Option<String>,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Claims handed over by the identity provider after a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct IdentityClaims {
    /// Directory tenant (`tid`); required to place the user in an organization.
    #[validate(length(min = 1, max = 255, message = "Tenant ID is required"))]
    pub tenant_id: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    pub name: Option<String>,
    /// Provider-side object id of the account.
    pub azure_oid: Option<String>,
}

/// Name given to a freshly provisioned organization: the email's domain.
pub fn organization_name_for_email(email: &str) -> Option<String> {
    email
        .split_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|domain| !domain.is_empty())
        .map(str::to_string)
}
