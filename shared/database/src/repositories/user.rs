//! User Repository
//!
//! Users are unique per email within an organization.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use clearcoa_models::{IdentityClaims, User};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str, organization_id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, user_email, user_name, azure_oid, organization_id, created_at
            FROM users
            WHERE user_email = $1 AND organization_id = $2
            "#
        )
        .bind(email)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")
    }

    pub async fn create(&self, claims: &IdentityClaims, organization_id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_email, user_name, azure_oid, organization_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_email, organization_id) DO NOTHING
            RETURNING id, user_email, user_name, azure_oid, organization_id, created_at
            "#
        )
        .bind(&claims.email)
        .bind(&claims.name)
        .bind(&claims.azure_oid)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to create user")
    }

    pub async fn find_or_create(&self, claims: &IdentityClaims, organization_id: Uuid) -> Result<User> {
        if let Some(existing) = self.find_by_email(&claims.email, organization_id).await? {
            return Ok(existing);
        }

        if let Some(created) = self.create(claims, organization_id).await? {
            tracing::info!(user_id = %created.id, %organization_id, "Provisioned user");
            return Ok(created);
        }

        self.find_by_email(&claims.email, organization_id)
            .await?
            .context("User vanished after conflicting insert")
    }
}
