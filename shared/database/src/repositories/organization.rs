//! Organization Repository
//!
//! Tenant-keyed organizations, provisioned on first sign-in.

use anyhow::{Context, Result};
use sqlx::PgPool;

use clearcoa_models::Organization;

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_tenant(&self, tenant_id: &str) -> Result<Option<Organization>> {
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, tenant_id, organization_name, permissions_granted, created_at
            FROM organizations
            WHERE tenant_id = $1
            "#
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch organization by tenant")
    }

    /// Insert unless the tenant already exists; `None` means it did.
    pub async fn create(
        &self,
        tenant_id: &str,
        organization_name: Option<&str>,
    ) -> Result<Option<Organization>> {
        sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (tenant_id, organization_name, permissions_granted)
            VALUES ($1, $2, FALSE)
            ON CONFLICT (tenant_id) DO NOTHING
            RETURNING id, tenant_id, organization_name, permissions_granted, created_at
            "#
        )
        .bind(tenant_id)
        .bind(organization_name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to create organization")
    }

    /// Look the tenant up, provisioning it on first sight.
    ///
    /// Returns the organization and whether it was created by this call.
    pub async fn find_or_create_for_tenant(
        &self,
        tenant_id: &str,
        organization_name: Option<&str>,
    ) -> Result<(Organization, bool)> {
        if let Some(existing) = self.find_by_tenant(tenant_id).await? {
            return Ok((existing, false));
        }

        if let Some(created) = self.create(tenant_id, organization_name).await? {
            tracing::info!(tenant_id, organization_id = %created.id, "Provisioned organization");
            return Ok((created, true));
        }

        // Lost a race with a concurrent sign-in from the same tenant
        let existing = self
            .find_by_tenant(tenant_id)
            .await?
            .context("Organization vanished after conflicting insert")?;
        Ok((existing, false))
    }
}
