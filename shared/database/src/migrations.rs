use anyhow::Result;
use sqlx::PgPool;

pub async fn run_postgres_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running PostgreSQL migrations");

    sqlx::query(r#"CREATE EXTENSION IF NOT EXISTS "pgcrypto""#)
        .execute(pool)
        .await?;

    // One row per identity-provider tenant
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            tenant_id TEXT NOT NULL UNIQUE,
            organization_name TEXT,
            permissions_granted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_email TEXT NOT NULL,
            user_name TEXT,
            azure_oid TEXT,
            organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_email, organization_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attachments_read (
            attachment_surrogate_key UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            organization_id UUID REFERENCES organizations(id) ON DELETE CASCADE,
            tenant_id TEXT NOT NULL,
            source_email_address TEXT,
            target_email_address TEXT,
            email_data JSONB,
            attachment_id TEXT,
            attachment_file_name TEXT,
            file_url TEXT,
            storage_object_id TEXT,
            is_coa BOOLEAN DEFAULT FALSE,
            is_processed BOOLEAN DEFAULT FALSE,
            confidence TEXT CHECK (confidence IN ('high', 'medium', 'low')) DEFAULT 'medium',
            received_at TIMESTAMPTZ,
            ingested_at TIMESTAMPTZ DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Filled by the extraction pipeline, one row per test result
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coa_data (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            attachment_surrogate_key UUID REFERENCES attachments_read(attachment_surrogate_key) ON DELETE CASCADE,
            organization_id UUID REFERENCES organizations(id) ON DELETE CASCADE,
            tenant_id TEXT NOT NULL,
            coa_date DATE,
            sender_name TEXT,
            product_name TEXT,
            test_name TEXT,
            test_result TEXT DEFAULT 'unknown' CHECK (test_result IN ('pass', 'fail', 'unknown')),
            test_specs TEXT,
            test_value TEXT,
            test_comments TEXT,
            confidence TEXT DEFAULT 'medium' CHECK (confidence IN ('high', 'medium', 'low')),
            file_url TEXT,
            is_imputed BOOLEAN DEFAULT FALSE,
            created_at TIMESTAMPTZ DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_users_organization ON users(organization_id)",
        "CREATE INDEX IF NOT EXISTS idx_attach_org ON attachments_read(organization_id)",
        "CREATE INDEX IF NOT EXISTS idx_attach_tenant ON attachments_read(tenant_id)",
        "CREATE INDEX IF NOT EXISTS idx_attach_email ON attachments_read(target_email_address)",
        "CREATE INDEX IF NOT EXISTS idx_attach_ingested ON attachments_read(ingested_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_coa_attachment ON coa_data(attachment_surrogate_key)",
        "CREATE INDEX IF NOT EXISTS idx_coa_product_test ON coa_data(product_name, test_name)",
        "CREATE INDEX IF NOT EXISTS idx_coa_org_date ON coa_data(organization_id, coa_date)",
    ];
    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("PostgreSQL migrations completed successfully");
    Ok(())
}
