//! Attachment Repository
//!
//! Metadata rows for uploaded documents in `attachments_read`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use clearcoa_models::{Attachment, Confidence, NewAttachment};

const ATTACHMENT_COLUMNS: &str = r#"
    attachment_surrogate_key, organization_id, tenant_id, attachment_file_name,
    file_url, storage_object_id, is_coa, is_processed, confidence,
    received_at, ingested_at
"#;

#[derive(Clone)]
pub struct AttachmentRepository {
    pool: PgPool,
}

impl AttachmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attachments of one organization and tenant, newest first
    pub async fn list_for_tenant(&self, organization_id: Uuid, tenant_id: &str) -> Result<Vec<Attachment>> {
        let rows: Vec<AttachmentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ATTACHMENT_COLUMNS}
            FROM attachments_read
            WHERE organization_id = $1 AND tenant_id = $2
            ORDER BY ingested_at DESC NULLS LAST
            "#
        ))
        .bind(organization_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list attachments")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Insert the metadata row for a freshly stored upload
    pub async fn insert(&self, attachment: &NewAttachment) -> Result<Attachment> {
        let row: AttachmentRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO attachments_read
                (organization_id, tenant_id, attachment_file_name, file_url,
                 storage_object_id, is_coa, is_processed, confidence, received_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, FALSE, 'medium', $6)
            RETURNING {ATTACHMENT_COLUMNS}
            "#
        ))
        .bind(attachment.organization_id)
        .bind(&attachment.tenant_id)
        .bind(&attachment.attachment_file_name)
        .bind(&attachment.file_url)
        .bind(&attachment.storage_object_id)
        .bind(attachment.received_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert attachment")?;

        Ok(row.into())
    }

    /// Find an attachment, only if it belongs to the organization
    pub async fn find_by_key(&self, organization_id: Uuid, key: Uuid) -> Result<Option<Attachment>> {
        let row: Option<AttachmentRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ATTACHMENT_COLUMNS}
            FROM attachments_read
            WHERE attachment_surrogate_key = $1 AND organization_id = $2
            "#
        ))
        .bind(key)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch attachment")?;

        Ok(row.map(Into::into))
    }

    /// Delete an attachment row; its COA results cascade with it
    pub async fn delete(&self, organization_id: Uuid, key: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM attachments_read WHERE attachment_surrogate_key = $1 AND organization_id = $2",
        )
        .bind(key)
        .bind(organization_id)
        .execute(&self.pool)
        .await
        .context("Failed to delete attachment")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct AttachmentRow {
    attachment_surrogate_key: Uuid,
    organization_id: Option<Uuid>,
    tenant_id: String,
    attachment_file_name: Option<String>,
    file_url: Option<String>,
    storage_object_id: Option<String>,
    is_coa: Option<bool>,
    is_processed: Option<bool>,
    confidence: Option<String>,
    received_at: Option<DateTime<Utc>>,
    ingested_at: Option<DateTime<Utc>>,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Self {
            attachment_surrogate_key: row.attachment_surrogate_key,
            organization_id: row.organization_id,
            tenant_id: row.tenant_id,
            attachment_file_name: row.attachment_file_name,
            file_url: row.file_url,
            storage_object_id: row.storage_object_id,
            is_coa: row.is_coa.unwrap_or(false),
            is_processed: row.is_processed.unwrap_or(false),
            confidence: Confidence::from_db(row.confidence.as_deref()),
            received_at: row.received_at,
            ingested_at: row.ingested_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearcoa_models::AttachmentStatus;

    #[test]
    fn test_row_mapping_defaults_nullable_flags() {
        let row = AttachmentRow {
            attachment_surrogate_key: Uuid::new_v4(),
            organization_id: Some(Uuid::new_v4()),
            tenant_id: "tenant-a".to_string(),
            attachment_file_name: Some("coa.pdf".to_string()),
            file_url: None,
            storage_object_id: Some("tenant-a/1-coa.pdf".to_string()),
            is_coa: None,
            is_processed: Some(true),
            confidence: None,
            received_at: None,
            ingested_at: None,
        };

        let attachment: Attachment = row.into();
        assert!(!attachment.is_coa);
        assert_eq!(attachment.status(), AttachmentStatus::Processed);
        assert_eq!(attachment.confidence, Confidence::Medium);
    }
}
