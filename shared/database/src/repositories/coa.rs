//! COA Result Repository
//!
//! Read access to extracted test results. Rows are written by the extraction
//! pipeline, never by this service.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use clearcoa_models::{CoaRecord, CoaTableRow, Confidence, TestOutcome};

#[derive(Clone)]
pub struct CoaRepository {
    pool: PgPool,
}

impl CoaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All test results of one organization, for the insights pipeline
    pub async fn find_by_organization(&self, organization_id: Uuid) -> Result<Vec<CoaRecord>> {
        let rows: Vec<CoaRecordRow> = sqlx::query_as(
            r#"
            SELECT id, organization_id, sender_name, product_name,
                   test_name, test_result, coa_date::text AS coa_date
            FROM coa_data
            WHERE organization_id = $1
            "#
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch COA results for organization")?;

        Ok(rows
            .into_iter()
            .map(|row| row.into_record(organization_id))
            .collect())
    }

    /// Table rows with their source document, newest first
    pub async fn find_table_rows(&self, organization_id: Uuid) -> Result<Vec<CoaTableRow>> {
        let rows: Vec<CoaTableRowRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.attachment_surrogate_key, c.sender_name, c.product_name,
                   c.test_name, c.test_result, c.test_specs, c.test_value,
                   c.test_comments, c.confidence, c.coa_date::text AS coa_date,
                   c.created_at, a.attachment_file_name, a.file_url AS attachment_url
            FROM coa_data c
            LEFT JOIN attachments_read a
                ON a.attachment_surrogate_key = c.attachment_surrogate_key
            WHERE c.organization_id = $1
            ORDER BY c.created_at DESC NULLS LAST
            "#
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch COA table rows")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct CoaRecordRow {
    id: Uuid,
    organization_id: Option<Uuid>,
    sender_name: Option<String>,
    product_name: Option<String>,
    test_name: Option<String>,
    test_result: Option<String>,
    coa_date: Option<String>,
}

impl CoaRecordRow {
    fn into_record(self, queried_organization: Uuid) -> CoaRecord {
        CoaRecord {
            id: self.id,
            organization_id: self.organization_id.unwrap_or(queried_organization),
            supplier_name: self.sender_name,
            product_name: self.product_name,
            test_name: self.test_name,
            test_result: TestOutcome::from_db(self.test_result.as_deref()),
            coa_date: self.coa_date,
        }
    }
}

#[derive(Debug, FromRow)]
struct CoaTableRowRow {
    id: Uuid,
    attachment_surrogate_key: Option<Uuid>,
    sender_name: Option<String>,
    product_name: Option<String>,
    test_name: Option<String>,
    test_result: Option<String>,
    test_specs: Option<String>,
    test_value: Option<String>,
    test_comments: Option<String>,
    confidence: Option<String>,
    coa_date: Option<String>,
    created_at: Option<DateTime<Utc>>,
    attachment_file_name: Option<String>,
    attachment_url: Option<String>,
}

impl From<CoaTableRowRow> for CoaTableRow {
    fn from(row: CoaTableRowRow) -> Self {
        Self {
            id: row.id,
            attachment_surrogate_key: row.attachment_surrogate_key,
            supplier_name: row.sender_name,
            product_name: row.product_name,
            test_name: row.test_name,
            test_result: TestOutcome::from_db(row.test_result.as_deref()),
            test_specs: row.test_specs,
            test_value: row.test_value,
            test_comments: row.test_comments,
            confidence: Confidence::from_db(row.confidence.as_deref()),
            coa_date: row.coa_date,
            created_at: row.created_at,
            attachment_file_name: row.attachment_file_name,
            attachment_url: row.attachment_url,
        }
    }
}
