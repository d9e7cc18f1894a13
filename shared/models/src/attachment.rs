//! Uploaded source documents (`attachments_read`).
//!
//! Rows are written when a file lands in object storage; the extraction
//! pipeline later flips `is_coa` / `is_processed` and fills `coa_data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Confidence;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    pub attachment_surrogate_key: Uuid,
    pub organization_id: Option<Uuid>,
    pub tenant_id: String,
    pub attachment_file_name: Option<String>,
    pub file_url: Option<String>,
    pub storage_object_id: Option<String>,
    pub is_coa: bool,
    pub is_processed: bool,
    pub confidence: Confidence,
    pub received_at: Option<DateTime<Utc>>,
    pub ingested_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentStatus {
    Pending,
    Processed,
}

impl Attachment {
    pub fn status(&self) -> AttachmentStatus {
        if self.is_processed {
            AttachmentStatus::Processed
        } else {
            AttachmentStatus::Pending
        }
    }
}

/// Metadata row for a file that was just put into storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAttachment {
    pub organization_id: Uuid,
    pub tenant_id: String,
    pub attachment_file_name: String,
    pub file_url: String,
    pub storage_object_id: String,
    pub received_at: DateTime<Utc>,
}

/// Object key inside the bucket: `{tenant}/{unix millis}-{file name}`.
pub fn storage_object_path(tenant_id: &str, uploaded_at: DateTime<Utc>, file_name: &str) -> String {
    format!("{}/{}-{}", tenant_id, uploaded_at.timestamp_millis(), file_name)
}
