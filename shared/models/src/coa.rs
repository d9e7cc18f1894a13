//! COA (Certificate of Analysis) domain models.
//!
//! A `CoaRecord` is one extracted test-result row of the `coa_data` table,
//! narrowed to the columns the insights pipeline reads. `CoaTableRow` is the
//! wide row shown in the data table, joined with its source attachment.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const UNKNOWN_SUPPLIER: &str = "Unknown Supplier";
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";
pub const UNKNOWN_TEST: &str = "Unknown Test";

/// Grouping key for a nullable label column.
///
/// Absent and empty values collapse to `sentinel`; everything else is kept
/// verbatim (case-sensitive, untrimmed). The sentinel is a display/grouping
/// value only and is never written back to storage.
pub fn normalize_label(value: Option<&str>, sentinel: &str) -> String {
    match value {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => sentinel.to_string(),
    }
}

/// Parse a stored `coa_date` the way the extraction pipeline writes it.
///
/// Accepts a calendar date (`2024-01-15`), an RFC 3339 timestamp or a naive
/// ISO timestamp. Returns `None` for anything else.
pub fn parse_coa_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|timestamp| timestamp.date())
}

/// Outcome of a single COA test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Pass,
    Fail,
    #[default]
    Unknown,
}

impl TestOutcome {
    /// Total mapping from the stored text column; NULL and unrecognised
    /// values are `Unknown`.
    pub fn from_db(value: Option<&str>) -> Self {
        match value {
            Some("pass") => Self::Pass,
            Some("fail") => Self::Fail,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction confidence attached to COA rows and attachments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    pub fn from_db(value: Option<&str>) -> Self {
        match value {
            Some("high") => Self::High,
            Some("low") => Self::Low,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted test result, scoped to a single organization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoaRecord {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Stored as `sender_name`: who sent the certificate.
    pub supplier_name: Option<String>,
    pub product_name: Option<String>,
    pub test_name: Option<String>,
    pub test_result: TestOutcome,
    /// Raw text form of the `coa_date` column; may be unparseable.
    pub coa_date: Option<String>,
}

impl CoaRecord {
    pub fn new(organization_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            supplier_name: None,
            product_name: None,
            test_name: None,
            test_result: TestOutcome::Unknown,
            coa_date: None,
        }
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier_name = Some(supplier.into());
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product_name = Some(product.into());
        self
    }

    pub fn with_test(mut self, test: impl Into<String>) -> Self {
        self.test_name = Some(test.into());
        self
    }

    pub fn with_result(mut self, result: TestOutcome) -> Self {
        self.test_result = result;
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.coa_date = Some(date.into());
        self
    }

    pub fn supplier_label(&self) -> String {
        normalize_label(self.supplier_name.as_deref(), UNKNOWN_SUPPLIER)
    }

    pub fn product_label(&self) -> String {
        normalize_label(self.product_name.as_deref(), UNKNOWN_PRODUCT)
    }

    pub fn test_label(&self) -> String {
        normalize_label(self.test_name.as_deref(), UNKNOWN_TEST)
    }

    pub fn is_failure(&self) -> bool {
        self.test_result == TestOutcome::Fail
    }
}

/// Full `coa_data` row with its attachment columns flattened in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoaTableRow {
    pub id: Uuid,
    pub attachment_surrogate_key: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub product_name: Option<String>,
    pub test_name: Option<String>,
    pub test_result: TestOutcome,
    pub test_specs: Option<String>,
    pub test_value: Option<String>,
    pub test_comments: Option<String>,
    pub confidence: Confidence,
    pub coa_date: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub attachment_file_name: Option<String>,
    pub attachment_url: Option<String>,
}

impl CoaTableRow {
    /// Every column rendered as text, absent values as the empty string.
    pub fn column_values(&self) -> Vec<String> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        vec![
            self.id.to_string(),
            self.attachment_surrogate_key
                .map(|key| key.to_string())
                .unwrap_or_default(),
            text(&self.supplier_name),
            text(&self.product_name),
            text(&self.test_name),
            self.test_result.to_string(),
            text(&self.test_specs),
            text(&self.test_value),
            text(&self.test_comments),
            self.confidence.to_string(),
            text(&self.coa_date),
            self.created_at
                .map(|created| created.to_rfc3339())
                .unwrap_or_default(),
            text(&self.attachment_file_name),
            text(&self.attachment_url),
        ]
    }
}
