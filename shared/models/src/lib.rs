//! # Clear-COA Domain Models
//!
//! Core domain types for the COA (Certificate of Analysis) dashboard.
//!
//! ## Key Models
//!
//! - **CoaRecord**: one extracted test result, as read by the insights charts
//! - **CoaTableRow**: the full result row with its source document, as shown in the data table
//! - **Organization** / **User**: tenant-scoped accounts provisioned at sign-in
//! - **Attachment**: an uploaded source document and its processing state
//!
//! ## Labels
//!
//! Supplier, product and test names are nullable free text. They are grouped
//! through [`normalize_label`], which maps absent values to fixed sentinels
//! such as `"Unknown Supplier"`.

pub mod coa;
pub mod organization;
pub mod attachment;


pub use coa::*;
pub use organization::*;
pub use attachment::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;
    use validator::Validate;

    #[test]
    fn test_normalize_label_sentinels() {
        assert_eq!(normalize_label(None, UNKNOWN_SUPPLIER), "Unknown Supplier");
        assert_eq!(normalize_label(Some(""), UNKNOWN_PRODUCT), "Unknown Product");
        assert_eq!(normalize_label(Some("pH"), UNKNOWN_TEST), "pH");
        // Case and surrounding whitespace are part of the key
        assert_eq!(normalize_label(Some(" Acme"), UNKNOWN_SUPPLIER), " Acme");
        assert_ne!(normalize_label(Some("acme"), UNKNOWN_SUPPLIER), "Acme");
    }

    #[test]
    fn test_record_labels() {
        let record = CoaRecord::new(Uuid::new_v4()).with_test("Moisture");

        assert_eq!(record.supplier_label(), UNKNOWN_SUPPLIER);
        assert_eq!(record.product_label(), UNKNOWN_PRODUCT);
        assert_eq!(record.test_label(), "Moisture");
        assert_eq!(record.supplier_name, None);
    }

    #[test]
    fn test_outcome_from_db() {
        assert_eq!(TestOutcome::from_db(Some("pass")), TestOutcome::Pass);
        assert_eq!(TestOutcome::from_db(Some("fail")), TestOutcome::Fail);
        assert_eq!(TestOutcome::from_db(Some("unknown")), TestOutcome::Unknown);
        assert_eq!(TestOutcome::from_db(Some("FAIL")), TestOutcome::Unknown);
        assert_eq!(TestOutcome::from_db(None), TestOutcome::Unknown);
        assert_eq!(TestOutcome::default(), TestOutcome::Unknown);
    }

    #[test]
    fn test_outcome_serde_lowercase() {
        let json = serde_json::to_string(&TestOutcome::Fail).unwrap();
        assert_eq!(json, "\"fail\"");
        let parsed: TestOutcome = serde_json::from_str("\"pass\"").unwrap();
        assert_eq!(parsed, TestOutcome::Pass);
    }

    #[test]
    fn test_confidence_defaults_to_medium() {
        assert_eq!(Confidence::from_db(None), Confidence::Medium);
        assert_eq!(Confidence::from_db(Some("high")), Confidence::High);
        assert_eq!(Confidence::from_db(Some("bogus")), Confidence::Medium);
    }

    #[test]
    fn test_parse_coa_date() {
        let jan_15 = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(parse_coa_date("2024-01-15"), jan_15);
        assert_eq!(parse_coa_date("2024-01-15T08:30:00Z"), jan_15);
        assert_eq!(parse_coa_date("2024-01-15T08:30:00.250"), jan_15);
        assert_eq!(parse_coa_date("15/01/2024"), None);
        assert_eq!(parse_coa_date("2024-13-01"), None);
        assert_eq!(parse_coa_date(""), None);
    }

    #[test]
    fn test_organization_name_for_email() {
        assert_eq!(
            organization_name_for_email("qa@acme-labs.com"),
            Some("acme-labs.com".to_string())
        );
        assert_eq!(organization_name_for_email("no-domain"), None);
        assert_eq!(organization_name_for_email("trailing@"), None);
    }

    #[test]
    fn test_identity_claims_validation() {
        let claims = IdentityClaims {
            tenant_id: "614d4a59-100a-4c66-87b3-123fa7a2116e".to_string(),
            email: "analyst@example.com".to_string(),
            name: Some("Analyst".to_string()),
            azure_oid: None,
        };
        assert!(claims.validate().is_ok());

        let missing_tenant = IdentityClaims {
            tenant_id: String::new(),
            ..claims.clone()
        };
        assert!(missing_tenant.validate().is_err());

        let bad_email = IdentityClaims {
            email: "not-an-email".to_string(),
            ..claims
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_storage_object_path() {
        let uploaded_at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            storage_object_path("tenant-a", uploaded_at, "coa.pdf"),
            "tenant-a/1700000000123-coa.pdf"
        );
    }

    #[test]
    fn test_table_row_column_values() {
        let row = CoaTableRow {
            id: Uuid::nil(),
            attachment_surrogate_key: None,
            supplier_name: Some("Acme".to_string()),
            product_name: None,
            test_name: Some("pH".to_string()),
            test_result: TestOutcome::Fail,
            test_specs: Some("6.5-7.5".to_string()),
            test_value: Some("8.1".to_string()),
            test_comments: None,
            confidence: Confidence::High,
            coa_date: Some("2024-01-15".to_string()),
            created_at: None,
            attachment_file_name: Some("acme.pdf".to_string()),
            attachment_url: None,
        };

        let values = row.column_values();
        assert!(values.contains(&"Acme".to_string()));
        assert!(values.contains(&"fail".to_string()));
        assert!(values.contains(&"high".to_string()));
        assert!(values.contains(&"acme.pdf".to_string()));
        assert_eq!(values[1], "");
    }
}
