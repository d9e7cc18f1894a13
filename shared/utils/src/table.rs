//! Data-table search over fully loaded COA rows.

use clearcoa_models::CoaTableRow;

/// Rows where any column contains `text`, ignoring case. Blank text keeps
/// every row. Order is preserved.
pub fn search_rows<'a>(rows: &'a [CoaTableRow], text: &str) -> Vec<&'a CoaTableRow> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return rows.iter().collect();
    }

    rows.iter()
        .filter(|row| {
            row.column_values()
                .iter()
                .any(|value| value.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearcoa_models::{Confidence, TestOutcome};
    use uuid::Uuid;

    fn row(supplier: &str, test: &str, result: TestOutcome, comments: Option<&str>) -> CoaTableRow {
        CoaTableRow {
            id: Uuid::new_v4(),
            attachment_surrogate_key: None,
            supplier_name: Some(supplier.to_string()),
            product_name: Some("Resin".to_string()),
            test_name: Some(test.to_string()),
            test_result: result,
            test_specs: None,
            test_value: None,
            test_comments: comments.map(str::to_string),
            confidence: Confidence::Medium,
            coa_date: Some("2024-01-15".to_string()),
            created_at: None,
            attachment_file_name: None,
            attachment_url: None,
        }
    }

    #[test]
    fn test_blank_search_keeps_everything() {
        let rows = vec![
            row("Acme", "pH", TestOutcome::Pass, None),
            row("Beta", "Lead", TestOutcome::Fail, None),
        ];
        assert_eq!(search_rows(&rows, "").len(), 2);
        assert_eq!(search_rows(&rows, "   ").len(), 2);
    }

    #[test]
    fn test_search_is_case_insensitive_across_columns() {
        let rows = vec![
            row("Acme", "pH", TestOutcome::Pass, None),
            row("Beta", "Lead", TestOutcome::Fail, Some("Retest requested")),
            row("Gamma", "Moisture", TestOutcome::Unknown, None),
        ];

        let hits = search_rows(&rows, "ACME");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].supplier_name.as_deref(), Some("Acme"));

        assert_eq!(search_rows(&rows, "retest").len(), 1);
        assert_eq!(search_rows(&rows, "fail").len(), 1);
        assert_eq!(search_rows(&rows, "2024-01").len(), 3);
        assert!(search_rows(&rows, "sulfur").is_empty());
    }

    #[test]
    fn test_search_preserves_order() {
        let rows = vec![
            row("Acme A", "pH", TestOutcome::Pass, None),
            row("Beta", "pH", TestOutcome::Pass, None),
            row("Acme B", "pH", TestOutcome::Pass, None),
        ];
        let hits = search_rows(&rows, "acme");
        assert_eq!(hits[0].id, rows[0].id);
        assert_eq!(hits[1].id, rows[2].id);
    }
}
