//! Filter-option derivation for the supplier and test dropdowns.

use std::collections::BTreeSet;

use clearcoa_models::CoaRecord;
use serde::{Deserialize, Serialize};

/// One dropdown entry. Labels are the normalized grouping keys themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterOption {
    pub label: String,
    pub value: String,
}

impl FilterOption {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            value,
        }
    }
}

/// Distinct supplier labels across every record, ascending.
///
/// Independent of the current selection so a supplier never disappears from
/// its own dropdown.
pub fn supplier_options(records: &[CoaRecord]) -> Vec<FilterOption> {
    records
        .iter()
        .map(CoaRecord::supplier_label)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(FilterOption::new)
        .collect()
}

/// Distinct test labels among the records of the selected suppliers,
/// ascending. An empty supplier selection means every supplier.
pub fn test_options(records: &[CoaRecord], selected_suppliers: &BTreeSet<String>) -> Vec<FilterOption> {
    records
        .iter()
        .filter(|record| {
            selected_suppliers.is_empty() || selected_suppliers.contains(&record.supplier_label())
        })
        .map(CoaRecord::test_label)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(FilterOption::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearcoa_models::{TestOutcome, UNKNOWN_SUPPLIER, UNKNOWN_TEST};
    use uuid::Uuid;

    fn values(options: &[FilterOption]) -> Vec<&str> {
        options.iter().map(|option| option.value.as_str()).collect()
    }

    fn sample() -> Vec<CoaRecord> {
        let org = Uuid::new_v4();
        vec![
            CoaRecord::new(org).with_supplier("Beta").with_test("pH"),
            CoaRecord::new(org).with_supplier("Acme").with_test("Moisture"),
            CoaRecord::new(org).with_supplier("Acme").with_test("pH"),
            CoaRecord::new(org).with_test("Lead").with_result(TestOutcome::Fail),
            CoaRecord::new(org).with_supplier("Acme"),
        ]
    }

    #[test]
    fn test_supplier_options_sorted_and_distinct() {
        let options = supplier_options(&sample());
        assert_eq!(values(&options), vec!["Acme", "Beta", UNKNOWN_SUPPLIER]);
        assert!(options.iter().all(|option| option.label == option.value));
    }

    #[test]
    fn test_test_options_without_selection_cover_all_records() {
        let options = test_options(&sample(), &BTreeSet::new());
        assert_eq!(values(&options), vec!["Lead", "Moisture", UNKNOWN_TEST, "pH"]);
    }

    #[test]
    fn test_test_options_follow_selected_suppliers() {
        let records = sample();
        let acme = BTreeSet::from(["Acme".to_string()]);
        assert_eq!(
            values(&test_options(&records, &acme)),
            vec!["Moisture", UNKNOWN_TEST, "pH"]
        );

        let unknown = BTreeSet::from([UNKNOWN_SUPPLIER.to_string()]);
        assert_eq!(values(&test_options(&records, &unknown)), vec!["Lead"]);
    }

    #[test]
    fn test_selection_of_missing_supplier_yields_no_tests() {
        let gone = BTreeSet::from(["Gamma".to_string()]);
        assert!(test_options(&sample(), &gone).is_empty());
    }

    #[test]
    fn test_empty_input_yields_empty_options() {
        assert!(supplier_options(&[]).is_empty());
        assert!(test_options(&[], &BTreeSet::new()).is_empty());
    }
}
