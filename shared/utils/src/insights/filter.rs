//! Row filter producing the working set shared by every chart.

use std::collections::BTreeSet;

use clearcoa_models::CoaRecord;

/// Records matching both selections, in input order.
///
/// An empty selection on either axis places no restriction on that axis.
/// `valid_tests` must already be reconciled against the current test options.
pub fn working_set<'a>(
    records: &'a [CoaRecord],
    selected_suppliers: &BTreeSet<String>,
    valid_tests: &BTreeSet<String>,
) -> Vec<&'a CoaRecord> {
    records
        .iter()
        .filter(|record| {
            let supplier_match = selected_suppliers.is_empty()
                || selected_suppliers.contains(&record.supplier_label());
            let test_match =
                valid_tests.is_empty() || valid_tests.contains(&record.test_label());
            supplier_match && test_match
        })
        .collect()
}
