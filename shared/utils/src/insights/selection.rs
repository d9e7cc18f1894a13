//! Filter selection state and its reconciliation against current options.
//!
//! The stored selection is the user's intent and is only ever changed by the
//! user. Which selected tests actually apply is derived on demand from the
//! current test options; tests that are unavailable under the current
//! supplier filter are masked, not removed, so they take effect again as
//! soon as a supplier that offers them is reselected.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::options::FilterOption;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSelection {
    /// Empty means every supplier.
    pub selected_suppliers: BTreeSet<String>,
    /// Raw intent; may name tests the current supplier filter does not offer.
    pub selected_tests: BTreeSet<String>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_selected_suppliers<I, S>(&mut self, suppliers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_suppliers = suppliers.into_iter().map(Into::into).collect();
    }

    pub fn set_selected_tests<I, S>(&mut self, tests: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_tests = tests.into_iter().map(Into::into).collect();
    }

    pub fn toggle_supplier(&mut self, supplier: &str) {
        toggle(&mut self.selected_suppliers, supplier);
    }

    pub fn toggle_test(&mut self, test: &str) {
        toggle(&mut self.selected_tests, test);
    }

    /// The selected tests that apply under `test_options`.
    pub fn valid_selected_tests(&self, test_options: &[FilterOption]) -> BTreeSet<String> {
        valid_selected_tests(&self.selected_tests, test_options)
    }
}

/// Multi-select click: add the value if absent, remove it if present.
pub fn toggle(selected: &mut BTreeSet<String>, value: &str) {
    if !selected.remove(value) {
        selected.insert(value.to_string());
    }
}

/// `selected_tests ∩ test_options`, leaving `selected_tests` untouched.
pub fn valid_selected_tests(
    selected_tests: &BTreeSet<String>,
    test_options: &[FilterOption],
) -> BTreeSet<String> {
    let available: BTreeSet<&str> = test_options
        .iter()
        .map(|option| option.value.as_str())
        .collect();

    selected_tests
        .iter()
        .filter(|test| available.contains(test.as_str()))
        .cloned()
        .collect()
}

/// Dropdown caption: "All Suppliers", the single selected label, or
/// "3 Suppliers selected".
pub fn selection_label(selected: &BTreeSet<String>, options: &[FilterOption], noun: &str) -> String {
    match selected.len() {
        0 => format!("All {}s", noun),
        1 => {
            let value = selected.iter().next().map(String::as_str).unwrap_or_default();
            options
                .iter()
                .find(|option| option.value == value)
                .map(|option| option.label.clone())
                .unwrap_or_else(|| value.to_string())
        }
        count => format!("{} {}s selected", count, noun),
    }
}
