//! Chart aggregates over the working set.
//!
//! All three aggregators are pure: same working set in, same output out.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use clearcoa_models::{parse_coa_date, CoaRecord, TestOutcome};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const FAILURE_SERIES_ID: &str = "Failures";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupplierFailures {
    pub name: String,
    pub failures: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductResults {
    pub name: String,
    pub pass: usize,
    pub fail: usize,
    pub unknown: usize,
}

impl ProductResults {
    fn new(name: String) -> Self {
        Self {
            name,
            pass: 0,
            fail: 0,
            unknown: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.unknown
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendPoint {
    /// Month label, e.g. "Jan 2024".
    pub x: String,
    pub y: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendSeries {
    pub id: String,
    pub data: Vec<TrendPoint>,
}

/// Failure count per supplier, suppliers without failures omitted.
///
/// Sorted by failures descending; equal counts are ordered by name.
pub fn failures_by_supplier<'a, I>(records: I) -> Vec<SupplierFailures>
where
    I: IntoIterator<Item = &'a CoaRecord>,
{
    let mut failures: HashMap<String, usize> = HashMap::new();
    for record in records.into_iter().filter(|record| record.is_failure()) {
        *failures.entry(record.supplier_label()).or_insert(0) += 1;
    }

    let mut result: Vec<SupplierFailures> = failures
        .into_iter()
        .map(|(name, failures)| SupplierFailures { name, failures })
        .collect();
    result.sort_by(|a, b| b.failures.cmp(&a.failures).then_with(|| a.name.cmp(&b.name)));
    result
}

/// Pass/fail/unknown counts per product, in order of first appearance.
pub fn results_by_product<'a, I>(records: I) -> Vec<ProductResults>
where
    I: IntoIterator<Item = &'a CoaRecord>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut products: Vec<ProductResults> = Vec::new();

    for record in records {
        let name = record.product_label();
        let slot = match index.get(&name) {
            Some(&slot) => slot,
            None => {
                index.insert(name.clone(), products.len());
                products.push(ProductResults::new(name));
                products.len() - 1
            }
        };

        let stats = &mut products[slot];
        match record.test_result {
            TestOutcome::Pass => stats.pass += 1,
            TestOutcome::Fail => stats.fail += 1,
            TestOutcome::Unknown => stats.unknown += 1,
        }
    }

    products
}

/// Failures per calendar month as a single "Failures" series.
///
/// Records without a `coa_date` are skipped silently; unparseable dates are
/// logged and skipped. Returns no series at all when no month qualifies.
pub fn failure_trend<'a, I>(records: I) -> Vec<TrendSeries>
where
    I: IntoIterator<Item = &'a CoaRecord>,
{
    // Keyed by first-of-month so iteration is chronological
    let mut by_month: BTreeMap<NaiveDate, usize> = BTreeMap::new();

    for record in records.into_iter().filter(|record| record.is_failure()) {
        let Some(raw) = record.coa_date.as_deref().filter(|raw| !raw.trim().is_empty()) else {
            continue;
        };
        match parse_coa_date(raw).and_then(|date| date.with_day(1)) {
            Some(month) => *by_month.entry(month).or_insert(0) += 1,
            None => warn!(
                record_id = %record.id,
                coa_date = raw,
                "Invalid date format, record left out of failure trend"
            ),
        }
    }

    if by_month.is_empty() {
        return Vec::new();
    }

    let data = by_month
        .into_iter()
        .map(|(month, count)| TrendPoint {
            x: month.format("%b %Y").to_string(),
            y: count,
        })
        .collect();

    vec![TrendSeries {
        id: FAILURE_SERIES_ID.to_string(),
        data,
    }]
}
