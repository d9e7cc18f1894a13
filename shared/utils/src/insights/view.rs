//! A mounted insights view: the record load lifecycle plus the user's
//! selection, rendered into snapshots for the presentation layer.

use std::collections::BTreeSet;

use clearcoa_models::CoaRecord;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::aggregate::{
    failure_trend, failures_by_supplier, results_by_product, ProductResults, SupplierFailures,
    TrendSeries,
};
use super::filter::working_set;
use super::options::{supplier_options, test_options, FilterOption};
use super::selection::{selection_label, FilterSelection};

pub const EMPTY_ORGANIZATION_MESSAGE: &str =
    "No data found for this organization to generate insights.";
pub const NO_SUPPLIER_FAILURES_MESSAGE: &str = "0 failures reported for the selected filters.";
pub const NO_PRODUCT_RESULTS_MESSAGE: &str = "No test results reported for the selected filters.";
pub const NO_FAILURE_TREND_MESSAGE: &str =
    "0 failures reported over time for the selected filters.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FilterPanel {
    pub supplier_options: Vec<FilterOption>,
    pub test_options: Vec<FilterOption>,
    pub selected_suppliers: BTreeSet<String>,
    /// Only the selected tests the current test options offer.
    pub selected_tests: BTreeSet<String>,
    pub supplier_label: String,
    pub test_label: String,
}

/// Per-chart "no data" message, set exactly when that chart is empty.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartNotices {
    pub failures_by_supplier: Option<String>,
    pub results_by_product: Option<String>,
    pub failure_trend: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InsightsCharts {
    pub failures_by_supplier: Vec<SupplierFailures>,
    pub results_by_product: Vec<ProductResults>,
    pub failure_trend: Vec<TrendSeries>,
    /// Longest bar of each bar chart, for integer axis ticks.
    pub max_failures: usize,
    pub max_results: usize,
    pub working_set_size: usize,
    pub notices: ChartNotices,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InsightsData {
    pub filters: FilterPanel,
    pub charts: InsightsCharts,
}

/// Run the whole pipeline for one record set and selection.
pub fn compute_insights(records: &[CoaRecord], selection: &FilterSelection) -> InsightsData {
    let suppliers = supplier_options(records);
    let tests = test_options(records, &selection.selected_suppliers);
    let valid_tests = selection.valid_selected_tests(&tests);

    let working = working_set(records, &selection.selected_suppliers, &valid_tests);
    let failures = failures_by_supplier(working.iter().copied());
    let products = results_by_product(working.iter().copied());
    let trend = failure_trend(working.iter().copied());

    let notice = |empty: bool, message: &str| empty.then(|| message.to_string());
    let notices = ChartNotices {
        failures_by_supplier: notice(failures.is_empty(), NO_SUPPLIER_FAILURES_MESSAGE),
        results_by_product: notice(products.is_empty(), NO_PRODUCT_RESULTS_MESSAGE),
        failure_trend: notice(trend.is_empty(), NO_FAILURE_TREND_MESSAGE),
    };

    let filters = FilterPanel {
        supplier_label: selection_label(&selection.selected_suppliers, &suppliers, "Supplier"),
        test_label: selection_label(&valid_tests, &tests, "Test"),
        supplier_options: suppliers,
        test_options: tests,
        selected_suppliers: selection.selected_suppliers.clone(),
        selected_tests: valid_tests,
    };

    let charts = InsightsCharts {
        max_failures: failures.iter().map(|entry| entry.failures).max().unwrap_or(0),
        max_results: products.iter().map(ProductResults::total).max().unwrap_or(0),
        working_set_size: working.len(),
        failures_by_supplier: failures,
        results_by_product: products,
        failure_trend: trend,
        notices,
    };

    InsightsData { filters, charts }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    Loading,
    Error,
    /// Loaded, but the organization has no records at all.
    Empty,
    Ready,
}

/// What the presentation layer renders. Charts are present only when ready.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InsightsSnapshot {
    pub state: ViewState,
    pub error: Option<String>,
    pub message: Option<String>,
    pub total_records: usize,
    pub insights: Option<InsightsData>,
}

impl InsightsSnapshot {
    pub fn loading() -> Self {
        Self {
            state: ViewState::Loading,
            error: None,
            message: None,
            total_records: 0,
            insights: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: ViewState::Error,
            error: Some(message.into()),
            message: None,
            total_records: 0,
            insights: None,
        }
    }

    pub fn from_records(records: &[CoaRecord], selection: &FilterSelection) -> Self {
        if records.is_empty() {
            return Self {
                state: ViewState::Empty,
                error: None,
                message: Some(EMPTY_ORGANIZATION_MESSAGE.to_string()),
                total_records: 0,
                insights: None,
            };
        }

        Self {
            state: ViewState::Ready,
            error: None,
            message: None,
            total_records: records.len(),
            insights: Some(compute_insights(records, selection)),
        }
    }
}

#[derive(Debug, Clone)]
enum LoadStatus {
    Loading,
    Failed(String),
    Ready(Vec<CoaRecord>),
}

/// Proof that a fetch was started for the current load of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// State held for one mounted dashboard view of one organization.
///
/// Records are loaded once per mount; a fetch result is only applied while
/// the view is still mounted and the fetch is the latest one started.
#[derive(Debug, Clone)]
pub struct InsightsView {
    organization_id: Uuid,
    status: LoadStatus,
    selection: FilterSelection,
    generation: u64,
    mounted: bool,
}

impl InsightsView {
    pub fn new(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            status: LoadStatus::Loading,
            selection: FilterSelection::new(),
            generation: 0,
            mounted: true,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, LoadStatus::Loading)
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    /// Start (or restart) loading; earlier tickets become stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.status = LoadStatus::Loading;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Apply a fetch result. Returns `false` when the result was discarded
    /// because the view was unmounted or a newer load superseded it.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<CoaRecord>, String>,
    ) -> bool {
        if !self.mounted || ticket.generation != self.generation {
            debug!(
                organization_id = %self.organization_id,
                mounted = self.mounted,
                "Discarding stale insights load"
            );
            return false;
        }

        self.status = match result {
            Ok(mut records) => {
                let fetched = records.len();
                records.retain(|record| record.organization_id == self.organization_id);
                if records.len() != fetched {
                    warn!(
                        organization_id = %self.organization_id,
                        dropped = fetched - records.len(),
                        "Dropped records belonging to another organization"
                    );
                }
                LoadStatus::Ready(records)
            }
            Err(message) => LoadStatus::Failed(message),
        };
        true
    }

    /// End the view's lifecycle; any in-flight result will be discarded.
    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    pub fn set_selected_suppliers<I, S>(&mut self, suppliers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.set_selected_suppliers(suppliers);
    }

    pub fn set_selected_tests<I, S>(&mut self, tests: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection.set_selected_tests(tests);
    }

    pub fn toggle_supplier(&mut self, supplier: &str) {
        self.selection.toggle_supplier(supplier);
    }

    pub fn toggle_test(&mut self, test: &str) {
        self.selection.toggle_test(test);
    }

    pub fn snapshot(&self) -> InsightsSnapshot {
        match &self.status {
            LoadStatus::Loading => InsightsSnapshot::loading(),
            LoadStatus::Failed(message) => InsightsSnapshot::failed(message.clone()),
            LoadStatus::Ready(records) => InsightsSnapshot::from_records(records, &self.selection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearcoa_models::TestOutcome;

    fn records(org: Uuid) -> Vec<CoaRecord> {
        vec![
            CoaRecord::new(org)
                .with_supplier("Acme")
                .with_product("Resin")
                .with_test("pH")
                .with_result(TestOutcome::Fail)
                .with_date("2024-01-15"),
            CoaRecord::new(org)
                .with_supplier("Acme")
                .with_product("Resin")
                .with_test("Lead")
                .with_result(TestOutcome::Pass)
                .with_date("2024-02-10"),
            CoaRecord::new(org)
                .with_supplier("Beta")
                .with_product("Solvent")
                .with_test("Moisture")
                .with_result(TestOutcome::Fail)
                .with_date("2024-01-20"),
        ]
    }

    fn ready_view() -> (InsightsView, Uuid) {
        let org = Uuid::new_v4();
        let mut view = InsightsView::new(org);
        let ticket = view.begin_load();
        assert!(view.complete_load(ticket, Ok(records(org))));
        (view, org)
    }

    #[test]
    fn test_loading_snapshot_has_no_charts() {
        let mut view = InsightsView::new(Uuid::new_v4());
        let _ticket = view.begin_load();

        let snapshot = view.snapshot();
        assert_eq!(snapshot.state, ViewState::Loading);
        assert!(snapshot.insights.is_none());
    }

    #[test]
    fn test_failed_load_is_error_state() {
        let mut view = InsightsView::new(Uuid::new_v4());
        let ticket = view.begin_load();
        assert!(view.complete_load(ticket, Err("connection refused".to_string())));

        let snapshot = view.snapshot();
        assert_eq!(snapshot.state, ViewState::Error);
        assert_eq!(snapshot.error.as_deref(), Some("connection refused"));
        assert!(snapshot.insights.is_none());
    }

    #[test]
    fn test_empty_organization_is_distinct_from_empty_filter() {
        let mut view = InsightsView::new(Uuid::new_v4());
        let ticket = view.begin_load();
        view.complete_load(ticket, Ok(Vec::new()));

        let snapshot = view.snapshot();
        assert_eq!(snapshot.state, ViewState::Empty);
        assert_eq!(snapshot.message.as_deref(), Some(EMPTY_ORGANIZATION_MESSAGE));

        let (mut view, _) = ready_view();
        view.set_selected_suppliers(["Gamma"]);
        let snapshot = view.snapshot();
        assert_eq!(snapshot.state, ViewState::Ready);
        let charts = snapshot.insights.unwrap().charts;
        assert_eq!(charts.working_set_size, 0);
        assert_eq!(
            charts.notices.failures_by_supplier.as_deref(),
            Some(NO_SUPPLIER_FAILURES_MESSAGE)
        );
        assert_eq!(
            charts.notices.results_by_product.as_deref(),
            Some(NO_PRODUCT_RESULTS_MESSAGE)
        );
        assert_eq!(
            charts.notices.failure_trend.as_deref(),
            Some(NO_FAILURE_TREND_MESSAGE)
        );
    }

    #[test]
    fn test_result_after_unmount_is_discarded() {
        let org = Uuid::new_v4();
        let mut view = InsightsView::new(org);
        let ticket = view.begin_load();
        view.unmount();

        assert!(!view.complete_load(ticket, Ok(records(org))));
        assert!(view.is_loading());
    }

    #[test]
    fn test_superseded_load_is_discarded() {
        let org = Uuid::new_v4();
        let mut view = InsightsView::new(org);
        let first = view.begin_load();
        let second = view.begin_load();

        assert!(!view.complete_load(first, Err("late failure".to_string())));
        assert!(view.complete_load(second, Ok(records(org))));
        assert_eq!(view.snapshot().state, ViewState::Ready);
    }

    #[test]
    fn test_foreign_records_are_dropped() {
        let org = Uuid::new_v4();
        let mut view = InsightsView::new(org);
        let ticket = view.begin_load();
        let mut mixed = records(org);
        mixed.extend(records(Uuid::new_v4()));
        view.complete_load(ticket, Ok(mixed));

        assert_eq!(view.snapshot().total_records, 3);
    }

    #[test]
    fn test_selection_made_while_loading_survives() {
        let org = Uuid::new_v4();
        let mut view = InsightsView::new(org);
        let ticket = view.begin_load();
        view.set_selected_suppliers(["Beta"]);
        view.complete_load(ticket, Ok(records(org)));

        let insights = view.snapshot().insights.unwrap();
        assert_eq!(insights.charts.working_set_size, 1);
        assert_eq!(insights.filters.supplier_label, "Beta");
    }

    #[test]
    fn test_test_intent_survives_supplier_changes() {
        let (mut view, _) = ready_view();
        view.set_selected_suppliers(["Acme"]);
        view.set_selected_tests(["Lead"]);
        let filters = view.snapshot().insights.unwrap().filters;
        assert!(filters.selected_tests.contains("Lead"));

        // Beta offers no "Lead": masked, working set limited by supplier only
        view.set_selected_suppliers(["Beta"]);
        let insights = view.snapshot().insights.unwrap();
        assert!(insights.filters.selected_tests.is_empty());
        assert_eq!(insights.filters.test_label, "All Tests");
        assert_eq!(insights.charts.working_set_size, 1);
        assert!(view.selection().selected_tests.contains("Lead"));

        view.set_selected_suppliers(["Acme"]);
        let insights = view.snapshot().insights.unwrap();
        assert!(insights.filters.selected_tests.contains("Lead"));
        assert_eq!(insights.charts.working_set_size, 1);
    }

    #[test]
    fn test_compute_insights_chart_maxima() {
        let org = Uuid::new_v4();
        let data = compute_insights(&records(org), &FilterSelection::new());

        assert_eq!(data.charts.max_failures, 1);
        assert_eq!(data.charts.max_results, 2);
        assert_eq!(data.charts.failure_trend[0].data.len(), 1);
        assert_eq!(data.filters.supplier_label, "All Suppliers");
        assert!(data.charts.notices.failures_by_supplier.is_none());
    }
}
