//! Insights Aggregation & Filter Pipeline
//!
//! Turns one organization's flat set of COA test results plus the user's
//! supplier/test selection into chart-ready aggregates:
//!
//! 1. [`options`] derives the supplier options (all records) and the test
//!    options (records of the selected suppliers only)
//! 2. [`selection`] keeps the user's raw selection and derives the tests that
//!    are still valid under the current supplier filter
//! 3. [`filter`] applies both selections to produce the working set
//! 4. [`aggregate`] computes failures by supplier, results by product and the
//!    monthly failure trend from the working set
//!
//! Every step is a pure function of its inputs and is recomputed from scratch
//! on every change. [`view`] wraps the pipeline with the load lifecycle of a
//! mounted dashboard view.

pub mod options;
pub mod selection;
pub mod filter;
pub mod aggregate;
pub mod view;


pub use options::{supplier_options, test_options, FilterOption};
pub use selection::{selection_label, toggle, valid_selected_tests, FilterSelection};
pub use filter::working_set;
pub use aggregate::{
    failure_trend, failures_by_supplier, results_by_product, ProductResults, SupplierFailures,
    TrendPoint, TrendSeries, FAILURE_SERIES_ID,
};
pub use view::{
    compute_insights, ChartNotices, FilterPanel, InsightsCharts, InsightsData, InsightsSnapshot,
    InsightsView, LoadTicket, ViewState,
};
