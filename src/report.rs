//! Everything the presentation layer renders for one pair of selections,
//! bundled as a single serializable value.

use rand::Rng;
use serde::Serialize;

use crate::error::CriteriaError;
use crate::processing::aggregate::{
    sample, ColumnProfiles, CorrelationMatrix, GroupedCounts, GroupedMeans, SummaryMetrics, SCATTER_SAMPLE_SIZE,
};
use crate::processing::filter::{filter_tests, filter_view, TestCriteria, ViewCriteria};
use crate::processing::hypothesis::HypothesisReport;
use crate::state::dataset::Dataset;
use crate::state::trip::{TripRecord, Weekday};

/// Rows shown in the data table.
pub const PREVIEW_ROWS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub trip_distance: f64,
    pub trip_duration: f64,
    pub weekday: Option<Weekday>,
    pub total_amount: f64,
}

impl From<&TripRecord> for ScatterPoint {
    fn from(trip: &TripRecord) -> Self {
        Self {
            trip_distance: trip.trip_distance,
            trip_duration: trip.trip_duration,
            weekday: trip.weekday,
            total_amount: trip.total_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport<'a> {
    pub dataset_rows: usize,
    pub has_trip_type: bool,
    pub view: ViewCriteria,
    pub summary: SummaryMetrics,
    pub profiles: ColumnProfiles,
    pub counts: GroupedCounts,
    pub means: GroupedMeans,
    pub correlation: CorrelationMatrix,
    pub scatter: Vec<ScatterPoint>,
    pub preview: Vec<&'a TripRecord>,
    pub tests: TestCriteria,
    pub hypothesis: HypothesisReport,
}

/// Filter both subsets and compute every view and test over them.
pub fn build_report<'a, R: Rng + ?Sized>(
    dataset: &'a Dataset,
    view: &ViewCriteria,
    tests: &TestCriteria,
    rng: &mut R,
) -> Result<DashboardReport<'a>, CriteriaError> {
    let subset = filter_view(dataset, view)?;
    let test_subset = filter_tests(dataset, tests);

    if subset.is_empty() {
        tracing::info!("No trips match the current selection");
    }

    Ok(DashboardReport {
        dataset_rows: dataset.len(),
        has_trip_type: dataset.has_trip_type(),
        view: *view,
        summary: SummaryMetrics::compute(&subset),
        profiles: ColumnProfiles::compute(&subset),
        counts: GroupedCounts::compute(&subset),
        means: GroupedMeans::compute(&subset),
        correlation: CorrelationMatrix::compute(&subset),
        scatter: sample(&subset, SCATTER_SAMPLE_SIZE, rng)
            .into_iter()
            .map(ScatterPoint::from)
            .collect(),
        preview: subset.iter().take(PREVIEW_ROWS).collect(),
        tests: *tests,
        hypothesis: HypothesisReport::run(&test_subset),
    })
}
