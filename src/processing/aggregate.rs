use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::processing::filter::Subset;
use crate::processing::statistics::{mean, pearson, SeriesStats};
use crate::state::trip::{PaymentType, TripRecord, TripType, WeekOfMonth, Weekday, CORRELATION_COLUMNS};

/// Upper bound on rows handed to the scatter plot.
pub const SCATTER_SAMPLE_SIZE: usize = 1000;

/// Headline numbers for a subset. Means are `None` ("no data") for an empty subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub trip_count: usize,
    pub mean_trip_distance: Option<f64>,
    pub mean_trip_duration: Option<f64>,
    pub mean_total_amount: Option<f64>,
}

impl SummaryMetrics {
    pub fn compute(subset: &Subset<'_>) -> Self {
        Self {
            trip_count: subset.len(),
            mean_trip_distance: mean(subset.iter().map(|t| t.trip_distance)),
            mean_trip_duration: mean(subset.iter().map(|t| t.trip_duration)),
            mean_total_amount: mean(subset.iter().map(|t| t.total_amount)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount<K> {
    pub category: K,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMean<K> {
    pub category: K,
    pub mean: Option<f64>,
}

/// Count rows per category over a fixed category list, zeros included.
fn counts_over<K: Copy + PartialEq>(
    subset: &Subset<'_>,
    categories: &[K],
    key: impl Fn(&TripRecord) -> Option<K>,
) -> Vec<CategoryCount<K>> {
    let mut counts: Vec<CategoryCount<K>> = categories
        .iter()
        .map(|&category| CategoryCount { category, count: 0 })
        .collect();
    for trip in subset.iter() {
        if let Some(k) = key(trip) {
            if let Some(slot) = counts.iter_mut().find(|c| c.category == k) {
                slot.count += 1;
            }
        }
    }
    counts
}

/// Count rows per category present in the subset, most frequent first.
fn counts_present<K: Copy + Ord>(
    subset: &Subset<'_>,
    categories: &[K],
    key: impl Fn(&TripRecord) -> Option<K>,
) -> Vec<CategoryCount<K>> {
    let mut counts: Vec<CategoryCount<K>> = counts_over(subset, categories, key)
        .into_iter()
        .filter(|c| c.count > 0)
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then(a.category.cmp(&b.category)));
    counts
}

fn means_over<K: Copy + PartialEq>(
    subset: &Subset<'_>,
    categories: &[K],
    key: impl Fn(&TripRecord) -> Option<K>,
) -> Vec<CategoryMean<K>> {
    categories
        .iter()
        .map(|&category| CategoryMean {
            category,
            mean: mean(
                subset
                    .iter()
                    .filter(|t| key(*t) == Some(category))
                    .map(|t| t.total_amount),
            ),
        })
        .collect()
}

/// Per-category trip counts backing the bar, line and pie charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedCounts {
    /// Monday through Sunday.
    pub by_weekday: Vec<CategoryCount<Weekday>>,
    /// Hours 0 through 23.
    pub by_hour: Vec<CategoryCount<u32>>,
    /// 1st through 5th week.
    pub by_week: Vec<CategoryCount<WeekOfMonth>>,
    pub by_payment_type: Vec<CategoryCount<PaymentType>>,
    /// `None` when the dataset has no trip type.
    pub by_trip_type: Option<Vec<CategoryCount<TripType>>>,
}

impl GroupedCounts {
    pub fn compute(subset: &Subset<'_>) -> Self {
        let hours: Vec<u32> = (0..24).collect();
        Self {
            by_weekday: counts_over(subset, &Weekday::ALL, |t| t.weekday),
            by_hour: counts_over(subset, &hours, |t| t.hour_of_day),
            by_week: counts_over(subset, &WeekOfMonth::ALL, |t| t.week),
            by_payment_type: counts_present(subset, &PaymentType::ALL, |t| t.payment_type),
            by_trip_type: subset
                .has_trip_type()
                .then(|| counts_present(subset, &TripType::ALL, |t| t.trip_type)),
        }
    }
}

/// Mean total amount per category, in fixed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedMeans {
    pub total_amount_by_weekday: Vec<CategoryMean<Weekday>>,
    pub total_amount_by_week: Vec<CategoryMean<WeekOfMonth>>,
}

impl GroupedMeans {
    pub fn compute(subset: &Subset<'_>) -> Self {
        Self {
            total_amount_by_weekday: means_over(subset, &Weekday::ALL, |t| t.weekday),
            total_amount_by_week: means_over(subset, &WeekOfMonth::ALL, |t| t.week),
        }
    }
}

/// Pearson correlations over `CORRELATION_COLUMNS`. Undefined cells are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<&'static str>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn compute(subset: &Subset<'_>) -> Self {
        let series: Vec<Vec<f64>> = CORRELATION_COLUMNS
            .iter()
            .map(|column| subset.iter().map(|t| t.numeric(column)).collect())
            .collect();

        let values = series
            .iter()
            .map(|x| series.iter().map(|y| pearson(x, y)).collect())
            .collect();

        Self {
            columns: CORRELATION_COLUMNS.to_vec(),
            values,
        }
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| *c == row)?;
        let j = self.columns.iter().position(|c| *c == column)?;
        self.values[i][j]
    }
}

/// Descriptive statistics for the three headline columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfiles {
    pub trip_distance: Option<SeriesStats>,
    pub trip_duration: Option<SeriesStats>,
    pub total_amount: Option<SeriesStats>,
}

impl ColumnProfiles {
    pub fn compute(subset: &Subset<'_>) -> Self {
        let column = |f: fn(&TripRecord) -> f64| -> Option<SeriesStats> {
            let values: Vec<f64> = subset.iter().map(f).collect();
            SeriesStats::compute(&values)
        };
        Self {
            trip_distance: column(|t| t.trip_distance),
            trip_duration: column(|t| t.trip_duration),
            total_amount: column(|t| t.total_amount),
        }
    }
}

/// Up to `max` rows drawn uniformly without replacement; the whole subset when smaller.
pub fn sample<'a, R: Rng + ?Sized>(subset: &Subset<'a>, max: usize, rng: &mut R) -> Vec<&'a TripRecord> {
    if subset.len() <= max {
        return subset.rows().to_vec();
    }
    subset.rows().choose_multiple(rng, max).copied().collect()
}
