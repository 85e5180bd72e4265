//! One-way ANOVA and chi-square independence over a test subset.
//!
//! Every test reports a [`TestOutcome`]. Guard failures (too few groups, a
//! degenerate contingency table) and degenerate data are statuses rather
//! than errors, and no outcome ever carries a NaN statistic.

use serde::Serialize;
use tracing::debug;

use crate::processing::distributions::{chi_square_survival, f_survival};
use crate::processing::filter::Subset;
use crate::processing::statistics::mean;
use crate::state::trip::{PaymentType, TripRecord, TripType, WeekOfMonth, Weekday};

pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Performed {
        statistic: f64,
        p_value: f64,
        /// `p_value < SIGNIFICANCE_LEVEL`
        significant: bool,
        dof: Vec<usize>,
    },
    CannotPerform {
        #[serde(skip_serializing_if = "Option::is_none")]
        groups_found: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        shape: Option<(usize, usize)>,
    },
    Undefined {
        reason: String,
    },
}

impl TestOutcome {
    fn performed(statistic: f64, p_value: f64, dof: Vec<usize>) -> Self {
        TestOutcome::Performed {
            statistic,
            p_value,
            significant: p_value < SIGNIFICANCE_LEVEL,
            dof,
        }
    }

    fn undefined(reason: impl Into<String>) -> Self {
        TestOutcome::Undefined { reason: reason.into() }
    }
}

/// One-way ANOVA over the given groups. Empty groups and NaN values are ignored.
pub fn one_way_anova(groups: &[Vec<f64>]) -> TestOutcome {
    let groups: Vec<Vec<f64>> = groups
        .iter()
        .map(|g| g.iter().copied().filter(|v| !v.is_nan()).collect::<Vec<f64>>())
        .filter(|g| !g.is_empty())
        .collect();

    let k = groups.len();
    if k < 2 {
        return TestOutcome::CannotPerform {
            groups_found: Some(k),
            shape: None,
        };
    }

    let n: usize = groups.iter().map(Vec::len).sum();
    let df_between = k - 1;
    let df_within = n - k;
    if df_within == 0 {
        return TestOutcome::undefined("every group has a single observation");
    }

    let grand_mean = groups.iter().flatten().sum::<f64>() / n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in &groups {
        let group_mean = group.iter().sum::<f64>() / group.len() as f64;
        ss_between += group.len() as f64 * (group_mean - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - group_mean).powi(2)).sum::<f64>();
    }

    if ss_within == 0.0 {
        return TestOutcome::undefined("no variance within groups");
    }

    let f = (ss_between / df_between as f64) / (ss_within / df_within as f64);
    if !f.is_finite() {
        return TestOutcome::undefined("non-finite F statistic");
    }
    let p = f_survival(f, df_between as f64, df_within as f64);
    TestOutcome::performed(f, p, vec![df_between, df_within])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub count: usize,
    pub mean_total_amount: Option<f64>,
}

/// ANOVA of `total_amount` across the categories of one grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaReport {
    pub grouping: &'static str,
    pub groups: Vec<GroupSummary>,
    pub outcome: TestOutcome,
}

fn anova_by<K: Copy + PartialEq + std::fmt::Display>(
    subset: &Subset<'_>,
    grouping: &'static str,
    categories: &[K],
    key: impl Fn(&TripRecord) -> Option<K>,
) -> AnovaReport {
    let partitions: Vec<Vec<f64>> = categories
        .iter()
        .map(|&category| {
            subset
                .iter()
                .filter(|t| key(*t) == Some(category))
                .map(|t| t.total_amount)
                .collect()
        })
        .collect();

    let groups = categories
        .iter()
        .zip(&partitions)
        .filter(|(_, values)| !values.is_empty())
        .map(|(category, values)| GroupSummary {
            label: category.to_string(),
            count: values.len(),
            mean_total_amount: mean(values.iter().copied()),
        })
        .collect();

    let outcome = one_way_anova(&partitions);
    debug!(grouping, ?outcome, "anova");
    AnovaReport {
        grouping,
        groups,
        outcome,
    }
}

pub fn anova_by_trip_type(subset: &Subset<'_>) -> AnovaReport {
    anova_by(subset, "trip_type", &TripType::ALL, |t| t.trip_type)
}

pub fn anova_by_weekday(subset: &Subset<'_>) -> AnovaReport {
    anova_by(subset, "weekday", &Weekday::ALL, |t| t.weekday)
}

pub fn anova_by_week(subset: &Subset<'_>) -> AnovaReport {
    anova_by(subset, "week", &WeekOfMonth::ALL, |t| t.week)
}

/// Observed counts of trip type (rows) against payment type (columns),
/// restricted to the categories present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyTable {
    pub rows: Vec<TripType>,
    pub columns: Vec<PaymentType>,
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn from_subset(subset: &Subset<'_>) -> Self {
        let pairs: Vec<(TripType, PaymentType)> = subset
            .iter()
            .filter_map(|t| Some((t.trip_type?, t.payment_type?)))
            .collect();

        let rows: Vec<TripType> = TripType::ALL
            .into_iter()
            .filter(|r| pairs.iter().any(|(tt, _)| tt == r))
            .collect();
        let columns: Vec<PaymentType> = PaymentType::ALL
            .into_iter()
            .filter(|c| pairs.iter().any(|(_, pt)| pt == c))
            .collect();

        let mut counts = vec![vec![0u64; columns.len()]; rows.len()];
        for (tt, pt) in &pairs {
            let i = rows.iter().position(|r| r == tt);
            let j = columns.iter().position(|c| c == pt);
            if let (Some(i), Some(j)) = (i, j) {
                counts[i][j] += 1;
            }
        }

        Self { rows, columns, counts }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }
}

/// Pearson chi-square test of independence on an observed table.
/// Applies Yates' continuity correction when there is one degree of freedom.
pub fn chi_square_independence(observed: &[Vec<u64>]) -> TestOutcome {
    let rows = observed.len();
    let columns = observed.first().map_or(0, Vec::len);
    if rows < 2 || columns < 2 {
        return TestOutcome::CannotPerform {
            groups_found: None,
            shape: Some((rows, columns)),
        };
    }

    let row_totals: Vec<f64> = observed.iter().map(|r| r.iter().sum::<u64>() as f64).collect();
    let column_totals: Vec<f64> = (0..columns)
        .map(|j| observed.iter().map(|r| r[j]).sum::<u64>() as f64)
        .collect();
    let total: f64 = row_totals.iter().sum();

    if row_totals.iter().chain(&column_totals).any(|&t| t == 0.0) {
        return TestOutcome::undefined("a row or column of the table is empty");
    }

    let dof = (rows - 1) * (columns - 1);
    let mut statistic = 0.0;
    for (i, row) in observed.iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            let expected = row_totals[i] * column_totals[j] / total;
            let mut diff = count as f64 - expected;
            if dof == 1 {
                diff = diff.signum() * (diff.abs() - 0.5).max(0.0);
            }
            statistic += diff * diff / expected;
        }
    }

    let p = chi_square_survival(statistic, dof as f64);
    TestOutcome::performed(statistic, p, vec![dof])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChiSquareReport {
    pub table: ContingencyTable,
    pub outcome: TestOutcome,
}

pub fn chi_square_trip_type_payment(subset: &Subset<'_>) -> ChiSquareReport {
    let table = ContingencyTable::from_subset(subset);
    let outcome = chi_square_independence(&table.counts);
    if let TestOutcome::CannotPerform { shape, .. } = &outcome {
        debug!(?shape, "chi-square skipped");
    }
    ChiSquareReport { table, outcome }
}

/// All statistical tests for one test subset. Trip-type tests are `None`
/// when the dataset has no trip type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisReport {
    pub sample_size: usize,
    pub anova_by_trip_type: Option<AnovaReport>,
    pub anova_by_weekday: AnovaReport,
    pub anova_by_week: AnovaReport,
    pub chi_square: Option<ChiSquareReport>,
}

impl HypothesisReport {
    pub fn run(subset: &Subset<'_>) -> Self {
        let has_trip_type = subset.has_trip_type();
        Self {
            sample_size: subset.len(),
            anova_by_trip_type: has_trip_type.then(|| anova_by_trip_type(subset)),
            anova_by_weekday: anova_by_weekday(subset),
            anova_by_week: anova_by_week(subset),
            chi_square: has_trip_type.then(|| chi_square_trip_type_payment(subset)),
        }
    }
}
