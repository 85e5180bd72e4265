use serde::Serialize;

/// Descriptive statistics for one numeric column of a subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl SeriesStats {
    /// Compute statistics over the finite values. `None` when there are none.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut vals: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if vals.is_empty() {
            return None;
        }

        let count = vals.len();
        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = vals.iter().sum::<f64>() / count as f64;

        vals.sort_by(f64::total_cmp);
        let median = sorted_median(&vals);

        // Sample standard deviation, matching what a dataframe `describe` shows.
        let std_dev = if count > 1 {
            (vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        Some(SeriesStats {
            count,
            min,
            max,
            mean,
            median,
            std_dev,
        })
    }
}

fn sorted_median(sorted: &[f64]) -> f64 {
    let count = sorted.len();
    if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    }
}

/// Median of the non-NaN values.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut vals: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if vals.is_empty() {
        return None;
    }
    vals.sort_by(f64::total_cmp);
    Some(sorted_median(&vals))
}

/// Arithmetic mean of the non-NaN values. `None` means "no data".
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Pearson correlation over pairs where both values are present.
/// `None` with fewer than two pairs or when either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    let r = cov / (var_x * var_y).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
