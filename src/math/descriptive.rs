//! Small descriptive statistics used for residual diagnostics and segment summaries.

/// Arithmetic mean, or `None` for an empty slice.
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Linearly interpolated quantile of pre-sorted values, `q ∈ [0, 1]`.
///
/// Matches the default (type 7) definition used by most statistics packages.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    debug_assert!(sorted.is_sorted_by(|a, b| a <= b), "values must be sorted");
    let last = sorted.len().checked_sub(1)?;
    let pos = q.clamp(0.0, 1.0) * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of unsorted values.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, 0.5)
}

/// Sample skewness and (Pearson) kurtosis from population moments.
///
/// Returns `(NaN, NaN)` when the values have zero variance.
#[allow(clippy::cast_precision_loss)]
pub fn skew_kurtosis(values: &[f64]) -> (f64, f64) {
    let Some(m) = mean(values) else {
        return (f64::NAN, f64::NAN);
    };
    let n = values.len() as f64;
    let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(a2, a3, a4), v| {
        let d = v - m;
        let d2 = d * d;
        (a2 + d2, a3 + d2 * d, a4 + d2 * d2)
    });
    let (m2, m3, m4) = (m2 / n, m3 / n, m4 / n);
    if m2 <= 0.0 {
        return (f64::NAN, f64::NAN);
    }
    (m3 / m2.powf(1.5), m4 / (m2 * m2))
}

/// Durbin–Watson statistic of a residual sequence.
pub fn durbin_watson(residuals: &[f64]) -> f64 {
    let ss: f64 = residuals.iter().map(|e| e * e).sum();
    if ss <= 0.0 {
        return f64::NAN;
    }
    let diff: f64 = residuals.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
    diff / ss
}
