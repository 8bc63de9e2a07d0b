//! Residual diagnostics reported alongside every fit.

use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::domain::ResidualSummary;
use crate::math::descriptive::{durbin_watson, quantile_sorted, skew_kurtosis};

/// Summarize residuals of a fit with `df_residual` residual degrees of freedom.
///
/// `residuals` must be in row order (Durbin–Watson depends on it) and non-empty.
#[allow(clippy::cast_precision_loss)]
pub fn summarize_residuals(residuals: &[f64], df_residual: usize) -> ResidualSummary {
    let n = residuals.len() as f64;
    let ssr: f64 = residuals.iter().map(|e| e * e).sum();

    let mut sorted = residuals.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q = |p| quantile_sorted(&sorted, p).unwrap_or(f64::NAN);

    let (skew, kurtosis) = skew_kurtosis(residuals);
    let jarque_bera = n / 6.0 * (skew * skew + (kurtosis - 3.0).powi(2) / 4.0);
    let jarque_bera_p = match ChiSquared::new(2.0) {
        Ok(chi2) if jarque_bera.is_finite() => (1.0 - chi2.cdf(jarque_bera)).clamp(0.0, 1.0),
        _ => f64::NAN,
    };

    ResidualSummary {
        min: q(0.0),
        q1: q(0.25),
        median: q(0.5),
        q3: q(0.75),
        max: q(1.0),
        std_err: (ssr / df_residual as f64).sqrt(),
        rmse: (ssr / n).sqrt(),
        skew,
        kurtosis,
        durbin_watson: durbin_watson(residuals),
        jarque_bera,
        jarque_bera_p,
    }
}
