//! Ordinary least squares solver.
//!
//! We solve regression problems of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! Implementation choices:
//! - Columns are scaled to unit Euclidean norm before decomposing. Catalog
//!   columns live on very different scales (price in dollars, playtime in
//!   minutes, review counts in the tens of thousands); scaling keeps the rank
//!   test and the condition number about geometry rather than units.
//! - We use SVD rather than the normal equations. The singular values give us
//!   the rank test and `(XᵀX)⁻¹ = V Σ⁻² Vᵀ` in one decomposition.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - A rank-deficient design is an error, never a minimum-norm solution.

use nalgebra::{DMatrix, DVector};

/// Why a design matrix was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Degeneracy {
    /// Column `index` is identically zero (or non-finite).
    ZeroColumn(usize),
    /// Smallest/largest singular value ratio fell below the tolerance.
    RankDeficient { ratio: f64 },
    /// The decomposition produced non-finite coefficients.
    NonFinite,
}

/// Solution of a full-rank least squares problem.
#[derive(Debug, Clone)]
pub struct OlsSolution {
    pub beta: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    /// Diagonal of `(XᵀX)⁻¹`; multiply by `σ²` for coefficient variances.
    pub xtx_inv_diag: DVector<f64>,
    /// Condition number of the column-scaled design matrix.
    pub condition_number: f64,
}

/// Solve `min ||y - Xβ||²` for a design with at least as many rows as columns.
///
/// `tolerance` is relative to the largest singular value of the scaled design.
pub fn solve_ols(x: &DMatrix<f64>, y: &DVector<f64>, tolerance: f64) -> Result<OlsSolution, Degeneracy> {
    let p = x.ncols();

    let mut norms = Vec::with_capacity(p);
    let mut scaled = x.clone();
    for j in 0..p {
        let norm = x.column(j).norm();
        if !(norm.is_finite() && norm > 0.0) {
            return Err(Degeneracy::ZeroColumn(j));
        }
        for v in scaled.column_mut(j).iter_mut() {
            *v /= norm;
        }
        norms.push(norm);
    }

    let svd = scaled.svd(true, true);
    let s = &svd.singular_values;
    let s_max = s.max();
    let s_min = s.min();
    let ratio = if s_max > 0.0 { s_min / s_max } else { 0.0 };
    if !(ratio.is_finite() && ratio >= tolerance) {
        return Err(Degeneracy::RankDeficient { ratio });
    }

    let beta_scaled = svd.solve(y, tolerance * s_max).map_err(|_| Degeneracy::NonFinite)?;
    let beta = DVector::from_iterator(p, beta_scaled.iter().zip(&norms).map(|(b, n)| b / n));
    if !beta.iter().all(|v| v.is_finite()) {
        return Err(Degeneracy::NonFinite);
    }

    // (XᵀX)⁻¹_jj = Σ_i (V_ji / s_i)² / norm_j²
    let v_t = svd.v_t.as_ref().ok_or(Degeneracy::NonFinite)?;
    let xtx_inv_diag = DVector::from_iterator(
        p,
        (0..p).map(|j| {
            let acc: f64 = (0..s.len()).map(|i| (v_t[(i, j)] / s[i]).powi(2)).sum();
            acc / (norms[j] * norms[j])
        }),
    );

    let residuals = y - x * &beta;
    let ssr = residuals.norm_squared();

    Ok(OlsSolution {
        beta,
        residuals,
        ssr,
        xtx_inv_diag,
        condition_number: s_max / s_min,
    })
}
