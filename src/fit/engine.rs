//! OLS regression over the cleaned catalog.
//!
//! Given a set of `ProductRow`s and a `RegressionSpec`, we:
//! - keep complete cases (every selected column present and finite)
//! - build a design matrix with an intercept column
//! - solve OLS and reject rank-deficient designs
//! - derive standard errors, t-statistics, two-sided p-values and fit quality
//!
//! The engine holds only its options. Fitting never mutates the rows, so the
//! same loaded table can be refit with different predictor sets.

use std::collections::HashSet;
use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use tracing::{debug, info};

use crate::domain::{Coefficient, FitOptions, NumericField, ProductRow, RegressionResult, RegressionSpec};
use crate::error::AppError;
use crate::fit::diagnostics::summarize_residuals;
use crate::math::{Degeneracy, solve_ols};

/// Name of the constant term in `RegressionResult::coefficients`.
pub const INTERCEPT: &str = "intercept";

/// Stateless regression engine.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    options: FitOptions,
}

/// Complete-case design data extracted from the rows.
struct CompleteCases {
    x: DMatrix<f64>,
    y: DVector<f64>,
    excluded: usize,
}

impl AnalyticsEngine {
    pub fn new(options: FitOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Fit `spec.response ~ 1 + spec.predictors` on the complete cases of `rows`.
    pub fn fit<'a, I>(&self, rows: I, spec: &RegressionSpec) -> Result<RegressionResult, AppError>
    where
        I: IntoIterator<Item = &'a ProductRow>,
    {
        validate_spec(spec)?;

        let k = spec.predictors.len();
        let p = k + 1;
        let cases = self.complete_cases(rows, spec);
        let n = cases.y.len();
        debug!(n, excluded = cases.excluded, response = %spec.response, "Collected complete cases");

        let required = (k + 2).max(self.options.min_observations);
        if n < required {
            return Err(AppError::InsufficientData { available: n, required });
        }

        let sol = solve_ols(&cases.x, &cases.y, self.options.rank_tolerance)
            .map_err(|d| AppError::DegenerateModel(describe_degeneracy(d, &cases.x, spec)))?;

        let df = n - p;
        let df_f = df as f64;
        let n_f = n as f64;
        let sigma2 = sol.ssr / df_f;

        let t_dist = StudentsT::new(0.0, 1.0, df_f)
            .map_err(|e| AppError::DegenerateModel(format!("t-distribution with {df} df: {e}")))?;

        // A constant response explains nothing; rounding in the solver must not
        // turn that into spurious inference.
        let constant_response = cases.y.iter().all(|v| *v == cases.y[0]);
        let y_mean = cases.y.mean();
        let sst: f64 = if constant_response {
            0.0
        } else {
            cases.y.iter().map(|v| (v - y_mean).powi(2)).sum()
        };

        let names = std::iter::once(INTERCEPT).chain(spec.predictors.iter().map(|f| f.name()));
        let coefficients = names
            .enumerate()
            .map(|(j, name)| {
                let estimate = sol.beta[j];
                let std_err = (sigma2 * sol.xtx_inv_diag[j]).sqrt();
                let (t_stat, p_value) = if std_err > 0.0 && !constant_response {
                    let t = estimate / std_err;
                    (t, (2.0 * (1.0 - t_dist.cdf(t.abs()))).clamp(0.0, 1.0))
                } else {
                    // Exact fit or constant response: inference is undefined.
                    (f64::NAN, f64::NAN)
                };
                Coefficient {
                    name: name.to_string(),
                    estimate,
                    std_err,
                    t_stat,
                    p_value,
                }
            })
            .collect();

        let r_squared = if sst > 0.0 { 1.0 - sol.ssr / sst } else { f64::NAN };
        let adj_r_squared = 1.0 - (1.0 - r_squared) * (n_f - 1.0) / df_f;

        let f_statistic = if constant_response {
            f64::NAN
        } else {
            ((sst - sol.ssr) / k as f64) / sigma2
        };
        let f_p_value = match FisherSnedecor::new(k as f64, df_f) {
            Ok(f) if f_statistic.is_finite() => (1.0 - f.cdf(f_statistic.max(0.0))).clamp(0.0, 1.0),
            _ => f64::NAN,
        };

        let log_likelihood = -n_f / 2.0 * ((2.0 * PI).ln() + (sol.ssr / n_f).ln() + 1.0);
        let aic = -2.0 * log_likelihood + 2.0 * p as f64;
        let bic = -2.0 * log_likelihood + p as f64 * n_f.ln();

        let residuals = summarize_residuals(sol.residuals.as_slice(), df);

        info!(
            response = %spec.response,
            n,
            excluded = cases.excluded,
            r_squared,
            "OLS model fitted"
        );

        Ok(RegressionResult {
            response: spec.response,
            predictors: spec.predictors.clone(),
            coefficients,
            n_observations: n,
            n_excluded: cases.excluded,
            df_residual: df,
            r_squared,
            adj_r_squared,
            f_statistic,
            f_p_value,
            log_likelihood,
            aic,
            bic,
            condition_number: sol.condition_number,
            residuals,
        })
    }

    fn complete_cases<'a, I>(&self, rows: I, spec: &RegressionSpec) -> CompleteCases
    where
        I: IntoIterator<Item = &'a ProductRow>,
    {
        let exclude_imputed = self.options.exclude_imputed;
        let read = |row: &ProductRow, field: NumericField| row.field(field, exclude_imputed).filter(|v| v.is_finite());

        let mut design = Vec::new();
        let mut response = Vec::new();
        let mut excluded = 0usize;

        for row in rows {
            let Some(y) = read(row, spec.response) else {
                excluded += 1;
                continue;
            };
            let Some(xs) = spec
                .predictors
                .iter()
                .map(|&f| read(row, f))
                .collect::<Option<Vec<f64>>>()
            else {
                excluded += 1;
                continue;
            };
            design.push(1.0);
            design.extend(xs);
            response.push(y);
        }

        let n = response.len();
        CompleteCases {
            x: DMatrix::from_row_slice(n, spec.predictors.len() + 1, &design),
            y: DVector::from_vec(response),
            excluded,
        }
    }
}

/// Fit with default `FitOptions`.
pub fn fit_regression<'a, I>(
    rows: I,
    predictors: &[NumericField],
    response: NumericField,
) -> Result<RegressionResult, AppError>
where
    I: IntoIterator<Item = &'a ProductRow>,
{
    AnalyticsEngine::default().fit(rows, &RegressionSpec::new(predictors.to_vec(), response))
}

fn validate_spec(spec: &RegressionSpec) -> Result<(), AppError> {
    if spec.predictors.is_empty() {
        return Err(AppError::InvalidSpec("at least one predictor is required".to_string()));
    }
    if spec.predictors.contains(&spec.response) {
        return Err(AppError::InvalidSpec(format!(
            "response `{}` is also listed as a predictor",
            spec.response
        )));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = spec.predictors.iter().find(|f| !seen.insert(**f)) {
        return Err(AppError::InvalidSpec(format!("predictor `{dup}` is listed twice")));
    }
    Ok(())
}

fn describe_degeneracy(d: Degeneracy, x: &DMatrix<f64>, spec: &RegressionSpec) -> String {
    // Column 0 is the intercept.
    let constant = spec
        .predictors
        .iter()
        .enumerate()
        .find(|(j, _)| {
            let col = x.column(j + 1);
            col.iter().all(|v| *v == col[0])
        })
        .map(|(_, f)| *f);

    match (d, constant) {
        (_, Some(field)) => format!(
            "predictor `{field}` is constant across all {} complete rows",
            x.nrows()
        ),
        (Degeneracy::ZeroColumn(j), None) => format!("design column {j} is all zero"),
        (Degeneracy::RankDeficient { ratio }, None) => format!(
            "predictors are collinear (singular value ratio {ratio:.3e})"
        ),
        (Degeneracy::NonFinite, None) => "least squares produced non-finite coefficients".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    use super::*;

    fn row(id: usize, price: f64, playtime: f64, score: Option<f64>) -> ProductRow {
        ProductRow {
            product_id: id.to_string(),
            name: None,
            release_date: None,
            price,
            playtime,
            price_imputed: false,
            playtime_imputed: false,
            positive_reviews: 0,
            negative_reviews: 0,
            score_ratio: score,
            tags: BTreeSet::new(),
            genres: BTreeSet::new(),
        }
    }

    /// `score_ratio = 0.5 - 0.01 * price + ε` on 50 rows.
    fn synthetic_rows(seed: u64) -> Vec<ProductRow> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.02).unwrap();
        (0..50)
            .map(|i| {
                let price: f64 = rng.gen_range(0.0..40.0);
                let playtime: f64 = rng.gen_range(0.0..600.0);
                let score = (0.5 - 0.01 * price + noise.sample(&mut rng)).clamp(0.0, 1.0);
                row(i, price, playtime, Some(score))
            })
            .collect()
    }

    #[test]
    fn recovers_negative_price_effect() {
        let rows = synthetic_rows(7);
        let result = fit_regression(&rows, &[NumericField::Price], NumericField::ScoreRatio).unwrap();

        let price = result.coefficient("price").unwrap();
        assert!(price.estimate < 0.0);
        assert!((price.estimate + 0.01).abs() < 0.003, "slope {}", price.estimate);
        assert!(price.p_value < 0.05);
        assert!(result.r_squared > 0.5 && result.r_squared <= 1.0);
        assert_eq!(result.n_observations, 50);
        assert_eq!(result.df_residual, 48);
        assert_eq!(result.coefficients[0].name, INTERCEPT);
    }

    #[test]
    fn unrelated_playtime_has_negligible_effect() {
        let rows = synthetic_rows(11);
        let result = fit_regression(
            &rows,
            &[NumericField::Price, NumericField::Playtime],
            NumericField::ScoreRatio,
        )
        .unwrap();
        assert_eq!(result.coefficients.len(), 3);
        assert!(result.coefficient("price").unwrap().p_value < 0.05);
        assert!(result.coefficient("playtime").unwrap().estimate.abs() < 1e-3);
    }

    #[test]
    fn matches_closed_form_simple_regression() {
        // y = [1,3,2,5] / 10 on x = [0,1,2,3]: slope 0.11, intercept 0.11, SSR 0.027.
        let rows = vec![
            row(1, 0.0, 0.0, Some(0.1)),
            row(2, 1.0, 0.0, Some(0.3)),
            row(3, 2.0, 0.0, Some(0.2)),
            row(4, 3.0, 0.0, Some(0.5)),
        ];
        let result = fit_regression(&rows, &[NumericField::Price], NumericField::ScoreRatio).unwrap();
        let b0 = &result.coefficients[0];
        let b1 = &result.coefficients[1];
        assert!((b0.estimate - 0.11).abs() < 1e-12);
        assert!((b1.estimate - 0.11).abs() < 1e-12);

        // σ² = SSR / 2 and (XᵀX)⁻¹₁₁ = 0.2
        let se1 = (0.027_f64 / 2.0 * 0.2).sqrt();
        assert!((b1.std_err - se1).abs() < 1e-12);
        assert!((result.r_squared - (1.0 - 0.027 / 0.0875)).abs() < 1e-12);
    }

    #[test]
    fn constant_predictor_is_degenerate() {
        let rows: Vec<ProductRow> = (0..20)
            .map(|i| row(i, 9.99, i as f64, Some(0.5 + 0.01 * i as f64)))
            .collect();
        let err = fit_regression(&rows, &[NumericField::Price, NumericField::Playtime], NumericField::ScoreRatio)
            .unwrap_err();
        match err {
            AppError::DegenerateModel(msg) => assert!(msg.contains("price"), "{msg}"),
            other => panic!("expected DegenerateModel, got {other:?}"),
        }
    }

    #[test]
    fn constant_response_has_no_inference() {
        let rows: Vec<ProductRow> = (0..10).map(|i| row(i, i as f64, 0.0, Some(0.1))).collect();
        let result = fit_regression(&rows, &[NumericField::Price], NumericField::ScoreRatio).unwrap();

        assert!((result.coefficients[0].estimate - 0.1).abs() < 1e-12);
        assert!(result.r_squared.is_nan());
        assert!(result.f_statistic.is_nan());
        assert!(result.f_p_value.is_nan());
        for c in &result.coefficients {
            assert!(c.t_stat.is_nan(), "{}: t = {}", c.name, c.t_stat);
            assert!(c.p_value.is_nan(), "{}: p = {}", c.name, c.p_value);
        }
    }

    #[test]
    fn all_zero_predictor_is_degenerate() {
        let rows: Vec<ProductRow> = (0..10).map(|i| row(i, 0.0, i as f64, Some(0.3))).collect();
        assert!(matches!(
            fit_regression(&rows, &[NumericField::Price], NumericField::ScoreRatio),
            Err(AppError::DegenerateModel(_))
        ));
    }

    #[test]
    fn collinear_predictors_are_degenerate() {
        let rows: Vec<ProductRow> = (0..50)
            .map(|i| row(i, i as f64, 100.0 + i as f64, Some(0.5)))
            .collect();
        assert!(matches!(
            fit_regression(&rows, &[NumericField::Price, NumericField::Playtime], NumericField::ScoreRatio),
            Err(AppError::DegenerateModel(_))
        ));
    }

    #[test]
    fn refits_are_bit_identical() {
        let rows = synthetic_rows(3);
        let engine = AnalyticsEngine::default();
        let spec = RegressionSpec::price_playtime();
        let a = engine.fit(&rows, &spec).unwrap();
        let b = engine.fit(&rows, &spec).unwrap();
        for (x, y) in a.coefficients.iter().zip(&b.coefficients) {
            assert_eq!(x.estimate.to_bits(), y.estimate.to_bits());
            assert_eq!(x.std_err.to_bits(), y.std_err.to_bits());
            assert_eq!(x.p_value.to_bits(), y.p_value.to_bits());
        }
        assert_eq!(a.r_squared.to_bits(), b.r_squared.to_bits());
    }

    #[test]
    fn incomplete_rows_are_excluded_and_counted() {
        let mut rows = synthetic_rows(5);
        rows[0].score_ratio = None;
        rows[1].score_ratio = None;
        let result = fit_regression(&rows, &[NumericField::Price], NumericField::ScoreRatio).unwrap();
        assert_eq!(result.n_observations, 48);
        assert_eq!(result.n_excluded, 2);
    }

    #[test]
    fn imputed_values_can_be_treated_as_missing() {
        let mut rows = synthetic_rows(5);
        rows[3].price_imputed = true;
        let engine = AnalyticsEngine::new(FitOptions {
            exclude_imputed: true,
            ..FitOptions::default()
        });
        let spec = RegressionSpec::new(vec![NumericField::Price], NumericField::ScoreRatio);
        let result = engine.fit(&rows, &spec).unwrap();
        assert_eq!(result.n_excluded, 1);
    }

    #[test]
    fn too_few_complete_rows_is_insufficient_data() {
        let rows = vec![row(1, 1.0, 2.0, Some(0.4)), row(2, 2.0, 1.0, Some(0.6)), row(3, 3.0, 5.0, None)];
        let err = fit_regression(&rows, &[NumericField::Price, NumericField::Playtime], NumericField::ScoreRatio)
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientData { available: 2, required: 4 }));

        let empty: Vec<ProductRow> = Vec::new();
        assert!(matches!(
            fit_regression(&empty, &[NumericField::Price], NumericField::ScoreRatio),
            Err(AppError::InsufficientData { available: 0, .. })
        ));
    }

    #[test]
    fn minimum_observation_floor_applies() {
        let rows = synthetic_rows(1);
        let engine = AnalyticsEngine::new(FitOptions {
            min_observations: 60,
            ..FitOptions::default()
        });
        let spec = RegressionSpec::new(vec![NumericField::Price], NumericField::ScoreRatio);
        assert!(matches!(
            engine.fit(&rows, &spec),
            Err(AppError::InsufficientData { available: 50, required: 60 })
        ));
    }

    #[test]
    fn invalid_specs_are_rejected_before_fitting() {
        let rows = synthetic_rows(2);
        for predictors in [
            vec![],
            vec![NumericField::ScoreRatio],
            vec![NumericField::Price, NumericField::Price],
        ] {
            assert!(matches!(
                fit_regression(&rows, &predictors, NumericField::ScoreRatio),
                Err(AppError::InvalidSpec(_))
            ));
        }
    }

    #[test]
    fn fits_subsets_by_reference() {
        let rows = synthetic_rows(9);
        let cheap: Vec<&ProductRow> = rows.iter().filter(|r| r.price < 30.0).collect();
        let result = fit_regression(cheap.iter().copied(), &[NumericField::Price], NumericField::ScoreRatio).unwrap();
        assert_eq!(result.n_observations, cheap.len());
    }
}
