//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during loading and fitting
//! - exported to JSON/CSV
//! - handed read-only to a presentation layer

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Which collection-valued field an association came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// User-voted store tags (`tags`).
    Tag,
    /// Developer-assigned genres (`genres`).
    Genre,
}

impl TagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TagKind::Tag => "tag",
            TagKind::Genre => "genre",
        }
    }
}

/// How a missing economic signal (`price`, `playtime`) is filled in.
///
/// Imputation biases slope estimates towards zero. Rows touched by it are
/// flagged on `ProductRow` so a fit can opt out via `FitOptions::exclude_imputed`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "strategy", content = "value")]
pub enum ImputeStrategy {
    /// Treat missing as free / unplayed.
    #[default]
    Zero,
    /// Fill with a fixed non-negative constant.
    Constant(f64),
    /// Fill with the median of the observed values in the same snapshot.
    Median,
}

/// What `score_ratio` becomes when a product has no reviews at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ZeroReviewPolicy {
    /// Leave the ratio undefined; such rows drop out of any fit that uses it.
    #[default]
    Exclude,
    /// Use `0.0` as a sentinel (legacy dashboard behavior).
    Zero,
}

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub price_impute: ImputeStrategy,
    pub playtime_impute: ImputeStrategy,
    pub zero_reviews: ZeroReviewPolicy,
    /// Record keys probed, in order, for the playtime value.
    pub playtime_keys: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            price_impute: ImputeStrategy::Zero,
            playtime_impute: ImputeStrategy::Zero,
            zero_reviews: ZeroReviewPolicy::Exclude,
            playtime_keys: vec![
                "average_playtime_forever".to_string(),
                "average_playtime".to_string(),
                "playtime".to_string(),
            ],
        }
    }
}

/// One cleaned product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub product_id: String,
    pub name: Option<String>,
    /// `None` when the raw date was absent or could not be parsed.
    pub release_date: Option<NaiveDate>,

    /// Price in store currency, always `>= 0`.
    pub price: f64,
    /// Average playtime in minutes, always `>= 0`.
    pub playtime: f64,
    pub price_imputed: bool,
    pub playtime_imputed: bool,

    pub positive_reviews: u64,
    pub negative_reviews: u64,
    /// `positive / (positive + negative)`; see `ZeroReviewPolicy` for the zero-review case.
    pub score_ratio: Option<f64>,

    pub tags: BTreeSet<String>,
    pub genres: BTreeSet<String>,
}

impl ProductRow {
    pub fn total_reviews(&self) -> u64 {
        self.positive_reviews.saturating_add(self.negative_reviews)
    }

    pub fn release_year(&self) -> Option<i32> {
        self.release_date.map(|d| d.year())
    }

    pub fn labels(&self, kind: TagKind) -> &BTreeSet<String> {
        match kind {
            TagKind::Tag => &self.tags,
            TagKind::Genre => &self.genres,
        }
    }

    /// Read a numeric column, or `None` if it is missing for this row.
    ///
    /// With `exclude_imputed`, imputed prices/playtimes also count as missing.
    #[allow(clippy::cast_precision_loss)]
    pub fn field(&self, field: NumericField, exclude_imputed: bool) -> Option<f64> {
        match field {
            NumericField::Price if exclude_imputed && self.price_imputed => None,
            NumericField::Price => Some(self.price),
            NumericField::Playtime if exclude_imputed && self.playtime_imputed => None,
            NumericField::Playtime => Some(self.playtime),
            NumericField::PositiveReviews => Some(self.positive_reviews as f64),
            NumericField::NegativeReviews => Some(self.negative_reviews as f64),
            NumericField::TotalReviews => Some(self.total_reviews() as f64),
            NumericField::ScoreRatio => self.score_ratio,
            NumericField::ReleaseYear => self.release_year().map(f64::from),
        }
    }
}

/// Long-format `(product, tag)` membership produced by unnesting.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TagAssociationRow {
    pub product_id: String,
    pub kind: TagKind,
    pub tag: String,
}

/// Numeric columns of `ProductRow` that can enter a regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Price,
    Playtime,
    PositiveReviews,
    NegativeReviews,
    TotalReviews,
    ScoreRatio,
    ReleaseYear,
}

impl NumericField {
    pub const ALL: [NumericField; 7] = [
        NumericField::Price,
        NumericField::Playtime,
        NumericField::PositiveReviews,
        NumericField::NegativeReviews,
        NumericField::TotalReviews,
        NumericField::ScoreRatio,
        NumericField::ReleaseYear,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericField::Price => "price",
            NumericField::Playtime => "playtime",
            NumericField::PositiveReviews => "positive_reviews",
            NumericField::NegativeReviews => "negative_reviews",
            NumericField::TotalReviews => "total_reviews",
            NumericField::ScoreRatio => "score_ratio",
            NumericField::ReleaseYear => "release_year",
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumericField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        // Raw feed names are accepted as aliases.
        let field = match key.as_str() {
            "average_playtime_forever" => NumericField::Playtime,
            "positive" => NumericField::PositiveReviews,
            "negative" => NumericField::NegativeReviews,
            "year" => NumericField::ReleaseYear,
            other => NumericField::ALL
                .into_iter()
                .find(|f| f.name() == other)
                .ok_or_else(|| AppError::UnknownField(s.trim().to_string()))?,
        };
        Ok(field)
    }
}

/// Which columns a regression uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegressionSpec {
    pub predictors: Vec<NumericField>,
    pub response: NumericField,
}

impl RegressionSpec {
    pub fn new(predictors: Vec<NumericField>, response: NumericField) -> Self {
        Self { predictors, response }
    }

    /// Resolve column names such as `"price"` or `"score_ratio"`.
    pub fn from_names<S: AsRef<str>>(predictors: &[S], response: &str) -> Result<Self, AppError> {
        let predictors = predictors
            .iter()
            .map(|p| p.as_ref().parse())
            .collect::<Result<Vec<NumericField>, _>>()?;
        Ok(Self::new(predictors, response.parse()?))
    }

    /// Score ratio explained by price and playtime.
    pub fn price_playtime() -> Self {
        Self::new(
            vec![NumericField::Price, NumericField::Playtime],
            NumericField::ScoreRatio,
        )
    }
}

/// Options that affect a single fit.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Treat imputed price/playtime values as missing (complete-case on observed data only).
    pub exclude_imputed: bool,
    /// Minimum complete rows, on top of the `k + 2` degrees-of-freedom floor.
    pub min_observations: usize,
    /// Relative singular value below which the design matrix counts as rank-deficient.
    pub rank_tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            exclude_imputed: false,
            min_observations: 0,
            rank_tolerance: 1e-10,
        }
    }
}

/// One named coefficient of a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    #[serde(with = "crate::domain::float_repr")]
    pub estimate: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub std_err: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub t_stat: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub p_value: f64,
}

/// Summary of the residual distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualSummary {
    #[serde(with = "crate::domain::float_repr")]
    pub min: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub q1: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub median: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub q3: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub max: f64,
    /// Residual standard error `sqrt(SSR / df)`.
    #[serde(with = "crate::domain::float_repr")]
    pub std_err: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub rmse: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub skew: f64,
    /// Pearson (non-excess) kurtosis; 3 for a normal distribution.
    #[serde(with = "crate::domain::float_repr")]
    pub kurtosis: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub durbin_watson: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub jarque_bera: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub jarque_bera_p: f64,
}

/// Immutable output of one `fit_regression` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub response: NumericField,
    pub predictors: Vec<NumericField>,
    /// `[intercept, predictors...]` in the order requested.
    pub coefficients: Vec<Coefficient>,
    pub n_observations: usize,
    /// Rows dropped by complete-case filtering.
    pub n_excluded: usize,
    pub df_residual: usize,
    /// `NaN` when the response is constant.
    #[serde(with = "crate::domain::float_repr")]
    pub r_squared: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub adj_r_squared: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub f_statistic: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub f_p_value: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub log_likelihood: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub aic: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub bic: f64,
    #[serde(with = "crate::domain::float_repr")]
    pub condition_number: f64,
    pub residuals: ResidualSummary,
}

impl RegressionResult {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

/// Time bucket granularity for tag trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    #[default]
    Year,
    Decade,
}

impl TimeBucket {
    pub fn bucket(self, year: i32) -> i32 {
        match self {
            TimeBucket::Year => year,
            TimeBucket::Decade => year.div_euclid(10) * 10,
        }
    }
}

/// Options for `report::tag_trends`.
#[derive(Debug, Clone, Default)]
pub struct TrendOptions {
    /// Restrict to tags or genres; `None` keeps both.
    pub kind: Option<TagKind>,
    /// Only these labels (exact match); `None` keeps all.
    pub tags: Option<BTreeSet<String>>,
    pub bucket: TimeBucket,
}

/// One `(tag, time bucket)` cell of the trend table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagTrendRow {
    pub kind: TagKind,
    pub tag: String,
    pub bucket: i32,
    pub count: usize,
    pub mean_playtime: f64,
}

/// Headline metrics of a product subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub products: usize,
    pub mean_price: Option<f64>,
    /// Median over titles with playtime > 0.
    pub median_playtime_played: Option<f64>,
    pub mean_score_ratio: Option<f64>,
}
