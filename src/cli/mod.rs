//! Command-line parsing for the catalog analysis binary.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{TagKind, TimeBucket, ZeroReviewPolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "steam-insights",
    version,
    about = "Price/playtime vs. review-score regression over a storefront catalog snapshot"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a snapshot, optionally filter it, and fit an OLS model.
    Fit(FitArgs),
    /// Tag or genre counts per release year (or decade).
    Trends(TrendArgs),
    /// Run the fit pipeline on a seeded synthetic catalog.
    Demo(DemoArgs),
    /// Print a previously exported result JSON.
    Show(ShowArgs),
}

/// Missing price/playtime fill strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImputeArg {
    Zero,
    Median,
}

/// Snapshot location and loader behavior.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Snapshot JSON (object keyed by app id).
    #[arg(short, long, env = "STEAM_GAMES_JSON", value_name = "JSON")]
    pub input: PathBuf,

    /// How missing prices and playtimes are filled.
    #[arg(long, value_enum, default_value_t = ImputeArg::Zero)]
    pub impute: ImputeArg,

    /// Fill missing prices and playtimes with this constant instead (overrides `--impute`).
    #[arg(long, value_name = "VALUE")]
    pub impute_constant: Option<f64>,

    /// What the score ratio becomes for products without reviews.
    #[arg(long, value_enum, default_value_t = ZeroReviewPolicy::Exclude)]
    pub zero_reviews: ZeroReviewPolicy,
}

/// Options for `fit`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Predictor columns, comma separated.
    #[arg(long, value_delimiter = ',', default_value = "price,playtime")]
    pub predictors: Vec<String>,

    /// Response column.
    #[arg(long, default_value = "score_ratio")]
    pub response: String,

    /// Earliest release year (inclusive).
    #[arg(long)]
    pub min_year: Option<i32>,

    /// Latest release year (inclusive).
    #[arg(long)]
    pub max_year: Option<i32>,

    #[arg(long)]
    pub min_price: Option<f64>,

    #[arg(long)]
    pub max_price: Option<f64>,

    /// Only products carrying this store tag.
    #[arg(long, conflicts_with = "genre")]
    pub tag: Option<String>,

    /// Only products in this genre.
    #[arg(long)]
    pub genre: Option<String>,

    /// Treat imputed prices/playtimes as missing.
    #[arg(long)]
    pub exclude_imputed: bool,

    /// Refuse to fit on fewer complete rows than this.
    #[arg(long, default_value_t = 0)]
    pub min_observations: usize,

    /// Export the result to JSON.
    #[arg(long, value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// Export the coefficient table to CSV.
    #[arg(long, value_name = "PATH")]
    pub export_csv: Option<PathBuf>,
}

/// Options for `trends`.
#[derive(Debug, Args, Clone)]
pub struct TrendArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[arg(long, value_enum, default_value_t = TagKind::Genre)]
    pub kind: TagKind,

    /// Track the N most frequent labels (ignored when `--tags` is given).
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Track exactly these labels, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(long, value_enum, default_value_t = TimeBucket::Year)]
    pub bucket: TimeBucket,

    /// Export the trend table to CSV.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

/// Options for `demo`.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Number of synthetic products.
    #[arg(short = 'n', long, default_value_t = 500)]
    pub count: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of the score noise.
    #[arg(long, default_value_t = 0.02)]
    pub noise_sd: f64,

    /// Share of products emitted without a price.
    #[arg(long, default_value_t = 0.0)]
    pub null_price_share: f64,
}

/// Options for `show`.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Result JSON produced by `fit --export-json`.
    #[arg(value_name = "JSON")]
    pub result: PathBuf,
}
