//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs the log subscriber and reads `.env`
//! - parses CLI arguments into library configs
//! - runs the load/fit/trend pipelines
//! - prints reports and writes optional exports

use std::collections::BTreeSet;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DemoArgs, FitArgs, ImputeArg, InputArgs, ShowArgs, TrendArgs};
use crate::data::{SampleConfig, Subset};
use crate::domain::{FitOptions, ImputeStrategy, LoaderConfig, RegressionSpec, TagKind, TrendOptions};
use crate::error::AppError;
use crate::io::ingest::Loader;
use crate::report;

pub mod pipeline;

use pipeline::{FitRun, TagSelection};

/// Entry point for the `steam-insights` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is normal.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Trends(args) => handle_trends(args),
        Command::Demo(args) => handle_demo(&args),
        Command::Show(args) => handle_show(&args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout stays clean for reports.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let spec = RegressionSpec::from_names(&args.predictors, &args.response)?;
    let subset = subset_from_args(&args);
    let options = fit_options_from_args(&args);
    debug!(?spec, ?options, "Fit configuration");

    let load = Loader::new(loader_config_from_args(&args.input)).load_path(&args.input.input)?;
    let run = pipeline::run_fit(load, subset, &spec, options)?;
    print_fit(&run);

    if let Some(path) = &args.export_json {
        let subset = (!run.subset.is_empty()).then(|| run.subset.to_string());
        crate::io::result::write_result_json(path, &run.result, subset.as_deref())?;
    }
    if let Some(path) = &args.export_csv {
        crate::io::export::write_coefficients_csv(path, &run.result)?;
    }

    Ok(())
}

fn handle_trends(args: TrendArgs) -> Result<(), AppError> {
    let load = Loader::new(loader_config_from_args(&args.input)).load_path(&args.input.input)?;

    let selection = if args.tags.is_empty() {
        TagSelection::Top(args.top)
    } else {
        TagSelection::Named(args.tags.iter().map(|t| t.trim().to_string()).collect::<BTreeSet<_>>())
    };
    let options = TrendOptions {
        bucket: args.bucket,
        ..TrendOptions::default()
    };
    let run = pipeline::run_trends(load, args.kind, selection, options);

    println!("{}", report::format_load_summary(&run.load.report));
    println!("Most frequent {}s:", args.kind.as_str());
    println!("{}", report::format_top_tags(&run.tracked));
    println!("{}", report::format_tag_trends(&run.rows));

    if let Some(path) = &args.export {
        crate::io::export::write_trends_csv(path, &run.rows)?;
    }

    Ok(())
}

fn handle_demo(args: &DemoArgs) -> Result<(), AppError> {
    let sample = SampleConfig {
        count: args.count,
        seed: args.seed,
        noise_sd: args.noise_sd,
        null_price_share: args.null_price_share,
        ..SampleConfig::default()
    };
    let run = pipeline::run_demo(&sample)?;
    println!(
        "Synthetic catalog: n={} seed={} (true model: score = {} + {}·price + {}·playtime)\n",
        sample.count, sample.seed, sample.intercept, sample.price_slope, sample.playtime_slope
    );
    print_fit(&run);
    Ok(())
}

fn handle_show(args: &ShowArgs) -> Result<(), AppError> {
    let file = crate::io::result::read_result_json(&args.result)?;
    if let Some(subset) = &file.subset {
        println!("Subset: {subset}");
    }
    println!("{}", report::format_regression(&file.result));
    Ok(())
}

fn print_fit(run: &FitRun) {
    println!("{}", report::format_load_summary(&run.load.report));
    println!("{}", report::format_segment(&run.segment));
    println!("{}", report::format_regression(&run.result));
}

pub fn loader_config_from_args(args: &InputArgs) -> LoaderConfig {
    let strategy = match (args.impute_constant, args.impute) {
        (Some(c), _) => ImputeStrategy::Constant(c),
        (None, ImputeArg::Zero) => ImputeStrategy::Zero,
        (None, ImputeArg::Median) => ImputeStrategy::Median,
    };
    LoaderConfig {
        price_impute: strategy,
        playtime_impute: strategy,
        zero_reviews: args.zero_reviews,
        ..LoaderConfig::default()
    }
}

pub fn subset_from_args(args: &FitArgs) -> Subset {
    let years = match (args.min_year, args.max_year) {
        (None, None) => None,
        (lo, hi) => Some(lo.unwrap_or(i32::MIN)..=hi.unwrap_or(i32::MAX)),
    };
    let price = match (args.min_price, args.max_price) {
        (None, None) => None,
        (lo, hi) => Some((lo.unwrap_or(0.0), hi.unwrap_or(f64::INFINITY))),
    };
    let tag = match (&args.tag, &args.genre) {
        (Some(t), _) => Some((TagKind::Tag, t.clone())),
        (None, Some(g)) => Some((TagKind::Genre, g.clone())),
        (None, None) => None,
    };
    Subset { years, price, tag }
}

pub fn fit_options_from_args(args: &FitArgs) -> FitOptions {
    FitOptions {
        exclude_imputed: args.exclude_imputed,
        min_observations: args.min_observations,
        ..FitOptions::default()
    }
}
