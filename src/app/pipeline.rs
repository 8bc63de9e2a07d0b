//! Shared analysis pipeline used by the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> subset -> complete cases -> OLS -> report
//!
//! The command handlers can then focus on presentation (printing and exports).

use std::collections::BTreeSet;

use tracing::info;

use crate::data::{SampleConfig, Subset, generate_catalog};
use crate::domain::{FitOptions, RegressionResult, RegressionSpec, SegmentSummary, TagKind, TagTrendRow, TrendOptions};
use crate::error::AppError;
use crate::fit::AnalyticsEngine;
use crate::io::ingest::{LoadOutput, Loader};
use crate::report::{segment_summary, tag_trends, top_tags};

/// All computed outputs of a single fit run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub load: LoadOutput,
    pub subset: Subset,
    pub segment: SegmentSummary,
    pub result: RegressionResult,
}

/// All computed outputs of a single trends run.
#[derive(Debug, Clone)]
pub struct TrendRun {
    pub load: LoadOutput,
    /// Labels being tracked, with their overall product counts.
    pub tracked: Vec<(String, usize)>,
    pub rows: Vec<TagTrendRow>,
}

/// How the labels of a trend table are chosen.
#[derive(Debug, Clone)]
pub enum TagSelection {
    Top(usize),
    Named(BTreeSet<String>),
}

/// Filter an already loaded table and fit `spec` on the remaining rows.
///
/// The loaded table is only borrowed; refitting a different subset does not reload.
pub fn run_fit(
    load: LoadOutput,
    subset: Subset,
    spec: &RegressionSpec,
    options: FitOptions,
) -> Result<FitRun, AppError> {
    subset.validate()?;

    let rows = subset.apply(&load.products, &load.associations);
    info!(subset = %subset, rows = rows.len(), "Selected rows");

    let segment = segment_summary(rows.iter().copied());
    let result = AnalyticsEngine::new(options).fit(rows, spec)?;

    Ok(FitRun {
        load,
        subset,
        segment,
        result,
    })
}

/// Track tag counts over time for the chosen labels.
pub fn run_trends(load: LoadOutput, kind: TagKind, selection: TagSelection, options: TrendOptions) -> TrendRun {
    let tracked = match selection {
        TagSelection::Top(n) => top_tags(&load.associations, kind, n),
        TagSelection::Named(names) => {
            let all = top_tags(&load.associations, kind, usize::MAX);
            all.into_iter().filter(|(tag, _)| names.contains(tag)).collect()
        }
    };

    let options = TrendOptions {
        kind: Some(kind),
        tags: Some(tracked.iter().map(|(tag, _)| tag.clone()).collect()),
        ..options
    };
    let rows = tag_trends(&load.products, &load.associations, &options);

    TrendRun { load, tracked, rows }
}

/// Generate a synthetic catalog, load it, and fit the default price/playtime model.
pub fn run_demo(sample: &SampleConfig) -> Result<FitRun, AppError> {
    let raw = generate_catalog(sample)?;
    let load = Loader::default().load_value(raw)?;
    run_fit(load, Subset::default(), &RegressionSpec::price_playtime(), FitOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(count: usize) -> LoadOutput {
        let cfg = SampleConfig {
            count,
            ..SampleConfig::default()
        };
        Loader::default().load_value(generate_catalog(&cfg).unwrap()).unwrap()
    }

    #[test]
    fn demo_run_fits_three_coefficients() {
        let run = run_demo(&SampleConfig {
            count: 120,
            ..SampleConfig::default()
        })
        .unwrap();
        assert_eq!(run.result.coefficients.len(), 3);
        assert_eq!(run.segment.products, 120);
        assert_eq!(run.result.n_observations, 120);
    }

    #[test]
    fn subset_refit_uses_fewer_rows() {
        let load = synthetic(300);
        let subset = Subset {
            price: Some((0.0, 20.0)),
            ..Subset::default()
        };
        let run = run_fit(load, subset, &RegressionSpec::price_playtime(), FitOptions::default()).unwrap();
        assert!(run.segment.products < 300);
        assert_eq!(run.result.n_observations + run.result.n_excluded, run.segment.products);
    }

    #[test]
    fn empty_subset_is_insufficient_data() {
        let load = synthetic(50);
        let subset = Subset {
            years: Some(1990..=1991),
            ..Subset::default()
        };
        let err = run_fit(load, subset, &RegressionSpec::price_playtime(), FitOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData { available: 0, .. }));
    }

    #[test]
    fn trends_track_requested_labels_only() {
        let load = synthetic(200);
        let names: BTreeSet<String> = ["Indie".to_string(), "Nonexistent".to_string()].into_iter().collect();
        let run = run_trends(load, TagKind::Tag, TagSelection::Named(names), TrendOptions::default());

        assert_eq!(run.tracked.len(), 1);
        assert_eq!(run.tracked[0].0, "Indie");
        assert!(run.rows.iter().all(|r| r.tag == "Indie" && r.kind == TagKind::Tag));
        let total: usize = run.rows.iter().map(|r| r.count).sum();
        assert_eq!(total, run.tracked[0].1);
    }

    #[test]
    fn top_n_trends_are_bounded() {
        let run = run_trends(synthetic(200), TagKind::Genre, TagSelection::Top(2), TrendOptions::default());
        assert_eq!(run.tracked.len(), 2);
        assert!(run.rows.iter().all(|r| run.tracked.iter().any(|(t, _)| *t == r.tag)));
    }
}
