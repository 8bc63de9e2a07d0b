//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the loading/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{RegressionResult, SegmentSummary, TagTrendRow};
use crate::io::ingest::LoadReport;

/// Format a fitted model: coefficient table, goodness of fit, residual diagnostics.
pub fn format_regression(result: &RegressionResult) -> String {
    let mut out = String::new();

    let predictors: Vec<&str> = result.predictors.iter().map(|p| p.name()).collect();
    out.push_str(&format!("=== OLS: {} ~ {} ===\n", result.response, predictors.join(" + ")));
    out.push_str(&format!(
        "Observations: n={} | excluded={} | df_resid={}\n\n",
        result.n_observations, result.n_excluded, result.df_residual
    ));

    out.push_str(
        format!(
            "{:<20} {:>12} {:>12} {:>10} {:>10}",
            "term", "estimate", "std_err", "t", "p_value"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<20} {:-<12} {:-<12} {:-<10} {:-<10}", "", "", "", "", "").trim_end());
    out.push('\n');
    for c in &result.coefficients {
        out.push_str(
            format!(
                "{:<20} {:>12} {:>12} {:>10} {:>10}",
                truncate(&c.name, 20),
                fmt_num(c.estimate, 6),
                fmt_num(c.std_err, 6),
                fmt_num(c.t_stat, 3),
                fmt_p(c.p_value),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&format!(
        "R²={} | adj R²={} | F={} (p={})\n",
        fmt_num(result.r_squared, 4),
        fmt_num(result.adj_r_squared, 4),
        fmt_num(result.f_statistic, 3),
        fmt_p(result.f_p_value),
    ));
    out.push_str(&format!(
        "logL={} | AIC={} | BIC={} | cond={}\n",
        fmt_num(result.log_likelihood, 3),
        fmt_num(result.aic, 3),
        fmt_num(result.bic, 3),
        fmt_num(result.condition_number, 2),
    ));

    let r = &result.residuals;
    out.push_str("\nResiduals:\n");
    out.push_str(&format!(
        "  min={} q1={} median={} q3={} max={}\n",
        fmt_num(r.min, 4),
        fmt_num(r.q1, 4),
        fmt_num(r.median, 4),
        fmt_num(r.q3, 4),
        fmt_num(r.max, 4),
    ));
    out.push_str(&format!(
        "  std_err={} rmse={} skew={} kurtosis={}\n",
        fmt_num(r.std_err, 4),
        fmt_num(r.rmse, 4),
        fmt_num(r.skew, 3),
        fmt_num(r.kurtosis, 3),
    ));
    out.push_str(&format!(
        "  durbin_watson={} jarque_bera={} (p={})\n",
        fmt_num(r.durbin_watson, 3),
        fmt_num(r.jarque_bera, 3),
        fmt_p(r.jarque_bera_p),
    ));

    out
}

/// One-paragraph summary of what the loader did.
pub fn format_load_summary(report: &LoadReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Records: read={} | used={} | skipped={}\n",
        report.records_read,
        report.records_used,
        report.skipped_count()
    ));
    out.push_str(&format!(
        "Imputed: price={} | playtime={} | zero-review rows={} | undated={}\n",
        report.price_imputed, report.playtime_imputed, report.zero_review_rows, report.undated_rows
    ));
    for w in report.skipped.iter().take(5) {
        out.push_str(&format!("  skipped {}: {}\n", truncate(&w.key, 16), w.message));
    }
    if report.skipped_count() > 5 {
        out.push_str(&format!("  ... and {} more\n", report.skipped_count() - 5));
    }
    out
}

/// Format the trend table as `(tag, bucket, count, mean playtime)` rows.
pub fn format_tag_trends(rows: &[TagTrendRow]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<6} {:<24} {:>6} {:>8} {:>14}", "kind", "tag", "bucket", "count", "mean_playtime").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<24} {:-<6} {:-<8} {:-<14}", "", "", "", "", "").trim_end());
    out.push('\n');
    for r in rows {
        out.push_str(
            format!(
                "{:<6} {:<24} {:>6} {:>8} {:>14.1}",
                r.kind.as_str(),
                truncate(&r.tag, 24),
                r.bucket,
                r.count,
                r.mean_playtime,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

pub fn format_top_tags(top: &[(String, usize)]) -> String {
    let mut out = String::new();
    for (rank, (tag, count)) in top.iter().enumerate() {
        out.push_str(&format!("{:>3}. {:<24} {count}\n", rank + 1, truncate(tag, 24)));
    }
    out
}

pub fn format_segment(summary: &SegmentSummary) -> String {
    let opt = |v: Option<f64>, digits: usize| v.map_or_else(|| "-".to_string(), |x| fmt_num(x, digits));
    format!(
        "Segment: products={} | mean price={} | median playtime (played)={} | mean score ratio={}\n",
        summary.products,
        opt(summary.mean_price, 2),
        opt(summary.median_playtime_played, 1),
        opt(summary.mean_score_ratio, 4),
    )
}

fn fmt_num(v: f64, digits: usize) -> String {
    if v.is_finite() {
        format!("{v:.digits$}")
    } else if v.is_nan() {
        "NaN".to_string()
    } else if v > 0.0 {
        "inf".to_string()
    } else {
        "-inf".to_string()
    }
}

fn fmt_p(p: f64) -> String {
    if p.is_finite() && p < 1e-4 {
        "<1e-4".to_string()
    } else {
        fmt_num(p, 4)
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
