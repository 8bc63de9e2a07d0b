//! CSV exports of fit and trend results.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::domain::{RegressionResult, TagTrendRow};
use crate::error::AppError;

/// Write one row per coefficient, plus the model-level statistics repeated per row.
pub fn write_coefficients_csv(path: &Path, result: &RegressionResult) -> Result<(), AppError> {
    let mut file = create(path)?;
    let write_err = |e: std::io::Error| AppError::export(path, e);

    writeln!(file, "term,estimate,std_err,t_stat,p_value,response,n_observations,r_squared,adj_r_squared")
        .map_err(write_err)?;
    for c in &result.coefficients {
        writeln!(
            file,
            "{},{:.10},{:.10},{:.6},{:.6e},{},{},{:.6},{:.6}",
            csv_field(&c.name),
            c.estimate,
            c.std_err,
            c.t_stat,
            c.p_value,
            result.response,
            result.n_observations,
            result.r_squared,
            result.adj_r_squared,
        )
        .map_err(write_err)?;
    }
    file.flush().map_err(write_err)?;

    info!(path = %path.display(), rows = result.coefficients.len(), "Wrote coefficient CSV");
    Ok(())
}

/// Write the `(kind, tag, bucket, count, mean_playtime)` trend table.
pub fn write_trends_csv(path: &Path, rows: &[TagTrendRow]) -> Result<(), AppError> {
    let mut file = create(path)?;
    let write_err = |e: std::io::Error| AppError::export(path, e);

    writeln!(file, "kind,tag,bucket,count,mean_playtime").map_err(write_err)?;
    for r in rows {
        writeln!(
            file,
            "{},{},{},{},{:.4}",
            r.kind.as_str(),
            csv_field(&r.tag),
            r.bucket,
            r.count,
            r.mean_playtime
        )
        .map_err(write_err)?;
    }
    file.flush().map_err(write_err)?;

    info!(path = %path.display(), rows = rows.len(), "Wrote trend CSV");
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>, AppError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::export(path, format!("cannot create file: {e}")))
}

/// Quote a field when it contains a delimiter, quote or newline.
fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
