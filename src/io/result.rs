//! Read/write regression result JSON files.
//!
//! The JSON file is the portable form of a fit that an external renderer
//! consumes: the `RegressionResult` plus the subset it was fitted on.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::RegressionResult;
use crate::error::AppError;

/// On-disk wrapper around a `RegressionResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub tool: String,
    /// Human-readable description of the row filter, if any.
    pub subset: Option<String>,
    pub result: RegressionResult,
}

/// Write a result JSON file.
pub fn write_result_json(path: &Path, result: &RegressionResult, subset: Option<&str>) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| AppError::export(path, format!("cannot create file: {e}")))?;

    let doc = ResultFile {
        tool: env!("CARGO_PKG_NAME").to_string(),
        subset: subset.map(str::to_string),
        result: result.clone(),
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &doc).map_err(|e| AppError::export(path, e))?;
    Ok(())
}

/// Read a result JSON file.
pub fn read_result_json(path: &Path) -> Result<ResultFile, AppError> {
    let file = File::open(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::schema("a regression result JSON file", e.to_string()))
}
