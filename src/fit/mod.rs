//! Regression fitting.
//!
//! Responsibilities:
//!
//! - extract complete cases for a `RegressionSpec`
//! - solve OLS and derive coefficient inference (`engine`)
//! - summarize residuals (`diagnostics`)

pub mod diagnostics;
pub mod engine;

pub use diagnostics::*;
pub use engine::*;
