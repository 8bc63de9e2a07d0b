//! Mathematical utilities: least squares and descriptive statistics.

pub mod descriptive;
pub mod ols;

pub use ols::*;
