//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - loader configuration (`LoaderConfig`, `ImputeStrategy`, `ZeroReviewPolicy`)
//! - normalized catalog rows (`ProductRow`, `TagAssociationRow`)
//! - regression inputs and outputs (`NumericField`, `RegressionSpec`, `RegressionResult`)
//! - aggregation outputs (`TagTrendRow`, `SegmentSummary`)

pub mod float_repr;
pub mod types;

pub use types::*;
