//! Input/output helpers.
//!
//! - snapshot JSON ingest + normalization (`ingest`)
//! - coefficient and trend CSV exports (`export`)
//! - result JSON read/write (`result`)

pub mod export;
pub mod ingest;
pub mod result;

pub use export::*;
pub use ingest::*;
pub use result::*;
