//! Data sources other than a real snapshot, and row selection.

pub mod sample;
pub mod subset;

pub use sample::*;
pub use subset::*;
