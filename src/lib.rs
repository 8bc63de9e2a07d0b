//! `steam-insights` library crate.
//!
//! The binary (`steam-insights`) is a thin wrapper around this library so that:
//!
//! - the loader and the analytics engine are testable without spawning processes
//! - a dashboard or notebook front-end can call the same pipeline
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod report;
