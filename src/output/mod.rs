//! Output module for reporting on stored articles
//!
//! This module handles displaying per-website statistics read back from the
//! article database.

pub mod stats;

pub use stats::{load_statistics, print_statistics, WebsiteStatistics};
