//! Analysis modules.
//!
//! Per-entry analysis, its failure taxonomy, and aggregation of the
//! results of a whole run.

pub mod aggregator;
pub mod analyzer;
pub mod errors;

pub use aggregator::*;
pub use analyzer::{try_analyze_log, ContentAnalyzer, SimulatedAnalyzer};
pub use errors::AnalysisError;
