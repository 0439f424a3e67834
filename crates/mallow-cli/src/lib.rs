//! Mallow CLI - batch front-end for the mallow schema migrator
//!
//! This crate owns everything `mallow-core` deliberately leaves out: finding
//! files, reading and writing them, loading `mallow.toml`, running files in
//! parallel and presenting diffs and reports.

pub mod config_file;
pub mod runner;

// Re-export commonly used types for convenience
pub use config_file::{load_config, ConfigSource, FileConfig, Overrides};
pub use runner::discover::Discovery;
pub use runner::output::{ColorChoice, ConsoleReporter, Reporter};
pub use runner::{Action, BatchSummary, FileOutcome, Runner};
