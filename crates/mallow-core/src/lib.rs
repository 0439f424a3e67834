//! # Mallow Core
//!
//! Core implementation of the mallow schema migrator, including:
//! - A lossless concrete syntax tree for Python source
//! - A hand-written tokenizer and parser that keeps every byte of trivia
//! - Schema class detection by base-name heuristic
//! - Rule-based rewriting of marshmallow field constructor calls
//! - A canonical printer with a byte-preserving mode
//! - Unified diff rendering
//!
//! The crate never touches the filesystem. Front-ends (the `mallow` CLI,
//! editor integrations, tests) hand it source text and receive text back.

#![warn(clippy::all)]

pub mod config;
pub mod cst;
pub mod diff;
pub mod parser;
pub mod pipeline;
pub mod printer;
pub mod rewrite;
pub mod schema;

// Re-export commonly used types
pub use config::{
    DetectorConfig, KeywordSelection, MallowConfig, MigrationRule, PrintMode, StyleConfig,
};
pub use cst::{Element, Group, GroupKind, Item, Module, Position, Statement, StatementPath, Token};
pub use diff::unified_diff;
pub use parser::{parse, SyntaxError};
pub use pipeline::{Pipeline, PipelineOutput};
pub use printer::print;
pub use rewrite::{
    RewriteEdit, RewriteReport, Rewriter, UnsupportedPatternWarning, WarningKind,
};
pub use schema::{DetectedSchema, SchemaDetector};

/// Mallow version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for mallow components
///
/// Covers the core and the CLI crate. `verbose` lowers their level from
/// `info` to `debug`; `RUST_LOG` adds directives for everything else.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in ["mallow_core", "mallow_cli"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }
    // A second call (tests, embedding) must not panic.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Error types for mallow core operations
#[derive(thiserror::Error, Debug)]
pub enum MallowError {
    /// Source did not parse
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rewrite could not be undone
    #[error("Rewrite error: {0}")]
    Rewrite(#[from] anyhow::Error),
}

/// Result type for mallow core operations
pub type Result<T> = std::result::Result<T, MallowError>;
