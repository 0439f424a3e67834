/*!
# Pipeline

One file's trip through the crate: parse, detect schema classes, rewrite
their field calls, mark fields for the printer, print. A pipeline holds only
immutable configuration, so one instance can serve many files from many
threads.
*/

use serde::Serialize;
use tracing::debug;

use crate::config::{MallowConfig, PrintMode};
use crate::diff::unified_diff;
use crate::parser::parse;
use crate::printer::print;
use crate::rewrite::{mark_fields, RewriteReport, Rewriter};
use crate::schema::SchemaDetector;

/// Result of running the pipeline over one source text
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub text: String,
    pub report: RewriteReport,
    /// Whether `text` differs from the input
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: MallowConfig,
    detector: SchemaDetector,
}

impl Pipeline {
    pub fn new(config: MallowConfig) -> Self {
        let detector = SchemaDetector::new(config.detector.clone());
        Self { config, detector }
    }

    pub fn run(&self, source: &str) -> crate::Result<PipelineOutput> {
        self.run_file(source, None)
    }

    /// Like [`Pipeline::run`], naming `file` in log events and warnings
    ///
    /// Fails with [`MallowError::Syntax`](crate::MallowError::Syntax) when the
    /// source does not parse and with
    /// [`MallowError::Config`](crate::MallowError::Config) when the
    /// configuration is rejected.
    pub fn run_file(&self, source: &str, file: Option<&str>) -> crate::Result<PipelineOutput> {
        let mut module = parse(source)?;
        debug!(file, statements = module.body.len(), "parsed");

        let schemas = self.detector.detect(&module);
        debug!(file, schemas = schemas.len(), "detected schemas");

        let mut rewriter = Rewriter::from_config(&self.config)?;
        if let Some(file) = file {
            rewriter = rewriter.with_source_file(file.to_string());
        }
        let report = rewriter.rewrite(&mut module, &schemas);
        debug!(
            file,
            edits = report.edits.len(),
            warnings = report.warnings.len(),
            "rewrote fields"
        );

        let reformat = self.config.format_fields && self.config.style.mode == PrintMode::Preserve;
        mark_fields(
            &mut module,
            &schemas,
            &self.config.detector,
            &self.config.migration.destination,
            reformat,
        );

        let text = print(&module, &self.config.style);
        let changed = text != source;
        debug!(file, changed, bytes = text.len(), "printed");
        Ok(PipelineOutput {
            text,
            report,
            changed,
        })
    }

    /// Unified diff of what [`Pipeline::run`] would write, labelled `a/<label>` and `b/<label>`
    pub fn diff(&self, source: &str, label: &str) -> crate::Result<String> {
        let output = self.run_file(source, Some(label))?;
        Ok(unified_diff(
            source,
            &output.text,
            &format!("a/{label}"),
            &format!("b/{label}"),
        ))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(MallowConfig::default())
    }
}
