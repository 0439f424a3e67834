/*!
# Field Rewriting

Applies [`RewriteRule`]s to the field constructor calls of detected schema
classes. Every call a rule changes is recorded as a [`RewriteEdit`] holding
the argument list before and after, so a report can be reverted exactly.

With nested rewriting enabled, field constructors that appear inside
another field's arguments (`fields.List(fields.String(...))`) are visited
too, after their enclosing call.
*/

use std::collections::HashMap;

use anyhow::{anyhow, bail};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{DetectorConfig, MallowConfig};
use crate::MallowError;
use crate::cst::{Group, GroupKind, Item, Module, Position, Statement, StatementPath};
use crate::schema::patterns::{field_call, field_call_arguments_mut, nested_constructor};
use crate::schema::DetectedSchema;

pub mod metadata;
pub mod rules;


pub use metadata::MetadataMigration;
pub use rules::{FieldSite, RewriteRule, RuleOutcome, RuleStats};

// Common result type for rewrite rules
pub type RewriteResult<T> = anyhow::Result<T>;

#[derive(Debug, Clone)]
pub struct RewriteContext {
    pub source_file: Option<String>,
    pub class_name: Option<String>,
    pub current_depth: usize,
    pub max_depth: usize,
}

impl Default for RewriteContext {
    fn default() -> Self {
        Self {
            source_file: None,
            class_name: None,
            current_depth: 0,
            max_depth: 32,
        }
    }
}

impl RewriteContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_file(mut self, file: String) -> Self {
        self.source_file = Some(file);
        self
    }

    pub fn with_class_name(mut self, name: String) -> Self {
        self.class_name = Some(name);
        self
    }

    pub fn descend(&self) -> Self {
        Self {
            source_file: self.source_file.clone(),
            class_name: self.class_name.clone(),
            current_depth: self.current_depth + 1,
            max_depth: self.max_depth,
        }
    }

    pub fn at_max_depth(&self) -> bool {
        self.current_depth >= self.max_depth
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// `**mapping` in a field call
    UnpackedKeywords,
    /// A migrated key was already present in the destination
    DuplicateKey,
    /// The destination argument is not a literal mapping
    OpaqueDestination,
}

/// A construct the rewriter saw but would not change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsupportedPatternWarning {
    pub kind: WarningKind,
    pub class_name: String,
    pub field_name: String,
    pub position: Position,
    pub message: String,
}

impl std::fmt::Display for UnsupportedPatternWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}.{}: {}",
            self.position, self.class_name, self.field_name, self.message
        )
    }
}

/// One changed call
#[derive(Debug, Clone, Serialize)]
pub struct RewriteEdit {
    pub class_name: String,
    pub field_name: String,
    pub constructor: String,
    pub position: Position,
    pub migrated: Vec<String>,
    pub destination: Option<String>,
    pub created_destination: bool,
    /// Statement holding the field assignment
    pub path: StatementPath,
    /// `(element, item)` steps from the field's call to the changed call
    pub call_path: Vec<(usize, usize)>,
    #[serde(skip)]
    pub before: Group,
    #[serde(skip)]
    pub after: Group,
    #[serde(skip)]
    reformat_before: bool,
}

/// Everything one rewrite pass did
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteReport {
    pub schemas: usize,
    pub fields_visited: usize,
    pub edits: Vec<RewriteEdit>,
    pub warnings: Vec<UnsupportedPatternWarning>,
}

impl RewriteReport {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.warnings.is_empty()
    }

    pub fn changed(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Total number of keyword arguments moved
    pub fn migrated_count(&self) -> usize {
        self.edits.iter().map(|edit| edit.migrated.len()).sum()
    }
}

/// Rule-driven rewriting engine
pub struct Rewriter {
    rules: Vec<Box<dyn RewriteRule>>,
    stats: HashMap<String, RuleStats>,
    detector: DetectorConfig,
    context: RewriteContext,
}

impl Rewriter {
    pub fn new(detector: DetectorConfig) -> Self {
        Self {
            rules: Vec::new(),
            stats: HashMap::new(),
            detector,
            context: RewriteContext::new(),
        }
    }

    /// Rewriter with the rules a configuration enables
    ///
    /// Fails with [`MallowError::Config`] when the configuration is invalid or
    /// its rules cannot be installed together.
    pub fn from_config(config: &MallowConfig) -> crate::Result<Self> {
        config.validate()?;
        let mut rewriter = Self::new(config.detector.clone());
        if config.migration.enabled {
            let migration = MetadataMigration::new(config.migration.clone());
            rewriter
                .add_rule(Box::new(migration))
                .map_err(|e| MallowError::Config(format!("{e:#}")))?;
        }
        Ok(rewriter)
    }

    pub fn with_source_file(mut self, file: String) -> Self {
        self.context = self.context.with_source_file(file);
        self
    }

    /// Add a rule, keeping rules sorted by priority (higher first)
    pub fn add_rule(&mut self, rule: Box<dyn RewriteRule>) -> RewriteResult<()> {
        if let Some(existing) = self.rules.iter().find(|existing| {
            existing.conflicts_with(rule.as_ref()) || rule.conflicts_with(existing.as_ref())
        }) {
            bail!("rule `{}` conflicts with `{}`", rule.name(), existing.name());
        }
        self.stats
            .insert(rule.name().to_string(), RuleStats::new(rule.name().to_string()));
        self.rules.push(rule);
        self.rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority()));
        Ok(())
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn RewriteRule> {
        self.rules.iter().map(|rule| rule.as_ref())
    }

    pub fn stats(&self) -> &HashMap<String, RuleStats> {
        &self.stats
    }

    /// Rewrite every field call of the given schemas in place
    pub fn rewrite(&mut self, module: &mut Module, schemas: &[DetectedSchema]) -> RewriteReport {
        let mut report = RewriteReport {
            schemas: schemas.len(),
            ..RewriteReport::default()
        };
        if self.rules.is_empty() {
            return report;
        }

        for schema in schemas {
            let context = self.context.clone().with_class_name(schema.name.clone());
            let Some(Statement::Class(class)) = module.statement_mut(&schema.path) else {
                continue;
            };
            for (index, statement) in class.block.body.iter_mut().enumerate() {
                let Statement::Simple(simple) = statement else {
                    continue;
                };
                let Some(call) = field_call(&simple.items) else {
                    continue;
                };
                let constructor = call.constructor().to_string();
                if !self.detector.is_field_constructor(&constructor) {
                    continue;
                }
                let field_name = call.target.text.clone();
                let position = call.target.position;
                let reformat_before = simple.reformat;
                let Some(arguments) = field_call_arguments_mut(&mut simple.items) else {
                    continue;
                };

                report.fields_visited += 1;
                let path = schema.path.child(index);
                let edits_before = report.edits.len();
                self.rewrite_call(
                    arguments,
                    &CallTarget {
                        class_name: &schema.name,
                        field_name: &field_name,
                        constructor: &constructor,
                        position,
                        path: &path,
                        reformat_before,
                    },
                    Vec::new(),
                    &context,
                    &mut report,
                );
                if report.edits.len() > edits_before {
                    simple.reformat = true;
                }
            }
        }

        debug!(
            schemas = report.schemas,
            fields = report.fields_visited,
            edits = report.edits.len(),
            warnings = report.warnings.len(),
            "rewrite pass finished"
        );
        report
    }

    fn rewrite_call(
        &mut self,
        arguments: &mut Group,
        target: &CallTarget<'_>,
        call_path: Vec<(usize, usize)>,
        context: &RewriteContext,
        report: &mut RewriteReport,
    ) {
        let site = FieldSite {
            class_name: target.class_name,
            field_name: target.field_name,
            constructor: target.constructor,
            position: target.position,
            path: target.path,
            call_path: &call_path,
        };
        let before = arguments.clone();
        let mut outcome = RuleOutcome::unchanged();

        for rule in &self.rules {
            if !rule.matches(&site, context) {
                continue;
            }
            let stats = self
                .stats
                .entry(rule.name().to_string())
                .or_insert_with(|| RuleStats::new(rule.name().to_string()));
            stats.applications += 1;

            let snapshot = arguments.clone();
            let applied = rule
                .apply(arguments, &site, context)
                .and_then(|result| rule.validate(&snapshot, arguments).map(|()| result));
            match applied {
                Ok(result) => {
                    if result.changed {
                        stats.transformations += 1;
                    }
                    stats.warnings += result.warnings.len() as u64;
                    outcome.merge(result);
                }
                Err(e) => {
                    stats.errors += 1;
                    *arguments = snapshot;
                    warn!(
                        rule = rule.name(),
                        class = target.class_name,
                        field = target.field_name,
                        error = %e,
                        "rule failed, call left unchanged"
                    );
                }
            }
        }

        report.warnings.append(&mut outcome.warnings);
        if outcome.changed && *arguments != before {
            report.edits.push(RewriteEdit {
                class_name: target.class_name.to_string(),
                field_name: target.field_name.to_string(),
                constructor: target.constructor.to_string(),
                position: target.position,
                migrated: outcome.migrated,
                destination: outcome.destination,
                created_destination: outcome.created_destination,
                path: target.path.clone(),
                call_path: call_path.clone(),
                before,
                after: arguments.clone(),
                reformat_before: target.reformat_before,
            });
        }

        if !self.detector.rewrite_nested || context.at_max_depth() {
            return;
        }
        let skip: Vec<String> = self
            .rules
            .iter()
            .filter_map(|rule| rule.destination().map(str::to_string))
            .collect();
        for (steps, constructor) in nested_field_calls(arguments, &self.detector, &skip) {
            let Some(nested) = group_at_mut(arguments, &steps) else {
                continue;
            };
            let position = nested.open.position;
            let mut nested_path = call_path.clone();
            nested_path.extend(steps);
            self.rewrite_call(
                nested,
                &CallTarget {
                    constructor: &constructor,
                    position,
                    ..*target
                },
                nested_path,
                &context.descend(),
                report,
            );
        }
    }

    /// Undo every edit of a report, newest first
    ///
    /// Fails with [`MallowError::Rewrite`], without changing anything further,
    /// when the tree no longer holds the rewritten argument list an edit expects.
    pub fn revert(module: &mut Module, report: &RewriteReport) -> crate::Result<()> {
        for edit in report.edits.iter().rev() {
            let statement = module
                .statement_mut(&edit.path)
                .and_then(Statement::as_simple_mut)
                .ok_or_else(|| anyhow!("no statement at {:?}", edit.path.0))?;
            let top = field_call_arguments_mut(&mut statement.items)
                .ok_or_else(|| anyhow!("{} is no longer a field call", edit.field_name))?;
            let arguments = group_at_mut(top, &edit.call_path)
                .ok_or_else(|| anyhow!("call path of {} no longer resolves", edit.field_name))?;
            if *arguments != edit.after {
                return Err(anyhow!(
                    "{}.{} changed since it was rewritten",
                    edit.class_name,
                    edit.field_name
                )
                .into());
            }
            *arguments = edit.before.clone();
            if edit.call_path.is_empty() {
                statement.reformat = edit.reformat_before;
            }
        }
        Ok(())
    }
}

/// Where a call sits, shared by a field's call and the calls nested in it
#[derive(Clone, Copy)]
struct CallTarget<'a> {
    class_name: &'a str,
    field_name: &'a str,
    constructor: &'a str,
    position: Position,
    path: &'a StatementPath,
    reformat_before: bool,
}

/// Field constructor calls anywhere inside `group`'s elements, outermost only
fn nested_field_calls(
    group: &Group,
    detector: &DetectorConfig,
    skip_keywords: &[String],
) -> Vec<(Vec<(usize, usize)>, String)> {
    let mut found = Vec::new();
    collect_nested(group, detector, skip_keywords, &mut Vec::new(), &mut found);
    found
}

fn collect_nested(
    group: &Group,
    detector: &DetectorConfig,
    skip_keywords: &[String],
    steps: &mut Vec<(usize, usize)>,
    found: &mut Vec<(Vec<(usize, usize)>, String)>,
) {
    for (element_index, element) in group.elements.iter().enumerate() {
        if element
            .keyword_name()
            .is_some_and(|name| skip_keywords.iter().any(|skip| skip == name))
        {
            continue;
        }
        for (item_index, item) in element.items.iter().enumerate() {
            let Item::Group(inner) = item else {
                continue;
            };
            steps.push((element_index, item_index));
            match nested_constructor(&element.items, item_index, detector) {
                Some(constructor) if inner.kind == GroupKind::Call => {
                    found.push((steps.clone(), constructor.to_string()));
                }
                _ => collect_nested(inner, detector, &[], steps, found),
            }
            steps.pop();
        }
    }
}

/// Follow `(element, item)` steps down from `group`
fn group_at_mut<'a>(group: &'a mut Group, steps: &[(usize, usize)]) -> Option<&'a mut Group> {
    let mut current = group;
    for &(element, item) in steps {
        current = current
            .elements
            .get_mut(element)?
            .items
            .get_mut(item)?
            .as_group_mut()?;
    }
    Some(current)
}

/// Mark every field statement of the schemas for canonical rendering
///
/// `reformat` makes preserve mode re-render the statement; the call group
/// and a dict destination become eligible for key sorting either way.
pub fn mark_fields(
    module: &mut Module,
    schemas: &[DetectedSchema],
    detector: &DetectorConfig,
    destination: &str,
    reformat: bool,
) {
    for schema in schemas {
        let Some(Statement::Class(class)) = module.statement_mut(&schema.path) else {
            continue;
        };
        for statement in &mut class.block.body {
            let Statement::Simple(simple) = statement else {
                continue;
            };
            let is_field = field_call(&simple.items)
                .is_some_and(|call| detector.is_field_constructor(call.constructor()));
            if !is_field {
                continue;
            }
            if reformat {
                simple.reformat = true;
            }
            if let Some(arguments) = field_call_arguments_mut(&mut simple.items) {
                arguments.canonical_order = true;
                if let Some(index) = arguments.keyword_index(destination) {
                    if let Some(Item::Group(mapping)) = arguments.elements[index].items.get_mut(2) {
                        if mapping.kind == GroupKind::Brace {
                            mapping.canonical_order = true;
                        }
                    }
                }
            }
        }
    }
}
