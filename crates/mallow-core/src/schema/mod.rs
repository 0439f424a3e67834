/*!
# Schema Detection

Finds the classes of a module that are marshmallow schemas. A class is a
schema when one of its positional bases has a simple name ending in the
configured suffix (`Schema` by default), or names another schema class
defined in the same file. The second rule is applied until nothing changes,
so `class C(B)` where `class B(A)` and `class A(Schema)` is found too.

Classes are searched at module level and inside class bodies and other
compound statements, but never inside function bodies.
*/

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::cst::{Module, Position, Statement, StatementPath};

pub mod patterns;

#[cfg(test)]
mod detector_tests;

pub use patterns::{field_call, FieldCall, PatternMatcher, StatementPattern, StatementWalker};

/// A class recognized as a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedSchema {
    pub name: String,
    /// Simple names of the positional bases
    pub bases: Vec<String>,
    pub path: StatementPath,
    pub position: Position,
}

/// A `name = fields.Constructor(...)` statement directly inside a schema body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldAssignment {
    pub name: String,
    pub constructor: String,
    pub path: StatementPath,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct SchemaDetector {
    config: DetectorConfig,
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl SchemaDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Whether a base name marks a schema on its own
    pub fn is_schema_base(&self, base: &str) -> bool {
        base.ends_with(&self.config.schema_suffix)
    }

    /// All schema classes of the module, in source order
    pub fn detect(&self, module: &Module) -> Vec<DetectedSchema> {
        let classes = StatementWalker::find_all_outside(
            module,
            &PatternMatcher::class_def(),
            &PatternMatcher::function_def(),
        );

        let mut schema_names: HashSet<&str> = HashSet::new();
        let mut is_schema = vec![false; classes.len()];
        loop {
            let mut changed = false;
            for (index, (_, statement)) in classes.iter().enumerate() {
                let Some(class) = statement.as_class() else {
                    continue;
                };
                if is_schema[index] {
                    continue;
                }
                let qualifies = class.bases.iter().any(|base| {
                    self.is_schema_base(base) || schema_names.contains(base.as_str())
                });
                if qualifies {
                    is_schema[index] = true;
                    schema_names.insert(class.name.as_str());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let detected: Vec<DetectedSchema> = classes
            .iter()
            .zip(is_schema)
            .filter(|(_, schema)| *schema)
            .filter_map(|((path, statement), _)| {
                let class = statement.as_class()?;
                Some(DetectedSchema {
                    name: class.name.clone(),
                    bases: class.bases.clone(),
                    path: path.clone(),
                    position: statement.position(),
                })
            })
            .collect();
        debug!(
            classes = classes.len(),
            schemas = detected.len(),
            "schema detection finished"
        );
        detected
    }

    /// Field assignments directly in the body of a detected schema
    pub fn field_assignments(
        &self,
        module: &Module,
        schema: &DetectedSchema,
    ) -> Vec<FieldAssignment> {
        let Some(Statement::Class(class)) = module.statement(&schema.path) else {
            return Vec::new();
        };
        StatementWalker::find_in_body(
            &class.block.body,
            &schema.path,
            &PatternMatcher::field_assignment(&self.config),
        )
        .into_iter()
        .filter_map(|(path, statement)| {
            let call = field_call(&statement.as_simple()?.items)?;
            Some(FieldAssignment {
                name: call.target.text.clone(),
                constructor: call.constructor().to_string(),
                path,
                position: statement.position(),
            })
        })
        .collect()
    }
}
