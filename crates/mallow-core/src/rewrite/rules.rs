/*!
# Rewrite Rules

Core trait and bookkeeping for rules that edit the argument list of one
field constructor call.
*/

use crate::cst::{Group, Position, StatementPath};

use super::{RewriteContext, RewriteResult, UnsupportedPatternWarning};

/// The call a rule is asked about
#[derive(Debug, Clone, Copy)]
pub struct FieldSite<'a> {
    pub class_name: &'a str,
    pub field_name: &'a str,
    /// Simple name of the constructor being called
    pub constructor: &'a str,
    pub position: Position,
    pub path: &'a StatementPath,
    /// Steps from the field's own call down to this one; empty at the top
    pub call_path: &'a [(usize, usize)],
}

impl FieldSite<'_> {
    pub fn is_nested(&self) -> bool {
        !self.call_path.is_empty()
    }

    /// Warning about this site
    pub fn warn(
        &self,
        kind: super::WarningKind,
        message: impl Into<String>,
    ) -> UnsupportedPatternWarning {
        UnsupportedPatternWarning {
            kind,
            class_name: self.class_name.to_string(),
            field_name: self.field_name.to_string(),
            position: self.position,
            message: message.into(),
        }
    }
}

/// What one rule application did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    pub changed: bool,
    /// Keyword names that moved, in their original order
    pub migrated: Vec<String>,
    pub destination: Option<String>,
    pub created_destination: bool,
    pub warnings: Vec<UnsupportedPatternWarning>,
}

impl RuleOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: RuleOutcome) {
        self.changed |= other.changed;
        self.migrated.extend(other.migrated);
        if other.destination.is_some() {
            self.destination = other.destination;
        }
        self.created_destination |= other.created_destination;
        self.warnings.extend(other.warnings);
    }
}

/// Core trait for rewrite rules
///
/// A rule sees one call's argument group at a time. It may reorder, add or
/// remove elements but must leave the group a valid argument list.
pub trait RewriteRule: Send + Sync {
    /// Human-readable name for this rule
    fn name(&self) -> &'static str;

    /// Detailed description of what this rule does
    fn description(&self) -> &'static str;

    /// Priority for rule ordering (higher priority runs first)
    fn priority(&self) -> u32 {
        100
    }

    /// Check if this rule applies to the given call
    fn matches(&self, site: &FieldSite<'_>, context: &RewriteContext) -> bool;

    /// Apply the rule to the call's arguments in place
    fn apply(
        &self,
        arguments: &mut Group,
        site: &FieldSite<'_>,
        context: &RewriteContext,
    ) -> RewriteResult<RuleOutcome>;

    /// Keyword argument this rule fills in, which nested rewriting skips
    fn destination(&self) -> Option<&str> {
        None
    }

    /// Optional validation of the rewritten arguments
    fn validate(&self, original: &Group, rewritten: &Group) -> RewriteResult<()> {
        let _ = (original, rewritten);
        Ok(())
    }

    /// Check if this rule conflicts with another rule
    fn conflicts_with(&self, other: &dyn RewriteRule) -> bool {
        let _ = other;
        false
    }
}

/// Rule execution statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleStats {
    pub rule_name: String,
    pub applications: u64,
    pub transformations: u64,
    pub errors: u64,
    pub warnings: u64,
}

impl RuleStats {
    pub fn new(rule_name: String) -> Self {
        Self {
            rule_name,
            ..Self::default()
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.applications == 0 {
            0.0
        } else {
            (self.transformations as f64) / (self.applications as f64)
        }
    }
}
