//! Run configuration
//!
//! Every knob the rewriter and printer read lives here as an immutable value.
//! All structs deserialize from kebab-case keys so that a `mallow.toml` or a
//! `[tool.mallow]` table maps onto them directly.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::MallowError;

/// How the printer treats statements the rewriter did not touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrintMode {
    /// Re-render every statement in canonical style
    #[default]
    Canonical,
    /// Reproduce untouched statements byte-for-byte
    Preserve,
}

/// Printer style, fixed for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StyleConfig {
    /// Target line width in display columns
    pub line_length: usize,
    /// Spaces per indentation level
    pub indent_size: usize,
    pub mode: PrintMode,
    /// Normalize string prefixes and quote characters
    pub normalize_quotes: bool,
    /// Keep single quotes when double quotes would need more escapes
    pub prefer_fewer_escapes: bool,
    /// Sort keyword arguments and mapping keys of schema fields
    pub sort_keys: bool,
    /// Add trailing commas to exploded brackets and honour magic trailing commas
    pub trailing_commas: bool,
    /// Re-wrap long plain strings at whitespace boundaries
    pub wrap_strings: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            line_length: 80,
            indent_size: 4,
            mode: PrintMode::Canonical,
            normalize_quotes: true,
            prefer_fewer_escapes: true,
            sort_keys: false,
            trailing_commas: true,
            wrap_strings: true,
        }
    }
}

impl StyleConfig {
    pub fn indent_unit(&self) -> String {
        " ".repeat(self.indent_size)
    }
}

/// Which keyword arguments move into the destination mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SelectionSpec", into = "SelectionSpec")]
pub enum KeywordSelection {
    /// Every keyword that is not a parameter of the called field constructor
    #[default]
    NonCore,
    /// Exactly these keyword names
    Named(BTreeSet<String>),
}

impl KeywordSelection {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeywordSelection::Named(names.into_iter().map(Into::into).collect())
    }
}

/// On-disk form: `migrate = "non-core"`, `migrate = "description"` or a list
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SelectionSpec {
    One(String),
    Many(Vec<String>),
}

impl From<SelectionSpec> for KeywordSelection {
    fn from(spec: SelectionSpec) -> Self {
        match spec {
            SelectionSpec::One(name) if name == "non-core" => KeywordSelection::NonCore,
            SelectionSpec::One(name) => KeywordSelection::named([name]),
            SelectionSpec::Many(names) => KeywordSelection::named(names),
        }
    }
}

impl From<KeywordSelection> for SelectionSpec {
    fn from(selection: KeywordSelection) -> Self {
        match selection {
            KeywordSelection::NonCore => SelectionSpec::One("non-core".to_string()),
            KeywordSelection::Named(names) => SelectionSpec::Many(names.into_iter().collect()),
        }
    }
}

/// Keyword migration rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MigrationRule {
    pub enabled: bool,
    /// Name of the mapping argument that receives migrated keywords
    pub destination: String,
    #[serde(rename = "migrate")]
    pub selection: KeywordSelection,
    /// Extra names treated as constructor parameters under `NonCore`
    pub extra_core: BTreeSet<String>,
}

impl Default for MigrationRule {
    fn default() -> Self {
        Self {
            enabled: false,
            destination: "metadata".to_string(),
            selection: KeywordSelection::NonCore,
            extra_core: BTreeSet::new(),
        }
    }
}

/// Field constructors recognized out of the box (marshmallow 3 `fields` module)
pub const DEFAULT_FIELD_CONSTRUCTORS: &[&str] = &[
    "Field",
    "Raw",
    "Nested",
    "Pluck",
    "List",
    "Tuple",
    "String",
    "Str",
    "UUID",
    "Number",
    "Integer",
    "Int",
    "Decimal",
    "Boolean",
    "Bool",
    "Float",
    "DateTime",
    "NaiveDateTime",
    "AwareDateTime",
    "Time",
    "Date",
    "TimeDelta",
    "Mapping",
    "Dict",
    "Url",
    "URL",
    "Email",
    "IP",
    "IPv4",
    "IPv6",
    "IPInterface",
    "IPv4Interface",
    "IPv6Interface",
    "Enum",
    "Method",
    "Function",
    "Constant",
];

/// Schema detection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DetectorConfig {
    /// A base whose simple name ends with this marks a schema class
    pub schema_suffix: String,
    /// Additional constructor names (custom field classes)
    pub extra_fields: BTreeSet<String>,
    /// Also rewrite field constructors nested inside another field's arguments
    pub rewrite_nested: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            schema_suffix: "Schema".to_string(),
            extra_fields: BTreeSet::new(),
            rewrite_nested: true,
        }
    }
}

impl DetectorConfig {
    pub fn is_field_constructor(&self, name: &str) -> bool {
        DEFAULT_FIELD_CONSTRUCTORS.contains(&name) || self.extra_fields.contains(name)
    }
}

/// Complete configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MallowConfig {
    pub style: StyleConfig,
    pub migration: MigrationRule,
    pub detector: DetectorConfig,
    /// In preserve mode, re-render every schema field, not only rewritten ones
    pub format_fields: bool,
}

impl Default for MallowConfig {
    fn default() -> Self {
        Self {
            style: StyleConfig::default(),
            migration: MigrationRule::default(),
            detector: DetectorConfig::default(),
            format_fields: true,
        }
    }
}

impl MallowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }

    pub fn with_migration(mut self, migration: MigrationRule) -> Self {
        self.migration = migration;
        self
    }

    /// Enable migration of the given keyword names into `destination`
    pub fn migrate<I, S>(mut self, names: I, destination: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.migration.enabled = true;
        self.migration.selection = KeywordSelection::named(names);
        self.migration.destination = destination.to_string();
        self
    }

    /// Check values a deserializer cannot constrain
    pub fn validate(&self) -> Result<(), MallowError> {
        if self.style.line_length < 10 {
            return Err(MallowError::Config(format!(
                "line-length must be at least 10, got {}",
                self.style.line_length
            )));
        }
        if self.style.indent_size == 0 || self.style.indent_size > 16 {
            return Err(MallowError::Config(format!(
                "indent-size must be between 1 and 16, got {}",
                self.style.indent_size
            )));
        }
        if !is_identifier(&self.migration.destination) {
            return Err(MallowError::Config(format!(
                "destination `{}` is not a valid keyword argument name",
                self.migration.destination
            )));
        }
        if self.detector.schema_suffix.is_empty() {
            return Err(MallowError::Config(
                "schema-suffix must not be empty".to_string(),
            ));
        }
        if let KeywordSelection::Named(names) = &self.migration.selection {
            if let Some(bad) = names.iter().find(|name| !is_identifier(name)) {
                return Err(MallowError::Config(format!(
                    "`{bad}` is not a valid keyword argument name"
                )));
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_') && !crate::cst::is_keyword(name)
        }
        _ => false,
    }
}
