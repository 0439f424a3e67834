/*!
# Metadata Migration

Moves selected keyword arguments of a field constructor call into a single
mapping argument (`metadata={...}` by default).

- An existing dict display is merged into; an existing `dict(...)` call gets
  keyword arguments appended. Any other destination value is left alone and
  reported.
- A key that is already present is replaced by the migrated keyword, which
  is appended after the surviving entries.
- Comments travel with the keyword they belong to.
*/

use anyhow::anyhow;
use tracing::debug;

use crate::config::{KeywordSelection, MigrationRule};
use crate::cst::trivia::{all_comments, own_line_comments, same_line_comment, split_same_line};
use crate::cst::{ArgumentKind, Element, Group, GroupKind, Item, ToSource, Token, TokenKind};
use crate::schema::patterns::unpacked_arguments;

use super::rules::{FieldSite, RewriteRule, RuleOutcome};
use super::{RewriteContext, RewriteResult, WarningKind};

/// Parameters every marshmallow field accepts
const FIELD_PARAMETERS: &[&str] = &[
    "load_default",
    "missing",
    "dump_default",
    "default",
    "data_key",
    "attribute",
    "validate",
    "required",
    "allow_none",
    "load_only",
    "dump_only",
    "error_messages",
    "metadata",
];

/// Parameters specific to one constructor
fn constructor_parameters(constructor: &str) -> &'static [&'static str] {
    match constructor {
        "Nested" => &["nested", "only", "exclude", "many", "unknown"],
        "Pluck" => &["nested", "field_name", "only", "exclude", "many", "unknown"],
        "List" => &["cls_or_instance"],
        "Tuple" => &["tuple_fields"],
        "Number" => &["as_string"],
        "Integer" | "Int" => &["strict", "as_string"],
        "Float" => &["allow_nan", "as_string"],
        "Decimal" => &["places", "rounding", "allow_nan", "as_string"],
        "Boolean" | "Bool" => &["truthy", "falsy"],
        "DateTime" | "Time" | "Date" => &["format"],
        "NaiveDateTime" => &["format", "timezone"],
        "AwareDateTime" => &["format", "default_timezone"],
        "TimeDelta" => &["precision", "serialization_type"],
        "Mapping" | "Dict" => &["keys", "values"],
        "Url" | "URL" => &["relative", "absolute", "schemes", "require_tld"],
        "IP" | "IPv4" | "IPv6" | "IPInterface" | "IPv4Interface" | "IPv6Interface" => {
            &["exploded"]
        }
        "Enum" => &["enum", "by_value"],
        "Method" | "Function" => &["serialize", "deserialize"],
        "Constant" => &["constant"],
        _ => &[],
    }
}

/// Whether `name` is a real parameter of the constructor
pub fn is_core_parameter(constructor: &str, name: &str) -> bool {
    FIELD_PARAMETERS.contains(&name) || constructor_parameters(constructor).contains(&name)
}

/// Where migrated keywords go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    /// No destination argument yet
    Create,
    /// `metadata={...}`
    Display,
    /// `metadata=dict(...)`
    DictCall,
    /// Anything else, such as a variable
    Opaque,
}

fn classify(arguments: &Group, destination: &str) -> Destination {
    let Some(index) = arguments.keyword_index(destination) else {
        return Destination::Create;
    };
    match arguments.elements[index].value_items() {
        [Item::Group(display)]
            if display.kind == GroupKind::Brace
                && !display.is_comprehension()
                && display.elements.iter().all(Element::is_mapping_entry) =>
        {
            Destination::Display
        }
        [Item::Token(callee), Item::Group(call)]
            if callee.is_name("dict")
                && call.kind == GroupKind::Call
                && call.elements.iter().all(|element| {
                    matches!(
                        element.argument_kind(),
                        ArgumentKind::Keyword(_) | ArgumentKind::Unpacked
                    )
                }) =>
        {
            Destination::DictCall
        }
        _ => Destination::Opaque,
    }
}

/// A keyword argument lifted out of the call
struct MovedKeyword {
    name: String,
    value: Vec<Item>,
    /// Comments placed on their own lines above the entry
    comments: Vec<String>,
    /// Comment that ended the keyword's line
    trailing: Option<String>,
}

/// Call arguments split into what stays and what moves
struct Partition {
    kept: Vec<Element>,
    moved: Vec<MovedKeyword>,
    /// Same-line comment that belonged after the last kept element
    owed: String,
    /// Remaining trivia before the closing bracket
    close_rest: String,
}

/// Split the elements, carrying comments with the element they annotate
///
/// A comment on the same line as an element lives in the prefix of the
/// token that follows it, so removing an element means handing that comment
/// back to whichever token follows the previous survivor.
fn partition(elements: Vec<Element>, selected: &[bool], close_prefix: &str) -> Partition {
    let count = elements.len();
    let mut same: Vec<String> = Vec::with_capacity(count);
    let mut rest: Vec<String> = Vec::with_capacity(count);
    for element in &elements {
        let prefix = element.first_token().map_or("", |token| token.prefix.as_str());
        let (same_line, remainder) = split_same_line(prefix);
        same.push(same_line.to_string());
        rest.push(remainder.to_string());
    }
    let (close_same, close_rest) = split_same_line(close_prefix);
    let mut close_same = close_same.to_string();

    let mut kept = Vec::new();
    let mut moved = Vec::new();
    let mut carry: Option<String> = None;
    for (index, mut element) in elements.into_iter().enumerate() {
        if selected[index] {
            if carry.is_none() {
                carry = Some(std::mem::take(&mut same[index]));
            }
            let trailing = if index + 1 < count {
                std::mem::take(&mut same[index + 1])
            } else {
                std::mem::take(&mut close_same)
            };
            let mut comments: Vec<String> = own_line_comments(&rest[index])
                .into_iter()
                .map(str::to_string)
                .collect();
            if let Some(Item::Token(eq)) = element.items.get(1) {
                comments.extend(all_comments(&eq.prefix).into_iter().map(str::to_string));
            }
            if let Some(comma) = &element.comma {
                comments.extend(all_comments(&comma.prefix).into_iter().map(str::to_string));
            }
            let trailing = same_line_comment(&trailing).map(str::to_string);

            let name = element.keyword_name().unwrap_or_default().to_string();
            let value = element.items.split_off(2usize.min(element.items.len()));
            moved.push(MovedKeyword {
                name,
                value,
                comments,
                trailing,
            });
        } else {
            let lead = carry
                .take()
                .unwrap_or_else(|| std::mem::take(&mut same[index]));
            if let Some(token) = element.first_token_mut() {
                token.prefix = format!("{lead}{}", rest[index]);
            }
            kept.push(element);
        }
    }

    Partition {
        kept,
        moved,
        owed: carry.unwrap_or(close_same),
        close_rest: close_rest.to_string(),
    }
}

/// Prefix putting `comments` on their own lines above a token
///
/// `same_line` is the comment ending the previous line, if any.
fn comment_prefix(same_line: &str, comments: &[String]) -> String {
    let mut prefix = same_line.to_string();
    for comment in comments {
        prefix.push('\n');
        prefix.push_str(comment);
    }
    if !prefix.is_empty() {
        prefix.push('\n');
    }
    prefix
}

/// `rest` behind a same-line comment, starting a new line if `rest` does not
fn after_comment(same_line: &str, rest: &str) -> String {
    if same_line.is_empty() || rest.starts_with(['\n', '\r']) {
        format!("{same_line}{rest}")
    } else {
        format!("{same_line}\n{rest}")
    }
}

/// Keyword migration rule
pub struct MetadataMigration {
    rule: MigrationRule,
}

impl MetadataMigration {
    pub fn new(rule: MigrationRule) -> Self {
        Self { rule }
    }

    /// Whether keyword `name` of a `constructor(...)` call should move
    pub fn selects(&self, constructor: &str, name: &str) -> bool {
        if name == self.rule.destination {
            return false;
        }
        match &self.rule.selection {
            KeywordSelection::Named(names) => names.contains(name),
            KeywordSelection::NonCore => {
                !is_core_parameter(constructor, name) && !self.rule.extra_core.contains(name)
            }
        }
    }

    fn entry(&self, style: Destination, keyword: MovedKeyword, prefix: String) -> Element {
        let mut value = keyword.value;
        if let Some(first) = value.first_mut().map(Item::first_token_mut) {
            if !first.has_comment() {
                first.prefix = " ".to_string();
            }
        }
        let mut items = match style {
            Destination::DictCall => vec![
                Item::Token(Token::name(&keyword.name).with_prefix(prefix)),
                Item::Token(Token::op("=")),
            ],
            _ => vec![
                Item::Token(
                    Token::synthetic(TokenKind::String, format!("\"{}\"", keyword.name))
                        .with_prefix(prefix),
                ),
                Item::Token(Token::op(":")),
            ],
        };
        items.extend(value);
        Element::new(items)
    }
}

impl RewriteRule for MetadataMigration {
    fn name(&self) -> &'static str {
        "metadata-migration"
    }

    fn description(&self) -> &'static str {
        "Moves selected keyword arguments of field constructors into one mapping argument"
    }

    fn matches(&self, _site: &FieldSite<'_>, _context: &RewriteContext) -> bool {
        self.rule.enabled
    }

    fn apply(
        &self,
        arguments: &mut Group,
        site: &FieldSite<'_>,
        _context: &RewriteContext,
    ) -> RewriteResult<RuleOutcome> {
        let mut outcome = RuleOutcome::unchanged();
        for element in unpacked_arguments(arguments) {
            outcome.warnings.push(site.warn(
                WarningKind::UnpackedKeywords,
                format!(
                    "`{}` may hold keywords that cannot be migrated",
                    element.items.to_source().trim()
                ),
            ));
        }

        let selected: Vec<bool> = arguments
            .elements
            .iter()
            .map(|element| {
                element
                    .keyword_name()
                    .is_some_and(|name| self.selects(site.constructor, name))
            })
            .collect();
        if !selected.contains(&true) {
            return Ok(outcome);
        }

        let destination = self.rule.destination.as_str();
        let style = classify(arguments, destination);
        if style == Destination::Opaque {
            outcome.warnings.push(site.warn(
                WarningKind::OpaqueDestination,
                format!("`{destination}` is not a dict literal, keywords left in place"),
            ));
            return Ok(outcome);
        }

        let trailing = arguments.has_trailing_comma();
        let elements = std::mem::take(&mut arguments.elements);
        let Partition {
            mut kept,
            moved,
            owed,
            close_rest,
        } = partition(elements, &selected, &arguments.close.prefix);

        let dest_index = if style == Destination::Create {
            let mut element = Element::keyword(
                destination,
                vec![Item::Group(Group::new(GroupKind::Brace, Vec::new()))],
            );
            if let Some(token) = element.first_token_mut() {
                token.prefix = after_comment(&owed, "");
            }
            kept.push(element);
            arguments.close.prefix = close_rest;
            outcome.created_destination = true;
            kept.len() - 1
        } else {
            arguments.close.prefix = after_comment(&owed, &close_rest);
            kept.iter()
                .position(|element| element.keyword_name() == Some(destination))
                .ok_or_else(|| anyhow!("destination `{destination}` disappeared"))?
        };

        let value_at = if style == Destination::DictCall { 3 } else { 2 };
        let mapping = kept[dest_index]
            .items
            .get_mut(value_at)
            .and_then(Item::as_group_mut)
            .ok_or_else(|| anyhow!("destination `{destination}` has no mapping"))?;

        let mapping_trailing = mapping.has_trailing_comma();
        let (mapping_same, mapping_rest) = split_same_line(&mapping.close.prefix);
        let mut owed_in_mapping = mapping_same.to_string();
        mapping.close.prefix = mapping_rest.to_string();

        for mut keyword in moved {
            let before = mapping.elements.len();
            mapping.elements.retain(|entry| match style {
                Destination::DictCall => entry.keyword_name() != Some(keyword.name.as_str()),
                _ => entry.string_key().as_deref() != Some(keyword.name.as_str()),
            });
            if mapping.elements.len() != before {
                outcome.warnings.push(site.warn(
                    WarningKind::DuplicateKey,
                    format!(
                        "`{}` was already in `{destination}`, the keyword argument wins",
                        keyword.name
                    ),
                ));
            }
            debug!(
                field = site.field_name,
                keyword = %keyword.name,
                destination,
                "migrating keyword"
            );
            outcome.migrated.push(keyword.name.clone());
            let prefix = comment_prefix(&std::mem::take(&mut owed_in_mapping), &keyword.comments);
            owed_in_mapping = keyword
                .trailing
                .take()
                .map(|comment| format!("  {comment}"))
                .unwrap_or_default();
            mapping.elements.push(self.entry(style, keyword, prefix));
        }
        mapping.close.prefix = after_comment(&owed_in_mapping, &mapping.close.prefix);
        mapping.normalize_commas(mapping_trailing);
        mapping.canonical_order = true;

        arguments.elements = kept;
        arguments.normalize_commas(trailing);
        arguments.canonical_order = true;

        outcome.changed = true;
        outcome.destination = Some(destination.to_string());
        Ok(outcome)
    }

    fn destination(&self) -> Option<&str> {
        Some(&self.rule.destination)
    }

    fn validate(&self, _original: &Group, rewritten: &Group) -> RewriteResult<()> {
        if rewritten.keyword_index(&self.rule.destination).is_none() {
            return Err(anyhow!(
                "rewritten call has no `{}` argument",
                self.rule.destination
            ));
        }
        Ok(())
    }

    fn conflicts_with(&self, other: &dyn RewriteRule) -> bool {
        other.name() == self.name()
    }
}
