/*!
# Statement Pattern Matching

Matchers over concrete syntax tree statements, plus a walker that collects
every statement a pattern accepts together with its [`StatementPath`].
*/

use crate::config::DetectorConfig;
use crate::cst::{
    ArgumentKind, Element, Group, GroupKind, Item, Module, Statement, StatementPath, Token,
    TokenKind,
};

/// Pattern matcher for statements
pub trait StatementPattern {
    /// Check if this pattern matches the given statement
    fn matches(&self, statement: &Statement) -> bool;
}

/// Pattern matcher utility
pub struct PatternMatcher;

impl PatternMatcher {
    /// Match class definitions
    pub fn class_def() -> impl StatementPattern {
        PredicateMatcher {
            predicate: |statement: &Statement| matches!(statement, Statement::Class(_)),
        }
    }

    /// Match `def` and `async def` statements
    pub fn function_def() -> impl StatementPattern {
        PredicateMatcher {
            predicate: |statement: &Statement| {
                let Statement::Compound(compound) = statement else {
                    return false;
                };
                let mut names = compound.header.iter().filter_map(Item::as_token);
                match names.next() {
                    Some(first) if first.is_name("def") => true,
                    Some(first) if first.is_name("async") => {
                        names.next().is_some_and(|second| second.is_name("def"))
                    }
                    _ => false,
                }
            },
        }
    }

    /// Match `name = fields.Constructor(...)` assignments
    pub fn field_assignment(config: &DetectorConfig) -> FieldAssignmentMatcher<'_> {
        FieldAssignmentMatcher { config }
    }
}

struct PredicateMatcher<F>
where
    F: Fn(&Statement) -> bool,
{
    predicate: F,
}

impl<F> StatementPattern for PredicateMatcher<F>
where
    F: Fn(&Statement) -> bool,
{
    fn matches(&self, statement: &Statement) -> bool {
        (self.predicate)(statement)
    }
}

/// Field assignment matcher
pub struct FieldAssignmentMatcher<'a> {
    config: &'a DetectorConfig,
}

impl StatementPattern for FieldAssignmentMatcher<'_> {
    fn matches(&self, statement: &Statement) -> bool {
        statement
            .as_simple()
            .and_then(|simple| field_call(&simple.items))
            .is_some_and(|call| self.config.is_field_constructor(call.constructor()))
    }
}

/// Utility for walking nested block bodies
pub struct StatementWalker;

impl StatementWalker {
    /// Statements matching `pattern` in source order, never entering bodies
    /// of statements matching `barrier`
    pub fn find_all_outside<'a, P: StatementPattern, B: StatementPattern>(
        module: &'a Module,
        pattern: &P,
        barrier: &B,
    ) -> Vec<(StatementPath, &'a Statement)> {
        let mut matches = Vec::new();
        Self::walk(
            &module.body,
            &StatementPath::default(),
            pattern,
            barrier,
            &mut matches,
        );
        matches
    }

    /// Direct children of one block matching a pattern
    pub fn find_in_body<'a, P: StatementPattern>(
        body: &'a [Statement],
        parent: &StatementPath,
        pattern: &P,
    ) -> Vec<(StatementPath, &'a Statement)> {
        body.iter()
            .enumerate()
            .filter(|(_, statement)| pattern.matches(statement))
            .map(|(index, statement)| (parent.child(index), statement))
            .collect()
    }

    fn walk<'a, P: StatementPattern>(
        body: &'a [Statement],
        parent: &StatementPath,
        pattern: &P,
        barrier: &dyn StatementPattern,
        matches: &mut Vec<(StatementPath, &'a Statement)>,
    ) {
        for (index, statement) in body.iter().enumerate() {
            let path = parent.child(index);
            if pattern.matches(statement) {
                matches.push((path.clone(), statement));
            }
            if barrier.matches(statement) {
                continue;
            }
            if let Some(block) = statement.block() {
                Self::walk(&block.body, &path, pattern, barrier, matches);
            }
        }
    }
}

/// View of `target = dotted.Callee(args)`
#[derive(Debug, Clone, Copy)]
pub struct FieldCall<'a> {
    pub target: &'a Token,
    /// Names of the dotted callee, `["fields", "String"]`
    callee: &'a [Item],
    pub arguments: &'a Group,
}

impl<'a> FieldCall<'a> {
    /// Last name of the callee
    pub fn constructor(&self) -> &'a str {
        callee_names(self.callee).last().copied().unwrap_or_default()
    }

    pub fn callee(&self) -> String {
        callee_names(self.callee).join(".")
    }
}

/// Match the items of a simple statement against `name = dotted.Callee(...)`
pub fn field_call(items: &[Item]) -> Option<FieldCall<'_>> {
    let [Item::Token(target), Item::Token(eq), callee @ .., Item::Group(arguments)] = items else {
        return None;
    };
    if !target.is_identifier() || !eq.is_op("=") || arguments.kind != GroupKind::Call {
        return None;
    }
    is_dotted_name(callee).then_some(FieldCall {
        target,
        callee,
        arguments,
    })
}

/// Argument group of a field assignment, for rewriting in place
pub fn field_call_arguments_mut(items: &mut [Item]) -> Option<&mut Group> {
    field_call(items)?;
    items.last_mut().and_then(Item::as_group_mut)
}

/// `a`, `a.b`, `a.b.c` with every part an identifier
pub fn is_dotted_name(items: &[Item]) -> bool {
    !items.is_empty()
        && items.len() % 2 == 1
        && items.iter().enumerate().all(|(index, item)| match item {
            Item::Token(token) if index % 2 == 0 => token.is_identifier(),
            Item::Token(token) => token.is_op("."),
            Item::Group(_) => false,
        })
}

fn callee_names(callee: &[Item]) -> Vec<&str> {
    callee
        .iter()
        .step_by(2)
        .filter_map(Item::as_token)
        .map(|token| token.text.as_str())
        .collect()
}

/// Constructor name when `items[at]` is a call group preceded by a dotted
/// field constructor name, as in `fields.List(fields.String())`
pub fn nested_constructor<'a>(
    items: &'a [Item],
    at: usize,
    config: &DetectorConfig,
) -> Option<&'a str> {
    let group = items.get(at)?.as_group()?;
    if group.kind != GroupKind::Call {
        return None;
    }
    let name = items[..at].last()?.as_token()?;
    if !name.is_identifier() || !config.is_field_constructor(&name.text) {
        return None;
    }
    // the dotted name must start the element or follow an operator
    let mut start = at - 1;
    while start >= 2
        && items[start - 1].is_op(".")
        && items[start - 2].as_token().is_some_and(Token::is_identifier)
    {
        start -= 2;
    }
    let starts_expression = start == 0
        || items[start - 1].as_token().is_some_and(|token| {
            (token.kind == TokenKind::Op && token.text != ".") || token.is_keyword()
        });
    starts_expression.then_some(name.text.as_str())
}

/// Keyword arguments given with `**mapping`
pub fn unpacked_arguments(group: &Group) -> impl Iterator<Item = &Element> {
    group
        .elements
        .iter()
        .filter(|element| element.argument_kind() == ArgumentKind::Unpacked)
}
