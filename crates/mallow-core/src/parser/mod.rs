// Parser module - turns Python source into a lossless concrete syntax tree
//
// The grammar handled here is deliberately shallow: logical lines, bracket
// groups split on commas, and indented blocks. That is enough structure for
// schema detection and field rewriting while every other construct survives
// as plain tokens.

use std::iter::Peekable;
use std::vec::IntoIter;

use crate::cst::{
    Block, ClassDef, CompoundStatement, Element, Group, GroupKind, Item, Module, Position,
    SimpleStatement, Statement, Token, TokenKind,
};

pub mod lexer;

#[cfg(test)]
mod lexer_tests;

#[cfg(test)]
mod parser_tests;

use lexer::Lexer;

/// Source text that is not valid Python
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct SyntaxError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, at: Position) -> Self {
        Self {
            message: message.into(),
            line: at.line,
            column: at.column,
        }
    }
}

/// Parse a whole file
pub fn parse(source: &str) -> Result<Module, SyntaxError> {
    let mut tokens = Lexer::new(source).tokenize()?;
    attach_block_trailers(&mut tokens);
    Parser::new(tokens).parse_module()
}

/// Operators that cannot end a logical line
const DANGLING_OPS: &[&str] = &[
    "+", "-", "/", "//", "%", "@", "**", "|", "&", "^", "<<", ">>", "<", ">", "<=", ">=", "==",
    "!=", "=", "+=", "-=", "*=", "/=", "//=", "%=", "@=", "&=", "|=", "^=", ">>=", "<<=", "**=",
    "->", ".", "~", ":=",
];

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
        }
    }

    fn parse_module(mut self) -> Result<Module, SyntaxError> {
        let body = self.parse_statements()?;
        let end = self.next();
        if end.kind != TokenKind::EndMarker {
            return Err(SyntaxError::new("invalid syntax", end.position));
        }
        Ok(Module { body, end })
    }

    fn parse_statements(&mut self) -> Result<Vec<Statement>, SyntaxError> {
        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Dedent | TokenKind::EndMarker => return Ok(body),
                TokenKind::Indent => {
                    return Err(SyntaxError::new("unexpected indent", self.peek_position()));
                }
                _ => body.push(self.parse_statement()?),
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let items = self.parse_line()?;
        let newline = self.next();
        let Some(first) = items.first() else {
            return Err(SyntaxError::new("invalid syntax", newline.position));
        };
        if let Some(Item::Token(last)) = items.last() {
            if last.kind == TokenKind::Op && DANGLING_OPS.contains(&last.text.as_str()) {
                return Err(SyntaxError::new("invalid syntax", last.position));
            }
        }
        let opens_block = items.last().is_some_and(|item| item.is_op(":"));

        if self.peek_kind() == TokenKind::Indent {
            if !opens_block {
                return Err(SyntaxError::new("unexpected indent", self.peek_position()));
            }
            let is_class = first.as_token().is_some_and(|token| token.is_name("class"));
            let block = self.parse_block()?;
            if is_class {
                return build_class(items, newline, block);
            }
            let mut header = items;
            relabel_soft_keyword_group(&mut header);
            return Ok(Statement::Compound(CompoundStatement {
                header,
                newline,
                block,
            }));
        }

        if opens_block {
            return Err(SyntaxError::new(
                "expected an indented block",
                self.peek_position(),
            ));
        }
        Ok(Statement::Simple(SimpleStatement {
            items,
            newline,
            reformat: false,
        }))
    }

    fn parse_block(&mut self) -> Result<Block, SyntaxError> {
        let indent = self.next();
        let body = self.parse_statements()?;
        let dedent = self.next();
        if dedent.kind != TokenKind::Dedent {
            return Err(SyntaxError::new("invalid syntax", dedent.position));
        }
        Ok(Block {
            indent,
            body,
            dedent,
        })
    }

    /// Items of one logical line, up to but excluding its newline
    fn parse_line(&mut self) -> Result<Vec<Item>, SyntaxError> {
        let mut items: Vec<Item> = Vec::new();
        while !matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::EndMarker | TokenKind::Indent | TokenKind::Dedent
        ) {
            let token = self.next();
            if is_open_bracket(&token) {
                let group = self.parse_group(token, items.last())?;
                items.push(Item::Group(group));
            } else {
                items.push(Item::Token(token));
            }
        }
        Ok(items)
    }

    fn parse_group(&mut self, open: Token, prev: Option<&Item>) -> Result<Group, SyntaxError> {
        let follows_callable = prev.is_some_and(|item| match item {
            Item::Group(_) => true,
            Item::Token(token) => token.is_identifier() || token.kind == TokenKind::String,
        });
        let kind = match (open.text.as_str(), follows_callable) {
            ("(", true) => GroupKind::Call,
            ("(", false) => GroupKind::Paren,
            ("[", true) => GroupKind::Subscript,
            ("[", false) => GroupKind::List,
            _ => GroupKind::Brace,
        };

        let mut elements = Vec::new();
        let mut current: Vec<Item> = Vec::new();
        let mut pending_lambdas = 0usize;
        let mut comprehension = false;

        loop {
            let token = self.next();
            match token.kind {
                TokenKind::Op if is_close_bracket(&token) => {
                    if !current.is_empty() {
                        elements.push(Element::new(current));
                    }
                    return Ok(Group {
                        open,
                        elements,
                        close: token,
                        kind,
                        canonical_order: false,
                    });
                }
                TokenKind::EndMarker => {
                    return Err(SyntaxError::new(
                        format!("'{}' was never closed", open.text),
                        open.position,
                    ));
                }
                TokenKind::Op if token.text == "," && pending_lambdas == 0 && !comprehension => {
                    if current.is_empty() {
                        return Err(SyntaxError::new("invalid syntax", token.position));
                    }
                    elements.push(Element {
                        items: std::mem::take(&mut current),
                        comma: Some(token),
                    });
                }
                TokenKind::Op if is_open_bracket(&token) => {
                    let group = self.parse_group(token, current.last())?;
                    current.push(Item::Group(group));
                }
                _ => {
                    if token.is_name("lambda") {
                        pending_lambdas += 1;
                    } else if token.is_op(":") && pending_lambdas > 0 {
                        pending_lambdas -= 1;
                    } else if token.is_name("for") && !current.is_empty() {
                        comprehension = true;
                    }
                    current.push(Item::Token(token));
                }
            }
        }
    }

    fn next(&mut self) -> Token {
        self.tokens
            .next()
            .unwrap_or_else(|| Token::synthetic(TokenKind::EndMarker, ""))
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.tokens
            .peek()
            .map_or(TokenKind::EndMarker, |token| token.kind)
    }

    fn peek_position(&mut self) -> Position {
        self.tokens
            .peek()
            .map(|token| token.position)
            .unwrap_or_default()
    }
}

fn is_open_bracket(token: &Token) -> bool {
    token.kind == TokenKind::Op && matches!(token.text.as_str(), "(" | "[" | "{")
}

fn is_close_bracket(token: &Token) -> bool {
    token.kind == TokenKind::Op && matches!(token.text.as_str(), ")" | "]" | "}")
}

fn build_class(header: Vec<Item>, newline: Token, block: Block) -> Result<Statement, SyntaxError> {
    let invalid = || SyntaxError::new("invalid syntax", header[0].first_token().position);
    let (name, bases) = match header.as_slice() {
        [_, Item::Token(name), Item::Token(colon)] if colon.is_op(":") => (name, None),
        [_, Item::Token(name), Item::Group(bases), Item::Token(colon)]
            if colon.is_op(":") && bases.kind == GroupKind::Call =>
        {
            (name, Some(bases))
        }
        // PEP 695 type parameters
        [_, Item::Token(name), Item::Group(params), Item::Group(bases), Item::Token(colon)]
            if colon.is_op(":")
                && params.kind == GroupKind::Subscript
                && bases.kind == GroupKind::Call =>
        {
            (name, Some(bases))
        }
        _ => return Err(invalid()),
    };
    if !name.is_identifier() {
        return Err(invalid());
    }
    let name = name.text.clone();

    let bases = bases
        .map(|group| {
            group
                .elements
                .iter()
                .filter(|element| {
                    matches!(element.argument_kind(), crate::cst::ArgumentKind::Positional)
                })
                .filter_map(|element| base_simple_name(&element.items))
                .collect()
        })
        .unwrap_or_default();

    Ok(Statement::Class(ClassDef {
        name,
        bases,
        header,
        newline,
        block,
    }))
}

/// `mod.Base[T]` -> `Base`
fn base_simple_name(items: &[Item]) -> Option<String> {
    let mut end = items.len();
    while end > 0 && matches!(&items[end - 1], Item::Group(group) if group.kind == GroupKind::Subscript)
    {
        end -= 1;
    }
    match items[..end].last() {
        Some(Item::Token(token)) if token.is_identifier() => Some(token.text.clone()),
        _ => None,
    }
}

/// `match (x):` and `case [a, b]:` use soft keywords, not calls or subscripts
fn relabel_soft_keyword_group(header: &mut [Item]) {
    let soft = header
        .first()
        .and_then(Item::as_token)
        .is_some_and(|token| token.is_name("match") || token.is_name("case"));
    if !soft {
        return;
    }
    if let Some(Item::Group(group)) = header.get_mut(1) {
        group.kind = match group.kind {
            GroupKind::Call => GroupKind::Paren,
            GroupKind::Subscript => GroupKind::List,
            other => other,
        };
    }
}

/// Move comment lines that trail a block at the block's depth onto its dedent
///
/// The lexer hands all trivia before a token to that token, so a comment
/// written at the end of an indented suite would otherwise belong to the next
/// outer statement.
fn attach_block_trailers(tokens: &mut [Token]) {
    let mut columns: Vec<usize> = Vec::new();
    for index in 0..tokens.len() {
        match tokens[index].kind {
            TokenKind::Indent => columns.push(tokens[index].position.column.saturating_sub(1)),
            TokenKind::Dedent => {
                let column = columns.pop().unwrap_or(0);
                let Some(next) = (index + 1..tokens.len())
                    .find(|&candidate| tokens[candidate].kind != TokenKind::Dedent)
                else {
                    continue;
                };
                let take = trailer_len(&tokens[next].prefix, column);
                if take > 0 {
                    let moved: String = tokens[next].prefix.drain(..take).collect();
                    tokens[index].prefix = moved;
                }
            }
            _ => {}
        }
    }
}

/// Byte length of the leading comment lines indented at least `column`
fn trailer_len(prefix: &str, column: usize) -> usize {
    let mut offset = 0;
    let mut taken = 0;
    for line in prefix.split_inclusive('\n') {
        if !line.ends_with('\n') {
            break;
        }
        offset += line.len();
        let body = line.trim_end_matches(['\n', '\r']);
        let content = body.trim_start_matches([' ', '\t', '\x0c']);
        if content.is_empty() {
            continue;
        }
        if content.starts_with('#') && indent_width(body) >= column {
            taken = offset;
            continue;
        }
        break;
    }
    taken
}

pub(crate) fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            '\x0c' => width = 0,
            _ => break,
        }
    }
    width
}
