//! Concrete syntax tree
//!
//! Leaves are tokens that own their exact source text and the trivia
//! (whitespace, comments, blank lines, line continuations) that precedes
//! them. Interior nodes only group leaves, so concatenating every token's
//! prefix and text in order yields the original file byte-for-byte.
//!
//! Formatting hints the printer needs live on the nodes themselves:
//! [`Group::kind`], [`Group::canonical_order`] and [`SimpleStatement::reformat`].

pub mod source_gen;
pub mod trivia;

#[cfg(test)]
mod source_gen_tests;

use serde::Serialize;

pub use source_gen::ToSource;

/// 1-based line and column of a token's first character
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Number,
    String,
    Op,
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Everything between the previous token and this one
    pub prefix: String,
    pub position: Position,
}

impl Token {
    /// A token that does not come from source text
    pub fn synthetic(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            prefix: String::new(),
            position: Position::default(),
        }
    }

    pub fn op(text: &str) -> Self {
        Self::synthetic(TokenKind::Op, text)
    }

    pub fn name(text: &str) -> Self {
        Self::synthetic(TokenKind::Name, text)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn is_op(&self, text: &str) -> bool {
        self.kind == TokenKind::Op && self.text == text
    }

    pub fn is_name(&self, text: &str) -> bool {
        self.kind == TokenKind::Name && self.text == text
    }

    /// A name that is not a hard keyword
    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Name && !is_keyword(&self.text)
    }

    pub fn is_keyword(&self) -> bool {
        self.kind == TokenKind::Name && is_keyword(&self.text)
    }

    pub fn has_comment(&self) -> bool {
        self.prefix.contains('#')
    }
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

/// Which bracket a group uses and what the bracket means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    /// `f(...)`, also class bases and `def` parameters
    Call,
    /// Parenthesized expression or tuple
    Paren,
    /// `x[...]`
    Subscript,
    /// List display
    List,
    /// Dict or set display
    Brace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Token(Token),
    Group(Group),
}

impl Item {
    pub fn first_token(&self) -> &Token {
        match self {
            Item::Token(token) => token,
            Item::Group(group) => &group.open,
        }
    }

    pub fn first_token_mut(&mut self) -> &mut Token {
        match self {
            Item::Token(token) => token,
            Item::Group(group) => &mut group.open,
        }
    }

    pub fn last_token(&self) -> &Token {
        match self {
            Item::Token(token) => token,
            Item::Group(group) => &group.close,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Item::Token(token) => Some(token),
            Item::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Item::Group(group) => Some(group),
            Item::Token(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Item::Group(group) => Some(group),
            Item::Token(_) => None,
        }
    }

    pub fn is_op(&self, text: &str) -> bool {
        self.as_token().is_some_and(|token| token.is_op(text))
    }
}

/// A bracketed construct and its comma-separated elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub open: Token,
    pub elements: Vec<Element>,
    pub close: Token,
    pub kind: GroupKind,
    /// Keyword arguments / mapping entries may be sorted by the printer
    pub canonical_order: bool,
}

impl Group {
    pub fn new(kind: GroupKind, elements: Vec<Element>) -> Self {
        let (open, close) = match kind {
            GroupKind::Call | GroupKind::Paren => ("(", ")"),
            GroupKind::Subscript | GroupKind::List => ("[", "]"),
            GroupKind::Brace => ("{", "}"),
        };
        Self {
            open: Token::op(open),
            elements,
            close: Token::op(close),
            kind,
            canonical_order: false,
        }
    }

    pub fn has_trailing_comma(&self) -> bool {
        self.elements
            .last()
            .is_some_and(|element| element.comma.is_some())
    }

    /// A single element containing a top-level `for`
    pub fn is_comprehension(&self) -> bool {
        self.elements.len() == 1
            && self.elements[0].items.iter().skip(1).any(|item| {
                item.as_token().is_some_and(|token| token.is_name("for"))
            })
    }

    /// Index of the keyword argument `name=...`
    pub fn keyword_index(&self, name: &str) -> Option<usize> {
        self.elements
            .iter()
            .position(|element| element.keyword_name() == Some(name))
    }

    /// Re-derive separator commas after elements were added, moved or removed
    ///
    /// Every element but the last gets a comma; the last keeps one only when
    /// `trailing` is set.
    pub fn normalize_commas(&mut self, trailing: bool) {
        let count = self.elements.len();
        for (index, element) in self.elements.iter_mut().enumerate() {
            let wants_comma = index + 1 < count || trailing;
            match (&element.comma, wants_comma) {
                (None, true) => element.comma = Some(Token::op(",")),
                (Some(_), false) => element.comma = None,
                _ => {}
            }
        }
    }
}

/// How an element passes its value to a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind<'a> {
    Positional,
    Keyword(&'a str),
    /// `*iterable`
    Starred,
    /// `**mapping`
    Unpacked,
}

/// One comma-separated slot of a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub items: Vec<Item>,
    pub comma: Option<Token>,
}

impl Element {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items, comma: None }
    }

    /// `name=value` built from scratch
    pub fn keyword(name: &str, value: Vec<Item>) -> Self {
        let mut items = vec![Item::Token(Token::name(name)), Item::Token(Token::op("="))];
        items.extend(value);
        Self::new(items)
    }

    pub fn first_token(&self) -> Option<&Token> {
        self.items.first().map(Item::first_token)
    }

    pub fn first_token_mut(&mut self) -> Option<&mut Token> {
        self.items.first_mut().map(Item::first_token_mut)
    }

    pub fn argument_kind(&self) -> ArgumentKind<'_> {
        if let Some(name) = self.keyword_name() {
            return ArgumentKind::Keyword(name);
        }
        match self.items.first() {
            Some(item) if item.is_op("**") => ArgumentKind::Unpacked,
            Some(item) if item.is_op("*") => ArgumentKind::Starred,
            _ => ArgumentKind::Positional,
        }
    }

    /// `name` when the element reads `name = ...`
    pub fn keyword_name(&self) -> Option<&str> {
        match self.items.as_slice() {
            [Item::Token(name), Item::Token(eq), _, ..]
                if name.is_identifier() && eq.is_op("=") =>
            {
                Some(name.text.as_str())
            }
            _ => None,
        }
    }

    /// Items after `name =`, or after `key :` for a mapping entry
    pub fn value_items(&self) -> &[Item] {
        if self.keyword_name().is_some() {
            return &self.items[2..];
        }
        match self.mapping_colon() {
            Some(colon) => &self.items[colon + 1..],
            None => &self.items,
        }
    }

    /// `key: value` or `**mapping` inside a brace display
    pub fn is_mapping_entry(&self) -> bool {
        self.mapping_colon().is_some() || self.argument_kind() == ArgumentKind::Unpacked
    }

    /// Index of the `:` of a `key: value` entry
    fn mapping_colon(&self) -> Option<usize> {
        let colon = self.items.iter().position(|item| item.is_op(":"))?;
        (colon > 0 && colon + 1 < self.items.len()).then_some(colon)
    }

    /// Literal value of a `"key": value` mapping entry's key
    pub fn string_key(&self) -> Option<String> {
        match self.items.as_slice() {
            [Item::Token(key), Item::Token(colon), _, ..]
                if key.kind == TokenKind::String && colon.is_op(":") =>
            {
                string_literal_value(&key.text)
            }
            _ => None,
        }
    }

    pub fn has_comments(&self) -> bool {
        self.items.iter().any(item_has_comments)
            || self.comma.as_ref().is_some_and(Token::has_comment)
    }
}

fn item_has_comments(item: &Item) -> bool {
    match item {
        Item::Token(token) => token.has_comment(),
        Item::Group(group) => {
            group.open.has_comment()
                || group.close.has_comment()
                || group.elements.iter().any(Element::has_comments)
        }
    }
}

/// Value of a plain string literal when it can be read without unescaping
///
/// Returns `None` for bytes, f-strings and literals containing backslashes.
pub fn string_literal_value(text: &str) -> Option<String> {
    let quote_at = text.find(['"', '\''])?;
    let prefix = text[..quote_at].to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }
    let rest = &text[quote_at..];
    let quote_len = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
        3
    } else {
        1
    };
    if rest.len() < quote_len * 2 {
        return None;
    }
    let body = &rest[quote_len..rest.len() - quote_len];
    if body.contains('\\') {
        return None;
    }
    Some(body.to_string())
}

/// One logical line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleStatement {
    pub items: Vec<Item>,
    pub newline: Token,
    /// Render canonically even when the printer preserves source text
    pub reformat: bool,
}

/// An indented suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub indent: Token,
    pub body: Vec<Statement>,
    /// Carries comments that trail the suite at its own indentation
    pub dedent: Token,
}

impl Block {
    /// Indentation width of the suite, in columns
    pub fn column(&self) -> usize {
        self.indent.position.column.saturating_sub(1)
    }
}

/// A `header:` line followed by an indented block (if/for/def/with/...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundStatement {
    pub header: Vec<Item>,
    pub newline: Token,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    /// Simple names of the positional bases, in declaration order
    pub bases: Vec<String>,
    pub header: Vec<Item>,
    pub newline: Token,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Simple(SimpleStatement),
    Compound(CompoundStatement),
    Class(ClassDef),
}

impl Statement {
    pub fn first_token(&self) -> Option<&Token> {
        let items = match self {
            Statement::Simple(simple) => &simple.items,
            Statement::Compound(compound) => &compound.header,
            Statement::Class(class) => &class.header,
        };
        items.first().map(Item::first_token)
    }

    pub fn position(&self) -> Position {
        self.first_token()
            .map(|token| token.position)
            .unwrap_or_default()
    }

    pub fn block(&self) -> Option<&Block> {
        match self {
            Statement::Simple(_) => None,
            Statement::Compound(compound) => Some(&compound.block),
            Statement::Class(class) => Some(&class.block),
        }
    }

    pub fn block_mut(&mut self) -> Option<&mut Block> {
        match self {
            Statement::Simple(_) => None,
            Statement::Compound(compound) => Some(&mut compound.block),
            Statement::Class(class) => Some(&mut class.block),
        }
    }

    pub fn as_simple(&self) -> Option<&SimpleStatement> {
        match self {
            Statement::Simple(simple) => Some(simple),
            _ => None,
        }
    }

    pub fn as_simple_mut(&mut self) -> Option<&mut SimpleStatement> {
        match self {
            Statement::Simple(simple) => Some(simple),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDef> {
        match self {
            Statement::Class(class) => Some(class),
            _ => None,
        }
    }
}

/// Indexes through nested block bodies, from the module down
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct StatementPath(pub Vec<usize>);

impl StatementPath {
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }
}

/// A parsed source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub body: Vec<Statement>,
    /// Holds trailing comments and blank lines at end of file
    pub end: Token,
}

impl Module {
    pub fn statement(&self, path: &StatementPath) -> Option<&Statement> {
        let (first, rest) = path.0.split_first()?;
        let mut current = self.body.get(*first)?;
        for index in rest {
            current = current.block()?.body.get(*index)?;
        }
        Some(current)
    }

    pub fn statement_mut(&mut self, path: &StatementPath) -> Option<&mut Statement> {
        let (first, rest) = path.0.split_first()?;
        let mut current = self.body.get_mut(*first)?;
        for index in rest {
            current = current.block_mut()?.body.get_mut(*index)?;
        }
        Some(current)
    }

    /// Line terminator used by the file, `\n` when it has none
    pub fn newline(&self) -> &str {
        fn find(body: &[Statement]) -> Option<&str> {
            body.iter().find_map(|statement| {
                let newline = match statement {
                    Statement::Simple(simple) => &simple.newline,
                    Statement::Compound(compound) => &compound.newline,
                    Statement::Class(class) => &class.newline,
                };
                if newline.text.is_empty() {
                    statement.block().and_then(|block| find(&block.body))
                } else {
                    Some(newline.text.as_str())
                }
            })
        }
        find(&self.body).unwrap_or("\n")
    }
}
