// Python tokenizer
// Produces significant tokens only; whitespace, comments, blank lines and
// backslash continuations become the prefix of the following token.

use crate::cst::{Position, Token, TokenKind};

use super::SyntaxError;

const THREE_CHAR_OPS: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];
const TWO_CHAR_OPS: &[&str] = &[
    "**", "//", ">>", "<<", "<=", ">=", "==", "!=", "->", "+=", "-=", "*=", "/=", "%=", "&=", "|=",
    "^=", "@=", ":=",
];
const ONE_CHAR_OPS: &str = "+-*/%@&|^~<>()[]{},:.;=";

const STRING_PREFIXES: &[&str] = &["r", "u", "f", "b", "br", "rb", "fr", "rf"];

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    /// Byte offset where the pending prefix starts
    prefix_start: usize,
    indents: Vec<usize>,
    brackets: Vec<(char, Position)>,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
            prefix_start: 0,
            indents: vec![0],
            brackets: Vec::new(),
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                if !self.start_line()? {
                    break;
                }
            }

            match self.peek() {
                None => break,
                Some(' ' | '\t' | '\x0c') => {
                    self.bump();
                }
                Some('\\') => self.continuation()?,
                Some('#') => self.skip_comment(),
                Some('\n' | '\r') => {
                    if self.brackets.is_empty() {
                        let start = self.here();
                        let text = self.newline();
                        self.emit(TokenKind::Newline, text, start);
                        self.at_line_start = true;
                    } else {
                        self.newline();
                    }
                }
                Some(c) => self.token(c)?,
            }
        }
        self.finish()
    }

    /// Handle indentation at the start of a logical line
    ///
    /// Returns `false` once the input is exhausted.
    fn start_line(&mut self) -> Result<bool, SyntaxError> {
        loop {
            let mut width = 0;
            let mut offset = self.pos;
            let src = self.src;
            let bytes = src.as_bytes();
            while offset < bytes.len() {
                match bytes[offset] {
                    b' ' => width += 1,
                    b'\t' => width = (width / 8 + 1) * 8,
                    b'\x0c' => width = 0,
                    _ => break,
                }
                offset += 1;
            }
            match bytes.get(offset) {
                None => {
                    self.advance_to(offset);
                    return Ok(false);
                }
                Some(b'\n' | b'\r' | b'#') => {
                    // Blank or comment-only line: pure trivia
                    self.advance_to(offset);
                    self.skip_comment();
                    if self.peek().is_none() {
                        return Ok(false);
                    }
                    self.newline();
                    continue;
                }
                Some(_) => {
                    self.advance_to(offset);
                    self.at_line_start = false;
                    self.indent_to(width)?;
                    return Ok(true);
                }
            }
        }
    }

    fn indent_to(&mut self, width: usize) -> Result<(), SyntaxError> {
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            // The column of an indent marker is the block's tab-expanded width
            let position = Position::new(self.line, width + 1);
            self.push_marker(TokenKind::Indent, position);
        } else if width < current {
            while self.indents.last().is_some_and(|&top| top > width) {
                self.indents.pop();
                let position = self.here();
                self.push_marker(TokenKind::Dedent, position);
            }
            if self.indents.last() != Some(&width) {
                return Err(SyntaxError::new(
                    "unindent does not match any outer indentation level",
                    self.here(),
                ));
            }
        }
        Ok(())
    }

    fn continuation(&mut self) -> Result<(), SyntaxError> {
        let start = self.here();
        self.bump();
        match self.peek() {
            Some('\n' | '\r') => {
                self.newline();
                Ok(())
            }
            None => Err(SyntaxError::new("unexpected EOF after line continuation", start)),
            Some(_) => Err(SyntaxError::new(
                "unexpected character after line continuation character",
                start,
            )),
        }
    }

    fn skip_comment(&mut self) {
        if self.peek() == Some('#') {
            while let Some(c) = self.peek() {
                if c == '\n' || c == '\r' {
                    break;
                }
                self.bump();
            }
        }
    }

    /// Consume one line terminator and return its text
    fn newline(&mut self) -> String {
        let start = self.pos;
        if self.peek() == Some('\r') {
            self.bump();
        }
        if self.peek() == Some('\n') {
            self.bump();
        }
        self.line += 1;
        self.column = 1;
        self.src[start..self.pos].to_string()
    }

    fn token(&mut self, c: char) -> Result<(), SyntaxError> {
        let start = self.here();
        let begin = self.pos;

        if c.is_alphabetic() || c == '_' {
            while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                self.bump();
            }
            let word = self.src[begin..self.pos].to_ascii_lowercase();
            if matches!(self.peek(), Some('"' | '\'')) && STRING_PREFIXES.contains(&word.as_str()) {
                self.string_body(word.contains('f'), start)?;
                return self.emit_from(TokenKind::String, begin, start);
            }
            return self.emit_from(TokenKind::Name, begin, start);
        }

        if c == '"' || c == '\'' {
            self.string_body(false, start)?;
            return self.emit_from(TokenKind::String, begin, start);
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
            self.number();
            return self.emit_from(TokenKind::Number, begin, start);
        }

        let rest = &self.src[self.pos..];
        let op = THREE_CHAR_OPS
            .iter()
            .chain(TWO_CHAR_OPS)
            .find(|op| rest.starts_with(*op))
            .map(|op| op.len())
            .or_else(|| ONE_CHAR_OPS.contains(c).then_some(c.len_utf8()));

        let Some(len) = op else {
            return Err(SyntaxError::new(format!("invalid character '{c}'"), start));
        };
        for _ in 0..len {
            self.bump();
        }
        match c {
            '(' | '[' | '{' if len == 1 => self.brackets.push((c, start)),
            ')' | ']' | '}' if len == 1 => self.close_bracket(c, start)?,
            _ => {}
        }
        self.emit_from(TokenKind::Op, begin, start)
    }

    fn close_bracket(&mut self, close: char, at: Position) -> Result<(), SyntaxError> {
        match self.brackets.pop() {
            None => Err(SyntaxError::new(format!("unmatched '{close}'"), at)),
            Some((open, _)) if matching(open) != close => Err(SyntaxError::new(
                format!("closing parenthesis '{close}' does not match opening parenthesis '{open}'"),
                at,
            )),
            Some(_) => Ok(()),
        }
    }

    fn number(&mut self) {
        let hex = self.src[self.pos..].starts_with("0x") || self.src[self.pos..].starts_with("0X");
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.bump();
                if !hex && (c == 'e' || c == 'E') && matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    /// Scan a string literal starting at the opening quote
    fn string_body(&mut self, formatted: bool, start: Position) -> Result<(), SyntaxError> {
        let quote = self.peek().unwrap_or('"');
        let triple = self.src[self.pos..].starts_with(&quote.to_string().repeat(3));
        let delimiter_len = if triple { 3 } else { 1 };
        for _ in 0..delimiter_len {
            self.bump();
        }

        loop {
            match self.peek() {
                None => {
                    let message = if triple {
                        "unterminated triple-quoted string literal"
                    } else {
                        "unterminated string literal"
                    };
                    return Err(SyntaxError::new(message, start));
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some('\n' | '\r') => {
                            self.newline();
                        }
                        Some(_) => {
                            self.bump();
                        }
                        None => {}
                    }
                }
                Some('\n' | '\r') if !triple => {
                    return Err(SyntaxError::new("unterminated string literal", start));
                }
                Some('\n' | '\r') => {
                    self.newline();
                }
                Some(c) if c == quote => {
                    if !triple {
                        self.bump();
                        return Ok(());
                    }
                    if self.src[self.pos..].starts_with(&quote.to_string().repeat(3)) {
                        for _ in 0..3 {
                            self.bump();
                        }
                        return Ok(());
                    }
                    self.bump();
                }
                Some('{') if formatted => {
                    self.bump();
                    if self.peek() == Some('{') {
                        self.bump();
                    } else {
                        self.replacement_field(triple, start)?;
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Scan an f-string `{...}` field; the opening brace is already consumed
    fn replacement_field(&mut self, triple: bool, start: Position) -> Result<(), SyntaxError> {
        let mut depth = 0usize;
        let mut in_spec = false;
        loop {
            match self.peek() {
                None => return Err(SyntaxError::new("unterminated string literal", start)),
                Some('\n' | '\r') if !triple => {
                    return Err(SyntaxError::new("unterminated string literal", start));
                }
                Some('\n' | '\r') => {
                    self.newline();
                }
                Some('}') if depth == 0 => {
                    self.bump();
                    return Ok(());
                }
                Some('{') if in_spec => {
                    self.bump();
                    self.replacement_field(triple, start)?;
                }
                Some(':') if depth == 0 && !in_spec => {
                    in_spec = true;
                    self.bump();
                }
                Some('"' | '\'') if !in_spec => {
                    let nested = self.here();
                    self.string_body(false, nested)?;
                }
                Some(c) if !in_spec && c.is_alphabetic() => {
                    let begin = self.pos;
                    while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
                        self.bump();
                    }
                    let word = self.src[begin..self.pos].to_ascii_lowercase();
                    if matches!(self.peek(), Some('"' | '\''))
                        && STRING_PREFIXES.contains(&word.as_str())
                    {
                        let nested = self.here();
                        self.string_body(word.contains('f'), nested)?;
                    }
                }
                Some('(' | '[' | '{') if !in_spec => {
                    depth += 1;
                    self.bump();
                }
                Some(')' | ']' | '}') if !in_spec => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn finish(mut self) -> Result<Vec<Token>, SyntaxError> {
        if let Some(&(open, at)) = self.brackets.last() {
            return Err(SyntaxError::new(format!("'{open}' was never closed"), at));
        }
        let needs_newline = self
            .tokens
            .last()
            .is_some_and(|token| !matches!(token.kind, TokenKind::Newline | TokenKind::Dedent));
        if needs_newline {
            let position = self.here();
            self.emit(TokenKind::Newline, String::new(), position);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            let position = self.here();
            self.push_marker(TokenKind::Dedent, position);
        }
        let position = self.here();
        self.emit(TokenKind::EndMarker, String::new(), position);
        Ok(self.tokens)
    }

    fn emit_from(&mut self, kind: TokenKind, begin: usize, start: Position) -> Result<(), SyntaxError> {
        let text = self.src[begin..self.pos].to_string();
        let prefix = self.src[self.prefix_start..begin].to_string();
        self.tokens.push(Token {
            kind,
            text,
            prefix,
            position: start,
        });
        self.prefix_start = self.pos;
        Ok(())
    }

    /// Emit a token whose text ends at the current offset
    fn emit(&mut self, kind: TokenKind, text: String, position: Position) {
        let begin = self.pos - text.len();
        let prefix = self.src[self.prefix_start..begin].to_string();
        self.tokens.push(Token {
            kind,
            text,
            prefix,
            position,
        });
        self.prefix_start = self.pos;
    }

    /// Indent and dedent markers take no text and leave the pending prefix alone
    fn push_marker(&mut self, kind: TokenKind, position: Position) {
        self.tokens.push(Token {
            kind,
            text: String::new(),
            prefix: String::new(),
            position,
        });
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            self.column += 1;
        }
    }

    /// Advance over bytes known not to contain line terminators
    fn advance_to(&mut self, offset: usize) {
        while self.pos < offset {
            self.bump();
        }
    }
}

fn matching(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}
