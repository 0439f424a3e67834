//! Whitespace between adjacent tokens of one flat line

use crate::cst::{GroupKind, Token, TokenKind};

/// What the next piece of a sequence starts with
#[derive(Debug, Clone, Copy)]
pub(crate) enum Atom<'a> {
    Token(&'a Token),
    /// Opening bracket of a group
    Open(GroupKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Previous<'a> {
    Token(TokenKind, &'a str),
    /// Closing bracket of a group
    Close,
}

/// Decides, token by token, whether a space separates a piece from the one before
///
/// One spacer covers one sequence: a statement line, or one element of a group.
#[derive(Debug)]
pub(crate) struct Spacer<'a> {
    group: Option<GroupKind>,
    keyword_element: bool,
    index: usize,
    previous: Option<Previous<'a>>,
    /// The previous token was a unary operator or a keyword-argument `=`
    hug_next: bool,
    /// The previous `:` belonged to a slice
    after_slice_colon: bool,
    /// Inside the dots of `from ..pkg import`
    relative_import: bool,
    open_lambdas: usize,
}

impl<'a> Spacer<'a> {
    /// `group` is `None` at statement level
    pub fn new(group: Option<GroupKind>, keyword_element: bool) -> Self {
        Self {
            group,
            keyword_element,
            index: 0,
            previous: None,
            hug_next: false,
            after_slice_colon: false,
            relative_import: false,
            open_lambdas: 0,
        }
    }

    pub fn space_before(&mut self, atom: Atom<'a>) -> bool {
        let space = match self.previous {
            None => false,
            Some(previous) => self.needs_space(previous, atom),
        };
        self.advance(atom);
        space
    }

    fn needs_space(&self, previous: Previous<'a>, atom: Atom<'a>) -> bool {
        if self.hug_next || self.after_slice_colon {
            return false;
        }
        if self.relative_import || previous == Previous::Token(TokenKind::Op, ".") {
            return matches!(atom, Atom::Token(token) if token.is_name("import"));
        }
        match atom {
            Atom::Open(GroupKind::Call | GroupKind::Subscript) => false,
            Atom::Open(_) => true,
            Atom::Token(token) if token.kind == TokenKind::Op => match token.text.as_str() {
                "," | ";" | ":" => false,
                "." => matches!(previous, Previous::Token(TokenKind::Name, "from")),
                "=" => !self.is_hugging_equals(),
                _ => true,
            },
            Atom::Token(_) => true,
        }
    }

    /// `=` of a keyword argument or a lambda default
    fn is_hugging_equals(&self) -> bool {
        self.open_lambdas > 0
            || (self.keyword_element && self.index == 1 && self.group == Some(GroupKind::Call))
    }

    fn advance(&mut self, atom: Atom<'a>) {
        let (hug_next, after_slice_colon) = match atom {
            Atom::Open(_) => (false, false),
            Atom::Token(token) => match (token.kind, token.text.as_str()) {
                (TokenKind::Op, "=") => (self.is_hugging_equals(), false),
                (TokenKind::Op, "-" | "+" | "~" | "*" | "**") => (self.is_operand_expected(), false),
                (TokenKind::Op, "@") => (self.previous.is_none(), false),
                (TokenKind::Op, ":") if self.open_lambdas > 0 => {
                    self.open_lambdas -= 1;
                    (false, false)
                }
                (TokenKind::Op, ":") => (false, self.group == Some(GroupKind::Subscript)),
                (TokenKind::Name, "lambda") => {
                    self.open_lambdas += 1;
                    (false, false)
                }
                _ => (false, false),
            },
        };
        self.relative_import = match atom {
            Atom::Token(token)
                if token.kind == TokenKind::Op && matches!(token.text.as_str(), "." | "...") =>
            {
                self.relative_import
                    || self.previous == Some(Previous::Token(TokenKind::Name, "from"))
            }
            _ => false,
        };
        self.hug_next = hug_next;
        self.after_slice_colon = after_slice_colon;
        self.previous = Some(match atom {
            Atom::Open(_) => Previous::Close,
            Atom::Token(token) => Previous::Token(token.kind, token.text.as_str()),
        });
        self.index += 1;
    }

    /// Whether an operator here would be unary
    fn is_operand_expected(&self) -> bool {
        match self.previous {
            None => true,
            Some(Previous::Close) => false,
            Some(Previous::Token(TokenKind::Op, text)) => text != "...",
            Some(Previous::Token(TokenKind::Name, text)) => {
                crate::cst::is_keyword(text) && !matches!(text, "True" | "False" | "None")
            }
            Some(Previous::Token(..)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::Lexer;
    use pretty_assertions::assert_eq;

    /// Flat text of a bracket-free token sequence
    fn spaced(source: &str, group: Option<GroupKind>, keyword_element: bool) -> String {
        let tokens: Vec<Token> = Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .filter(|token| {
                matches!(
                    token.kind,
                    TokenKind::Name | TokenKind::Number | TokenKind::String | TokenKind::Op
                )
            })
            .collect();
        let mut spacer = Spacer::new(group, keyword_element);
        let mut out = String::new();
        for token in &tokens {
            if spacer.space_before(Atom::Token(token)) {
                out.push(' ');
            }
            out.push_str(&token.text);
        }
        out
    }

    #[test]
    fn test_binary_and_unary_operators() {
        assert_eq!(spaced("x=-1+y", None, false), "x = -1 + y");
        assert_eq!(spaced("return -x", None, false), "return -x");
        assert_eq!(spaced("a, *rest = items", None, false), "a, *rest = items");
        assert_eq!(spaced("2**-1", None, false), "2 ** -1");
        assert_eq!(spaced("True - 1", None, false), "True - 1");
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(spaced("import os , sys", None, false), "import os, sys");
        assert_eq!(spaced("a = 1 ; b = 2", None, false), "a = 1; b = 2");
        assert_eq!(spaced("x . y . z", None, false), "x.y.z");
        assert_eq!(spaced("if x : pass", None, false), "if x: pass");
    }

    #[test]
    fn test_relative_imports() {
        assert_eq!(spaced("from . import a", None, false), "from . import a");
        assert_eq!(spaced("from .. mod import a", None, false), "from ..mod import a");
        assert_eq!(spaced("from ... pkg import a", None, false), "from ...pkg import a");
        assert_eq!(spaced("from ...pkg.sub import a", None, false), "from ...pkg.sub import a");
        assert_eq!(spaced("from ... import a", None, false), "from ... import a");
        assert_eq!(spaced("x = ... if a else b", None, false), "x = ... if a else b");
    }

    #[test]
    fn test_keyword_argument_equals() {
        assert_eq!(spaced("required = True", Some(GroupKind::Call), true), "required=True");
        assert_eq!(spaced("x = 1", None, false), "x = 1");
        assert_eq!(spaced("a : int = 1", Some(GroupKind::Call), false), "a: int = 1");
    }

    #[test]
    fn test_lambda() {
        assert_eq!(spaced("lambda x = 1 : x", None, false), "lambda x=1: x");
        assert_eq!(spaced("lambda : 0", None, false), "lambda: 0");
    }

    #[test]
    fn test_slices() {
        assert_eq!(spaced("1 : - 1", Some(GroupKind::Subscript), false), "1:-1");
        assert_eq!(spaced("a : b", Some(GroupKind::Brace), false), "a: b");
    }

    #[test]
    fn test_decorator() {
        assert_eq!(spaced("@ property", None, false), "@property");
        assert_eq!(spaced("a @ b", None, false), "a @ b");
    }

    #[test]
    fn test_brackets() {
        let name = Token::name("f");
        let mut spacer = Spacer::new(None, false);
        assert!(!spacer.space_before(Atom::Token(&name)));
        assert!(!spacer.space_before(Atom::Open(GroupKind::Call)));

        let keyword = Token::name("if");
        let mut spacer = Spacer::new(None, false);
        spacer.space_before(Atom::Token(&keyword));
        assert!(spacer.space_before(Atom::Open(GroupKind::Paren)));
    }
}
