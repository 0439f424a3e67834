// Tests for the tokenizer

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::cst::{Position, TokenKind};
    use crate::parser::lexer::Lexer;

    fn kinds_and_texts(source: &str) -> Vec<(TokenKind, String)> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect()
    }

    #[test]
    fn test_simple_assignment() {
        let tokens = kinds_and_texts("x = 1\n");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Name, "x".to_string()),
                (TokenKind::Op, "=".to_string()),
                (TokenKind::Number, "1".to_string()),
                (TokenKind::Newline, "\n".to_string()),
                (TokenKind::EndMarker, String::new()),
            ]
        );
    }

    #[test]
    fn test_tokens_partition_source() {
        let source = "# head\n\nclass A(Schema):  # trailing\n    x = f(\n        1,  # one\n    )\n\n# tail\n";
        let tokens = Lexer::new(source).tokenize().unwrap();
        let rebuilt: String = tokens
            .iter()
            .map(|token| format!("{}{}", token.prefix, token.text))
            .collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn test_comment_goes_to_next_token_prefix() {
        let tokens = Lexer::new("# lead\nx = 1\n").tokenize().unwrap();
        assert_eq!(tokens[0].prefix, "# lead\n");
        assert_eq!(tokens[0].position, Position::new(2, 1));
    }

    #[test]
    fn test_same_line_comment_goes_to_newline() {
        let tokens = Lexer::new("x = 1  # note\n").tokenize().unwrap();
        let newline = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Newline)
            .unwrap();
        assert_eq!(newline.prefix, "  # note");
    }

    #[test]
    fn test_indent_and_dedent() {
        let tokens = kinds_and_texts("if x:\n    y\nz\n");
        let kinds: Vec<TokenKind> = tokens.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Name,
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Name,
                TokenKind::Newline,
                TokenKind::EndMarker,
            ]
        );
    }

    #[test]
    fn test_indent_column_is_expanded_width() {
        let tokens = Lexer::new("if x:\n\ty\n").tokenize().unwrap();
        let indent = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Indent)
            .unwrap();
        assert_eq!(indent.position.column, 9);
    }

    #[test]
    fn test_no_newline_tokens_inside_brackets() {
        let tokens = kinds_and_texts("f(\n    a,\n    b,\n)\n");
        let newlines = tokens
            .iter()
            .filter(|(kind, _)| *kind == TokenKind::Newline)
            .count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn test_missing_final_newline() {
        let tokens = kinds_and_texts("x = 1");
        assert_eq!(tokens[3], (TokenKind::Newline, String::new()));
    }

    #[test]
    fn test_crlf_newlines() {
        let tokens = kinds_and_texts("x = 1\r\ny = 2\r\n");
        assert_eq!(tokens[3], (TokenKind::Newline, "\r\n".to_string()));
    }

    #[test]
    fn test_string_forms() {
        let source = "a = 'x' \"y\" r'\\d' b\"z\" '''multi\nline''' f\"{a['k']!r:>{width}}\"\n";
        let strings: Vec<String> = kinds_and_texts(source)
            .into_iter()
            .filter(|(kind, _)| *kind == TokenKind::String)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(
            strings,
            vec![
                "'x'",
                "\"y\"",
                "r'\\d'",
                "b\"z\"",
                "'''multi\nline'''",
                "f\"{a['k']!r:>{width}}\"",
            ]
        );
    }

    #[test]
    fn test_nested_same_quote_fstring() {
        let strings: Vec<String> = kinds_and_texts("x = f\"{d[\"k\"]}\"\n")
            .into_iter()
            .filter(|(kind, _)| *kind == TokenKind::String)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(strings, vec!["f\"{d[\"k\"]}\""]);
    }

    #[test]
    fn test_numbers() {
        let numbers: Vec<String> = kinds_and_texts("n = 1_000 + 0xFF + 1.5e-3 + .5j\n")
            .into_iter()
            .filter(|(kind, _)| *kind == TokenKind::Number)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(numbers, vec!["1_000", "0xFF", "1.5e-3", ".5j"]);
    }

    #[test]
    fn test_longest_operator_match() {
        let ops: Vec<String> = kinds_and_texts("a **= b // c -> ...\n")
            .into_iter()
            .filter(|(kind, _)| *kind == TokenKind::Op)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(ops, vec!["**=", "//", "->", "..."]);
    }

    #[test]
    fn test_line_continuation_is_trivia() {
        let tokens = Lexer::new("x = 1 + \\\n    2\n").tokenize().unwrap();
        let two = tokens.iter().find(|token| token.text == "2").unwrap();
        assert_eq!(two.prefix, " \\\n    ");
        assert_eq!(two.position, Position::new(2, 5));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("x = 'abc\n").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn test_unterminated_triple_quoted_string() {
        let err = Lexer::new("x = \"\"\"abc\n").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated triple-quoted string literal");
    }

    #[test]
    fn test_unclosed_bracket() {
        let err = Lexer::new("x = f(1,\n").tokenize().unwrap_err();
        assert_eq!(err.message, "'(' was never closed");
        assert_eq!((err.line, err.column), (1, 6));
    }

    #[test]
    fn test_mismatched_bracket() {
        let err = Lexer::new("x = [1)\n").tokenize().unwrap_err();
        assert!(err.message.contains("does not match"));
        assert_eq!((err.line, err.column), (1, 7));
    }

    #[test]
    fn test_unmatched_close() {
        let err = Lexer::new("x = 1)\n").tokenize().unwrap_err();
        assert_eq!(err.message, "unmatched ')'");
    }

    #[test]
    fn test_invalid_character() {
        let err = Lexer::new("x = 1 $ 2\n").tokenize().unwrap_err();
        assert_eq!(err.message, "invalid character '$'");
        assert_eq!((err.line, err.column), (1, 7));
    }

    #[test]
    fn test_bad_dedent() {
        let err = Lexer::new("if x:\n    a\n  b\n").tokenize().unwrap_err();
        assert_eq!(
            err.message,
            "unindent does not match any outer indentation level"
        );
        assert_eq!(err.line, 3);
    }
}
