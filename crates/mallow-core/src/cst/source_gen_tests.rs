// Tests for source regeneration and tree helpers

#[cfg(test)]
mod source_tests {
    use pretty_assertions::assert_eq;

    use crate::cst::{
        string_literal_value, Element, Group, GroupKind, Item, StatementPath, ToSource, Token,
        TokenKind,
    };
    use crate::parser::parse;

    #[test]
    fn test_round_trip_preserves_trivia() {
        let source = r#"# -*- coding: utf-8 -*-
from marshmallow import Schema, fields


class UserSchema(Schema):  # users
    """Docstring stays."""

    name = fields.String(  required = True ,
        description='the name' ,)   # odd spacing
    # a comment between fields

    age = fields.Integer(
        # leading comment
        missing=0,
    )
"#;
        let module = parse(source).unwrap();
        assert_eq!(module.to_source(), source);
    }

    #[test]
    fn test_round_trip_without_final_newline() {
        let source = "x = {'a': 1,\n     'b': 2}";
        assert_eq!(parse(source).unwrap().to_source(), source);
    }

    #[test]
    fn test_synthetic_group_to_source() {
        let mut group = Group::new(
            GroupKind::Brace,
            vec![
                Element::new(vec![
                    Item::Token(Token::synthetic(TokenKind::String, "\"a\"")),
                    Item::Token(Token::op(":")),
                    Item::Token(Token::synthetic(TokenKind::Number, "1").with_prefix(" ")),
                ]),
                Element::new(vec![Item::Token(
                    Token::synthetic(TokenKind::Name, "b").with_prefix(" "),
                )]),
            ],
        );
        group.normalize_commas(false);
        assert_eq!(group.to_source(), "{\"a\": 1, b}");
        group.normalize_commas(true);
        assert_eq!(group.to_source(), "{\"a\": 1, b,}");
    }

    #[test]
    fn test_keyword_element_helpers() {
        let module = parse("f(required=True, **extra)\n").unwrap();
        let group = module.body[0].as_simple().unwrap().items[1].as_group().unwrap();
        assert_eq!(group.keyword_index("required"), Some(0));
        assert_eq!(group.keyword_index("extra"), None);
        assert_eq!(group.elements[0].value_items().to_source(), "True");
    }

    #[test]
    fn test_string_key_values() {
        assert_eq!(string_literal_value("'abc'"), Some("abc".to_string()));
        assert_eq!(string_literal_value("\"\"\"abc\"\"\""), Some("abc".to_string()));
        assert_eq!(string_literal_value("u'abc'"), Some("abc".to_string()));
        assert_eq!(string_literal_value("b'abc'"), None);
        assert_eq!(string_literal_value("f'{abc}'"), None);
        assert_eq!(string_literal_value("'a\\'b'"), None);
    }

    #[test]
    fn test_statement_paths() {
        let module = parse("class A:\n    class B:\n        x = 1\n").unwrap();
        let inner = module.statement(&StatementPath(vec![0, 0, 0])).unwrap();
        assert_eq!(inner.to_source(), "        x = 1\n");
        assert!(module.statement(&StatementPath(vec![0, 3])).is_none());
        assert_eq!(StatementPath::root(0).child(0), StatementPath(vec![0, 0]));
    }
}
