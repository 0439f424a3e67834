// Tests for statement and group parsing

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::cst::{ArgumentKind, GroupKind, Item, Statement, ToSource};
    use crate::parser::parse;

    fn first_group(statement: &Statement) -> &crate::cst::Group {
        statement
            .as_simple()
            .unwrap()
            .items
            .iter()
            .find_map(Item::as_group)
            .unwrap()
    }

    #[test]
    fn test_parse_empty_file() {
        let module = parse("").unwrap();
        assert!(module.body.is_empty());
        assert_eq!(module.to_source(), "");
    }

    #[test]
    fn test_parse_only_comments() {
        let source = "# just a comment\n\n# another\n";
        let module = parse(source).unwrap();
        assert!(module.body.is_empty());
        assert_eq!(module.end.prefix, source);
    }

    #[test]
    fn test_call_arguments_split_on_commas() {
        let module = parse("f(a, b=1, *c, **d)\n").unwrap();
        let group = first_group(&module.body[0]);
        assert_eq!(group.kind, GroupKind::Call);
        let kinds: Vec<ArgumentKind> = group
            .elements
            .iter()
            .map(|element| element.argument_kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                ArgumentKind::Positional,
                ArgumentKind::Keyword("b"),
                ArgumentKind::Starred,
                ArgumentKind::Unpacked,
            ]
        );
        assert!(!group.has_trailing_comma());
    }

    #[test]
    fn test_group_kinds() {
        let module = parse("x = (1)\ny = [1]\nz = a[1]\nw = {1: 2}\n").unwrap();
        let kinds: Vec<GroupKind> = module.body.iter().map(|s| first_group(s).kind).collect();
        assert_eq!(
            kinds,
            vec![
                GroupKind::Paren,
                GroupKind::List,
                GroupKind::Subscript,
                GroupKind::Brace,
            ]
        );
    }

    #[test]
    fn test_keyword_before_paren_is_not_a_call() {
        let module = parse("x = not (a)\n").unwrap();
        assert_eq!(first_group(&module.body[0]).kind, GroupKind::Paren);
    }

    #[test]
    fn test_lambda_and_comprehension_commas_do_not_split() {
        let module = parse("f(key=lambda a, b: a, other=[x for x, y in z])\n").unwrap();
        let group = first_group(&module.body[0]);
        assert_eq!(group.elements.len(), 2);
        let inner = group.elements[1].items.iter().find_map(Item::as_group).unwrap();
        assert_eq!(inner.elements.len(), 1);
        assert!(inner.is_comprehension());
    }

    #[test]
    fn test_trailing_comma_recorded() {
        let module = parse("f(\n    a,\n)\n").unwrap();
        assert!(first_group(&module.body[0]).has_trailing_comma());
    }

    #[test]
    fn test_class_def_bases() {
        let module = parse("class A(mod.BaseSchema, Generic[T], metaclass=Meta):\n    pass\n").unwrap();
        let class = module.body[0].as_class().unwrap();
        assert_eq!(class.name, "A");
        assert_eq!(class.bases, vec!["BaseSchema", "Generic"]);
        assert_eq!(class.block.body.len(), 1);
    }

    #[test]
    fn test_class_without_bases() {
        let module = parse("class A:\n    x = 1\n").unwrap();
        let class = module.body[0].as_class().unwrap();
        assert!(class.bases.is_empty());
    }

    #[test]
    fn test_nested_blocks() {
        let source = "class A(Schema):\n    class Meta:\n        ordered = True\n\n    x = 1\n";
        let module = parse(source).unwrap();
        let class = module.body[0].as_class().unwrap();
        assert_eq!(class.block.body.len(), 2);
        assert!(class.block.body[0].as_class().is_some());
        assert_eq!(module.to_source(), source);
    }

    #[test]
    fn test_block_trailing_comment_stays_with_block() {
        let source = "def f():\n    return 1\n    # end of f\n\n# module comment\nx = 1\n";
        let module = parse(source).unwrap();
        let Statement::Compound(def) = &module.body[0] else {
            panic!("expected compound statement");
        };
        assert_eq!(def.block.dedent.prefix, "    # end of f\n");
        let next = module.body[1].first_token().unwrap();
        assert_eq!(next.prefix, "\n# module comment\n");
        assert_eq!(module.to_source(), source);
    }

    #[test]
    fn test_expected_indented_block() {
        let err = parse("if x:\ny = 1\n").unwrap_err();
        assert_eq!(err.message, "expected an indented block");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unexpected_indent() {
        let err = parse("x = 1\n    y = 2\n").unwrap_err();
        assert_eq!(err.message, "unexpected indent");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_empty_argument_is_an_error() {
        let err = parse("f(a, , b)\n").unwrap_err();
        assert_eq!(err.message, "invalid syntax");
        assert_eq!((err.line, err.column), (1, 6));
    }

    #[test]
    fn test_dangling_operator_is_an_error() {
        let err = parse("x = 1 +\n").unwrap_err();
        assert_eq!((err.line, err.column), (1, 7));
    }

    #[test]
    fn test_malformed_class_header() {
        let err = parse("class (A):\n    pass\n").unwrap_err();
        assert_eq!(err.message, "invalid syntax");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_star_import_is_valid() {
        assert!(parse("from os import *\n").is_ok());
    }

    #[test]
    fn test_match_statement_subject_is_not_a_call() {
        let module = parse("match (x):\n    case [a, b]:\n        pass\n").unwrap();
        let Statement::Compound(statement) = &module.body[0] else {
            panic!("expected compound statement");
        };
        assert_eq!(statement.header[1].as_group().unwrap().kind, GroupKind::Paren);
    }

    #[test]
    fn test_round_trip_odd_formatting() {
        let source = "x   =  f( a,b ,\n\n      c=  'q' )   # trailing\r\nif y :\n\tpass\n";
        let module = parse(source).unwrap();
        assert_eq!(module.to_source(), source);
    }
}
