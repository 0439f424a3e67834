// Tests for schema detection and field matching

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::config::DetectorConfig;
    use crate::cst::{Position, StatementPath};
    use crate::parser::parse;
    use crate::schema::patterns::{
        nested_constructor, PatternMatcher, StatementPattern, StatementWalker,
    };
    use crate::schema::{field_call, SchemaDetector};

    fn schema_names(source: &str) -> Vec<String> {
        let module = parse(source).unwrap();
        SchemaDetector::default()
            .detect(&module)
            .into_iter()
            .map(|schema| schema.name)
            .collect()
    }

    #[test]
    fn test_direct_schema_base() {
        let names = schema_names(
            "from marshmallow import Schema\n\nclass UserSchema(Schema):\n    pass\n\nclass Plain:\n    pass\n",
        );
        assert_eq!(names, vec!["UserSchema"]);
    }

    #[test]
    fn test_qualified_and_suffixed_bases() {
        let names = schema_names(
            "class A(ma.Schema):\n    pass\nclass B(BaseSchema):\n    pass\nclass C(SQLAlchemyAutoSchema):\n    pass\n",
        );
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_transitive_detection_regardless_of_order() {
        let source = "class C(B):\n    pass\n\nclass B(A):\n    pass\n\nclass A(Schema):\n    pass\n\nclass D(Other):\n    pass\n";
        assert_eq!(schema_names(source), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_class_named_schema_is_not_itself_a_schema() {
        assert!(schema_names("class Schema:\n    pass\n").is_empty());
    }

    #[test]
    fn test_nested_classes_are_found() {
        let module = parse("class Outer(Schema):\n    class Inner(Schema):\n        x = fields.Str()\n").unwrap();
        let schemas = SchemaDetector::default().detect(&module);
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[1].name, "Inner");
        assert_eq!(schemas[1].path, StatementPath(vec![0, 0]));
        assert_eq!(schemas[1].position, Position::new(2, 5));
    }

    #[test]
    fn test_classes_inside_functions_are_skipped() {
        let source = "def make():\n    class Local(Schema):\n        pass\n    return Local\n\nif True:\n    class Guarded(Schema):\n        pass\n";
        assert_eq!(schema_names(source), vec!["Guarded"]);
    }

    #[test]
    fn test_custom_suffix() {
        let module = parse("class A(Serializer):\n    pass\nclass B(Schema):\n    pass\n").unwrap();
        let detector = SchemaDetector::new(DetectorConfig {
            schema_suffix: "Serializer".to_string(),
            ..DetectorConfig::default()
        });
        let names: Vec<String> = detector.detect(&module).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["A"]);
    }

    #[test]
    fn test_field_assignments() {
        let source = r#"class UserSchema(Schema):
    name = fields.String(required=True)
    tags = List(fields.Str())
    helper = compute(1)
    total: int = 0

    class Meta:
        ordered = True
"#;
        let module = parse(source).unwrap();
        let detector = SchemaDetector::default();
        let schemas = detector.detect(&module);
        let fields = detector.field_assignments(&module, &schemas[0]);
        let summary: Vec<(&str, &str)> = fields
            .iter()
            .map(|field| (field.name.as_str(), field.constructor.as_str()))
            .collect();
        assert_eq!(summary, vec![("name", "String"), ("tags", "List")]);
        assert_eq!(fields[0].path, StatementPath(vec![0, 0]));
    }

    #[test]
    fn test_field_call_shape() {
        let module = parse("a = x.y.Z(1)\nb = x().Z(1)\nc = Z[int](1)\n").unwrap();
        let call = field_call(&module.body[0].as_simple().unwrap().items).unwrap();
        assert_eq!(call.target.text, "a");
        assert_eq!(call.callee(), "x.y.Z");
        assert_eq!(call.constructor(), "Z");
        assert!(field_call(&module.body[1].as_simple().unwrap().items).is_none());
        assert!(field_call(&module.body[2].as_simple().unwrap().items).is_none());
    }

    #[test]
    fn test_nested_constructor_lookup() {
        let module = parse("f(fields.Str(), x.fields.Int(), obj().Str(), Str())\n").unwrap();
        let group = module.body[0].as_simple().unwrap().items[1].as_group().unwrap();
        let config = DetectorConfig::default();
        let found: Vec<Option<&str>> = group
            .elements
            .iter()
            .map(|element| {
                let last = element.items.len() - 1;
                nested_constructor(&element.items, last, &config)
            })
            .collect();
        assert_eq!(found, vec![Some("Str"), Some("Int"), None, Some("Str")]);
    }

    #[test]
    fn test_walker_does_not_enter_functions() {
        let source = "class A:\n    class B:\n        pass\ndef f():\n    class C:\n        pass\n";
        let module = parse(source).unwrap();
        let found = StatementWalker::find_all_outside(
            &module,
            &PatternMatcher::class_def(),
            &PatternMatcher::function_def(),
        );
        let paths: Vec<StatementPath> = found.into_iter().map(|(path, _)| path).collect();
        assert_eq!(paths, vec![StatementPath(vec![0]), StatementPath(vec![0, 0])]);
        assert!(PatternMatcher::function_def().matches(&module.body[1]));
    }
}
