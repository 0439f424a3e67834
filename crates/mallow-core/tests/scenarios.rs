/*!
# Pipeline Scenario Tests

End-to-end runs of the public API over small schema modules.
*/

use mallow_core::{
    parse, DetectorConfig, KeywordSelection, MallowConfig, MallowError, MigrationRule, Pipeline,
    PrintMode, StyleConfig, WarningKind,
};
use pretty_assertions::assert_eq;

fn migrate_description() -> MallowConfig {
    MallowConfig::new().migrate(["description"], "metadata")
}

fn with_width(config: MallowConfig, line_length: usize) -> MallowConfig {
    let style = StyleConfig {
        line_length,
        ..config.style.clone()
    };
    config.with_style(style)
}

fn preserve(config: MallowConfig) -> MallowConfig {
    let style = StyleConfig {
        mode: PrintMode::Preserve,
        ..config.style.clone()
    };
    config.with_style(style)
}

const USER_SCHEMA: &str = "class UserSchema(Schema):\n    my_field = fields.String(allow_none=True, description=\"hi\")\n";

#[test]
fn test_migrates_description_into_metadata() -> anyhow::Result<()> {
    let output = Pipeline::new(migrate_description()).run(USER_SCHEMA)?;
    assert_eq!(
        output.text,
        "class UserSchema(Schema):\n    my_field = fields.String(allow_none=True, metadata={\"description\": \"hi\"})\n"
    );
    assert!(output.changed);
    assert_eq!(output.report.migrated_count(), 1);
    Ok(())
}

#[test]
fn test_migrated_call_reflows_past_line_width() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(with_width(migrate_description(), 60));
    let output = pipeline.run(USER_SCHEMA)?;
    assert_eq!(
        output.text,
        concat!(
            "class UserSchema(Schema):\n",
            "    my_field = fields.String(\n",
            "        allow_none=True,\n",
            "        metadata={\"description\": \"hi\"},\n",
            "    )\n",
        )
    );
    Ok(())
}

#[test]
fn test_non_schema_class_is_not_rewritten() -> anyhow::Result<()> {
    let source = "class Helper(object):\n    my_field = fields.String(allow_none=True, description=\"hi\")\n";
    let output = Pipeline::new(migrate_description()).run(source)?;
    assert_eq!(output.text, source);
    assert!(!output.changed);
    assert!(output.report.edits.is_empty());
    assert_eq!(output.report.schemas, 0);
    Ok(())
}

#[test]
fn test_merges_into_existing_metadata() -> anyhow::Result<()> {
    let source = "class S(Schema):\n    f = fields.String(metadata={'a': 1}, description='d')\n";
    let output = Pipeline::new(migrate_description()).run(source)?;
    assert_eq!(
        output.text,
        "class S(Schema):\n    f = fields.String(metadata={\"a\": 1, \"description\": \"d\"})\n"
    );
    let edit = &output.report.edits[0];
    assert!(!edit.created_destination);
    assert_eq!(edit.migrated, vec!["description"]);
    Ok(())
}

#[test]
fn test_duplicate_key_warns_and_keeps_migrated_value() -> anyhow::Result<()> {
    let source =
        "class S(Schema):\n    f = fields.String(metadata={\"description\": \"old\"}, description=\"new\")\n";
    let output = Pipeline::new(migrate_description()).run(source)?;
    assert!(output.text.contains("\"description\": \"new\""));
    assert!(!output.text.contains("\"old\""));
    assert_eq!(output.report.warnings.len(), 1);
    assert_eq!(output.report.warnings[0].kind, WarningKind::DuplicateKey);
    Ok(())
}

#[test]
fn test_non_core_selection_over_inherited_schema() -> anyhow::Result<()> {
    let source = concat!(
        "class BaseSchema(Schema):\n",
        "    pass\n",
        "\n",
        "class Child(BaseSchema):\n",
        "    tags = fields.List(fields.String(), required=True, doc=\"a\")\n",
    );
    let config = MallowConfig::new().with_migration(MigrationRule {
        enabled: true,
        selection: KeywordSelection::NonCore,
        ..MigrationRule::default()
    });
    let output = Pipeline::new(config).run(source)?;
    assert!(output.text.contains(
        "    tags = fields.List(fields.String(), required=True, metadata={\"doc\": \"a\"})\n"
    ));
    assert_eq!(output.report.schemas, 2);
    Ok(())
}

#[test]
fn test_custom_suffix_and_field_constructor() -> anyhow::Result<()> {
    let source = "class UserSerializer(BaseSerializer):\n    price = fields.Money(description='cost')\n";
    let mut detector = DetectorConfig {
        schema_suffix: "Serializer".to_string(),
        ..DetectorConfig::default()
    };
    detector.extra_fields.insert("Money".to_string());
    let mut config = migrate_description();
    config.detector = detector;

    let output = Pipeline::new(config).run(source)?;
    assert_eq!(
        output.text,
        "class UserSerializer(BaseSerializer):\n    price = fields.Money(metadata={\"description\": \"cost\"})\n"
    );
    Ok(())
}

#[test]
fn test_preserve_mode_reformats_only_schema_fields() -> anyhow::Result<()> {
    let source = concat!(
        "import os\n",
        "x=1\n",
        "class S(Schema):\n",
        "    a   =   fields.String( required = True )\n",
        "    b = 1   +   2\n",
    );
    let output = Pipeline::new(preserve(MallowConfig::new())).run(source)?;
    assert_eq!(
        output.text,
        concat!(
            "import os\n",
            "x=1\n",
            "class S(Schema):\n",
            "    a = fields.String(required=True)\n",
            "    b = 1   +   2\n",
        )
    );
    Ok(())
}

#[test]
fn test_only_changed_leaves_untouched_fields_alone() -> anyhow::Result<()> {
    let source = concat!(
        "class S(Schema):\n",
        "    a   =   fields.String( required = True )\n",
        "    b = fields.Int( description = 'count' )\n",
    );
    let mut config = preserve(migrate_description());
    config.format_fields = false;
    let pipeline = Pipeline::new(config);

    let output = pipeline.run(source)?;
    assert_eq!(
        output.text,
        concat!(
            "class S(Schema):\n",
            "    a   =   fields.String( required = True )\n",
            "    b = fields.Int(metadata={\"description\": \"count\"})\n",
        )
    );

    let mut config = preserve(MallowConfig::new());
    config.format_fields = false;
    let untouched = Pipeline::new(config).run(source)?;
    assert_eq!(untouched.text, source);
    assert!(!untouched.changed);
    Ok(())
}

#[test]
fn test_pipeline_is_idempotent() -> anyhow::Result<()> {
    let source = concat!(
        "class UserSchema(Schema):\n",
        "    # identity\n",
        "    id = fields.Int(dump_only=True, description='Primary key of the user row in the database')\n",
        "    name = fields.Str(required=True, description=\"Display name\", example='Ada')\n",
        "\n",
        "    class Meta:\n",
        "        ordered = True\n",
    );
    let config = MallowConfig::new().migrate(["description", "example"], "metadata");
    let pipeline = Pipeline::new(config);

    let first = pipeline.run(source)?;
    assert!(first.changed);
    let second = pipeline.run(&first.text)?;
    assert_eq!(second.text, first.text);
    assert!(!second.changed);
    assert!(second.report.edits.is_empty());
    Ok(())
}

#[test]
fn test_diff_is_empty_only_when_nothing_changes() -> anyhow::Result<()> {
    let pipeline = Pipeline::new(migrate_description());
    let diff = pipeline.diff(USER_SCHEMA, "user.py")?;
    assert!(diff.starts_with("--- a/user.py"));
    assert!(diff.contains("+++ b/user.py"));
    assert!(diff.contains("-    my_field = fields.String(allow_none=True, description=\"hi\")"));

    let output = pipeline.run(USER_SCHEMA)?;
    assert_eq!(pipeline.diff(&output.text, "user.py")?, "");
    Ok(())
}

#[test]
fn test_report_serializes_to_json() -> anyhow::Result<()> {
    let output = Pipeline::new(migrate_description()).run_file(USER_SCHEMA, Some("user.py"))?;
    let json = serde_json::to_value(&output.report)?;
    assert_eq!(json["schemas"], 1);
    let edit = &json["edits"][0];
    assert_eq!(edit["class_name"], "UserSchema");
    assert_eq!(edit["field_name"], "my_field");
    assert_eq!(edit["migrated"][0], "description");
    assert_eq!(edit["position"]["line"], 2);
    assert!(edit.get("before").is_none());
    Ok(())
}

#[test]
fn test_trailing_comment_follows_migrated_keyword() -> anyhow::Result<()> {
    let source = "class S(Schema):\n    f = fields.String(\n        required=True,\n        description=\"d\",  # why\n    )\n";
    let output = Pipeline::new(migrate_description()).run(source)?;
    assert_eq!(
        output.text,
        concat!(
            "class S(Schema):\n",
            "    f = fields.String(\n",
            "        required=True,\n",
            "        metadata={\n",
            "            \"description\": \"d\",  # why\n",
            "        },\n",
            "    )\n",
        )
    );
    assert_eq!(Pipeline::new(migrate_description()).run(&output.text)?.text, output.text);
    Ok(())
}

#[test]
fn test_syntax_error_carries_position() {
    let error = Pipeline::default().run("x = 1\ny = )\n").unwrap_err();
    assert!(error.to_string().contains("line 2"));
    match error {
        MallowError::Syntax(syntax) => assert_eq!(syntax.line, 2),
        other => panic!("expected a syntax error, got {other}"),
    }
    assert!(parse("def f(:\n").is_err());
}

#[test]
fn test_rejected_configuration_fails_the_run() {
    let config = MallowConfig::new().migrate(["description"], "class");
    let error = Pipeline::new(config).run(USER_SCHEMA).unwrap_err();
    assert!(matches!(error, MallowError::Config(_)));
}
