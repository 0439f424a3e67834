use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::{debug, info};

use mallow_cli::{
    load_config, Action, ColorChoice, ConsoleReporter, Discovery, Overrides, Runner,
};
use mallow_core::{init_tracing, Pipeline, PrintMode};

fn cli() -> Command {
    Command::new("mallow")
        .version(mallow_core::VERSION)
        .about("Migrate and format marshmallow schema definitions")
        .arg(
            Arg::new("paths")
                .value_name("PATH")
                .help("Files or directories to process")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("line-length")
                .long("line-length")
                .visible_alias("max-line-length")
                .value_name("N")
                .help("Target line width [default: 80]")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("indent-size")
                .long("indent-size")
                .value_name("N")
                .help("Spaces per indentation level [default: 4]")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("Re-render every statement, or keep untouched ones byte-for-byte [default: canonical]")
                .value_parser(["canonical", "preserve"]),
        )
        .arg(
            Arg::new("only-changed")
                .long("only-changed")
                .help("Preserve mode, reformatting only the rewritten fields")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("migrate-metadata")
                .long("migrate-metadata")
                .visible_alias("fix-kwargs-for-marshmallow-4")
                .help("Move extra keyword arguments of field calls into the metadata mapping")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("migrate")
                .long("migrate")
                .value_name("NAME")
                .help("Keyword to migrate (repeatable); default: every non-core keyword")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("destination")
                .long("destination")
                .value_name("NAME")
                .help("Keyword argument receiving migrated keywords [default: metadata]"),
        )
        .arg(
            Arg::new("schema-suffix")
                .long("schema-suffix")
                .value_name("SUFFIX")
                .help("Base-class name suffix marking a schema [default: Schema]"),
        )
        .arg(
            Arg::new("field")
                .long("field")
                .value_name("NAME")
                .help("Additional field constructor name (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("sort")
                .long("sort")
                .help("Sort keyword arguments and metadata keys of schema fields")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-trailing-commas")
                .long("no-trailing-commas")
                .help("Never add trailing commas to exploded brackets")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-string-wrap")
                .long("no-string-wrap")
                .help("Leave long string literals unwrapped")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-normalize-quotes")
                .long("no-normalize-quotes")
                .help("Keep string prefixes and quote characters as written")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("diff")
                .long("diff")
                .help("Print unified diffs instead of writing files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Exit with status 1 if any file would change; write nothing")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .value_name("WHEN")
                .help("Colour diff output")
                .value_parser(["auto", "always", "never"])
                .default_value("auto"),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .value_name("REGEX")
                .help("Skip paths matching this pattern during discovery"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file [default: mallow.toml or pyproject.toml [tool.mallow]]")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("report-json")
                .long("report-json")
                .help("Print the batch report as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log every pipeline stage")
                .action(ArgAction::SetTrue),
        )
}

fn overrides(matches: &ArgMatches) -> Overrides {
    let strings = |id: &str| -> Vec<String> {
        matches
            .get_many::<String>(id)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    };
    Overrides {
        line_length: matches.get_one::<usize>("line-length").copied(),
        indent_size: matches.get_one::<usize>("indent-size").copied(),
        mode: matches
            .get_one::<String>("mode")
            .map(|mode| match mode.as_str() {
                "preserve" => PrintMode::Preserve,
                _ => PrintMode::Canonical,
            }),
        only_changed: matches.get_flag("only-changed"),
        migrate_metadata: matches.get_flag("migrate-metadata"),
        migrate: strings("migrate"),
        destination: matches.get_one::<String>("destination").cloned(),
        schema_suffix: matches.get_one::<String>("schema-suffix").cloned(),
        fields: strings("field"),
        sort: matches.get_flag("sort"),
        no_trailing_commas: matches.get_flag("no-trailing-commas"),
        no_string_wrap: matches.get_flag("no-string-wrap"),
        no_normalize_quotes: matches.get_flag("no-normalize-quotes"),
        exclude: matches.get_one::<String>("exclude").cloned(),
    }
}

fn run(matches: &ArgMatches) -> Result<u8> {
    let cwd = std::env::current_dir().context("failed to read the working directory")?;
    let explicit = matches.get_one::<PathBuf>("config");
    let (file, source) = load_config(explicit.map(PathBuf::as_path), &cwd)?;
    debug!(%source, "loaded configuration");
    let file = overrides(matches).apply(file)?;

    let mut discovery = Discovery::new();
    if let Some(pattern) = &file.exclude {
        discovery = discovery.exclude(pattern)?;
    }
    let paths: Vec<PathBuf> = matches
        .get_many::<PathBuf>("paths")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let files = discovery.discover(&paths)?;
    info!(files = files.len(), "processing");

    let action = if matches.get_flag("check") {
        Action::Check
    } else if matches.get_flag("diff") {
        Action::Diff
    } else {
        Action::Write
    };
    let color = matches
        .get_one::<String>("color")
        .and_then(|value| ColorChoice::parse(value))
        .ok_or_else(|| anyhow!("invalid --color value"))?;
    let reporter = ConsoleReporter::new(color).json(matches.get_flag("report-json"));

    let runner = Runner::new(Pipeline::new(file.config)).with_action(action);
    let summary = runner.run_with(&files, &reporter);
    Ok(summary.exit_code(action))
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(&matches) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
