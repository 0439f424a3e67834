//! Output of a batch run
//!
//! A trait-based reporter so the binary prints to the terminal while tests
//! capture what would have been shown.

use std::io::{self, IsTerminal, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};

use super::{Action, BatchSummary, FileOutcome};

/// When to colour diff output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(ColorChoice::Auto),
            "always" => Some(ColorChoice::Always),
            "never" => Some(ColorChoice::Never),
            _ => None,
        }
    }

    /// Resolve `Auto` against stdout and `NO_COLOR`
    pub fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        }
    }
}

/// Receives the results of a batch run
pub trait Reporter: Send + Sync {
    /// One processed file, in discovery order
    fn on_file(&self, outcome: &FileOutcome, action: Action);

    /// The whole batch, once every file is done
    fn on_summary(&self, summary: &BatchSummary, action: Action);
}

/// Writes diffs to stdout and file status lines to stderr
pub struct ConsoleReporter {
    color: bool,
    json: bool,
}

impl ConsoleReporter {
    pub fn new(color: ColorChoice) -> Self {
        Self {
            color: color.enabled(),
            json: false,
        }
    }

    /// Print the summary as JSON on stdout instead of a status line
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

impl Reporter for ConsoleReporter {
    fn on_file(&self, outcome: &FileOutcome, action: Action) {
        if let Some(error) = &outcome.error {
            eprintln!("error: {error}");
            return;
        }
        if let Some(diff) = &outcome.diff {
            let mut stdout = io::stdout().lock();
            if let Err(e) = write_diff(&mut stdout, diff, self.color) {
                eprintln!("error: failed to write diff: {e}");
            }
        }
        if outcome.changed {
            let verb = match action {
                Action::Write => "reformatted",
                Action::Diff | Action::Check => "would reformat",
            };
            eprintln!("{verb} {}", outcome.path.display());
        }
    }

    fn on_summary(&self, summary: &BatchSummary, action: Action) {
        if self.json {
            match serde_json::to_string_pretty(summary) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("error: failed to serialize report: {e}"),
            }
            return;
        }
        eprintln!("{}", summary_line(summary, action));
    }
}

/// Write a unified diff, colouring removed and added lines
pub fn write_diff<W: Write>(out: &mut W, diff: &str, color: bool) -> io::Result<()> {
    if !color {
        out.write_all(diff.as_bytes())?;
        return out.flush();
    }
    for line in diff.split_inclusive('\n') {
        let style = if line.starts_with("+++") || line.starts_with("---") {
            Some((Color::Reset, Attribute::Bold))
        } else if line.starts_with('+') {
            Some((Color::Green, Attribute::Reset))
        } else if line.starts_with('-') {
            Some((Color::Red, Attribute::Reset))
        } else if line.starts_with("@@") {
            Some((Color::Cyan, Attribute::Reset))
        } else {
            None
        };
        match style {
            Some((color, attribute)) => {
                let (text, newline) = match line.strip_suffix('\n') {
                    Some(text) => (text, "\n"),
                    None => (line, ""),
                };
                queue!(
                    out,
                    SetForegroundColor(color),
                    SetAttribute(attribute),
                    Print(text),
                    SetAttribute(Attribute::Reset),
                    ResetColor,
                    Print(newline)
                )?;
            }
            None => queue!(out, Print(line))?,
        }
    }
    out.flush()
}

/// One-line account of a batch, e.g. `2 files reformatted, 3 files left unchanged`
pub fn summary_line(summary: &BatchSummary, action: Action) -> String {
    let changed_verb = match action {
        Action::Write => "reformatted",
        Action::Diff | Action::Check => "would be reformatted",
    };
    let unchanged = summary.files_processed - summary.files_changed - summary.files_failed;
    let mut parts = Vec::new();
    if summary.files_changed > 0 {
        parts.push(format!("{} {changed_verb}", files(summary.files_changed)));
    }
    if unchanged > 0 {
        let verb = match action {
            Action::Write => "left unchanged",
            Action::Diff | Action::Check => "would be left unchanged",
        };
        parts.push(format!("{} {verb}", files(unchanged)));
    }
    if summary.files_failed > 0 {
        parts.push(format!("{} failed", files(summary.files_failed)));
    }
    if parts.is_empty() {
        return "No Python files found".to_string();
    }
    let mut line = parts.join(", ");
    if summary.edits > 0 {
        line.push_str(&format!(" ({} field calls migrated", summary.edits));
        if summary.warnings > 0 {
            line.push_str(&format!(", {} warnings", summary.warnings));
        }
        line.push(')');
    } else if summary.warnings > 0 {
        line.push_str(&format!(" ({} warnings)", summary.warnings));
    }
    line
}

fn files(count: u64) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{count} files")
    }
}
