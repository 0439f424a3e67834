/*!
# Printer

Renders a [`Module`] back to text.

In canonical mode every statement is re-rendered: indentation becomes
`indent_size` spaces per level, tokens are re-spaced, strings normalized and
brackets laid out against the line width. Comments and blank lines survive
at their statement positions.

In preserve mode the source text of every statement comes back untouched,
except for simple statements carrying the `reformat` hint. Those are
rendered canonically at their original indentation, keeping the trivia
before them and the comment after them.

Printing is deterministic and `print(parse(print(parse(text))))` equals
`print(parse(text))` for either mode.
*/

mod layout;
mod spacing;
mod strings;


use crate::config::{PrintMode, StyleConfig};
use crate::cst::trivia::{self, TriviaLine};
use crate::cst::{Block, Item, Module, SimpleStatement, Statement, ToSource, Token};

use layout::{ChunkBuilder, Renderer};

/// Render `module` in the configured mode
pub fn print(module: &Module, style: &StyleConfig) -> String {
    let printer = LinePrinter::new(style, module.newline());
    match style.mode {
        PrintMode::Canonical => CanonicalPrinter::new(printer).print(module),
        PrintMode::Preserve => PreservePrinter::new(printer).print(module),
    }
}

/// Renders one logical line at a given indentation
struct LinePrinter<'s> {
    builder: ChunkBuilder<'s>,
    renderer: Renderer<'s>,
    style: &'s StyleConfig,
    newline: String,
}

impl<'s> LinePrinter<'s> {
    fn new(style: &'s StyleConfig, newline: &str) -> Self {
        Self {
            builder: ChunkBuilder::new(style),
            renderer: Renderer::new(style),
            style,
            newline: newline.to_string(),
        }
    }

    fn indent(&self, depth: usize) -> String {
        self.style.indent_unit().repeat(depth)
    }

    /// Physical lines of `items`, with the comment from `newline` at the end
    fn line(&self, items: &[Item], newline: &Token, indent: &str) -> Vec<String> {
        let mut comments = Vec::new();
        let chunks = self.builder.line(items, &mut comments);
        let mut lines: Vec<String> = comments
            .iter()
            .map(|comment| format!("{indent}{comment}"))
            .collect();
        self.renderer.render(&chunks, indent, "", false, &mut lines);
        if let Some(comment) = trivia::same_line_comment(&newline.prefix) {
            if let Some(last) = lines.last_mut() {
                last.push_str("  ");
                last.push_str(comment);
            }
        }
        lines
    }
}

struct CanonicalPrinter<'s> {
    printer: LinePrinter<'s>,
    lines: Vec<String>,
}

impl<'s> CanonicalPrinter<'s> {
    fn new(printer: LinePrinter<'s>) -> Self {
        Self {
            printer,
            lines: Vec::new(),
        }
    }

    fn print(mut self, module: &Module) -> String {
        self.statements(&module.body, 0);
        self.trivia(&module.end.prefix, 0);

        let mut end = self.lines.len();
        while end > 0 && self.lines[end - 1].is_empty() {
            end -= 1;
        }
        if end == 0 {
            return String::new();
        }
        let newline = &self.printer.newline;
        let mut out = self.lines[..end].join(newline);
        out.push_str(newline);
        out
    }

    fn statements(&mut self, body: &[Statement], depth: usize) {
        for statement in body {
            self.statement(statement, depth);
        }
    }

    fn statement(&mut self, statement: &Statement, depth: usize) {
        if let Some(first) = statement.first_token() {
            self.trivia(&first.prefix, depth);
        }
        let indent = self.printer.indent(depth);
        match statement {
            Statement::Simple(simple) => {
                let lines = self.printer.line(&simple.items, &simple.newline, &indent);
                self.lines.extend(lines);
            }
            Statement::Compound(compound) => {
                let lines = self
                    .printer
                    .line(&compound.header, &compound.newline, &indent);
                self.lines.extend(lines);
                self.block(&compound.block, depth + 1);
            }
            Statement::Class(class) => {
                let lines = self.printer.line(&class.header, &class.newline, &indent);
                self.lines.extend(lines);
                self.block(&class.block, depth + 1);
            }
        }
    }

    fn block(&mut self, block: &Block, depth: usize) {
        self.statements(&block.body, depth);
        self.trivia(&block.dedent.prefix, depth);
    }

    /// Blank lines and own-line comments; blank lines never open the file
    fn trivia(&mut self, prefix: &str, depth: usize) {
        for line in trivia::lines(prefix) {
            match line {
                TriviaLine::Blank if self.lines.is_empty() => {}
                TriviaLine::Blank => self.lines.push(String::new()),
                TriviaLine::Comment(comment) => {
                    let indent = self.printer.indent(depth);
                    self.lines.push(format!("{indent}{comment}"));
                }
            }
        }
    }
}

struct PreservePrinter<'s> {
    printer: LinePrinter<'s>,
    out: String,
}

impl<'s> PreservePrinter<'s> {
    fn new(printer: LinePrinter<'s>) -> Self {
        Self {
            printer,
            out: String::new(),
        }
    }

    fn print(mut self, module: &Module) -> String {
        for statement in &module.body {
            self.statement(statement);
        }
        module.end.write_source(&mut self.out);
        self.out
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Simple(simple) if simple.reformat => self.reformat(simple),
            Statement::Simple(_) => statement.write_source(&mut self.out),
            Statement::Compound(compound) => {
                compound.header.write_source(&mut self.out);
                compound.newline.write_source(&mut self.out);
                self.block(&compound.block);
            }
            Statement::Class(class) => {
                class.header.write_source(&mut self.out);
                class.newline.write_source(&mut self.out);
                self.block(&class.block);
            }
        }
    }

    fn block(&mut self, block: &Block) {
        block.indent.write_source(&mut self.out);
        for statement in &block.body {
            self.statement(statement);
        }
        block.dedent.write_source(&mut self.out);
    }

    fn reformat(&mut self, simple: &SimpleStatement) {
        let prefix = simple
            .items
            .first()
            .map(|item| item.first_token().prefix.as_str())
            .unwrap_or_default();
        let (leading, indent) = match prefix.rfind('\n') {
            Some(at) => prefix.split_at(at + 1),
            None => ("", prefix),
        };
        let indent: String = indent.chars().filter(|c| matches!(c, ' ' | '\t')).collect();

        self.out.push_str(leading);
        let lines = self.printer.line(&simple.items, &simple.newline, &indent);
        self.out.push_str(&lines.join(&self.printer.newline));
        self.out.push_str(&simple.newline.text);
    }
}
