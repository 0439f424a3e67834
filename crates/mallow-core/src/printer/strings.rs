//! String literal normalization and re-wrapping
//!
//! Quote selection follows the rules popularized by black: prefer double
//! quotes, but never introduce more backslashes than the literal already has
//! (unless `prefer_fewer_escapes` is off), never touch the expression parts
//! of an f-string, and never change what a raw string means.

use std::sync::OnceLock;

use regex::Regex;

use super::layout::display_width;
use crate::config::StyleConfig;

/// A string literal split into prefix, delimiter and body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Literal<'a> {
    pub prefix: &'a str,
    pub quote: &'a str,
    pub body: &'a str,
}

impl<'a> Literal<'a> {
    pub fn parse(text: &'a str) -> Option<Self> {
        let quote_at = text.find(['"', '\''])?;
        let (prefix, rest) = text.split_at(quote_at);
        let quote = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
            &rest[..3]
        } else {
            &rest[..1]
        };
        if rest.len() < quote.len() * 2 || !rest.ends_with(quote) {
            return None;
        }
        Some(Self {
            prefix,
            quote,
            body: &rest[quote.len()..rest.len() - quote.len()],
        })
    }

    fn is_triple(&self) -> bool {
        self.quote.len() == 3
    }
}

/// Lowercase `F`/`B`, drop the redundant `u`; `R` keeps its case
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    prefix
        .chars()
        .filter(|c| !matches!(c, 'u' | 'U'))
        .map(|c| match c {
            'F' => 'f',
            'B' => 'b',
            other => other,
        })
        .collect()
}

/// Canonical spelling of one literal
pub(crate) fn normalize_string(text: &str, style: &StyleConfig) -> String {
    if !style.normalize_quotes {
        return text.to_string();
    }
    let Some(literal) = Literal::parse(text) else {
        return text.to_string();
    };
    let prefix = normalize_prefix(literal.prefix);
    normalize_quotes(
        &prefix,
        literal.quote,
        literal.body,
        style.prefer_fewer_escapes,
    )
}

struct QuotePatterns {
    /// A backslash-escaped quote
    escaped: Regex,
    /// A quote preceded by an even number of backslashes
    unescaped: Regex,
}

impl QuotePatterns {
    fn new(quote: &str) -> Self {
        Self {
            escaped: Regex::new(&format!(r"([^\\]|^)\\((?:\\\\)*){quote}"))
                .expect("escaped quote pattern"),
            unescaped: Regex::new(&format!(r"(([^\\]|^)(\\\\)*){quote}"))
                .expect("unescaped quote pattern"),
        }
    }
}

fn patterns(quote: &str) -> &'static QuotePatterns {
    static DOUBLE: OnceLock<QuotePatterns> = OnceLock::new();
    static SINGLE: OnceLock<QuotePatterns> = OnceLock::new();
    static TRIPLE_DOUBLE: OnceLock<QuotePatterns> = OnceLock::new();
    static TRIPLE_SINGLE: OnceLock<QuotePatterns> = OnceLock::new();
    let cell = match quote {
        "\"" => &DOUBLE,
        "'" => &SINGLE,
        "\"\"\"" => &TRIPLE_DOUBLE,
        _ => &TRIPLE_SINGLE,
    };
    cell.get_or_init(|| QuotePatterns::new(quote))
}

// Matches can overlap by one character, so a single pass misses some.
fn sub_twice(pattern: &Regex, replacement: &str, text: &str) -> String {
    let once = pattern.replace_all(text, replacement);
    pattern.replace_all(&once, replacement).into_owned()
}

fn is_raw(prefix: &str) -> bool {
    prefix.contains(['r', 'R'])
}

/// Re-escape a body written between `orig_quote`s for `new_quote`s
///
/// Returns the original body without redundant escapes and the converted
/// body, or `None` when a raw string holds an unescaped `new_quote`.
fn requote(
    prefix: &str,
    orig_quote: &str,
    new_quote: &str,
    body: &str,
) -> Option<(String, String)> {
    if is_raw(prefix) {
        let escaped = format!("\\{new_quote}");
        if body.matches(new_quote).count() != body.matches(escaped.as_str()).count() {
            return None;
        }
        return Some((body.to_string(), body.to_string()));
    }
    let cleaned = sub_twice(
        &patterns(new_quote).escaped,
        &format!("${{1}}${{2}}{new_quote}"),
        body,
    );
    let converted = sub_twice(
        &patterns(orig_quote).escaped,
        &format!("${{1}}${{2}}{orig_quote}"),
        &cleaned,
    );
    let converted = sub_twice(
        &patterns(new_quote).unescaped,
        &format!("${{1}}\\{new_quote}"),
        &converted,
    );
    Some((cleaned, converted))
}

/// Whether any `{...}` replacement field of an f-string body has a backslash
fn backslash_in_expressions(body: &str) -> bool {
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
            }
            '{' => {
                let mut depth = 1;
                for inner in chars.by_ref() {
                    match inner {
                        '\\' => return true,
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    false
}

fn normalize_quotes(prefix: &str, orig_quote: &str, body: &str, prefer_fewer: bool) -> String {
    let keep = |body: &str| format!("{prefix}{orig_quote}{body}{orig_quote}");
    if orig_quote == "\"\"\"" {
        return keep(body);
    }
    let new_quote = match orig_quote {
        "'''" => "\"\"\"",
        "\"" => "'",
        _ => "\"",
    };
    let Some((body, mut new_body)) = requote(prefix, orig_quote, new_quote, body) else {
        return keep(body);
    };
    if prefix.contains(['f', 'F']) && backslash_in_expressions(&new_body) {
        return keep(&body);
    }
    if new_quote == "\"\"\"" && new_body.ends_with('"') {
        new_body.pop();
        new_body.push_str("\\\"");
    }

    let orig_escapes = body.matches('\\').count();
    let new_escapes = new_body.matches('\\').count();
    let switch = if prefer_fewer {
        new_escapes < orig_escapes || (new_escapes == orig_escapes && orig_quote != "\"")
    } else {
        orig_quote != "\""
    };
    if switch {
        format!("{prefix}{new_quote}{new_body}{new_quote}")
    } else {
        keep(&body)
    }
}

/// Body of a literal re-escaped as if it were delimited by `"`
fn double_body(prefix: &str, quote: &str, body: &str) -> Option<String> {
    match quote {
        "\"" if is_raw(prefix) => Some(body.to_string()),
        "\"" => Some(sub_twice(&patterns("'").escaped, "${1}${2}'", body)),
        _ => requote(prefix, quote, "\"", body).map(|(_, converted)| converted),
    }
}

fn has_octal_escape(body: &str) -> bool {
    body.as_bytes()
        .windows(2)
        .any(|pair| pair[0] == b'\\' && pair[1].is_ascii_digit())
}

/// Several literals joined into one body that can be split anywhere after a space
#[derive(Debug, Clone, PartialEq, Eq)]
struct Merged {
    prefix: String,
    quote: String,
    body: String,
}

impl Merged {
    fn new(texts: &[&str], style: &StyleConfig) -> Option<Self> {
        if !style.wrap_strings {
            return None;
        }
        let literals = texts
            .iter()
            .map(|text| Literal::parse(text))
            .collect::<Option<Vec<_>>>()?;
        let first = literals.first()?;
        let prefix = if style.normalize_quotes {
            normalize_prefix(first.prefix)
        } else {
            first.prefix.to_string()
        };
        let joinable = literals.iter().all(|literal| {
            let own = if style.normalize_quotes {
                normalize_prefix(literal.prefix)
            } else {
                literal.prefix.to_string()
            };
            own == prefix
                && !literal.is_triple()
                && !literal.body.contains("\\N{")
                && !has_octal_escape(literal.body)
        });
        if !joinable || prefix.contains(['f', 'F']) {
            return None;
        }

        if style.normalize_quotes {
            let mut body = String::new();
            for literal in &literals {
                body.push_str(&double_body(&prefix, literal.quote, literal.body)?);
            }
            let normalized = normalize_quotes(&prefix, "\"", &body, style.prefer_fewer_escapes);
            let literal = Literal::parse(&normalized)?;
            Some(Self {
                prefix,
                quote: literal.quote.to_string(),
                body: literal.body.to_string(),
            })
        } else {
            if literals.iter().any(|literal| literal.quote != first.quote) {
                return None;
            }
            Some(Self {
                quote: first.quote.to_string(),
                body: literals.iter().map(|literal| literal.body).collect(),
                prefix,
            })
        }
    }

    fn quoted(&self, body: &str) -> String {
        format!("{}{}{}{}", self.prefix, self.quote, body, self.quote)
    }
}

/// Adjacent string literals printed as one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StringRun {
    pieces: Vec<String>,
    merged: Option<Merged>,
}

impl StringRun {
    pub fn new(texts: &[&str], style: &StyleConfig) -> Self {
        Self {
            pieces: texts
                .iter()
                .map(|text| normalize_string(text, style))
                .collect(),
            merged: Merged::new(texts, style),
        }
    }

    /// Single-line spelling
    pub fn flat(&self) -> String {
        match &self.merged {
            Some(merged) => merged.quoted(&merged.body),
            None => self.pieces.join(" "),
        }
    }

    /// One literal per line, each at most `available` columns wide when the
    /// words allow it
    pub fn lines(&self, available: usize) -> Vec<String> {
        let Some(merged) = &self.merged else {
            return self.pieces.clone();
        };
        let overhead = display_width(&merged.prefix) + merged.quote.len() * 2;
        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        for word in merged.body.split_inclusive(' ') {
            if !current.is_empty()
                && overhead + display_width(&current) + display_width(word) > available
            {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(word);
        }
        if !current.is_empty() || chunks.is_empty() {
            chunks.push(current);
        }
        chunks.iter().map(|chunk| merged.quoted(chunk)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalize(text: &str) -> String {
        normalize_string(text, &StyleConfig::default())
    }

    #[test]
    fn test_prefers_double_quotes() {
        assert_eq!(normalize("'hello'"), "\"hello\"");
        assert_eq!(normalize("\"hello\""), "\"hello\"");
        assert_eq!(normalize("''"), "\"\"");
    }

    #[test]
    fn test_keeps_single_quotes_to_avoid_escapes() {
        assert_eq!(normalize(r#"'say "hi"'"#), r#"'say "hi"'"#);
        assert_eq!(normalize(r"'it\'s'"), "\"it's\"");
    }

    #[test]
    fn test_removes_redundant_escapes() {
        assert_eq!(normalize(r#""it\'s""#), r#""it's""#);
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(normalize("U'x'"), "\"x\"");
        assert_eq!(normalize("F'{x}'"), "f\"{x}\"");
        assert_eq!(normalize("Rb'x'"), "Rb\"x\"");
    }

    #[test]
    fn test_raw_strings_keep_meaning() {
        assert_eq!(normalize(r#"r'a"b'"#), r#"r'a"b'"#);
        assert_eq!(normalize(r"r'\d+'"), r#"r"\d+""#);
    }

    #[test]
    fn test_fstring_expressions_are_not_escaped() {
        assert_eq!(normalize(r#"f'{x["k"]}'"#), r#"f'{x["k"]}'"#);
        assert_eq!(normalize("f'{x}'"), "f\"{x}\"");
    }

    #[test]
    fn test_triple_quotes() {
        assert_eq!(normalize("'''doc'''"), "\"\"\"doc\"\"\"");
        assert_eq!(normalize("'''ends with \"'''"), "'''ends with \"'''");
        assert_eq!(normalize("\"\"\"doc\"\"\""), "\"\"\"doc\"\"\"");
    }

    #[test]
    fn test_fewer_escapes_off_forces_double() {
        let style = StyleConfig {
            prefer_fewer_escapes: false,
            ..StyleConfig::default()
        };
        assert_eq!(normalize_string(r#"'say "hi"'"#, &style), r#""say \"hi\"""#);
    }

    #[test]
    fn test_normalization_off_keeps_text() {
        let style = StyleConfig {
            normalize_quotes: false,
            ..StyleConfig::default()
        };
        assert_eq!(normalize_string("U'x'", &style), "U'x'");
    }

    #[test]
    fn test_run_merges_compatible_pieces() {
        let run = StringRun::new(&["'The quick '", "\"brown fox\""], &StyleConfig::default());
        assert_eq!(run.flat(), "\"The quick brown fox\"");
    }

    #[test]
    fn test_run_keeps_incompatible_pieces() {
        let style = StyleConfig::default();
        let run = StringRun::new(&["'a'", "f'{b}'"], &style);
        assert_eq!(run.flat(), "\"a\" f\"{b}\"");
        let run = StringRun::new(&["'\\1'", "'2'"], &style);
        assert_eq!(run.flat(), "\"\\1\" \"2\"");
    }

    #[test]
    fn test_run_lines_split_after_spaces() {
        let run = StringRun::new(&["'one two three four'"], &StyleConfig::default());
        assert_eq!(
            run.lines(12),
            vec!["\"one two \"", "\"three four\""]
        );
        assert_eq!(run.lines(80), vec!["\"one two three four\""]);
    }

    #[test]
    fn test_lines_are_stable_when_reparsed() {
        let style = StyleConfig::default();
        let run = StringRun::new(&["'it'", "'s \"quoted\" text here'"], &style);
        let lines = run.lines(14);
        let texts: Vec<&str> = lines.iter().map(String::as_str).collect();
        let again = StringRun::new(&texts, &style);
        assert_eq!(again.flat(), run.flat());
        assert_eq!(again.lines(14), lines);
    }

    #[test]
    fn test_fstring_detection() {
        assert!(backslash_in_expressions(r"{a\n}"));
        assert!(!backslash_in_expressions(r"{{\n}}"));
        assert!(!backslash_in_expressions(r"plain\n {x}"));
    }
}
