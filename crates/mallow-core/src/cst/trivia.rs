//! Reading comments and blank lines out of token prefixes

/// One line of trivia preceding a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriviaLine<'a> {
    Blank,
    Comment(&'a str),
}

/// Split a prefix into the comment on the previous token's line and the rest
///
/// The first part is non-empty only when that line carries a comment; the
/// second part starts at the line break.
pub fn split_same_line(prefix: &str) -> (&str, &str) {
    let end = prefix.find(['\n', '\r']).unwrap_or(prefix.len());
    if prefix[..end].contains('#') {
        (&prefix[..end], &prefix[end..])
    } else {
        ("", prefix)
    }
}

/// Comment text on the previous token's line, if any
pub fn same_line_comment(prefix: &str) -> Option<&str> {
    let (same, _) = split_same_line(prefix);
    comment_text(same)
}

/// Comments that sit on their own lines
pub fn own_line_comments(prefix: &str) -> Vec<&str> {
    let (_, rest) = split_same_line(prefix);
    lines(rest)
        .into_iter()
        .filter_map(|line| match line {
            TriviaLine::Comment(text) => Some(text),
            TriviaLine::Blank => None,
        })
        .collect()
}

/// Every comment in the prefix, in source order
pub fn all_comments(prefix: &str) -> Vec<&str> {
    let mut comments: Vec<&str> = same_line_comment(prefix).into_iter().collect();
    comments.extend(own_line_comments(prefix));
    comments
}

/// Full lines of trivia in a prefix that starts at the beginning of a line
///
/// A trailing piece without a line break is the indentation of the token
/// itself and is ignored unless it holds a comment (end of file).
pub fn lines(prefix: &str) -> Vec<TriviaLine<'_>> {
    let mut result = Vec::new();
    let mut rest = prefix;
    while !rest.is_empty() {
        let end = rest.find('\n').map_or(rest.len(), |at| at + 1);
        let line = &rest[..end];
        rest = &rest[end..];
        let terminated = line.ends_with('\n');
        let content = line.trim_matches(|c: char| c.is_whitespace() || c == '\x0c');
        if let Some(comment) = comment_text(content) {
            result.push(TriviaLine::Comment(comment));
        } else if terminated && content.is_empty() {
            result.push(TriviaLine::Blank);
        }
    }
    result
}

fn comment_text(fragment: &str) -> Option<&str> {
    fragment
        .find('#')
        .map(|at| fragment[at..].trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_same_line() {
        assert_eq!(split_same_line("  # c\n    "), ("  # c", "\n    "));
        assert_eq!(split_same_line("\n    "), ("", "\n    "));
        assert_eq!(split_same_line(" "), ("", " "));
    }

    #[test]
    fn test_own_line_comments() {
        let prefix = "  # same\n\n    # one\n    # two\n    ";
        assert_eq!(same_line_comment(prefix), Some("# same"));
        assert_eq!(own_line_comments(prefix), vec!["# one", "# two"]);
        assert_eq!(all_comments(prefix), vec!["# same", "# one", "# two"]);
    }

    #[test]
    fn test_lines_with_blanks() {
        let prefix = "\n\n# c\n  \n    ";
        assert_eq!(
            lines(prefix),
            vec![
                TriviaLine::Blank,
                TriviaLine::Blank,
                TriviaLine::Comment("# c"),
                TriviaLine::Blank,
            ]
        );
    }

    #[test]
    fn test_comment_at_end_of_file_without_newline() {
        assert_eq!(lines("\n# tail"), vec![TriviaLine::Blank, TriviaLine::Comment("# tail")]);
    }
}
