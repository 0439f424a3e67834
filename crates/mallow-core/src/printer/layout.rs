/*!
# Line Layout

A logical line becomes a list of chunks: plain text, bracketed blocks and
runs of adjacent string literals. Rendering tries the whole line flat first.
When that is impossible (a comment or a magic trailing comma forces a block
open) or the line is too wide, it explodes one block: the head up to the
opening bracket stays on the current line, each element gets its own line one
level deeper, and whatever follows the closing bracket is laid out again from
the closing bracket's line.

Every decision depends only on the chunks, the indentation and the style, so
rendering the output of a previous rendering makes the same decisions.
*/

use unicode_width::UnicodeWidthChar;

use super::spacing::{Atom, Spacer};
use super::strings::StringRun;
use crate::config::StyleConfig;
use crate::cst::trivia::{all_comments, own_line_comments, same_line_comment};
use crate::cst::{Element, Group, GroupKind, Item, Token, TokenKind};

/// Columns a string occupies in a terminal, with tabs stopping every 8
pub(crate) fn display_width(text: &str) -> usize {
    text.chars().fold(0, |width, c| match c {
        '\t' => (width / 8 + 1) * 8,
        _ => width + c.width().unwrap_or(0),
    })
}

/// Operators after which a lone string may be wrapped in parentheses
const VALUE_INTRODUCERS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "//=", "%=", "@=", "&=", "|=", "^=", ">>=", "<<=", "**=",
    "return",
];

#[derive(Debug, Clone)]
pub(crate) enum Chunk {
    Text {
        text: String,
        space_before: bool,
    },
    Strings {
        run: StringRun,
        flat: String,
        space_before: bool,
    },
    Block(Box<BlockChunk>),
}

impl Chunk {
    fn text(text: &str, space_before: bool) -> Self {
        Chunk::Text {
            text: text.to_string(),
            space_before,
        }
    }

    fn space_before(&self) -> bool {
        match self {
            Chunk::Text { space_before, .. } | Chunk::Strings { space_before, .. } => {
                *space_before
            }
            Chunk::Block(block) => block.space_before,
        }
    }

    fn is_forced(&self) -> bool {
        matches!(self, Chunk::Block(block) if block.forced)
    }

    fn is_multiline_string(&self) -> bool {
        matches!(self, Chunk::Strings { flat, .. } if flat.contains('\n'))
    }

    fn write_flat(&self, out: &mut String) {
        match self {
            Chunk::Text { text, .. } => out.push_str(text),
            Chunk::Strings { flat, .. } => out.push_str(flat),
            Chunk::Block(block) => block.write_flat(out),
        }
    }
}

/// Single-line text of a chunk sequence
pub(crate) fn flat(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    for (index, chunk) in chunks.iter().enumerate() {
        if index > 0 && chunk.space_before() {
            out.push(' ');
        }
        chunk.write_flat(&mut out);
    }
    out
}

/// One comma-separated slot of a block and the comments around it
#[derive(Debug, Clone, Default)]
pub(crate) struct ElementChunk {
    chunks: Vec<Chunk>,
    /// Own-line comments printed above the element
    leading: Vec<String>,
    /// Comments printed after the element's comma
    trailing: Vec<String>,
    /// Elements with a key may be reordered among their neighbours
    sort_key: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct BlockChunk {
    space_before: bool,
    open: String,
    close: String,
    elements: Vec<ElementChunk>,
    /// Comment on the line of the opening bracket
    open_comment: Vec<String>,
    /// Own-line comments before the closing bracket
    dangling: Vec<String>,
    comma_when_exploded: bool,
    comma_when_flat: bool,
    /// Parentheses that only appear when the block is exploded
    is_virtual: bool,
    forced: bool,
}

impl BlockChunk {
    fn virtual_parens(run: StringRun, flat: String, space_before: bool) -> Self {
        Self {
            space_before,
            open: "(".to_string(),
            close: ")".to_string(),
            elements: vec![ElementChunk {
                chunks: vec![Chunk::Strings {
                    run,
                    flat,
                    space_before: false,
                }],
                ..ElementChunk::default()
            }],
            open_comment: Vec::new(),
            dangling: Vec::new(),
            comma_when_exploded: false,
            comma_when_flat: false,
            is_virtual: true,
            forced: false,
        }
    }

    fn has_comments(&self) -> bool {
        !self.open_comment.is_empty()
            || !self.dangling.is_empty()
            || self
                .elements
                .iter()
                .any(|element| !element.leading.is_empty() || !element.trailing.is_empty())
    }

    fn write_flat(&self, out: &mut String) {
        if self.is_virtual {
            if let Some(element) = self.elements.first() {
                out.push_str(&flat(&element.chunks));
            }
            return;
        }
        out.push_str(&self.open);
        for (index, element) in self.elements.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            out.push_str(&flat(&element.chunks));
        }
        if self.comma_when_flat {
            out.push(',');
        }
        out.push_str(&self.close);
    }

    fn lone_string(&self) -> Option<&StringRun> {
        match self.elements.as_slice() {
            [element] => match element.chunks.as_slice() {
                [Chunk::Strings { run, .. }] => Some(run),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Turns CST items into chunks
pub(crate) struct ChunkBuilder<'s> {
    style: &'s StyleConfig,
}

impl<'s> ChunkBuilder<'s> {
    pub fn new(style: &'s StyleConfig) -> Self {
        Self { style }
    }

    /// Chunks of a statement line
    ///
    /// Comments found between the line's own tokens (after a backslash
    /// continuation) cannot stay where they are and are pushed to `comments`.
    pub fn line(&self, items: &[Item], comments: &mut Vec<String>) -> Vec<Chunk> {
        let mut chunks = self.sequence(items, None, false, comments);
        wrap_trailing_string(&mut chunks, VALUE_INTRODUCERS);
        chunks
    }

    fn sequence(
        &self,
        items: &[Item],
        group: Option<GroupKind>,
        keyword_element: bool,
        comments: &mut Vec<String>,
    ) -> Vec<Chunk> {
        let mut spacer = Spacer::new(group, keyword_element);
        let mut chunks = Vec::with_capacity(items.len());
        let mut index = 0;
        while index < items.len() {
            let item = &items[index];
            if index > 0 {
                collect_comments(&item.first_token().prefix, comments);
            }
            match item {
                Item::Token(token) if token.kind == TokenKind::String => {
                    let mut tokens = vec![token];
                    while let Some(Item::Token(next)) = items.get(index + 1) {
                        if next.kind != TokenKind::String {
                            break;
                        }
                        collect_comments(&next.prefix, comments);
                        tokens.push(next);
                        index += 1;
                    }
                    let space_before = spacer.space_before(Atom::Token(token));
                    chunks.push(self.strings(&tokens, space_before));
                }
                Item::Token(token) => {
                    let space_before = spacer.space_before(Atom::Token(token));
                    chunks.push(Chunk::text(&token.text, space_before));
                }
                Item::Group(group) => {
                    let space_before = spacer.space_before(Atom::Open(group.kind));
                    chunks.push(Chunk::Block(Box::new(self.block(group, space_before))));
                }
            }
            index += 1;
        }
        chunks
    }

    fn strings(&self, tokens: &[&Token], space_before: bool) -> Chunk {
        let texts: Vec<&str> = tokens.iter().map(|token| token.text.as_str()).collect();
        let run = StringRun::new(&texts, self.style);
        Chunk::Strings {
            flat: run.flat(),
            run,
            space_before,
        }
    }

    fn block(&self, group: &Group, space_before: bool) -> BlockChunk {
        let mut elements: Vec<ElementChunk> = Vec::with_capacity(group.elements.len());
        let mut open_comment = Vec::new();

        for element in &group.elements {
            let mut chunk = ElementChunk::default();
            if let Some(first) = element.first_token() {
                if let Some(comment) = same_line_comment(&first.prefix) {
                    attach_trailing(&mut elements, &mut open_comment, comment);
                }
                chunk.leading = own_line_comments(&first.prefix)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
            }
            chunk.chunks = self.sequence(
                &element.items,
                Some(group.kind),
                element.keyword_name().is_some(),
                &mut chunk.leading,
            );
            match group.kind {
                GroupKind::Call if element.keyword_name().is_some() => {
                    if chunk.chunks.len() == 3 {
                        wrap_trailing_string(&mut chunk.chunks, &["="]);
                    }
                }
                GroupKind::Brace => wrap_trailing_string(&mut chunk.chunks, &[":"]),
                _ => {}
            }
            if let Some(comma) = &element.comma {
                collect_comments(&comma.prefix, &mut chunk.trailing);
            }
            chunk.sort_key = sort_key(group.kind, element);
            elements.push(chunk);
        }

        if let Some(comment) = same_line_comment(&group.close.prefix) {
            attach_trailing(&mut elements, &mut open_comment, comment);
        }
        let dangling = own_line_comments(&group.close.prefix)
            .into_iter()
            .map(str::to_string)
            .collect();

        if self.style.sort_keys && group.canonical_order {
            sort_runs(&mut elements);
        }

        let count = group.elements.len();
        let has_trailing = group.has_trailing_comma();
        let tuple_like = count == 1 && matches!(group.kind, GroupKind::Paren | GroupKind::Subscript);
        let comma_when_exploded = if tuple_like || group.is_comprehension() {
            has_trailing
        } else if self.style.trailing_commas {
            count > 0
        } else {
            has_trailing
        };
        let magic_comma = self.style.trailing_commas && has_trailing && !tuple_like;

        let mut block = BlockChunk {
            space_before,
            open: group.open.text.clone(),
            close: group.close.text.clone(),
            elements,
            open_comment,
            dangling,
            comma_when_exploded,
            comma_when_flat: tuple_like && has_trailing,
            is_virtual: false,
            forced: false,
        };
        let multiline_string = block.elements.len() >= 2
            && block
                .elements
                .iter()
                .any(|element| element.chunks.iter().any(Chunk::is_multiline_string));
        let nested_forced = block
            .elements
            .iter()
            .any(|element| element.chunks.iter().any(Chunk::is_forced));
        block.forced = magic_comma || block.has_comments() || multiline_string || nested_forced;
        block
    }
}

fn collect_comments(prefix: &str, comments: &mut Vec<String>) {
    comments.extend(all_comments(prefix).into_iter().map(str::to_string));
}

fn attach_trailing(elements: &mut [ElementChunk], open_comment: &mut Vec<String>, comment: &str) {
    match elements.last_mut() {
        Some(previous) => previous.trailing.push(comment.to_string()),
        None => open_comment.push(comment.to_string()),
    }
}

fn sort_key(kind: GroupKind, element: &Element) -> Option<String> {
    match kind {
        GroupKind::Call => element.keyword_name().map(str::to_string),
        GroupKind::Brace => element.string_key(),
        _ => None,
    }
}

/// Sort each run of keyed elements; unkeyed elements stay put and split runs
fn sort_runs(elements: &mut [ElementChunk]) {
    let mut start = 0;
    while start < elements.len() {
        if elements[start].sort_key.is_none() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < elements.len() && elements[end].sort_key.is_some() {
            end += 1;
        }
        elements[start..end].sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        start = end;
    }
}

/// Give a string run that ends the sequence after one of `introducers`
/// parentheses it can be split inside
fn wrap_trailing_string(chunks: &mut Vec<Chunk>, introducers: &[&str]) {
    let count = chunks.len();
    if count < 2 || !matches!(chunks[count - 1], Chunk::Strings { .. }) {
        return;
    }
    let introduced = matches!(
        &chunks[count - 2],
        Chunk::Text { text, .. } if introducers.contains(&text.as_str())
    );
    if !introduced {
        return;
    }
    if let Some(Chunk::Strings {
        run,
        flat,
        space_before,
    }) = chunks.pop()
    {
        chunks.push(Chunk::Block(Box::new(BlockChunk::virtual_parens(
            run,
            flat,
            space_before,
        ))));
    }
}

/// Lays chunks out into physical lines
pub(crate) struct Renderer<'s> {
    style: &'s StyleConfig,
    unit: String,
}

impl<'s> Renderer<'s> {
    pub fn new(style: &'s StyleConfig) -> Self {
        Self {
            style,
            unit: style.indent_unit(),
        }
    }

    /// Append the lines of `chunks` at `indent` to `out`
    ///
    /// `suffix` ends the last line (a separator comma); `in_brackets` allows
    /// a lone string run to continue on the next line.
    pub fn render(
        &self,
        chunks: &[Chunk],
        indent: &str,
        suffix: &str,
        in_brackets: bool,
        out: &mut Vec<String>,
    ) {
        if !chunks.iter().any(Chunk::is_forced) {
            let line = format!("{indent}{}{suffix}", flat(chunks));
            if self.fits(&line) {
                out.push(line);
                return;
            }
        }
        if let Some(at) = chunks.iter().position(Chunk::is_forced) {
            self.explode_at(chunks, at, indent, suffix, in_brackets, out);
            return;
        }
        if in_brackets {
            if let [Chunk::Strings { run, .. }] = chunks {
                let lines = run.lines(self.available(indent, suffix));
                if lines.len() > 1 {
                    let last = lines.len() - 1;
                    for (index, line) in lines.into_iter().enumerate() {
                        let end = if index == last { suffix } else { "" };
                        out.push(format!("{indent}{line}{end}"));
                    }
                    return;
                }
            }
        }
        match self.split_point(chunks, indent, suffix) {
            Some(at) => self.explode_at(chunks, at, indent, suffix, in_brackets, out),
            None => out.push(format!("{indent}{}{suffix}", flat(chunks))),
        }
    }

    fn fits(&self, line: &str) -> bool {
        let first = line.split('\n').next().unwrap_or_default();
        let last = line.rsplit('\n').next().unwrap_or_default();
        display_width(first) <= self.style.line_length
            && display_width(last) <= self.style.line_length
    }

    fn available(&self, indent: &str, suffix: &str) -> usize {
        self.style
            .line_length
            .saturating_sub(display_width(indent) + display_width(suffix))
    }

    /// Line up to and including the opening bracket of `chunks[at]`
    fn head(&self, chunks: &[Chunk], at: usize, indent: &str) -> String {
        let mut line = format!("{indent}{}", flat(&chunks[..at]));
        if let Chunk::Block(block) = &chunks[at] {
            if at > 0 && block.space_before {
                line.push(' ');
            }
            line.push_str(&block.open);
        }
        line
    }

    /// Line from the closing bracket of `chunks[at]` to the end
    fn tail(&self, chunks: &[Chunk], at: usize, indent: &str, suffix: &str) -> String {
        let mut line = indent.to_string();
        if let Chunk::Block(block) = &chunks[at] {
            line.push_str(&block.close);
        }
        for chunk in &chunks[at + 1..] {
            if chunk.space_before() {
                line.push(' ');
            }
            chunk.write_flat(&mut line);
        }
        line.push_str(suffix);
        line
    }

    /// Whether exploding this block can produce anything useful
    fn is_splittable(&self, block: &BlockChunk, indent: &str) -> bool {
        if !block.is_virtual {
            return !block.elements.is_empty() || block.has_comments();
        }
        let Some(run) = block.lone_string() else {
            return false;
        };
        let inner = format!("{indent}{}", self.unit);
        run.lines(self.available(&inner, "")).len() > 1
            || self.fits(&format!("{inner}{}", run.flat()))
    }

    /// Block to explode when the line is too long: the rightmost one whose
    /// head and tail both fit, else the rightmost one
    fn split_point(&self, chunks: &[Chunk], indent: &str, suffix: &str) -> Option<usize> {
        let candidates: Vec<usize> = chunks
            .iter()
            .enumerate()
            .filter_map(|(at, chunk)| match chunk {
                Chunk::Block(block) if self.is_splittable(block, indent) => Some(at),
                _ => None,
            })
            .collect();
        candidates
            .iter()
            .rev()
            .copied()
            .find(|&at| {
                self.fits(&self.head(chunks, at, indent))
                    && self.fits(&self.tail(chunks, at, indent, suffix))
            })
            .or_else(|| candidates.last().copied())
    }

    fn explode_at(
        &self,
        chunks: &[Chunk],
        at: usize,
        indent: &str,
        suffix: &str,
        in_brackets: bool,
        out: &mut Vec<String>,
    ) {
        let Chunk::Block(block) = &chunks[at] else {
            out.push(format!("{indent}{}{suffix}", flat(chunks)));
            return;
        };
        let mut head = self.head(chunks, at, indent);
        if !block.open_comment.is_empty() {
            head.push_str("  ");
            head.push_str(&block.open_comment.join("  "));
        }
        out.push(head);

        let inner = format!("{indent}{}", self.unit);
        let count = block.elements.len();
        for (index, element) in block.elements.iter().enumerate() {
            for comment in &element.leading {
                out.push(format!("{inner}{comment}"));
            }
            let comma = if index + 1 < count || block.comma_when_exploded {
                ","
            } else {
                ""
            };
            self.render(&element.chunks, &inner, comma, true, out);
            if !element.trailing.is_empty() {
                if let Some(last) = out.last_mut() {
                    last.push_str("  ");
                    last.push_str(&element.trailing.join("  "));
                }
            }
        }
        for comment in &block.dangling {
            out.push(format!("{inner}{comment}"));
        }

        let mut tail = Vec::with_capacity(chunks.len() - at);
        tail.push(Chunk::text(&block.close, false));
        tail.extend(chunks[at + 1..].iter().cloned());
        self.render(&tail, indent, suffix, in_brackets, out);
    }
}
