use std::iter::FusedIterator;
use std::ops::Range;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Debug)]
pub struct File {
    name: String,
    contents: String,
    lines: Vec<usize>,
}

impl File {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        let name = name.into();
        let contents = contents.into();
        let mut lines = vec![0];
        for (idx, ch) in contents.char_indices() {
            if ch == '\n' {
                lines.push(idx + ch.len_utf8());
            }
        }
        Self {
            name,
            contents,
            lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub(crate) fn len(&self) -> usize {
        self.contents.len()
    }

    /// 1-based line and 1-based column (in chars) of a byte offset.
    pub fn line_column_at(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.contents.len());
        let line_index = match self.lines.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        let line_start = self.lines[line_index];
        let column = self.contents[line_start..offset].chars().count() + 1;
        (line_index + 1, column)
    }

    pub fn line(&self, line: usize) -> &str {
        if line == 0 || line > self.lines.len() {
            return "";
        }
        let start = self.lines[line - 1];
        let end = if let Some(next_start) = self.lines.get(line) {
            let mut end = *next_start;
            if end > start && self.contents.as_bytes()[end - 1] == b'\n' {
                end -= 1;
            }
            if end > start && self.contents.as_bytes()[end - 1] == b'\r' {
                end -= 1;
            }
            end
        } else {
            self.contents.len()
        };
        &self.contents[start..end]
    }
}

/// Half-open source range, suitable for highlighting in an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub start: (usize, usize),
    pub end: (usize, usize),
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.0, self.start.1, self.end.0, self.end.1
        )
    }
}

#[derive(Debug, Clone)]
pub struct SourceInfo {
    range: Range<usize>,
    file: Arc<File>,
}

impl SourceInfo {
    pub fn new(file: Arc<File>, range: Range<usize>) -> Self {
        Self { range, file }
    }

    pub fn eof(file: Arc<File>) -> Self {
        let len = file.len();
        Self::new(file, len..len)
    }

    /// Joins two source infos of the same file into the range covering both.
    pub fn join(&self, other: &SourceInfo) -> SourceInfo {
        let start = self.range.start.min(other.range.start);
        let end = self.range.end.max(other.range.end);
        SourceInfo::new(Arc::clone(&self.file), start..end)
    }

    fn as_str(&self) -> &str {
        self.file
            .contents()
            .get(self.range.clone())
            .unwrap_or_default()
    }

    pub fn line_column(&self) -> (usize, usize) {
        self.file.line_column_at(self.range.start)
    }

    pub fn location(&self) -> Location {
        Location {
            start: self.file.line_column_at(self.range.start),
            end: self.file.line_column_at(self.range.end),
        }
    }
}

impl std::fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (line, column) = self.line_column();
        writeln!(f, "{}:{}:{}\n", self.file.name(), line, column)?;
        let line_text = self.file.line(line);
        writeln!(f, "{}", line_text)?;
        // only the part of the range that lies on the first line is underlined
        let width = self
            .as_str()
            .lines()
            .next()
            .map(|s| s.chars().count())
            .unwrap_or(0);
        writeln!(
            f,
            "{}{}",
            " ".repeat(column - 1),
            "^".repeat(std::cmp::max(1, width))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,   // e.g. "i", "max", "oude_variant"
    Symbol,  // e.g. "==>", "<=", "#", "["
    NumLit,  // e.g. "0", "42"
    Keyword, // e.g. "assert", "Herschrijven", "op"
    Eol,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub source_info: SourceInfo,
}

impl Token {
    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    pub fn is_num_lit(&self) -> bool {
        self.kind == TokenKind::NumLit
    }

    pub fn is_eol(&self) -> bool {
        self.kind == TokenKind::Eol
    }

    pub fn as_str(&self) -> &str {
        self.source_info.as_str()
    }

    /// Human readable description used in "expected X, found Y" messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eol => "end of line".to_owned(),
            _ => format!("`{}`", self.as_str()),
        }
    }
}

pub const KEYWORDS: &[&str] = &[
    "assert",
    "and",
    "True",
    "Herschrijven",
    "met",
    "in",
    "Z",
    "op",
    "Wet",
    "not",
    "en",
    "if",
    "else",
    "of",
];

#[derive(Debug, Clone)]
pub struct Lex {
    file: Arc<File>,
    position: usize,
}

#[derive(Debug, Clone, Error)]
pub enum LexError {
    #[error("unrecognized character")]
    Unrecognized { source_info: SourceInfo },
    #[error("indentation is not supported")]
    Indentation { source_info: SourceInfo },
}

impl LexError {
    pub fn source_info(&self) -> &SourceInfo {
        match self {
            LexError::Unrecognized { source_info } | LexError::Indentation { source_info } => {
                source_info
            }
        }
    }
}

impl From<Lex> for LexError {
    fn from(lex: Lex) -> Self {
        Self::Unrecognized {
            source_info: lex.current_char(),
        }
    }
}

impl Lex {
    pub fn new(file: Arc<File>) -> Self {
        Self { file, position: 0 }
    }

    pub fn input(&self) -> &Arc<File> {
        &self.file
    }

    fn advance(&mut self, bytes: usize) -> SourceInfo {
        let source_info =
            SourceInfo::new(Arc::clone(&self.file), self.position..self.position + bytes);
        self.position += bytes;
        source_info
    }

    fn current_char(&self) -> SourceInfo {
        let start = std::cmp::min(self.position, self.file.len());
        let end = self.file.contents()[start..]
            .chars()
            .next()
            .map(|c| start + c.len_utf8())
            .unwrap_or(start);
        SourceInfo::new(Arc::clone(&self.file), start..end)
    }

    fn at_line_start(&self) -> bool {
        self.position == 0 || self.file.contents().as_bytes()[self.position - 1] == b'\n'
    }
}

impl Iterator for Lex {
    type Item = std::result::Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        #[derive(PartialEq, Eq, Debug)]
        enum Kind {
            Space,
            Eol,
            Ident,
            Symbol,
            NumLit,
        }

        static RE: Lazy<Regex> = Lazy::new(|| {
            let s = &[
                (Kind::Space, r" +"),
                (Kind::Eol, r"\r?\n"),
                (Kind::Ident, r"[A-Za-z_][A-Za-z0-9_]*"),
                (Kind::Symbol, r"==>|==|!=|<=|<|\+|-|\*|#|\(|\)|,|:|\[|\]"),
                (Kind::NumLit, r"[0-9]+"),
            ]
            .iter()
            .map(|(kind, re)| format!("(?P<{:?}>{})", kind, re))
            .collect::<Vec<_>>()
            .join("|");
            Regex::new(&format!("^(?:{})", s)).expect("lexer regex is well-formed")
        });

        loop {
            if self.file.len() == self.position {
                return None;
            }
            let input = Arc::clone(&self.file);
            let cap = match RE.captures(&input.contents()[self.position..]) {
                None => return Some(Err(LexError::from(self.clone()))),
                Some(cap) => cap,
            };
            let len = cap.get(0).map_or(0, |m| m.len());

            if cap.name(&format!("{:?}", Kind::Space)).is_some() {
                if self.at_line_start() {
                    return Some(Err(LexError::Indentation {
                        source_info: self.current_char(),
                    }));
                }
                self.advance(len);
                continue;
            }

            let source_info = self.advance(len);
            let text = source_info.as_str();

            let kind;
            if cap.name(&format!("{:?}", Kind::Ident)).is_some() {
                if KEYWORDS.contains(&text) {
                    kind = TokenKind::Keyword;
                } else {
                    kind = TokenKind::Ident;
                }
            } else if cap.name(&format!("{:?}", Kind::Eol)).is_some() {
                kind = TokenKind::Eol;
            } else if cap.name(&format!("{:?}", Kind::NumLit)).is_some() {
                kind = TokenKind::NumLit;
            } else {
                kind = TokenKind::Symbol;
            };
            return Some(Ok(Token { kind, source_info }));
        }
    }
}

impl FusedIterator for Lex {}
