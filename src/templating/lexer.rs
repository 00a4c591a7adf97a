//! Tokenizer for template markup.
//!
//! Splits a template into literal text and tags in a single forward scan. A
//! `{` that does not start a well-formed tag is ordinary text and scanning
//! resumes at the next byte, so stray braces, widget markers (`{{$ … $}}`) and
//! half-written tags pass through untouched.
//!
//! ```text
//! {{ path }}  {{ path | filter }}        Variable
//! {%EACH path%}  …  {%ENDEACH%}          EachOpen / EachClose
//! {%IF path%}  {%IF path OP right%}      IfOpen
//! {%ENDIF%}                              IfClose
//! {% name %}  {% $path %}                Include
//! ```
//!
//! Keyword tags may also close with a bare `}`. Includes always close with
//! `%}`.

use super::loose::CompareOp;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind<'a> {
    Text,
    Variable {
        path: &'a str,
        filter: Option<&'a str>,
    },
    EachOpen {
        path: &'a str,
    },
    EachClose,
    IfOpen {
        path: &'a str,
        comparison: Option<(CompareOp, &'a str)>,
    },
    IfClose,
    Include {
        path: &'a str,
        dynamic: bool,
    },
}

/// One token and the exact source text it was scanned from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub raw: &'a str,
    /// Byte offset of `raw` in the template
    pub start: usize,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.start + self.raw.len()
    }
}

/// Tokenize `source`. Concatenating every token's `raw` yields `source`.
pub(crate) fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(offset) = source[pos..].find('{') {
        let start = pos + offset;
        match scan_tag(source, start) {
            Some((kind, end)) => {
                if text_start < start {
                    tokens.push(text_token(source, text_start, start));
                }
                tokens.push(Token {
                    kind,
                    raw: &source[start..end],
                    start,
                });
                pos = end;
                text_start = end;
            }
            None => pos = start + 1,
        }
    }

    if text_start < source.len() {
        tokens.push(text_token(source, text_start, source.len()));
    }

    tokens
}

fn text_token(source: &str, start: usize, end: usize) -> Token<'_> {
    Token {
        kind: TokenKind::Text,
        raw: &source[start..end],
        start,
    }
}

fn scan_tag(source: &str, start: usize) -> Option<(TokenKind<'_>, usize)> {
    let mut cursor = Cursor {
        source,
        pos: start,
    };

    if cursor.eat("{{") {
        return scan_variable(cursor);
    }
    if cursor.eat("{%") {
        cursor.skip_whitespace();
        return scan_keyword(cursor).or_else(|| scan_include(cursor));
    }
    None
}

fn scan_variable(mut cursor: Cursor<'_>) -> Option<(TokenKind<'_>, usize)> {
    cursor.skip_whitespace();
    let path = cursor.take_while(is_path_char);
    cursor.skip_whitespace();

    let mut filter = None;
    if cursor.eat("|") {
        cursor.skip_whitespace();
        let name = cursor.take_while(is_name_char);
        if name.is_empty() {
            return None;
        }
        filter = Some(name);
        cursor.skip_whitespace();
    }

    cursor.eat("}}").then_some((
        TokenKind::Variable {
            path,
            filter,
        },
        cursor.pos,
    ))
}

fn scan_keyword(cursor: Cursor<'_>) -> Option<(TokenKind<'_>, usize)> {
    // ENDEACH/ENDIF first: neither EACH nor IF is a prefix of them, but checking
    // closers first keeps the common case cheap.
    for (keyword, kind) in [("ENDEACH", TokenKind::EachClose), ("ENDIF", TokenKind::IfClose)] {
        let mut attempt = cursor;
        if attempt.eat(keyword) {
            attempt.skip_whitespace();
            if attempt.eat_closer() {
                return Some((kind, attempt.pos));
            }
        }
    }

    let mut attempt = cursor;
    if attempt.eat("EACH") && attempt.skip_whitespace() > 0 {
        let path = attempt.take_while(is_path_char);
        attempt.skip_whitespace();
        if attempt.eat_closer() {
            return Some((
                TokenKind::EachOpen {
                    path,
                },
                attempt.pos,
            ));
        }
    }

    let mut attempt = cursor;
    if attempt.eat("IF") && attempt.skip_whitespace() > 0 {
        let path = attempt.take_while(is_path_char);
        attempt.skip_whitespace();
        let comparison = match attempt.take_operator() {
            Some(op) => {
                attempt.skip_whitespace();
                let right = attempt.take_while(is_operand_char);
                attempt.skip_whitespace();
                Some((op, right))
            }
            None => None,
        };
        if attempt.eat_closer() {
            return Some((
                TokenKind::IfOpen {
                    path,
                    comparison,
                },
                attempt.pos,
            ));
        }
    }

    None
}

fn scan_include(mut cursor: Cursor<'_>) -> Option<(TokenKind<'_>, usize)> {
    let dynamic = cursor.eat("$");
    let path = cursor.take_while(is_include_char);
    if path.is_empty() {
        return None;
    }
    cursor.skip_whitespace();
    cursor.eat("%}").then_some((
        TokenKind::Include {
            path,
            dynamic,
        },
        cursor.pos,
    ))
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_operand_char(c: char) -> bool {
    is_path_char(c) || c == '"'
}

fn is_include_char(c: char) -> bool {
    is_path_char(c) || c == '/' || c == '-'
}

#[derive(Clone, Copy)]
struct Cursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn eat(&mut self, literal: &str) -> bool {
        if self.rest().starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn eat_closer(&mut self) -> bool {
        self.eat("%}") || self.eat("}")
    }

    /// Skip whitespace, returning how many bytes were skipped.
    fn skip_whitespace(&mut self) -> usize {
        let skipped = self.take_while(char::is_whitespace);
        skipped.len()
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !predicate(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn take_operator(&mut self) -> Option<CompareOp> {
        ["==", "!=", "<=", ">=", "<", ">"].into_iter().find_map(|text| {
            if self.eat(text) {
                CompareOp::parse(text)
            } else {
                None
            }
        })
    }
}
