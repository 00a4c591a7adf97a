//! Builds the directive tree from the token stream.
//!
//! Markup that does not balance is kept as text rather than rejected:
//!
//! - a closer with no matching opener on top of the stack is literal text
//! - an opener still unclosed at the end of input becomes literal text and its
//!   children are spliced into the parent in place
//! - include tags are literal text here; the engine expands them before
//!   directives are parsed

use serde_json::Value;

use super::lexer::{Token, TokenKind};
use super::loose::CompareOp;

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// A double-quoted string or bare number.
    Literal(Value),
    /// Looked like a literal but did not parse; compares as undefined.
    Invalid,
    /// Anything else resolves the left path a second time.
    LeftPath,
}

impl Operand {
    fn parse(text: &str) -> Self {
        let quoted = text.len() >= 2 && text.starts_with('"') && text.ends_with('"');
        let numeric = !text.is_empty() && text.chars().all(|c| c.is_ascii_digit() || c == '.');
        if quoted || numeric {
            serde_json::from_str(text).map(Operand::Literal).unwrap_or(Operand::Invalid)
        } else {
            Operand::LeftPath
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Condition<'a> {
    Truthy(&'a str),
    Compare {
        left: &'a str,
        op: CompareOp,
        right: Operand,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node<'a> {
    Text(&'a str),
    Variable {
        path: &'a str,
        filter: Option<&'a str>,
        raw: &'a str,
    },
    Each {
        path: &'a str,
        body: Vec<Node<'a>>,
    },
    If {
        condition: Condition<'a>,
        body: Vec<Node<'a>>,
        /// Full source of the directive, opener through closer
        raw: &'a str,
    },
}

enum BlockKind<'a> {
    Each(&'a str),
    If(Condition<'a>),
}

struct Block<'a> {
    kind: BlockKind<'a>,
    opener: Token<'a>,
    children: Vec<Node<'a>>,
}

/// Parse tokens scanned from `source` into a directive tree.
pub(crate) fn parse<'a>(source: &'a str, tokens: Vec<Token<'a>>) -> Vec<Node<'a>> {
    let mut root = Vec::new();
    let mut stack: Vec<Block<'a>> = Vec::new();

    for token in tokens {
        let raw = token.raw;
        match token.kind {
            TokenKind::Text
            | TokenKind::Include {
                ..
            } => push(&mut stack, &mut root, Node::Text(raw)),
            TokenKind::Variable {
                path,
                filter,
            } => push(
                &mut stack,
                &mut root,
                Node::Variable {
                    path,
                    filter,
                    raw,
                },
            ),
            TokenKind::EachOpen {
                path,
            } => stack.push(Block {
                kind: BlockKind::Each(path),
                opener: token,
                children: Vec::new(),
            }),
            TokenKind::IfOpen {
                path,
                comparison,
            } => {
                let condition = match comparison {
                    Some((op, right)) => Condition::Compare {
                        left: path,
                        op,
                        right: Operand::parse(right),
                    },
                    None => Condition::Truthy(path),
                };
                stack.push(Block {
                    kind: BlockKind::If(condition),
                    opener: token,
                    children: Vec::new(),
                });
            }
            TokenKind::EachClose | TokenKind::IfClose => {
                let closes_top = matches!(
                    (stack.last().map(|block| &block.kind), &token.kind),
                    (Some(BlockKind::Each(_)), TokenKind::EachClose)
                        | (Some(BlockKind::If(_)), TokenKind::IfClose)
                );
                match stack.pop() {
                    Some(block) if closes_top => {
                        let node = match block.kind {
                            BlockKind::Each(path) => Node::Each {
                                path,
                                body: block.children,
                            },
                            BlockKind::If(condition) => Node::If {
                                condition,
                                body: block.children,
                                raw: &source[block.opener.start..token.end()],
                            },
                        };
                        push(&mut stack, &mut root, node);
                    }
                    other => {
                        if let Some(block) = other {
                            stack.push(block);
                        }
                        push(&mut stack, &mut root, Node::Text(raw));
                    }
                }
            }
        }
    }

    // Unclosed openers: the opener becomes text, its children move up a level.
    while let Some(block) = stack.pop() {
        let mut nodes = Vec::with_capacity(block.children.len() + 1);
        nodes.push(Node::Text(block.opener.raw));
        nodes.extend(block.children);
        match stack.last_mut() {
            Some(parent) => parent.children.extend(nodes),
            None => root.extend(nodes),
        }
    }

    root
}

fn push<'a>(stack: &mut [Block<'a>], root: &mut Vec<Node<'a>>, node: Node<'a>) {
    match stack.last_mut() {
        Some(block) => block.children.push(node),
        None => root.push(node),
    }
}
