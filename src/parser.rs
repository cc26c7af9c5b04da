use std::borrow::Cow;

use log::warn;
use pest_derive::Parser;

use crate::ast::{Group, Node, Token};
use crate::lexer::Tokenizer;

#[derive(Parser)]
#[grammar = "src/tex.pest"]
pub struct TexParser;

/// Deepest group nesting kept in the tree. Braces nested deeper stay literal
/// text, which keeps every recursive walk over the tree bounded.
pub const DEPTH_LIMIT: usize = 256;

/// Build the group tree of `input`.
///
/// Bracing errors are tolerated: a `}` without a matching `{` is dropped and
/// groups still open at the end of input are closed there.
pub fn parse(input: &str) -> Group<'_> {
    parse_with_depth(input, DEPTH_LIMIT)
}

/// Like [`parse`], keeping at most `max_depth` levels of groups.
pub fn parse_with_depth(input: &str, max_depth: usize) -> Group<'_> {
    parse_tokens(Tokenizer::new(input), max_depth)
}

/// Build the group tree from an already tokenized input
pub fn parse_tokens<'a>(
    tokens: impl IntoIterator<Item = Token<'a>>,
    max_depth: usize,
) -> Group<'a> {
    let mut root = Group::new();
    let mut open: Vec<Group<'a>> = Vec::new();
    // braces past `max_depth` that are waiting for their `}`
    let mut literal_depth = 0usize;
    // whether the last node pushed is a run of literal braces
    let mut literal_run = false;

    for token in tokens {
        let is_literal = match token {
            Token::BraceOpen => open.len() >= max_depth,
            Token::BraceClose => literal_depth > 0,
            _ => false,
        };
        if is_literal {
            if literal_depth == 0 {
                warn!("groups nested deeper than {max_depth} levels are kept as text");
            }
            let brace = token.lexeme();
            if brace == "{" {
                literal_depth += 1;
            } else {
                literal_depth -= 1;
            }
            push_literal(top(&mut root, &mut open), brace, literal_run);
            literal_run = true;
            continue;
        }
        literal_run = false;

        match token {
            Token::BraceOpen => open.push(Group::new()),
            Token::BraceClose => match open.pop() {
                Some(group) => top(&mut root, &mut open).push(Node::Group(group)),
                None => warn!("dropping unmatched closing brace"),
            },
            Token::ControlSequence {
                name,
                starred,
                lexeme,
            } => {
                let leaf = if starred {
                    Cow::Owned(format!("{name}*"))
                } else {
                    Cow::Borrowed(lexeme)
                };
                top(&mut root, &mut open).push(Node::Leaf(leaf));
            }
            Token::Text(text) => top(&mut root, &mut open).push(Node::Leaf(Cow::Borrowed(text))),
        }
    }

    if !open.is_empty() {
        warn!("closing {} unterminated group(s) at end of input", open.len());
    }
    while let Some(group) = open.pop() {
        top(&mut root, &mut open).push(Node::Group(group));
    }
    root
}

/// Append a literal brace, extending the previous run when there is one
fn push_literal<'a>(group: &mut Group<'a>, brace: &'a str, extend: bool) {
    if let (true, Some(Node::Leaf(text))) = (extend, group.nodes.last_mut()) {
        text.to_mut().push_str(brace);
        return;
    }
    group.push(Node::Leaf(Cow::Borrowed(brace)));
}

/// Innermost open group
fn top<'s, 'a>(root: &'s mut Group<'a>, open: &'s mut [Group<'a>]) -> &'s mut Group<'a> {
    open.last_mut().unwrap_or(root)
}
