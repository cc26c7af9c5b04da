use std::iter::FusedIterator;

use log::trace;
use pest::Parser;

use crate::ast::Token;
use crate::parser::{Rule, TexParser};

/// Lazy tokenizer over a text buffer.
///
/// Every byte of the input ends up in exactly one token, so concatenating
/// the [`Token::lexeme`]s of a full pass yields the input again. The
/// tokenizer never fails: anything that is not a control sequence or a brace
/// becomes [`Token::Text`].
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    offset: usize,
    /// Token found while scanning a text run, emitted on the next call
    pending: Option<Token<'a>>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
            pending: None,
        }
    }

    /// Byte offset of the next token.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Restart tokenization from the beginning of the input.
    pub fn rewind(&mut self) {
        self.offset = 0;
        self.pending = None;
    }

    /// Try the token patterns at `offset`, in grammar order
    fn match_at(&self, offset: usize) -> Option<Token<'a>> {
        let rest = &self.input[offset..];
        // Tokens can only start with one of these
        if !rest.starts_with(['\\', '{', '}']) {
            return None;
        }
        // A lone `\` or one followed by whitespace never matches the grammar
        if rest.starts_with('\\') && !rest[1..].starts_with(|c: char| !is_space(c)) {
            return None;
        }

        let token = TexParser::parse(Rule::token, rest).ok()?.next()?;
        let inner = token.into_inner().next()?;
        match inner.as_rule() {
            Rule::brace_open => Some(Token::BraceOpen),
            Rule::brace_close => Some(Token::BraceClose),
            Rule::control_sequence => {
                let lexeme = inner.as_str();
                let mut name = lexeme;
                let mut starred = false;
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::sequence_name => name = &rest[..part.as_span().end()],
                        Rule::star => starred = true,
                        _ => {}
                    }
                }
                Some(Token::ControlSequence {
                    name,
                    starred,
                    lexeme,
                })
            }
            _ => None,
        }
    }
}

/// Whitespace as the grammar's `space` rule defines it
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{0B}' | '\u{0C}')
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if let Some(token) = self.pending.take() {
            self.offset += token.lexeme().len();
            trace!("token {token:?}");
            return Some(token);
        }

        let start = self.offset;
        let mut cursor = start;
        while cursor < self.input.len() {
            if let Some(token) = self.match_at(cursor) {
                if cursor == start {
                    self.offset += token.lexeme().len();
                    trace!("token {token:?}");
                    return Some(token);
                }
                self.pending = Some(token);
                break;
            }
            cursor += self.input[cursor..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
        }

        if cursor == start {
            return None;
        }
        self.offset = cursor;
        let text = Token::Text(&self.input[start..cursor]);
        trace!("token {text:?}");
        Some(text)
    }
}

impl FusedIterator for Tokenizer<'_> {}
