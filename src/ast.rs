use std::borrow::Cow;

/// Lexical token produced by the [`Tokenizer`](crate::lexer::Tokenizer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// `{`
    BraceOpen,
    /// `}`
    BraceClose,
    /// Control sequence such as `\emph`, `\,` or `\vspace *`
    ControlSequence {
        /// Escape character plus name, e.g. `\emph`
        name: &'a str,
        /// Whether a trailing `*` was attached
        starred: bool,
        /// Exact input span, including trailing whitespace and star
        lexeme: &'a str,
    },
    /// Literal run of text between the other tokens
    Text(&'a str),
}

impl<'a> Token<'a> {
    /// The exact slice of the input this token covers.
    pub fn lexeme(&self) -> &'a str {
        match *self {
            Token::BraceOpen => "{",
            Token::BraceClose => "}",
            Token::ControlSequence { lexeme, .. } => lexeme,
            Token::Text(text) => text,
        }
    }
}

/// Node of the tree built by [`parse`](crate::parser::parse)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    /// Literal text or a normalized control sequence
    Leaf(Cow<'a, str>),
    /// Brace-delimited subtree
    Group(Group<'a>),
}

impl Node<'_> {
    /// Plain text of the node with group braces dropped and nothing expanded.
    pub fn flatten(&self) -> Cow<'_, str> {
        match self {
            Node::Leaf(text) => Cow::Borrowed(text.as_ref()),
            Node::Group(group) => Cow::Owned(group.flatten()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Group<'a> {
    pub nodes: Vec<Node<'a>>,
}

impl<'a> Group<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node<'a>) {
        self.nodes.push(node);
    }

    pub fn flatten(&self) -> String {
        let mut text = String::new();
        for node in &self.nodes {
            text.push_str(&node.flatten());
        }
        text
    }
}
