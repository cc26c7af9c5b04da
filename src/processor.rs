use std::borrow::Cow;

use log::{debug, warn};

use crate::ast::{Group, Node};
use crate::error::{Error, Result};
use crate::macros::{
    Callback, Definition, MacroTable, Replacement, normalize_name, render_template,
};

/// Steps a single group walk may take before expansion is aborted
pub const SAFETY_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

/// Stack of the lists currently open.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ListState(Vec<ListKind>);

impl ListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn current(&self) -> Option<ListKind> {
        self.0.last().copied()
    }

    /// Run `callback` against the list stack and return its output.
    ///
    /// Closing a list that was never opened does nothing; an item outside of
    /// any list gets the ordered marker at depth zero.
    pub fn apply(&mut self, callback: Callback) -> String {
        match callback {
            Callback::StartOrderedList => {
                self.0.push(ListKind::Ordered);
                "\n".to_owned()
            }
            Callback::StartUnorderedList => {
                self.0.push(ListKind::Unordered);
                "\n".to_owned()
            }
            Callback::EndOrderedList | Callback::EndUnorderedList => {
                self.0.pop();
                "\n".to_owned()
            }
            Callback::ListItem => {
                let marker = match self.current() {
                    Some(ListKind::Unordered) => '*',
                    _ => '-',
                };
                format!("\n{}{marker} ", "  ".repeat(self.depth()))
            }
            Callback::Paragraph => {
                if self.is_empty() {
                    "\n\n".to_owned()
                } else {
                    "\\\\ ".to_owned()
                }
            }
        }
    }
}

/// Index based position over the children of one group
#[derive(Debug, Clone)]
struct Cursor<'g, 'a> {
    nodes: &'g [Node<'a>],
    pos: usize,
}

impl<'g, 'a> Cursor<'g, 'a> {
    fn new(nodes: &'g [Node<'a>]) -> Self {
        Self { nodes, pos: 0 }
    }

    fn current(&self) -> Option<&'g Node<'a>> {
        self.nodes.get(self.pos)
    }

    /// Sibling `offset` positions after the current one
    fn peek(&self, offset: usize) -> Option<&'g Node<'a>> {
        self.nodes.get(self.pos + offset)
    }

    fn remaining(&self) -> usize {
        self.nodes.len().saturating_sub(self.pos)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.nodes.len());
    }

    fn mark(&self) -> usize {
        self.pos
    }

    fn reset(&mut self, mark: usize) {
        self.pos = mark;
    }
}

/// Expands group trees against a [`MacroTable`].
///
/// The expander only borrows the table, so one table can serve any number
/// of expanders. List state lives for a single [`Expander::expand`] call.
#[derive(Debug, Clone)]
pub struct Expander<'t> {
    table: &'t MacroTable,
    step_limit: usize,
}

impl<'t> Expander<'t> {
    pub fn new(table: &'t MacroTable) -> Self {
        Self {
            table,
            step_limit: SAFETY_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Expand a whole tree (main entry point)
    ///
    /// Recursion follows the group nesting of `root`, which [`parse`] caps at
    /// [`DEPTH_LIMIT`](crate::parser::DEPTH_LIMIT) levels.
    ///
    /// [`parse`]: crate::parser::parse
    pub fn expand(&self, root: &Group) -> Result<String> {
        let mut walk = Walk {
            expander: self,
            lists: ListState::new(),
        };
        let output = walk.group(root)?;
        if !walk.lists.is_empty() {
            debug!("{} list(s) left open at end of input", walk.lists.depth());
        }
        Ok(output)
    }
}

/// State of one top-level expansion
struct Walk<'e, 't> {
    expander: &'e Expander<'t>,
    lists: ListState,
}

impl Walk<'_, '_> {
    fn group(&mut self, group: &Group) -> Result<String> {
        let mut cursor = Cursor::new(&group.nodes);
        let mut output = String::new();
        let mut steps = 0;
        while let Some(node) = cursor.current() {
            steps += 1;
            if steps > self.expander.step_limit {
                return Err(Error::StepLimitExceeded {
                    limit: self.expander.step_limit,
                });
            }

            match node {
                Node::Group(inner) => {
                    output.push('{');
                    output.push_str(&self.group(inner)?);
                    output.push('}');
                    cursor.advance(1);
                }
                Node::Leaf(text) => self.leaf(text, &mut cursor, &mut output)?,
            }
        }
        Ok(output)
    }

    /// Expand the leaf under the cursor, consuming its mask and arguments
    fn leaf(&mut self, text: &str, cursor: &mut Cursor, output: &mut String) -> Result<()> {
        let table = self.expander.table;
        let name = normalize_name(text);
        let Some(variant) = Self::choose_variant(table, &name, cursor) else {
            output.push_str(text);
            cursor.advance(1);
            return Ok(());
        };

        let mark = cursor.mark();
        cursor.advance(1 + variant.mask().len());
        if cursor.remaining() < variant.arity() {
            warn!(
                "{name} takes {} argument(s) but only {} follow, leaving it as is",
                variant.arity(),
                cursor.remaining()
            );
            cursor.reset(mark);
            output.push_str(text);
            cursor.advance(1);
            return Ok(());
        }

        let mut args = Vec::with_capacity(variant.arity());
        for _ in 0..variant.arity() {
            if let Some(arg) = cursor.current() {
                args.push(self.argument(arg)?);
            }
            cursor.advance(1);
        }

        let replacement = match variant.replacement() {
            Replacement::Template(template) => render_template(template, &args),
            Replacement::Callback(callback) => {
                debug!("{name}: {callback:?} at list depth {}", self.lists.depth());
                self.lists.apply(*callback)
            }
        };
        output.push_str(&replacement);
        Ok(())
    }

    /// Pick the variant whose mask matches the siblings after the cursor.
    /// Mask siblings are compared as flattened text, never expanded.
    fn choose_variant<'t>(
        table: &'t MacroTable,
        name: &str,
        cursor: &Cursor,
    ) -> Option<&'t Definition> {
        let max_mask = table.max_mask_len(name)?;
        let window: Vec<Option<Cow<str>>> = (1..=max_mask)
            .map(|offset| cursor.peek(offset).map(Node::flatten))
            .collect();
        let variant = table.select(name, &window);
        match variant {
            Some(v) => debug!("{name}: variant with mask {:?}", v.mask()),
            None => debug!("{name}: no variant matches {window:?}"),
        }
        variant
    }

    fn argument(&mut self, node: &Node) -> Result<String> {
        match node {
            Node::Leaf(text) => Ok(text.to_string()),
            Node::Group(group) => self.group(group),
        }
    }
}
