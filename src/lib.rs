//! Translate a small TeX dialect into wiki markup.
//!
//! ```
//! assert_eq!(texwiki::preprocess(r"\emph{hello}").unwrap(), "//hello//");
//! ```
//!
//! Input goes through the quantity rewrite ([`units`]), the [`Tokenizer`],
//! the tree builder ([`parse`]) and finally the [`Expander`].

pub mod ast;
pub mod error;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod processor;
pub mod units;

use std::sync::LazyLock;

pub use ast::{Group, Node, Token};
pub use error::{Error, Result};
pub use lexer::Tokenizer;
pub use macros::{Callback, Definition, MacroTable, Replacement};
pub use parser::{DEPTH_LIMIT, parse, parse_with_depth};
pub use processor::{Expander, ListKind, ListState, SAFETY_LIMIT};

static BUILTIN: LazyLock<MacroTable> = LazyLock::new(MacroTable::builtin);

/// Preprocess `text` with the built-in macro table.
pub fn preprocess(text: &str) -> Result<String> {
    let table = &*BUILTIN;
    run(text, &Expander::new(table), DEPTH_LIMIT)
}

/// Configurable front end owning its macro table
#[derive(Debug, Clone)]
pub struct Preprocessor {
    table: MacroTable,
    step_limit: usize,
    depth_limit: usize,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::with_table(MacroTable::builtin())
    }
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: MacroTable) -> Self {
        Self {
            table,
            step_limit: SAFETY_LIMIT,
            depth_limit: DEPTH_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// Group nesting kept by the tree builder; deeper braces stay literal.
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    pub fn table(&self) -> &MacroTable {
        &self.table
    }

    pub fn preprocess(&self, text: &str) -> Result<String> {
        let expander = Expander::new(&self.table).with_step_limit(self.step_limit);
        run(text, &expander, self.depth_limit)
    }
}

fn run(text: &str, expander: &Expander, depth_limit: usize) -> Result<String> {
    let text = units::rewrite(text);
    let tree = parse_with_depth(&text, depth_limit);
    expander.expand(&tree)
}
