//! Macro definitions and the table the expander looks them up in.
//!
//! A macro is identified by its control-sequence name (matched
//! case-insensitively). It may have several *variants* that differ in the
//! mask, the literal siblings that have to follow the name for the variant to
//! apply. An empty mask token stands for whitespace, so `\begin compactenum `
//! also swallows the blank after `\begin{compactenum}`.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::HashMap;

use pest::Parser;

use crate::error::{Error, Result};
use crate::parser::{Rule, TexParser};

/// Stateful replacement, applied by [`ListState::apply`](crate::processor::ListState::apply)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callback {
    StartOrderedList,
    EndOrderedList,
    StartUnorderedList,
    EndUnorderedList,
    ListItem,
    Paragraph,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Text with `\1`..`\9` placeholders for the expanded arguments
    Template(Cow<'static, str>),
    Callback(Callback),
}

impl Replacement {
    pub fn template(text: impl Into<Cow<'static, str>>) -> Self {
        Replacement::Template(text.into())
    }
}

/// One variant of a macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    name: String,
    mask: Vec<String>,
    arity: usize,
    replacement: Replacement,
}

impl Definition {
    /// Template variant; the arity is the highest placeholder used.
    pub fn template(name: &str, template: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, Replacement::template(template))
    }

    /// Callback variant taking no arguments.
    pub fn callback(name: &str, callback: Callback) -> Self {
        Self::new(name, Replacement::Callback(callback))
    }

    pub fn new(name: &str, replacement: Replacement) -> Self {
        let arity = match &replacement {
            Replacement::Template(text) => template_arity(text),
            Replacement::Callback(_) => 0,
        };
        Self {
            name: normalize_name(name),
            mask: Vec::new(),
            arity,
            replacement,
        }
    }

    pub fn with_mask<I, S>(mut self, mask: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mask = mask.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    /// Parse the compact notation `\name[:arity] mask mask ...`.
    ///
    /// Masks are separated by single spaces, so a trailing space adds an
    /// empty (whitespace-matching) mask token.
    pub fn parse(pattern: &str, replacement: Replacement) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidPattern {
            pattern: pattern.to_owned(),
            reason,
        };

        let pair = TexParser::parse(Rule::pattern, pattern)
            .map_err(Box::new)?
            .next()
            .ok_or_else(|| invalid("empty pattern".to_owned()))?;

        let mut definition = Self::new("", replacement);
        for part in pair.into_inner() {
            match part.as_rule() {
                Rule::macro_name => definition.name = normalize_name(part.as_str()),
                Rule::arity => {
                    definition.arity = part
                        .as_str()
                        .parse::<usize>()
                        .map_err(|e| invalid(e.to_string()))?;
                }
                Rule::mask => {
                    let token = part.into_inner().next().map_or("", |t| t.as_str());
                    definition.mask.push(token.to_owned());
                }
                _ => {}
            }
        }
        Ok(definition)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mask(&self) -> &[String] {
        &self.mask
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn replacement(&self) -> &Replacement {
        &self.replacement
    }

    /// Whether the mask matches the start of `window`.
    ///
    /// `None` marks a position past the last sibling and never matches.
    pub fn matches<S: AsRef<str>>(&self, window: &[Option<S>]) -> bool {
        self.mask.len() <= window.len()
            && self.mask.iter().zip(window).all(|(expected, actual)| {
                actual.as_ref().is_some_and(|actual| {
                    let actual: &str = actual.as_ref();
                    expected == actual
                        || (expected.is_empty()
                            && !actual.is_empty()
                            && actual.trim().is_empty())
                })
            })
    }
}

/// Lookup key of a control sequence leaf.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Highest `\N` placeholder in `template`, 0 if there is none.
pub fn template_arity(template: &str) -> usize {
    placeholders(template)
        .filter_map(|(_, index)| index)
        .max()
        .unwrap_or(0)
}

/// Substitute `\N` placeholders with `args[N - 1]`.
///
/// `\0` and indices past the end of `args` render as nothing.
pub fn render_template(template: &str, args: &[String]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut last = 0;
    for (at, index) in placeholders(template) {
        output.push_str(&template[last..at]);
        if let Some(arg) = index.and_then(|n| args.get(n - 1)) {
            output.push_str(arg);
        }
        last = at + 2;
    }
    output.push_str(&template[last..]);
    output
}

/// Byte offsets of `\<digit>` and the 1-based argument index (`None` for `\0`)
fn placeholders(template: &str) -> impl Iterator<Item = (usize, Option<usize>)> + '_ {
    let bytes = template.as_bytes();
    bytes.windows(2).enumerate().filter_map(|(at, pair)| {
        if pair[0] == b'\\' && pair[1].is_ascii_digit() {
            let index = usize::from(pair[1] - b'0');
            Some((at, (index > 0).then_some(index)))
        } else {
            None
        }
    })
}

/// All macros known to the expander, variants ordered longest mask first.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: HashMap<String, Vec<Definition>>,
}

impl MacroTable {
    pub fn new(definitions: impl IntoIterator<Item = Definition>) -> Self {
        let mut table = Self::default();
        for definition in definitions {
            table.insert(definition);
        }
        table
    }

    /// Build a table from `(pattern, replacement)` pairs in the notation of
    /// [`Definition::parse`].
    pub fn from_patterns<'p>(
        patterns: impl IntoIterator<Item = (&'p str, Replacement)>,
    ) -> Result<Self> {
        let mut table = Self::default();
        for (pattern, replacement) in patterns {
            table.insert(Definition::parse(pattern, replacement)?);
        }
        Ok(table)
    }

    /// Add a variant. Variants with equal mask length keep insertion order.
    pub fn insert(&mut self, definition: Definition) {
        let variants = self.macros.entry(definition.name.clone()).or_default();
        variants.push(definition);
        variants.sort_by_key(|v| Reverse(v.mask.len()));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Variants of `name`, most specific first. `name` must be normalized.
    pub fn variants(&self, name: &str) -> &[Definition] {
        self.macros.get(name).map_or(&[], Vec::as_slice)
    }

    /// Longest mask among the variants of `name`.
    pub fn max_mask_len(&self, name: &str) -> Option<usize> {
        self.variants(name).first().map(|v| v.mask.len())
    }

    /// First variant whose mask matches `window`.
    pub fn select<S: AsRef<str>>(&self, name: &str, window: &[Option<S>]) -> Option<&Definition> {
        self.variants(name).iter().find(|v| v.matches(window))
    }

    /// Number of distinct macro names.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// The table used by [`preprocess`](crate::preprocess).
    pub fn builtin() -> Self {
        use Callback::*;

        const ALIGN: &str = "\n\\[\\begin{align*}\n    \\1\n\\end {align*}\\]\n";
        const EQUATION: &str = "\n\\[\\begin{equation*}\n    \\1\n\\end {equation*}\\]\n";

        Self::new([
            // equations; the space in `\end {..}` keeps the wiki parser away
            Definition::template(r"\eq", ALIGN).with_mask(["m"]),
            Definition::template(r"\eq", EQUATION).with_mask(["s"]),
            Definition::template(r"\eq", EQUATION),
            Definition::template(r"\eqref", r"\eqref{\1}").with_arity(1),
            // lists
            Definition::callback(r"\begin", StartOrderedList).with_mask(["compactenum", ""]),
            Definition::callback(r"\begin", StartOrderedList).with_mask(["compactenum"]),
            Definition::callback(r"\end", EndOrderedList).with_mask(["compactenum"]),
            Definition::callback(r"\begin", StartUnorderedList).with_mask(["compactitem", ""]),
            Definition::callback(r"\begin", StartUnorderedList).with_mask(["compactitem"]),
            Definition::callback(r"\end", EndUnorderedList).with_mask(["compactitem"]),
            Definition::callback(r"\item", ListItem),
            // text style and typography
            Definition::template(r"\emph", r"//\1//"),
            Definition::template(r"\footnote", r"((\1))"),
            Definition::callback(r"\par", Paragraph),
            Definition::template(r"\textit", r"//\1//"),
            Definition::template(r"\url", r"[[\1]]").with_arity(1),
            Definition::template(r"\uv", "\u{201e}\\1\u{201c}").with_arity(1),
            Definition::template(r"\,", "\u{2009}"),
            Definition::template(r"\\", r"\\"),
            // figures
            Definition::template(r"\illfigi", "").with_arity(5).with_mask(["i"]),
            Definition::template(r"\illfigi", "").with_arity(5).with_mask(["o"]),
            Definition::template(r"\illfigi", "").with_arity(5),
            Definition::template(r"\illfig", "").with_arity(4),
            Definition::template(r"\fullfig", "").with_arity(3),
            // dropped
            Definition::template(r"\hfill", ""),
            Definition::template(r"\mbox", r"\1").with_arity(1),
            Definition::template(r"\noindent", ""),
            Definition::template(r"\quad", " "),
            Definition::template(r"\ref", "").with_arity(1),
            Definition::template(r"\smallskip", ""),
            Definition::template(r"\vspace", "").with_arity(1),
            Definition::template(r"\vspace*", "").with_arity(1),
            Definition::template(r"\taskhint", r"**\1:** \2").with_arity(2),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window<'a>(items: &[&'a str]) -> Vec<Option<&'a str>> {
        items.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_template_arity() {
        assert_eq!(template_arity("no args"), 0);
        assert_eq!(template_arity(r"//\1//"), 1);
        assert_eq!(template_arity(r"**\1:** \2"), 2);
        assert_eq!(template_arity(r"\3 only"), 3);
        assert_eq!(template_arity(r"\\"), 0);
    }

    #[test]
    fn test_render_template() {
        let args = vec!["a".to_owned(), "b".to_owned()];
        assert_eq!(render_template(r"**\1:** \2", &args), "**a:** b");
        assert_eq!(render_template(r"\2\1\2", &args), "bab");
        assert_eq!(render_template(r"[\0|\3]", &args), "[|]");
        assert_eq!(render_template(r"\\ line", &args), r"\\ line");
    }

    #[test]
    fn test_parse_pattern() {
        let def = Definition::parse(r"\illfigi:5 i", Replacement::template("")).unwrap();
        assert_eq!(def.name(), r"\illfigi");
        assert_eq!(def.arity(), 5);
        assert_eq!(def.mask(), ["i"]);

        let def = Definition::parse(
            r"\begin compactenum ",
            Replacement::Callback(Callback::StartOrderedList),
        )
        .unwrap();
        assert_eq!(def.name(), r"\begin");
        assert_eq!(def.arity(), 0);
        assert_eq!(def.mask(), ["compactenum", ""]);

        let def = Definition::parse(r"\vspace*:1", Replacement::template("")).unwrap();
        assert_eq!(def.name(), r"\vspace*");
        assert_eq!(def.arity(), 1);
        assert!(def.mask().is_empty());

        let def = Definition::parse(r"\taskhint", Replacement::template(r"\1 \2")).unwrap();
        assert_eq!(def.arity(), 2);

        let def = Definition::parse(r"\\", Replacement::template(r"\\")).unwrap();
        assert_eq!(def.name(), r"\\");
    }

    #[test]
    fn test_parse_invalid_pattern() {
        assert!(matches!(
            Definition::parse("emph", Replacement::template("")),
            Err(Error::Grammar(_))
        ));
        assert!(matches!(
            Definition::parse(r"\x:99999999999999999999999", Replacement::template("")),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_empty_mask_matches_whitespace_only() {
        let def = Definition::template(r"\x", "").with_mask(["a", ""]);
        assert!(def.matches(&window(&["a", " \n"])));
        assert!(!def.matches(&window(&["a", ""])));
        assert!(!def.matches(&window(&["a", " b"])));
        assert!(!def.matches(&[Some("a"), None]));
    }

    #[test]
    fn test_variants_sorted_by_mask_length() {
        let table = MacroTable::new([
            Definition::template(r"\begin", "plain"),
            Definition::template(r"\begin", "one").with_mask(["x"]),
            Definition::template(r"\begin", "two").with_mask(["x", ""]),
        ]);
        let masks: Vec<usize> = table
            .variants(r"\begin")
            .iter()
            .map(|v| v.mask().len())
            .collect();
        assert_eq!(masks, vec![2, 1, 0]);
        assert_eq!(table.max_mask_len(r"\begin"), Some(2));
        assert_eq!(table.max_mask_len(r"\end"), None);

        let chosen = table.select(r"\begin", &window(&["x", "y"])).unwrap();
        assert_eq!(chosen.mask(), ["x"]);
        let chosen = table.select(r"\begin", &window(&["z", " "])).unwrap();
        assert!(chosen.mask().is_empty());
    }

    #[test]
    fn test_names_are_normalized() {
        let table = MacroTable::new([Definition::template(r" \EMPH ", r"//\1//")]);
        assert!(table.contains(r"\emph"));
        assert_eq!(normalize_name("\\Item  "), r"\item");
    }

    #[test]
    fn test_builtin_table() {
        let table = MacroTable::builtin();
        assert_eq!(table.max_mask_len(r"\begin"), Some(2));
        assert_eq!(table.max_mask_len(r"\eq"), Some(1));
        assert_eq!(table.variants(r"\illfigi").len(), 3);
        assert_eq!(table.variants(r"\illfigi")[2].arity(), 5);
        assert_eq!(table.variants(r"\taskhint")[0].arity(), 2);
        assert!(table.contains(r"\vspace*"));
    }

    #[test]
    fn test_from_patterns_matches_builder() {
        let parsed = MacroTable::from_patterns([
            (r"\emph", Replacement::template(r"//\1//")),
            (r"\url:1", Replacement::template(r"[[\1]]")),
        ])
        .unwrap();
        assert_eq!(
            parsed.variants(r"\url"),
            [Definition::template(r"\url", r"[[\1]]").with_arity(1)]
        );
        assert_eq!(parsed.len(), 2);
    }
}
