//! Textual rewrites applied before tokenization.
//!
//! Authors write physical quantities as quoted strings such as
//! `"9.81 m.s^{-2}"` or `"6.022e23"`. These become TeX math with a decimal
//! comma and the unit set upright after a thin space.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Bracketed optional arguments that masks know about
const OPTIONAL_ARGS: [(&str, &str); 3] = [("[m]", "{m}"), ("[i]", "{i}"), ("[o]", "{o}")];

static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"""#,
        r"(?P<mantissa>[+-]?[0-9\\,]+(?: +[0-9\\,]+)*(?:\.[0-9\\,]+(?: +[0-9\\,]+)*)?)",
        r"(?:e(?P<exponent>[+-]?[0-9]+(?: +[0-9]+)*))?",
        r#"(?:(?P<space>\s*)(?P<unit>[^"]+))?"#,
        r#"""#,
    ))
    .expect("quantity pattern is valid")
});

/// Run all rewrites on `text`.
pub fn rewrite(text: &str) -> String {
    let text = rewrite_optional_args(text);
    rewrite_quantities(&text).into_owned()
}

/// `\eq[m]{..}` becomes `\eq{m}{..}` so the mask can see the option.
pub fn rewrite_optional_args(text: &str) -> String {
    OPTIONAL_ARGS
        .iter()
        .fold(text.to_owned(), |text, (from, to)| text.replace(from, to))
}

/// Replace every quoted quantity by its TeX rendering.
pub fn rewrite_quantities(text: &str) -> Cow<'_, str> {
    QUANTITY_RE.replace_all(text, |caps: &Captures| format_quantity(caps))
}

fn format_quantity(caps: &Captures) -> String {
    let mantissa = &caps["mantissa"];
    let number = match caps.name("exponent") {
        Some(exponent) => format!(r"{mantissa} \cdot 10^{{{}}}", exponent.as_str()),
        None => mantissa.to_owned(),
    };
    let mut output = number.replace('.', "{,}").replace(' ', r"\;");

    if let Some(unit) = caps.name("unit") {
        let separated = caps.name("space").is_some_and(|s| !s.as_str().is_empty());
        if separated {
            output.push_str(r"\,\mathrm{");
            output.push_str(&unit.as_str().replace('.', r"\cdot "));
            output.push('}');
        } else {
            output.push_str(unit.as_str());
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_number() {
        assert_eq!(rewrite(r#"v = "12.5""#), r"v = 12{,}5");
        assert_eq!(rewrite(r#""-3""#), "-3");
    }

    #[test]
    fn test_exponent_and_unit() {
        assert_eq!(
            rewrite(r#""12.5e3 m/s""#),
            r"12{,}5\;\cdot\;10^{3}\,\mathrm{m/s}"
        );
        assert_eq!(
            rewrite(r#""6.022e+23""#),
            r"6{,}022\;\cdot\;10^{+23}"
        );
    }

    #[test]
    fn test_unit_dots_become_products() {
        assert_eq!(rewrite(r#""9.81 m.s^{-2}""#), r"9{,}81\,\mathrm{m\cdot s^{-2}}");
    }

    #[test]
    fn test_digit_groups() {
        assert_eq!(rewrite(r#""1 000 000 kg""#), r"1\;000\;000\,\mathrm{kg}");
        assert_eq!(rewrite(r#""3.141 59""#), r"3{,}141\;59");
    }

    #[test]
    fn test_glued_unit_is_not_wrapped() {
        assert_eq!(rewrite(r#""5kg""#), "5kg");
    }

    #[test]
    fn test_non_numeric_quotes_are_kept() {
        let text = r#"he said "hello" and "x 5""#;
        assert_eq!(rewrite(text), text);
    }

    #[test]
    fn test_optional_args() {
        assert_eq!(rewrite(r"\eq[m]{a}\illfigi[o]"), r"\eq{m}{a}\illfigi{o}");
        assert_eq!(rewrite("[x]"), "[x]");
    }
}
