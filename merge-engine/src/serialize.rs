//! Markup builder.
//!
//! Merged output is produced as text. Every emitted piece remembers whether
//! it is already bare markup (usable directly as a JSX child or attribute
//! value) or a plain expression that needs a `{...}` container there.

use crate::syntax::{SyntaxNode, indent_continuation};

pub const EMPTY_FRAGMENT: &str = "<></>";

/// One level of child indentation.
const INDENT: &str = "  ";

/// Syntax kinds that can sit directly in a JSX child list or attribute value.
const BARE_KINDS: &[&str] = &[
    "jsx_element",
    "jsx_self_closing_element",
    "jsx_fragment",
    "jsx_expression",
    "jsx_text",
    "html_character_reference",
    "string",
];

pub fn is_bare_markup(node: &SyntaxNode) -> bool {
    BARE_KINDS.contains(&node.kind())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub code: String,
    pub bare: bool,
}

impl Emitted {
    pub fn markup(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            bare: true,
        }
    }

    pub fn expression(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            bare: false,
        }
    }

    /// Code derived from `raw`, bare when `raw` itself is.
    pub fn from_raw(raw: &SyntaxNode, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            bare: is_bare_markup(raw),
        }
    }

    /// Text usable inside a JSX child list or as an attribute value.
    pub fn into_embedded(self) -> String {
        if self.bare {
            self.code
        } else {
            format!("{{{}}}", self.code)
        }
    }
}

/// `<tag a b>` children `</tag>`, or `<tag a b />` when childless and the
/// source element was self-closing.
pub fn build_element(tag: &str, attributes: &[String], children: &[String], self_closing: bool) -> String {
    let mut open = format!("<{tag}");
    for attr in attributes {
        open.push(' ');
        open.push_str(attr);
    }

    if children.is_empty() {
        if self_closing {
            format!("{open} />")
        } else {
            format!("{open}></{tag}>")
        }
    } else {
        format!("{open}>\n{}\n</{tag}>", child_block(children))
    }
}

pub fn build_fragment(children: &[String]) -> String {
    if children.is_empty() {
        EMPTY_FRAGMENT.to_string()
    } else {
        format!("<>\n{}\n</>", child_block(children))
    }
}

/// Children one per line, each indented one level.
fn child_block(children: &[String]) -> String {
    children
        .iter()
        .map(|child| format!("{INDENT}{}", indent_continuation(child, INDENT)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `name` or `name=value`.
pub fn print_attribute(name: &str, value: Option<Emitted>) -> String {
    match value {
        Some(value) => format!("{name}={}", value.into_embedded()),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Dialect, parse_expression};

    #[test]
    fn test_build_element_shapes() {
        let attrs = vec!["className={rh.clsRoot()}".to_string()];
        assert_eq!(build_element("div", &attrs, &[], true), "<div className={rh.clsRoot()} />");
        assert_eq!(build_element("div", &[], &[], false), "<div></div>");
        assert_eq!(
            build_element("p", &[], &["Hi".to_string(), "{name}".to_string()], true),
            "<p>\n  Hi\n  {name}\n</p>"
        );
        let nested = build_element("b", &[], &["x".to_string()], false);
        assert_eq!(build_fragment(&[nested]), "<>\n  <b>\n    x\n  </b>\n</>");
    }

    #[test]
    fn test_expression_wrapped_when_embedded() {
        assert_eq!(Emitted::expression("a && b").into_embedded(), "{a && b}");
        assert_eq!(Emitted::markup("<a />").into_embedded(), "<a />");
        assert_eq!(print_attribute("tab", Some(Emitted::expression("123"))), "tab={123}");
        assert_eq!(print_attribute("hidden", None), "hidden");
    }

    #[test]
    fn test_bare_markup_kinds() {
        let element = parse_expression("<a />", Dialect::Tsx).unwrap();
        let call = parse_expression("f()", Dialect::Tsx).unwrap();
        assert!(is_bare_markup(&element));
        assert!(!is_bare_markup(&call));
    }
}
