//! Semantic tree builder.
//!
//! Converts a JSX expression into a [`Node`] tree, discovering element
//! identities from the generator's helper-call idioms:
//!
//! - `className={... rh.clsRoot() ...}` or `{...rh.propsRoot()}` marks an
//!   element with stable id `Root` (both must agree when present);
//! - `rh.childStrRoot(...)` is a [`Node::ChildStrCall`];
//! - an expression rooted at `args.<name>` is a [`Node::ArgRef`].
//!
//! The recognizer only depends on [`Idioms`], so other encodings can be
//! plugged in without touching the merge.

use crate::error::{MergeError, Result};
use crate::options::{Idioms, is_class_attribute};
use crate::syntax::SyntaxNode;
use crate::types::{ArgRef, Attribute, ElementBody, Node, TagOrComponent};

const ELEMENT_KINDS: &[&str] = &["jsx_element", "jsx_self_closing_element"];

pub struct TreeBuilder<'a> {
    idioms: &'a Idioms,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(idioms: &'a Idioms) -> Self {
        Self { idioms }
    }

    /// Build the semantic tree of a root expression.
    pub fn build(&self, expression: &SyntaxNode) -> Result<Node> {
        let expression = expression.unparenthesized();
        self.build_expression(expression, expression)
    }

    /// `raw` is the syntax the node is derived from (possibly a `{...}`
    /// container); `expr` is the expression inside it.
    fn build_expression(&self, raw: &SyntaxNode, expr: &SyntaxNode) -> Result<Node> {
        let expr = expr.unparenthesized();

        if is_fragment(expr) {
            return Ok(Node::Fragment {
                children: self.build_children(expr)?,
                raw: raw.clone(),
            });
        }

        if ELEMENT_KINDS.contains(&expr.kind()) {
            if let Some(element) = self.build_element(expr)? {
                return Ok(Node::TagOrComponent(TagOrComponent {
                    element,
                    raw: raw.clone(),
                    secondary: Vec::new(),
                }));
            }
        } else if expr.kind() == "string" {
            return Ok(Node::StringLiteral {
                value: unquote(expr.text()).to_string(),
                raw: raw.clone(),
            });
        } else if self
            .idioms
            .idiom_call(expr, &self.idioms.child_str_prefix)
            .is_some()
        {
            return Ok(Node::ChildStrCall { raw: raw.clone() });
        } else if let Some(arg_name) = self.arg_name(expr) {
            return Ok(Node::ArgRef(ArgRef {
                arg_name: arg_name.to_string(),
                defaults: self.shallow_elements(expr)?,
                raw: raw.clone(),
            }));
        }

        let mut found = self.identified_elements(expr)?;
        if found.is_empty() {
            return Ok(Node::Opaque { raw: raw.clone() });
        }
        let element = found.remove(0);
        tracing::trace!(
            stable_id = %element.stable_id,
            secondary = found.len(),
            "element decorated by wrapper expression"
        );
        Ok(Node::TagOrComponent(TagOrComponent {
            element,
            raw: raw.clone(),
            secondary: found,
        }))
    }

    /// Children of a JSX element or fragment.
    fn build_children(&self, parent: &SyntaxNode) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        for child in parent.named_children() {
            match child.kind() {
                "jsx_opening_element" | "jsx_closing_element" => {}
                "jsx_text" => {
                    let value = text_lines(child.text());
                    if !value.is_empty() {
                        nodes.push(Node::Text {
                            value,
                            raw: child.clone(),
                        });
                    }
                }
                "html_character_reference" => nodes.push(Node::Text {
                    value: child.text().to_string(),
                    raw: child.clone(),
                }),
                "jsx_element" | "jsx_self_closing_element" | "jsx_fragment" => {
                    nodes.push(self.build_expression(child, child)?)
                }
                "jsx_expression" => match child.named_children().next() {
                    Some(inner) if inner.kind() != "spread_element" => {
                        nodes.push(self.build_expression(child, inner)?)
                    }
                    _ => nodes.push(Node::Opaque { raw: child.clone() }),
                },
                _ => nodes.push(Node::Opaque { raw: child.clone() }),
            }
        }
        Ok(nodes)
    }

    /// Build an element body if the element carries an identity.
    fn build_element(&self, node: &SyntaxNode) -> Result<Option<ElementBody>> {
        let self_closing = node.kind() == "jsx_self_closing_element";
        let opening = if self_closing {
            node
        } else {
            match node
                .named_children()
                .find(|c| c.kind() == "jsx_opening_element")
            {
                Some(opening) => opening,
                None => return Ok(None),
            }
        };

        let Some(stable_id) = self.element_identity(opening)? else {
            return Ok(None);
        };

        let tag = opening
            .child_by_field("name")
            .or_else(|| opening.named_children().find(|c| !is_attribute_node(c)))
            .map(|n| n.text().to_string())
            .unwrap_or_default();

        let attributes = attribute_nodes(opening)
            .map(|attr| self.build_attribute(attr))
            .collect::<Result<Vec<_>>>()?;

        let children = if self_closing {
            Vec::new()
        } else {
            self.build_children(node)?
        };

        Ok(Some(ElementBody {
            stable_id: stable_id.to_string(),
            tag,
            attributes,
            children,
            self_closing,
            raw: node.clone(),
        }))
    }

    fn build_attribute(&self, attr: &SyntaxNode) -> Result<Attribute> {
        if attr.kind() == "jsx_expression" {
            return Ok(Attribute::Spread {
                text: attr.text().to_string(),
                raw: attr.clone(),
            });
        }

        let mut parts = attr.named_children();
        let name = parts.next().map(|n| n.text().to_string()).unwrap_or_default();
        let value = match parts.next() {
            None => None,
            Some(value) if value.kind() == "jsx_expression" => match value.named_children().next() {
                Some(inner) => Some(self.build_expression(value, inner)?),
                None => Some(Node::Opaque { raw: value.clone() }),
            },
            Some(value) => Some(self.build_expression(value, value)?),
        };

        Ok(Attribute::Named {
            name,
            value,
            raw: attr.clone(),
        })
    }

    /// Identity from the class-name and props-spread idioms.
    fn element_identity<'n>(&self, opening: &'n SyntaxNode) -> Result<Option<&'n str>> {
        let mut class_id = None;
        let mut props_id = None;

        for attr in attribute_nodes(opening) {
            if attr.kind() == "jsx_expression" {
                let spread = attr.named_children().find(|c| c.kind() == "spread_element");
                if let Some(call) = spread.and_then(|s| s.named_children().next()) {
                    if let Some(id) = self.idioms.idiom_call(call.unparenthesized(), &self.idioms.props_prefix) {
                        props_id.get_or_insert(id);
                    }
                }
                continue;
            }

            let mut parts = attr.named_children();
            let is_class = parts.next().is_some_and(|name| is_class_attribute(name.text()));
            if let (true, Some(value)) = (is_class, parts.next()) {
                if let Some(id) = self.first_idiom_call(value, &self.idioms.class_prefix) {
                    class_id.get_or_insert(id);
                }
            }
        }

        match (class_id, props_id) {
            (Some(class_id), Some(props_id)) if class_id != props_id => Err(MergeError::IdentityMismatch {
                class_id: class_id.to_string(),
                props_id: props_id.to_string(),
            }),
            (class_id, props_id) => Ok(class_id.or(props_id)),
        }
    }

    fn first_idiom_call<'n>(&self, node: &'n SyntaxNode, prefix: &str) -> Option<&'n str> {
        let mut found = None;
        node.walk(&mut |n| {
            if found.is_none() {
                found = self.idioms.idiom_call(n, prefix);
            }
            found.is_none()
        });
        found
    }

    /// `args.<name>` at the leftmost position of the expression.
    fn arg_name<'n>(&self, expr: &'n SyntaxNode) -> Option<&'n str> {
        let mut node = expr;
        loop {
            match node.kind() {
                "member_expression" => {
                    let object = node.child_by_field("object")?;
                    if object.kind() == "identifier" && object.text() == self.idioms.args_object {
                        return node.child_by_field("property").map(|p| p.text());
                    }
                    node = object;
                }
                "parenthesized_expression"
                | "binary_expression"
                | "call_expression"
                | "subscript_expression"
                | "ternary_expression"
                | "non_null_expression"
                | "as_expression" => node = node.named_children().next()?,
                _ => return None,
            }
        }
    }

    /// Identified elements anywhere below `node`, stopping at each one found.
    fn identified_elements(&self, node: &SyntaxNode) -> Result<Vec<ElementBody>> {
        let mut found = Vec::new();
        self.collect_elements(node, true, &mut found)?;
        Ok(found)
    }

    /// Identified elements directly inside an arg expression. The walk stops
    /// at the first element or fragment boundary, identified or not.
    fn shallow_elements(&self, node: &SyntaxNode) -> Result<Vec<ElementBody>> {
        let mut found = Vec::new();
        self.collect_elements(node, false, &mut found)?;
        Ok(found)
    }

    fn collect_elements(
        &self,
        node: &SyntaxNode,
        descend_markup: bool,
        out: &mut Vec<ElementBody>,
    ) -> Result<()> {
        if ELEMENT_KINDS.contains(&node.kind()) && !is_fragment(node) {
            if let Some(element) = self.build_element(node)? {
                out.push(element);
                return Ok(());
            }
            if !descend_markup {
                return Ok(());
            }
        } else if is_fragment(node) && !descend_markup {
            return Ok(());
        }
        for child in node.children() {
            self.collect_elements(child, descend_markup, out)?;
        }
        Ok(())
    }
}

fn is_attribute_node(node: &SyntaxNode) -> bool {
    matches!(node.kind(), "jsx_attribute" | "jsx_expression")
}

fn attribute_nodes(opening: &SyntaxNode) -> impl Iterator<Item = &SyntaxNode> {
    opening.named_children().filter(|c| is_attribute_node(c))
}

/// `<>...</>`, whichever way the grammar spells it.
pub fn is_fragment(node: &SyntaxNode) -> bool {
    match node.kind() {
        "jsx_fragment" => true,
        "jsx_element" => node
            .named_children()
            .find(|c| c.kind() == "jsx_opening_element")
            .is_some_and(|opening| opening.named_children().next().is_none()),
        _ => false,
    }
}

/// JSX text with each line trimmed and blank lines dropped.
fn text_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn unquote(text: &str) -> &str {
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    }
}
