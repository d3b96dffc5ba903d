//! Naming conventions and merge policy knobs.

use crate::syntax::{Dialect, SyntaxNode};

/// Attribute names treated as the class-name attribute.
pub const CLASS_ATTRIBUTES: &[&str] = &["className", "class"];

/// The generator's helper-call naming scheme.
///
/// Generated markup carries its identities inside calls on a helper object:
/// `className={rh.clsRoot()}`, `{...rh.propsRoot()}`, `rh.showRoot() && ...`
/// and `{rh.childStrRoot()}` all name the element `Root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Idioms {
    pub helper_object: String,
    pub args_object: String,
    pub class_prefix: String,
    pub props_prefix: String,
    pub show_prefix: String,
    pub child_str_prefix: String,
}

impl Default for Idioms {
    fn default() -> Self {
        Self {
            helper_object: "rh".into(),
            args_object: "args".into(),
            class_prefix: "cls".into(),
            props_prefix: "props".into(),
            show_prefix: "show".into(),
            child_str_prefix: "childStr".into(),
        }
    }
}

impl Idioms {
    /// If `node` is a call shaped `<helper>.<prefix><Id>(...)`, return `Id`.
    pub fn idiom_call<'n>(&self, node: &'n SyntaxNode, prefix: &str) -> Option<&'n str> {
        if node.kind() != "call_expression" {
            return None;
        }
        let callee = node.child_by_field("function")?;
        self.idiom_member(callee, prefix)
    }

    /// If `node` is a member access `<helper>.<prefix><Id>`, return `Id`.
    pub fn idiom_member<'n>(&self, node: &'n SyntaxNode, prefix: &str) -> Option<&'n str> {
        if node.kind() != "member_expression" {
            return None;
        }
        let object = node.child_by_field("object")?;
        let property = node.child_by_field("property")?;
        if object.text() != self.helper_object {
            return None;
        }
        property
            .text()
            .strip_prefix(prefix)
            .filter(|id| !id.is_empty())
    }

    /// Every identity-carrying prefix, longest first so that no prefix
    /// shadows a longer one sharing its start.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes = vec![
            self.class_prefix.as_str(),
            self.props_prefix.as_str(),
            self.show_prefix.as_str(),
            self.child_str_prefix.as_str(),
        ];
        prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
        prefixes
    }

    /// First `<helper>.<prefix><id>()` call anywhere under `node`.
    pub fn find_call<'n>(&self, node: &'n SyntaxNode, prefix: &str, id: &str) -> Option<&'n SyntaxNode> {
        let mut found = None;
        node.walk(&mut |n| {
            if found.is_some() {
                return false;
            }
            if self.idiom_call(n, prefix) == Some(id) {
                found = Some(n);
                return false;
            }
            true
        });
        found
    }
}

pub fn is_class_attribute(name: &str) -> bool {
    CLASS_ATTRIBUTES.contains(&name)
}

/// Options for one merge invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    pub idioms: Idioms,
    pub dialect: Dialect,
    /// Comment prefix marking the managed region, e.g. `managed-jsx/12`.
    pub managed_jsx_marker: String,
    /// Comment prefix tagging managed imports, e.g. `managed-import: abc/component`.
    pub managed_import_marker: String,
    /// Attributes starting with this prefix keep the developer's value when
    /// both sides changed them.
    pub event_handler_prefix: String,
    /// Tag whose `value` attribute keeps the developer's value when both
    /// sides changed it.
    pub slot_host_tag: String,
    /// Append the regenerated markup as a comment instead of failing when no
    /// base snapshot is available.
    pub manual_merge_fallback: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            idioms: Idioms::default(),
            dialect: Dialect::default(),
            managed_jsx_marker: "managed-jsx".into(),
            managed_import_marker: "managed-import".into(),
            event_handler_prefix: "on".into(),
            slot_host_tag: "Slot".into(),
            manual_merge_fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_expression;

    #[test]
    fn test_idiom_call_extracts_id() {
        let idioms = Idioms::default();
        let call = parse_expression("rh.clsRoot()", Dialect::Tsx).unwrap();
        assert_eq!(idioms.idiom_call(&call, "cls"), Some("Root"));
        assert_eq!(idioms.idiom_call(&call, "show"), None);

        let other = parse_expression("helpers.clsRoot()", Dialect::Tsx).unwrap();
        assert_eq!(idioms.idiom_call(&other, "cls"), None);

        let bare = parse_expression("rh.cls()", Dialect::Tsx).unwrap();
        assert_eq!(idioms.idiom_call(&bare, "cls"), None);
    }

    #[test]
    fn test_custom_helper_object() {
        let idioms = Idioms {
            helper_object: "helpers".into(),
            ..Default::default()
        };
        let call = parse_expression("helpers.showTitle()", Dialect::Tsx).unwrap();
        assert_eq!(idioms.idiom_call(&call, "show"), Some("Title"));
    }

    #[test]
    fn test_prefixes_longest_first() {
        let idioms = Idioms::default();
        let prefixes = idioms.prefixes();
        assert_eq!(prefixes[0], "childStr");
    }
}
