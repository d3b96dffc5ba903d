//! Version container: one semantic tree plus its identity indexes.

use std::collections::HashMap;

use crate::error::{MergeError, Result};
use crate::options::Idioms;
use crate::semantic::TreeBuilder;
use crate::syntax::SyntaxNode;
use crate::types::{ArgRef, Attribute, ElementBody, Node, TagOrComponent};

/// One of the three merge inputs (base, edited, new), indexed for lookup.
///
/// Built once from a managed expression and the version's
/// `stable_id -> uuid` map; immutable afterwards.
#[derive(Debug)]
pub struct CodeVersion {
    root: Node,
    identity_map: HashMap<String, String>,
    by_stable_id: HashMap<String, TagOrComponent>,
    by_uuid: HashMap<String, String>,
    arg_name_to_node: HashMap<String, ArgRef>,
}

#[derive(Default)]
struct Indexes {
    by_stable_id: HashMap<String, TagOrComponent>,
    arg_name_to_node: HashMap<String, ArgRef>,
}

impl Indexes {
    fn add_element(&mut self, element: TagOrComponent) -> Result<()> {
        let id = element.element.stable_id.clone();
        if self.by_stable_id.contains_key(&id) {
            return Err(MergeError::DuplicateIdentity(id));
        }
        self.by_stable_id.insert(id, element);
        Ok(())
    }

    fn index_node(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::TagOrComponent(tag) => {
                self.add_element(tag.clone())?;
                for secondary in &tag.secondary {
                    if secondary.stable_id != tag.element.stable_id {
                        self.add_element(TagOrComponent::bare(secondary.clone()))?;
                    }
                    self.index_body(secondary)?;
                }
                self.index_body(&tag.element)
            }
            Node::ArgRef(arg) => {
                self.arg_name_to_node
                    .entry(arg.arg_name.clone())
                    .or_insert_with(|| arg.clone());
                for default in &arg.defaults {
                    self.add_element(TagOrComponent::bare(default.clone()))?;
                    self.index_body(default)?;
                }
                Ok(())
            }
            Node::Fragment { children, .. } => children.iter().try_for_each(|c| self.index_node(c)),
            Node::StringLiteral { .. } | Node::Text { .. } | Node::ChildStrCall { .. } | Node::Opaque { .. } => Ok(()),
        }
    }

    fn index_body(&mut self, body: &ElementBody) -> Result<()> {
        for attr in &body.attributes {
            if let Attribute::Named { value: Some(value), .. } = attr {
                self.index_node(value)?;
            }
        }
        body.children.iter().try_for_each(|c| self.index_node(c))
    }
}

impl CodeVersion {
    pub fn new(expression: &SyntaxNode, identity_map: HashMap<String, String>, idioms: &Idioms) -> Result<Self> {
        let root = TreeBuilder::new(idioms).build(expression)?;
        Self::from_root(root, identity_map)
    }

    pub fn from_root(root: Node, identity_map: HashMap<String, String>) -> Result<Self> {
        let mut indexes = Indexes::default();
        indexes.index_node(&root)?;

        let by_uuid = identity_map
            .iter()
            .map(|(id, uuid)| (uuid.clone(), id.clone()))
            .collect();

        tracing::trace!(
            elements = indexes.by_stable_id.len(),
            args = indexes.arg_name_to_node.len(),
            "indexed code version"
        );

        Ok(Self {
            root,
            identity_map,
            by_stable_id: indexes.by_stable_id,
            by_uuid,
            arg_name_to_node: indexes.arg_name_to_node,
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn find(&self, stable_id: &str) -> Option<&TagOrComponent> {
        self.by_stable_id.get(stable_id)
    }

    pub fn find_arg(&self, arg_name: &str) -> Option<&ArgRef> {
        self.arg_name_to_node.get(arg_name)
    }

    pub fn uuid_of(&self, stable_id: &str) -> Option<&str> {
        self.identity_map.get(stable_id).map(String::as_str)
    }

    pub fn stable_id_of(&self, uuid: &str) -> Option<&str> {
        self.by_uuid.get(uuid).map(String::as_str)
    }

    /// The element in this version corresponding to `stable_id` of `other`.
    /// Goes through the uuid when `other` knows one and this version maps it;
    /// otherwise falls back to the stable id itself.
    pub fn correlate(&self, other: &CodeVersion, stable_id: &str) -> Option<&TagOrComponent> {
        let local = other
            .uuid_of(stable_id)
            .and_then(|uuid| self.stable_id_of(uuid))
            .unwrap_or(stable_id);
        self.find(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Dialect, parse_expression};

    fn version(src: &str, map: &[(&str, &str)]) -> Result<CodeVersion> {
        let expr = parse_expression(src, Dialect::Tsx).unwrap();
        let map = map.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect();
        CodeVersion::new(&expr, map, &Idioms::default())
    }

    #[test]
    fn test_indexes_nested_elements() {
        let v = version(
            r#"<div className={rh.clsRoot()}>
                 <span className={rh.clsLabel()} title={<b className={rh.clsBold()} />} />
                 {args.icon ?? <i className={rh.clsIcon()} />}
               </div>"#,
            &[],
        )
        .unwrap();
        for id in ["Root", "Label", "Bold", "Icon"] {
            assert!(v.find(id).is_some(), "missing {id}");
        }
        assert!(v.find_arg("icon").is_some());
        assert!(v.find_arg("children").is_none());
    }

    #[test]
    fn test_duplicate_identity_is_fatal() {
        let err = version(
            r#"<div className={rh.clsRoot()}><a className={rh.clsX()} /><b className={rh.clsX()} /></div>"#,
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::DuplicateIdentity(id) if id == "X"));
    }

    #[test]
    fn test_secondary_elements_indexed() {
        let v = version(
            r#"<div className={rh.clsRoot()}>{a ? <p className={rh.clsA()} /> : <p className={rh.clsB()} />}</div>"#,
            &[],
        )
        .unwrap();
        let primary = v.find("A").unwrap();
        assert!(primary.is_wrapped());
        assert_eq!(primary.secondary.len(), 1);
        assert!(!v.find("B").unwrap().is_wrapped());
    }

    #[test]
    fn test_correlate_through_uuid() {
        let base = version(r#"<div className={rh.clsRoot()} />"#, &[("Root", "u1")]).unwrap();
        let new = version(r#"<div className={rh.clsNewRoot()} />"#, &[("NewRoot", "u1")]).unwrap();
        let found = base.correlate(&new, "NewRoot").unwrap();
        assert_eq!(found.element.stable_id, "Root");

        let unmapped = version(r#"<div className={rh.clsRoot()} />"#, &[]).unwrap();
        assert!(unmapped.correlate(&new, "NewRoot").is_none());
        assert!(unmapped.correlate(&base, "Root").is_some());
    }
}
