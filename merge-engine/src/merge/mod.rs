//! Three-way structural merge of semantic trees.
//!
//! The merge is driven by the new tree: every node the generator emits is
//! serialized, looking up its counterparts in the edited and base versions
//! by identity. Developer-only content rides along through the child-list
//! and attribute merges.

mod attributes;
mod children;
mod element;
pub mod file;

use std::collections::HashMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::Result;
use crate::options::MergeOptions;
use crate::serialize::{EMPTY_FRAGMENT, Emitted, build_fragment};
use crate::syntax::{NodeId, SyntaxNode, structurally_equal};
use crate::types::{ArgRef, Node};
use crate::version::CodeVersion;

pub use children::{Match, find_match, perfect_match};

/// The developer's side of a merge: the edited version and the base it
/// started from.
#[derive(Debug, Clone, Copy)]
pub struct Prior<'a> {
    pub edited: &'a CodeVersion,
    pub base: &'a CodeVersion,
}

pub struct Merger<'a> {
    new: &'a CodeVersion,
    prior: Option<Prior<'a>>,
    options: &'a MergeOptions,
    diagnostics: Diagnostics,
}

impl<'a> Merger<'a> {
    /// A merger without a prior side prints the new tree.
    pub fn new(new: &'a CodeVersion, prior: Option<Prior<'a>>, options: &'a MergeOptions) -> Self {
        Self {
            new,
            prior,
            options,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Merged text of the root expression.
    pub fn merge_root(&mut self) -> Result<String> {
        let new = self.new;
        if let (Node::Fragment { children, .. }, Some(prior)) = (new.root(), self.prior) {
            if let (Node::Fragment { children: edited, .. }, Node::Fragment { children: base, .. }) =
                (prior.edited.root(), prior.base.root())
            {
                let merged = self.merge_children(children, edited, base)?;
                return Ok(build_fragment(&merged));
            }
        }

        Ok(match self.serialize_node(new.root())? {
            Some(emitted) => emitted.code,
            None => "null".to_string(),
        })
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_vec()
    }

    /// Serialize a node of the new tree. `None` when the developer deleted it.
    fn serialize_node(&mut self, node: &Node) -> Result<Option<Emitted>> {
        match node {
            Node::TagOrComponent(tag) => self.serialize_tag_or_component(tag),
            Node::Text { value, .. } => Ok(Some(Emitted::markup(value.clone()))),
            Node::StringLiteral { raw, .. } | Node::ChildStrCall { raw } | Node::Opaque { raw } => {
                Ok(Some(Emitted::from_raw(raw, raw.relative_text())))
            }
            Node::ArgRef(arg) => self.serialize_arg(arg).map(Some),
            Node::Fragment { children, raw } => {
                let merged = self.merge_children(children, &[], &[])?;
                Ok(Some(fragment_emitted(raw, build_fragment(&merged))))
            }
        }
    }

    /// An arg slot. The developer's expression shape wins when they changed
    /// it; default-content elements inside are merged by identity.
    fn serialize_arg(&mut self, arg: &ArgRef) -> Result<Emitted> {
        let edited_arg = self.prior.and_then(|prior| {
            let edited = prior.edited.find_arg(&arg.arg_name)?;
            let base = prior.base.find_arg(&arg.arg_name)?;
            let changed = !structurally_equal(&edited.raw, &base.raw);
            changed.then_some((prior.edited, edited))
        });

        let mut replacements = HashMap::new();
        let shape = match edited_arg {
            Some((edited_version, edited)) => {
                tracing::debug!(arg = %arg.arg_name, "keeping edited arg expression");
                let new = self.new;
                for default in &edited.defaults {
                    let code = match new.correlate(edited_version, &default.stable_id) {
                        Some(found) => self.element_code(&found.element)?,
                        None => None,
                    };
                    let code = code.unwrap_or_else(|| self.collapse(&default.stable_id));
                    replacements.insert(default.raw.id(), code);
                }
                edited
            }
            None => {
                for default in &arg.defaults {
                    let code = self
                        .element_code(default)?
                        .unwrap_or_else(|| EMPTY_FRAGMENT.to_string());
                    replacements.insert(default.raw.id(), code);
                }
                arg
            }
        };

        Ok(Emitted::from_raw(&shape.raw, substitute(&shape.raw, replacements)))
    }

    fn collapse(&mut self, stable_id: &str) -> String {
        self.diagnostics.push(
            DiagnosticKind::CollapsedElement,
            Some(stable_id),
            "element no longer generated; replaced by an empty fragment",
        );
        EMPTY_FRAGMENT.to_string()
    }
}

/// Print `raw`, substituting the subtrees whose ids are keys of `replacements`.
/// Fragment code in the position `raw` occupied. A fragment written inside
/// `{}` keeps its braces.
fn fragment_emitted(raw: &SyntaxNode, code: String) -> Emitted {
    if raw.kind() == "jsx_expression" {
        return Emitted::markup(format!("{{{code}}}"));
    }
    Emitted::from_raw(raw, code)
}

fn substitute(raw: &SyntaxNode, mut replacements: HashMap<NodeId, String>) -> String {
    if replacements.is_empty() {
        return raw.relative_text();
    }
    raw.print_relative_with(&mut |node| replacements.remove(&node.id()))
}

/// Merge three versions of a managed expression.
pub fn merge_trees(
    new: &CodeVersion,
    edited: &CodeVersion,
    base: &CodeVersion,
    options: &MergeOptions,
) -> Result<(String, Vec<Diagnostic>)> {
    let mut merger = Merger::new(new, Some(Prior { edited, base }), options);
    let code = merger.merge_root()?;
    Ok((code, merger.into_diagnostics()))
}

/// Canonical printing of a tree, the form a merge without edits produces.
pub fn print_tree(version: &CodeVersion, options: &MergeOptions) -> Result<String> {
    Merger::new(version, None, options).merge_root()
}
