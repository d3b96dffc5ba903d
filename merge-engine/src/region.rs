//! Managed region location and identity renames.
//!
//! The generator marks the expression it owns with a comment such as
//! `// managed-jsx/12` right before a `return`, a variable declaration or
//! an assignment. The number is the revision the region was generated at.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::{MergeError, Result};
use crate::options::{Idioms, MergeOptions};
use crate::syntax::{SyntaxNode, parse};

#[derive(Debug, Clone)]
pub struct ManagedRegion<'a> {
    pub revision: u64,
    /// Byte range of the revision digits inside the marker comment.
    pub revision_range: Range<usize>,
    pub marker: &'a SyntaxNode,
    /// The managed expression, parentheses removed.
    pub expression: &'a SyntaxNode,
}

/// Revision digits of a marker comment, with their offset in the comment.
fn marker_revision<'t>(comment: &'t str, prefix: &str) -> Option<(usize, &'t str)> {
    let body = comment
        .strip_prefix("//")
        .or_else(|| comment.strip_prefix("/*").map(|c| c.trim_end_matches("*/")))?;
    let trimmed = body.trim_start();
    let rest = trimmed.strip_prefix(prefix)?.strip_prefix('/')?;
    let digits_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let offset = rest.as_ptr() as usize - comment.as_ptr() as usize;
    Some((offset, &rest[..digits_len]))
}

fn managed_expression(statement: &SyntaxNode) -> Option<&SyntaxNode> {
    let expression = match statement.kind() {
        "return_statement" => statement.named_children().next(),
        "lexical_declaration" | "variable_declaration" => statement
            .named_children()
            .find(|c| c.kind() == "variable_declarator")
            .and_then(|d| d.child_by_field("value")),
        "expression_statement" => statement
            .named_children()
            .next()
            .filter(|e| e.kind() == "assignment_expression")
            .and_then(|e| e.child_by_field("right")),
        "export_statement" => statement.child_by_field("declaration").and_then(managed_expression),
        _ => None,
    }?;
    Some(expression.unparenthesized())
}

/// Find the first managed region of a file.
pub fn locate_managed_region<'a>(root: &'a SyntaxNode, prefix: &str) -> Result<Option<ManagedRegion<'a>>> {
    let mut found = None;
    let mut error = None;
    root.walk(&mut |node| {
        if found.is_some() || error.is_some() {
            return false;
        }
        let children = node.children();
        for (i, child) in children.iter().enumerate() {
            if !child.is_comment() {
                continue;
            }
            let Some((offset, digits)) = marker_revision(child.text(), prefix) else {
                continue;
            };
            let revision = match digits.parse::<u64>() {
                Ok(revision) => revision,
                Err(_) => {
                    error = Some(MergeError::InvalidRevision(child.text().to_string()));
                    return false;
                }
            };
            let statement = children[i + 1..].iter().find(|c| c.is_named() && !c.is_comment());
            if let Some(expression) = statement.and_then(managed_expression) {
                let start = child.range().start + offset;
                found = Some(ManagedRegion {
                    revision,
                    revision_range: start..start + digits.len(),
                    marker: child,
                    expression,
                });
                return false;
            }
        }
        true
    });

    match error {
        Some(error) => Err(error),
        None => Ok(found),
    }
}

/// Revision of the managed region of `file`, if it has one.
pub fn managed_revision(file: &str, options: &MergeOptions) -> Result<Option<u64>> {
    let root = parse(file, options.dialect)?;
    Ok(locate_managed_region(&root, &options.managed_jsx_marker)?.map(|region| region.revision))
}

/// Stable ids renamed between the base and new identity maps, keyed by the
/// old name. Two names are the same element when they map to the same uuid.
pub fn identity_renames(
    base_map: &HashMap<String, String>,
    new_map: &HashMap<String, String>,
) -> HashMap<String, String> {
    let new_by_uuid: HashMap<&str, &str> = new_map
        .iter()
        .map(|(name, uuid)| (uuid.as_str(), name.as_str()))
        .collect();

    base_map
        .iter()
        .filter_map(|(name, uuid)| {
            let new_name = new_by_uuid.get(uuid.as_str())?;
            (*new_name != name.as_str()).then(|| (name.clone(), new_name.to_string()))
        })
        .collect()
}

/// Apply renames to an identity map.
pub fn rename_identity_map(map: &HashMap<String, String>, renames: &HashMap<String, String>) -> HashMap<String, String> {
    map.iter()
        .map(|(name, uuid)| (renames.get(name).unwrap_or(name).clone(), uuid.clone()))
        .collect()
}

/// Rewrite every idiom call naming a renamed identity, e.g. `rh.clsRoot` to
/// `rh.clsNewRoot`. The rest of the file is left untouched.
pub fn rename_identities(root: &SyntaxNode, renames: &HashMap<String, String>, idioms: &Idioms) -> String {
    if renames.is_empty() {
        return root.source().to_string();
    }
    let prefixes = idioms.prefixes();
    root.print_file_with(&mut |node| {
        let property = node.child_by_field("property")?;
        for prefix in &prefixes {
            let Some(old) = idioms.idiom_member(node, prefix) else {
                continue;
            };
            let new = renames.get(old)?;
            let head = &node.source()[node.range().start..property.range().start];
            return Some(format!("{head}{prefix}{new}"));
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Dialect;

    const COMPONENT: &str = r#"import * as React from "react";

function PlasmicButton(props) {
  const rh = useHelpers(props);
  // managed-jsx/42
  return (
    <div className={rh.clsRoot()}>
      <span className={rh.clsLabel()} />
    </div>
  );
}
"#;

    #[test]
    fn test_locates_return_region() {
        let root = parse(COMPONENT, Dialect::Tsx).unwrap();
        let region = locate_managed_region(&root, "managed-jsx").unwrap().unwrap();
        assert_eq!(region.revision, 42);
        assert_eq!(&COMPONENT[region.revision_range.clone()], "42");
        assert_eq!(region.expression.kind(), "jsx_element");
    }

    #[test]
    fn test_locates_declaration_and_assignment() {
        let decl = "/* managed-jsx/7 */\nconst tree = (<a className={rh.clsRoot()} />);\n";
        let root = parse(decl, Dialect::Jsx).unwrap();
        let region = locate_managed_region(&root, "managed-jsx").unwrap().unwrap();
        assert_eq!(region.revision, 7);
        assert_eq!(region.expression.kind(), "jsx_self_closing_element");

        let assign = "let tree;\n// managed-jsx/3\ntree = <a className={rh.clsRoot()} />;\n";
        let root = parse(assign, Dialect::Tsx).unwrap();
        let region = locate_managed_region(&root, "managed-jsx").unwrap().unwrap();
        assert_eq!(region.revision, 3);
    }

    #[test]
    fn test_missing_and_invalid_markers() {
        let root = parse("const a = 1;\n", Dialect::Tsx).unwrap();
        assert!(locate_managed_region(&root, "managed-jsx").unwrap().is_none());

        let root = parse("// managed-jsx/x\nconst a = <b />;\n", Dialect::Tsx).unwrap();
        assert!(matches!(
            locate_managed_region(&root, "managed-jsx"),
            Err(MergeError::InvalidRevision(_))
        ));
    }

    #[test]
    fn test_identity_renames_by_uuid() {
        let base: HashMap<String, String> =
            [("Root", "u1"), ("Label", "u2")].iter().map(|(a, b)| (a.to_string(), b.to_string())).collect();
        let new: HashMap<String, String> =
            [("NewRoot", "u1"), ("Label", "u2")].iter().map(|(a, b)| (a.to_string(), b.to_string())).collect();
        let renames = identity_renames(&base, &new);
        assert_eq!(renames.len(), 1);
        assert_eq!(renames["Root"], "NewRoot");
        assert_eq!(rename_identity_map(&base, &renames)["NewRoot"], "u1");
    }

    #[test]
    fn test_rename_rewrites_every_idiom() {
        let src = "const x = <div className={rh.clsRoot()} {...rh.propsRoot()}>{rh.showRoot() && 1}{rh.childStrRoot()}{other.clsRoot()}</div>;";
        let root = parse(src, Dialect::Tsx).unwrap();
        let renames = HashMap::from([("Root".to_string(), "Main".to_string())]);
        let out = rename_identities(&root, &renames, &Idioms::default());
        assert_eq!(
            out,
            "const x = <div className={rh.clsMain()} {...rh.propsMain()}>{rh.showMain() && 1}{rh.childStrMain()}{other.clsRoot()}</div>;"
        );
    }
}
