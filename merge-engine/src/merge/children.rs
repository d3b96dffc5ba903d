//! Child-list merge.
//!
//! Matching is a first-fit scan: from a start index, the first perfect match
//! wins, otherwise the first node of the same kind. An edited sibling with no
//! perfect match ahead is looked up from the start of the list once before
//! falling back to a same-kind match. It is not an optimal alignment and can
//! misorder siblings that were both moved and duplicated.

use super::{Merger, fragment_emitted};
use crate::error::Result;
use crate::serialize::{Emitted, build_fragment};
use crate::syntax::structurally_equal;
use crate::types::{Node, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub index: usize,
    pub perfect: bool,
}

/// Same element identity, equal text, any child-string call, same arg name,
/// structurally equal opaque code, or any two fragments. Paired fragments
/// have their contents merged.
pub fn perfect_match(a: &Node, b: &Node) -> bool {
    match (a, b) {
        (Node::TagOrComponent(a), Node::TagOrComponent(b)) => a.element.stable_id == b.element.stable_id,
        (Node::Text { value: a, .. }, Node::Text { value: b, .. })
        | (Node::StringLiteral { value: a, .. }, Node::StringLiteral { value: b, .. }) => a == b,
        (Node::ChildStrCall { .. }, Node::ChildStrCall { .. }) => true,
        (Node::ArgRef(a), Node::ArgRef(b)) => a.arg_name == b.arg_name,
        (Node::Opaque { raw: a }, Node::Opaque { raw: b }) => structurally_equal(a, b),
        (Node::Fragment { .. }, Node::Fragment { .. }) => true,
        _ => false,
    }
}

fn scan<'n>(candidates: impl Iterator<Item = (usize, &'n Node)>, target: &Node) -> Option<Match> {
    let mut compatible = None;
    for (index, node) in candidates {
        if perfect_match(node, target) {
            return Some(Match { index, perfect: true });
        }
        if compatible.is_none() && node.kind() == target.kind() {
            compatible = Some(Match { index, perfect: false });
        }
    }
    compatible
}

/// Scan `list` forward from `start` for `target`.
pub fn find_match(list: &[Node], start: usize, target: &Node) -> Option<Match> {
    scan(list.iter().enumerate().skip(start), target)
}

fn has_perfect_match(list: &[Node], target: &Node) -> bool {
    find_match(list, 0, target).is_some_and(|m| m.perfect)
}

/// `node` appears in `list` exactly as written.
fn unchanged_in(list: &[Node], node: &Node) -> bool {
    list.iter()
        .any(|other| perfect_match(other, node) && structurally_equal(other.raw(), node.raw()))
}

/// Developer-written node kinds that are carried over when not accounted for.
fn is_insertable(node: &Node) -> bool {
    matches!(
        node,
        Node::Text { .. } | Node::StringLiteral { .. } | Node::Opaque { .. } | Node::Fragment { .. }
    )
}

#[derive(Debug, Clone, Copy)]
pub(super) enum Entry<'n> {
    /// A generated node. A fragment also carries the edited and base
    /// fragments it pairs with.
    New {
        node: &'n Node,
        edited: Option<&'n Node>,
        base: Option<&'n Node>,
    },
    Edited(&'n Node),
}

/// Forward scan over the generated entries of a partially merged list.
/// Fragments already paired with an edited fragment are skipped.
fn find_generated(result: &[Entry<'_>], start: usize, target: &Node) -> Option<Match> {
    let candidates = result.iter().enumerate().skip(start).filter_map(|(i, entry)| match entry {
        Entry::New { node, edited: None, .. } => Some((i, *node)),
        _ => None,
    });
    scan(candidates, target)
}

/// A perfect match at or after `start`, else a perfect match anywhere, so a
/// sibling the generator moved earlier is still found.
fn find_perfect(result: &[Entry<'_>], start: usize, target: &Node) -> Option<Match> {
    find_generated(result, start, target)
        .filter(|m| m.perfect)
        .or_else(|| find_generated(result, 0, target).filter(|m| m.perfect))
}

fn pair<'n>(entry: &mut Entry<'n>, node: &'n Node) {
    if let (Entry::New { node: Node::Fragment { .. }, edited, .. }, Node::Fragment { .. }) = (entry, node) {
        *edited = Some(node);
    }
}

/// Order the merged child list: the generated children minus those the
/// developer deleted, with developer-written nodes inserted after the
/// position their preceding edited sibling matched.
pub(super) fn merge_child_lists<'n>(new: &'n [Node], edited: &'n [Node], base: &'n [Node]) -> Vec<Entry<'n>> {
    let mut base_fragments = base.iter().filter(|node| node.kind() == NodeKind::Fragment);
    let mut result: Vec<Entry<'n>> = Vec::with_capacity(new.len());
    for node in new {
        let base_fragment = match node {
            Node::Fragment { .. } => base_fragments.next(),
            _ => None,
        };
        if has_perfect_match(base, node) && !has_perfect_match(edited, node) {
            continue;
        }
        result.push(Entry::New {
            node,
            edited: None,
            base: base_fragment,
        });
    }

    let mut anchor: Option<usize> = None;
    for node in edited {
        let start = anchor.map_or(0, |a| a + 1);

        let found = if is_insertable(node) {
            find_perfect(&result, start, node)
        } else {
            find_perfect(&result, start, node).or_else(|| find_generated(&result, start, node))
        };
        if let Some(found) = found {
            pair(&mut result[found.index], node);
            anchor = Some(found.index);
            continue;
        }
        if !is_insertable(node) || unchanged_in(base, node) {
            // Not ours to carry, or unchanged by the developer and dropped by
            // the generator.
            continue;
        }

        let at = start.min(result.len());
        tracing::trace!(kind = %node.kind(), at, "carrying developer node");
        result.insert(at, Entry::Edited(node));
        anchor = Some(at);
    }

    result
}

impl<'a> Merger<'a> {
    /// Merge three child lists into embedded child code.
    pub(super) fn merge_children(&mut self, new: &[Node], edited: &[Node], base: &[Node]) -> Result<Vec<String>> {
        let entries = merge_child_lists(new, edited, base);
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let emitted = match entry {
                Entry::New {
                    node: Node::Fragment { children, raw },
                    edited: Some(Node::Fragment { children: edited_children, .. }),
                    base,
                } => {
                    let base_children: &[Node] = match base {
                        Some(Node::Fragment { children, .. }) => children.as_slice(),
                        _ => &[],
                    };
                    let merged = self.merge_children(children, edited_children, base_children)?;
                    Some(fragment_emitted(raw, build_fragment(&merged)))
                }
                Entry::New { node, .. } => self.serialize_node(node)?,
                Entry::Edited(Node::Text { value, .. }) => Some(Emitted::markup(value.clone())),
                Entry::Edited(node) => Some(Emitted::from_raw(node.raw(), node.raw().relative_text())),
            };
            if let Some(emitted) = emitted {
                out.push(emitted.into_embedded());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Idioms;
    use crate::semantic::TreeBuilder;
    use crate::syntax::{Dialect, parse_expression};

    fn children(src: &str) -> Vec<Node> {
        let expr = parse_expression(src, Dialect::Tsx).unwrap();
        match TreeBuilder::new(&Idioms::default()).build(&expr).unwrap() {
            Node::TagOrComponent(tag) => tag.element.children,
            other => panic!("expected element, got {}", other.kind()),
        }
    }

    fn describe(entries: &[Entry<'_>]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| match entry {
                Entry::New { node, .. } => format!("new:{}", label(node)),
                Entry::Edited(node) => format!("edited:{}", label(node)),
            })
            .collect()
    }

    fn label(node: &Node) -> String {
        match node {
            Node::Text { value, .. } => value.clone(),
            other => other.stable_id().map_or_else(|| other.raw().text().to_string(), str::to_string),
        }
    }

    #[test]
    fn test_find_match_prefers_perfect_then_compatible() {
        let list = children(r#"<div className={rh.clsR()}><a className={rh.clsA()} />text<b className={rh.clsB()} /></div>"#);
        let target = &children(r#"<div className={rh.clsR()}><x className={rh.clsB()} /></div>"#)[0];

        assert_eq!(find_match(&list, 0, target), Some(Match { index: 2, perfect: true }));
        let other = &children(r#"<div className={rh.clsR()}><x className={rh.clsZ()} /></div>"#)[0];
        assert_eq!(find_match(&list, 0, other), Some(Match { index: 0, perfect: false }));
        assert_eq!(find_match(&list, 1, other), Some(Match { index: 2, perfect: false }));
        assert_eq!(find_match(&list, 3, other), None);
    }

    #[test]
    fn test_child_str_calls_always_match() {
        let a = children(r#"<p className={rh.clsP()}>{rh.childStrP()}</p>"#);
        let b = children(r#"<p className={rh.clsP()}>{rh.childStrP("fallback")}</p>"#);
        assert!(perfect_match(&a[0], &b[0]));
    }

    #[test]
    fn test_developer_text_rides_with_anchor() {
        let base = children(r#"<div className={rh.clsR()}><a className={rh.clsA()} /><b className={rh.clsB()} /></div>"#);
        let edited = children(
            r#"<div className={rh.clsR()}><a className={rh.clsA()} />after a<b className={rh.clsB()} /></div>"#,
        );
        let new = children(r#"<div className={rh.clsR()}><b className={rh.clsB()} /><a className={rh.clsA()} /></div>"#);

        let merged = merge_child_lists(&new, &edited, &base);
        assert_eq!(describe(&merged), vec!["new:B", "new:A", "edited:after a"]);
    }

    #[test]
    fn test_developer_deletion_removes_generated_node() {
        let base = children(r#"<div className={rh.clsR()}>Hello<a className={rh.clsA()} /></div>"#);
        let edited = children(r#"<div className={rh.clsR()}><a className={rh.clsA()} /></div>"#);
        let new = children(r#"<div className={rh.clsR()}>Hello<a className={rh.clsA()} /></div>"#);

        let merged = merge_child_lists(&new, &edited, &base);
        assert_eq!(describe(&merged), vec!["new:A"]);
    }

    #[test]
    fn test_generator_text_change_wins_over_untouched_text() {
        let base = children(r#"<div className={rh.clsR()}>Hello</div>"#);
        let new = children(r#"<div className={rh.clsR()}>Hi</div>"#);

        let merged = merge_child_lists(&new, &base, &base);
        assert_eq!(describe(&merged), vec!["new:Hi"]);
    }

    #[test]
    fn test_leading_developer_node_inserted_first() {
        let base = children(r#"<div className={rh.clsR()}><a className={rh.clsA()} /></div>"#);
        let edited = children(r#"<div className={rh.clsR()}>{note}<a className={rh.clsA()} /></div>"#);

        let merged = merge_child_lists(&base, &edited, &base);
        assert_eq!(describe(&merged), vec!["edited:{note}", "new:A"]);
    }

    #[test]
    fn test_anchor_found_after_generator_moves_sibling_earlier() {
        let base = children(r#"<div className={rh.clsR()}><a className={rh.clsA()} /><b className={rh.clsB()} /></div>"#);
        let edited = children(
            r#"<div className={rh.clsR()}><a className={rh.clsA()} />{x}<b className={rh.clsB()} />{afterB}</div>"#,
        );
        let new = children(r#"<div className={rh.clsR()}><b className={rh.clsB()} /><a className={rh.clsA()} /></div>"#);

        let merged = merge_child_lists(&new, &edited, &base);
        assert_eq!(describe(&merged), vec!["new:B", "edited:{afterB}", "new:A", "edited:{x}"]);
    }

    #[test]
    fn test_fragments_pair_with_edited_and_base() {
        let base = children(r#"<div className={rh.clsR()}><>{a}</><b className={rh.clsB()} /></div>"#);
        let edited = children(r#"<div className={rh.clsR()}><>{a} {note}</><b className={rh.clsB()} /></div>"#);

        let merged = merge_child_lists(&base, &edited, &base);
        assert_eq!(merged.len(), 2);
        match merged[0] {
            Entry::New {
                node: Node::Fragment { .. },
                edited: Some(paired),
                base: Some(base_fragment),
            } => {
                assert!(std::ptr::eq(paired, &edited[0]));
                assert!(std::ptr::eq(base_fragment, &base[0]));
            }
            other => panic!("expected paired fragment, got {other:?}"),
        }
    }

    #[test]
    fn test_unchanged_fragment_dropped_by_generator_stays_dropped() {
        let base = children(r#"<div className={rh.clsR()}><>{a}</><b className={rh.clsB()} /></div>"#);
        let new = children(r#"<div className={rh.clsR()}><b className={rh.clsB()} /></div>"#);

        let merged = merge_child_lists(&new, &base, &base);
        assert_eq!(describe(&merged), vec!["new:B"]);
    }

    #[test]
    fn test_edited_fragment_kept_when_generator_drops_it() {
        let base = children(r#"<div className={rh.clsR()}><>{a}</><b className={rh.clsB()} /></div>"#);
        let edited = children(r#"<div className={rh.clsR()}><>{a}{note}</><b className={rh.clsB()} /></div>"#);
        let new = children(r#"<div className={rh.clsR()}><b className={rh.clsB()} /></div>"#);

        let merged = merge_child_lists(&new, &edited, &base);
        assert_eq!(describe(&merged), vec!["edited:<>{a}{note}</>", "new:B"]);
    }
}
