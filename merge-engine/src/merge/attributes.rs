use super::Merger;
use crate::diagnostics::DiagnosticKind;
use crate::error::Result;
use crate::options::is_class_attribute;
use crate::serialize::{Emitted, build_fragment, print_attribute};
use crate::syntax::structurally_equal;
use crate::types::{Attribute, AttributeKey, ElementBody, Node};

/// One attribute of the merged element.
struct Merged {
    key: AttributeKey,
    code: String,
}

fn find<'b>(body: &'b ElementBody, key: &AttributeKey) -> Option<&'b Attribute> {
    body.attributes.iter().find(|attr| attr.key() == *key)
}

fn same(a: &Attribute, b: &Attribute) -> bool {
    structurally_equal(a.raw(), b.raw())
}

fn verbatim(attr: &Attribute) -> String {
    attr.raw().relative_text()
}

impl<'a> Merger<'a> {
    /// Attributes of a generated element with no developer counterpart.
    pub(super) fn print_attributes(&mut self, body: &ElementBody) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(body.attributes.len());
        for attr in &body.attributes {
            if let Some(code) = self.print_new_attribute(attr)? {
                out.push(code);
            }
        }
        Ok(out)
    }

    /// Three-way attribute merge. Output follows the edited order; attributes
    /// only the generator knows are added afterwards.
    pub(super) fn merge_attributes(
        &mut self,
        new: &ElementBody,
        edited: &ElementBody,
        base: &ElementBody,
    ) -> Result<Vec<String>> {
        let mut merged: Vec<Merged> = Vec::new();

        for edited_attr in &edited.attributes {
            let key = edited_attr.key();
            let base_attr = find(base, &key);
            let new_attr = find(new, &key);

            match (base_attr, new_attr) {
                // Developer-added.
                (None, None) => merged.push(Merged {
                    key,
                    code: verbatim(edited_attr),
                }),
                // Generator dropped it; keep it only if the developer changed it.
                (Some(base_attr), None) => {
                    if !same(edited_attr, base_attr) {
                        merged.push(Merged {
                            key,
                            code: verbatim(edited_attr),
                        });
                    }
                }
                (_, Some(new_attr)) if same(edited_attr, new_attr) => {
                    if let Some(code) = self.print_new_attribute(new_attr)? {
                        merged.push(Merged { key, code });
                    }
                }
                // Both sides have it with no base to tell who changed what.
                (None, Some(new_attr)) => {
                    for code in self.merge_values(new_attr, edited_attr, None, &new.stable_id)? {
                        merged.push(Merged { key: key.clone(), code });
                    }
                }
                (Some(base_attr), Some(new_attr)) => {
                    if same(base_attr, edited_attr) {
                        if let Some(code) = self.print_new_attribute(new_attr)? {
                            merged.push(Merged { key, code });
                        }
                    } else if self.keeps_developer_value(edited_attr, &new.tag) || same(base_attr, new_attr) {
                        merged.push(Merged {
                            key,
                            code: verbatim(edited_attr),
                        });
                    } else {
                        for code in self.merge_values(new_attr, edited_attr, Some(base_attr), &new.stable_id)? {
                            merged.push(Merged { key: key.clone(), code });
                        }
                    }
                }
            }
        }

        for new_attr in &new.attributes {
            let key = new_attr.key();
            if find(edited, &key).is_some() || find(base, &key).is_some() {
                continue;
            }
            let Some(code) = self.print_new_attribute(new_attr)? else {
                continue;
            };

            let position = if new_attr.name().is_some_and(is_class_attribute) {
                0
            } else if self.is_props_spread(new_attr) {
                merged
                    .iter()
                    .position(|m| matches!(&m.key, AttributeKey::Named(name) if is_class_attribute(name)))
                    .map_or(0, |i| i + 1)
            } else {
                merged.len()
            };
            merged.insert(position, Merged { key, code });
        }

        Ok(merged.into_iter().map(|m| m.code).collect())
    }

    /// Event handlers and a slot host's `value` stay as the developer wrote
    /// them when both sides changed.
    fn keeps_developer_value(&self, attr: &Attribute, tag: &str) -> bool {
        let Some(name) = attr.name() else {
            return false;
        };
        name.starts_with(&self.options.event_handler_prefix)
            || (name == "value" && tag == self.options.slot_host_tag)
    }

    fn is_props_spread(&self, attr: &Attribute) -> bool {
        let Attribute::Spread { raw, .. } = attr else {
            return false;
        };
        let idioms = &self.options.idioms;
        raw.any(&mut |node| idioms.idiom_call(node, &idioms.props_prefix).is_some())
    }

    /// A new-side attribute, with recognized values serialized recursively.
    /// `None` when its value was an element the developer deleted.
    fn print_new_attribute(&mut self, attr: &Attribute) -> Result<Option<String>> {
        match attr {
            Attribute::Spread { raw, .. } => Ok(Some(raw.relative_text())),
            Attribute::Named { name, value: None, .. } => Ok(Some(print_attribute(name, None))),
            Attribute::Named {
                name,
                value: Some(value),
                ..
            } => Ok(self
                .serialize_node(value)?
                .map(|emitted| print_attribute(name, Some(emitted)))),
        }
    }

    /// Both sides changed a value. Same-identity elements and fragments are
    /// merged recursively; anything else keeps both attributes for the
    /// developer to reconcile.
    fn merge_values(
        &mut self,
        new: &Attribute,
        edited: &Attribute,
        base: Option<&Attribute>,
        stable_id: &str,
    ) -> Result<Vec<String>> {
        if let (
            Attribute::Named {
                name,
                value: Some(new_value),
                ..
            },
            Attribute::Named {
                value: Some(edited_value),
                ..
            },
        ) = (new, edited)
        {
            match (new_value, edited_value) {
                (Node::TagOrComponent(n), Node::TagOrComponent(e)) if n.element.stable_id == e.element.stable_id => {
                    if let Some(emitted) = self.serialize_node(new_value)? {
                        return Ok(vec![print_attribute(name, Some(emitted))]);
                    }
                }
                (Node::Fragment { children: new_children, .. }, Node::Fragment { children: edited_children, .. }) => {
                    let base_children: &[Node] = match base {
                        Some(Attribute::Named {
                            value: Some(Node::Fragment { children, .. }),
                            ..
                        }) => children.as_slice(),
                        _ => &[],
                    };
                    let children = self.merge_children(new_children, edited_children, base_children)?;
                    return Ok(vec![print_attribute(name, Some(Emitted::markup(build_fragment(&children))))]);
                }
                _ => {}
            }
        }

        let label = new.name().map_or_else(|| verbatim(new), str::to_string);
        self.diagnostics.push(
            DiagnosticKind::AttributeConflict,
            Some(stable_id),
            format!("`{label}` changed on both sides; kept both values"),
        );
        let mut out = Vec::with_capacity(2);
        if let Some(code) = self.print_new_attribute(new)? {
            out.push(code);
        }
        out.push(verbatim(edited));
        Ok(out)
    }
}
