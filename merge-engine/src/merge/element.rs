use std::collections::HashMap;

use super::{Merger, substitute};
use crate::error::{MergeError, Result};
use crate::serialize::{EMPTY_FRAGMENT, Emitted, build_element};
use crate::syntax::{NodeId, SyntaxNode};
use crate::types::{ElementBody, TagOrComponent};

impl<'a> Merger<'a> {
    pub(super) fn serialize_tag_or_component(&mut self, tag: &TagOrComponent) -> Result<Option<Emitted>> {
        let id = &tag.element.stable_id;
        let Some(prior) = self.prior else {
            return self.print_tag_or_component(tag).map(Some);
        };

        let new = self.new;
        let edited = prior.edited.correlate(new, id);
        let base = prior.base.correlate(new, id);
        match (edited, base) {
            (Some(edited), Some(base)) => self.merge_tag_or_component(tag, edited, base).map(Some),
            (Some(_), None) => Err(MergeError::MissingBaseElement(id.clone())),
            (None, Some(_)) => {
                tracing::debug!(stable_id = %id, "element deleted by developer");
                Ok(None)
            }
            (None, None) => self.print_tag_or_component(tag).map(Some),
        }
    }

    /// The element body alone, by the same decision table as
    /// [`serialize_tag_or_component`](Self::serialize_tag_or_component).
    pub(super) fn element_code(&mut self, body: &ElementBody) -> Result<Option<String>> {
        let Some(prior) = self.prior else {
            return self.print_body(body).map(Some);
        };

        let new = self.new;
        let edited = prior.edited.correlate(new, &body.stable_id);
        let base = prior.base.correlate(new, &body.stable_id);
        match (edited, base) {
            (Some(edited), Some(base)) => self.merge_body(body, &edited.element, &base.element).map(Some),
            (Some(_), None) => Err(MergeError::MissingBaseElement(body.stable_id.clone())),
            (None, Some(_)) => Ok(None),
            (None, None) => self.print_body(body).map(Some),
        }
    }

    /// A generated element with no developer counterpart: the new wrapper
    /// with the element and any secondary elements re-emitted.
    fn print_tag_or_component(&mut self, tag: &TagOrComponent) -> Result<Emitted> {
        let body = self.print_body(&tag.element)?;
        if !tag.is_wrapped() {
            return Ok(Emitted::markup(body));
        }

        let mut replacements = HashMap::new();
        replacements.insert(tag.element.raw.id(), body);
        for secondary in &tag.secondary {
            let code = self
                .element_code(secondary)?
                .unwrap_or_else(|| EMPTY_FRAGMENT.to_string());
            replacements.insert(secondary.raw.id(), code);
        }
        Ok(Emitted::from_raw(&tag.raw, substitute(&tag.raw, replacements)))
    }

    fn print_body(&mut self, body: &ElementBody) -> Result<String> {
        let attributes = self.print_attributes(body)?;
        let children = self.merge_children(&body.children, &[], &[])?;
        Ok(build_element(&body.tag, &attributes, &children, body.self_closing))
    }

    fn merge_body(&mut self, new: &ElementBody, edited: &ElementBody, base: &ElementBody) -> Result<String> {
        let tag = if base.tag != edited.tag {
            tracing::debug!(stable_id = %new.stable_id, tag = %edited.tag, "keeping developer tag");
            &edited.tag
        } else {
            &new.tag
        };
        let attributes = self.merge_attributes(new, edited, base)?;
        let children = self.merge_children(&new.children, &edited.children, &base.children)?;
        Ok(build_element(tag, &attributes, &children, edited.self_closing))
    }

    /// Merge the element and reconcile its conditional wrapper.
    fn merge_tag_or_component(
        &mut self,
        new: &TagOrComponent,
        edited: &TagOrComponent,
        base: &TagOrComponent,
    ) -> Result<Emitted> {
        let body = self.merge_body(&new.element, &edited.element, &base.element)?;

        let new_shows = self.show_calls(new);
        let edited_shows = self.show_calls(edited);

        let mut replacements = self.secondary_replacements(edited)?;

        match (new_shows.first(), edited_shows.is_empty()) {
            (Some(show), true) => {
                let guard = guard_text(new).unwrap_or_else(|| show.relative_text());
                tracing::debug!(stable_id = %new.element.stable_id, %guard, "adding show guard");
                if !edited.is_wrapped() {
                    return Ok(Emitted::expression(format!("{guard} && {body}")));
                }
                replacements.insert(edited.element.raw.id(), format!("({guard} && {body})"));
            }
            (None, false) => {
                tracing::debug!(stable_id = %new.element.stable_id, "removing show guard");
                for call in &edited_shows {
                    replacements.insert(call.id(), "true".to_string());
                }
                replacements.insert(edited.element.raw.id(), body);
            }
            _ => {
                if !edited.is_wrapped() {
                    return Ok(Emitted::markup(body));
                }
                replacements.insert(edited.element.raw.id(), body);
            }
        }

        Ok(Emitted::from_raw(&edited.raw, substitute(&edited.raw, replacements)))
    }

    /// Secondary elements of an edited wrapper, merged against the new
    /// element of the same identity or collapsed when it is gone.
    fn secondary_replacements(&mut self, edited: &TagOrComponent) -> Result<HashMap<NodeId, String>> {
        let Some(prior) = self.prior else {
            return Ok(HashMap::new());
        };
        let new = self.new;
        let mut replacements = HashMap::new();
        for secondary in &edited.secondary {
            let code = match new.correlate(prior.edited, &secondary.stable_id) {
                Some(found) => self.element_code(&found.element)?,
                None => None,
            };
            let code = code.unwrap_or_else(|| self.collapse(&secondary.stable_id));
            replacements.insert(secondary.raw.id(), code);
        }
        Ok(replacements)
    }

    /// Calls of the element's own show predicate inside its wrapper, outside
    /// the element itself.
    fn show_calls<'t>(&self, tag: &'t TagOrComponent) -> Vec<&'t SyntaxNode> {
        if !tag.is_wrapped() {
            return Vec::new();
        }
        let idioms = &self.options.idioms;
        let element_id = tag.element.raw.id();
        let mut calls = Vec::new();
        tag.raw.walk(&mut |node| {
            if node.id() == element_id {
                return false;
            }
            if idioms.idiom_call(node, &idioms.show_prefix) == Some(tag.element.stable_id.as_str()) {
                calls.push(node);
                return false;
            }
            true
        });
        calls
    }
}

/// Left operand of `guard && <element>` when that is the wrapper's shape.
fn guard_text(tag: &TagOrComponent) -> Option<String> {
    let mut expr = tag.raw.unparenthesized();
    if expr.kind() == "jsx_expression" {
        expr = expr.named_children().next()?.unparenthesized();
    }
    if expr.kind() != "binary_expression" {
        return None;
    }
    let operator = expr.child_by_field("operator")?;
    let right = expr.child_by_field("right")?.unparenthesized();
    if operator.text() != "&&" || right.id() != tag.element.raw.id() {
        return None;
    }
    expr.child_by_field("left").map(SyntaxNode::relative_text)
}
