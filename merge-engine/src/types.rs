//! Semantic node model for generated markup.
//!
//! A component's managed JSX is viewed as a tree of tagged nodes. Elements
//! carrying a generator identity are `TagOrComponent`s; content the engine
//! does not understand is `Opaque` and is passed through verbatim. Every node
//! owns an exclusive copy of the syntax node it was derived from.

use std::fmt;

use crate::syntax::SyntaxNode;

#[derive(Debug, Clone)]
pub enum Node {
    /// An identified element, possibly decorated by a wrapper expression.
    TagOrComponent(TagOrComponent),
    /// A string literal: a quoted attribute value or `{"..."}`.
    StringLiteral { value: String, raw: SyntaxNode },
    /// Non-blank JSX text, one trimmed line per source line.
    Text { value: String, raw: SyntaxNode },
    /// `{rh.childStrX()}`: renders a slot's string content.
    ChildStrCall { raw: SyntaxNode },
    /// Placeholder for externally supplied content.
    ArgRef(ArgRef),
    /// `<>...</>`.
    Fragment { children: Vec<Node>, raw: SyntaxNode },
    /// Anything unrecognized.
    Opaque { raw: SyntaxNode },
}

/// An identified element and the expression that decorates it.
#[derive(Debug, Clone)]
pub struct TagOrComponent {
    pub element: ElementBody,
    /// The whole decorated expression. Equal to `element.raw` when the element
    /// is not wrapped.
    pub raw: SyntaxNode,
    /// Further identified elements found inside the same wrapper.
    pub secondary: Vec<ElementBody>,
}

#[derive(Debug, Clone)]
pub struct ElementBody {
    pub stable_id: String,
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub self_closing: bool,
    pub raw: SyntaxNode,
}

#[derive(Debug, Clone)]
pub enum Attribute {
    /// `name`, `name="v"` or `name={v}`. `value` is `None` for boolean-style
    /// attributes.
    Named {
        name: String,
        value: Option<Node>,
        raw: SyntaxNode,
    },
    /// `{...expr}`.
    Spread { text: String, raw: SyntaxNode },
}

#[derive(Debug, Clone)]
pub struct ArgRef {
    pub arg_name: String,
    /// Identified default-content elements nested directly in the expression.
    pub defaults: Vec<ElementBody>,
    pub raw: SyntaxNode,
}

/// Variant tag used for type-compatible matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    TagOrComponent,
    StringLiteral,
    Text,
    ChildStrCall,
    ArgRef,
    Fragment,
    Opaque,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::TagOrComponent => write!(f, "tag-or-component"),
            NodeKind::StringLiteral => write!(f, "string-literal"),
            NodeKind::Text => write!(f, "text"),
            NodeKind::ChildStrCall => write!(f, "child-str-call"),
            NodeKind::ArgRef => write!(f, "arg"),
            NodeKind::Fragment => write!(f, "fragment"),
            NodeKind::Opaque => write!(f, "opaque"),
        }
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::TagOrComponent(_) => NodeKind::TagOrComponent,
            Node::StringLiteral { .. } => NodeKind::StringLiteral,
            Node::Text { .. } => NodeKind::Text,
            Node::ChildStrCall { .. } => NodeKind::ChildStrCall,
            Node::ArgRef(_) => NodeKind::ArgRef,
            Node::Fragment { .. } => NodeKind::Fragment,
            Node::Opaque { .. } => NodeKind::Opaque,
        }
    }

    /// The syntax this node was derived from.
    pub fn raw(&self) -> &SyntaxNode {
        match self {
            Node::TagOrComponent(t) => &t.raw,
            Node::ArgRef(a) => &a.raw,
            Node::StringLiteral { raw, .. }
            | Node::Text { raw, .. }
            | Node::ChildStrCall { raw }
            | Node::Fragment { raw, .. }
            | Node::Opaque { raw } => raw,
        }
    }

    pub fn stable_id(&self) -> Option<&str> {
        match self {
            Node::TagOrComponent(t) => Some(&t.element.stable_id),
            _ => None,
        }
    }
}

impl TagOrComponent {
    /// An element with no decoration.
    pub fn bare(element: ElementBody) -> Self {
        Self {
            raw: element.raw.clone(),
            element,
            secondary: Vec::new(),
        }
    }

    pub fn is_wrapped(&self) -> bool {
        self.raw.id() != self.element.raw.id()
    }
}

impl Attribute {
    pub fn raw(&self) -> &SyntaxNode {
        match self {
            Attribute::Named { raw, .. } | Attribute::Spread { raw, .. } => raw,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Attribute::Named { name, .. } => Some(name),
            Attribute::Spread { .. } => None,
        }
    }

    /// Lookup key: the name for named attributes, the normalized expression
    /// text for spreads.
    pub fn key(&self) -> AttributeKey {
        match self {
            Attribute::Named { name, .. } => AttributeKey::Named(name.clone()),
            Attribute::Spread { raw, .. } => AttributeKey::Spread(raw.normalized_text()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    Named(String),
    Spread(String),
}
