//! Tree-sitter syntax adapter.
//!
//! Source text is parsed with the TSX (or plain JavaScript) grammar and copied
//! into an owned, immutable [`SyntaxNode`] tree. Nodes remember their byte
//! range in the shared source, so printing a node is a matter of copying the
//! source between its children. Derived trees are never built by mutation:
//! [`SyntaxNode::print_with`] clones a subtree to text while a hook substitutes
//! any visited node, and [`apply_edits`] splices replacements into a file.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

/// Unique identifier for a syntax node. Unique across every tree parsed by
/// this process, so hooks keyed by id never collide between versions.
pub type NodeId = usize;

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

fn fresh_id() -> NodeId {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Grammar used to parse a component file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Tsx,
    Jsx,
}

impl Dialect {
    /// Infer the dialect from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "tsx" | "ts" => Some(Dialect::Tsx),
            "jsx" | "js" | "mjs" | "cjs" => Some(Dialect::Jsx),
            _ => None,
        }
    }

    fn language(self) -> tree_sitter::Language {
        match self {
            Dialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Dialect::Jsx => tree_sitter_javascript::LANGUAGE.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("language error: {0}")]
    Language(String),
    #[error("parse failed")]
    ParseFailed,
    #[error("syntax error at byte {offset}: `{snippet}`")]
    Syntax { offset: usize, snippet: String },
    #[error("source contains no expression")]
    NoExpression,
}

/// An owned copy of one tree-sitter node and its subtree.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    id: NodeId,
    kind: &'static str,
    field: Option<&'static str>,
    named: bool,
    range: Range<usize>,
    source: Arc<str>,
    children: Vec<SyntaxNode>,
}

/// Parse a whole source file.
pub fn parse(source: &str, dialect: Dialect) -> Result<SyntaxNode, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&dialect.language())
        .map_err(|e| ParseError::Language(e.to_string()))?;

    let tree = parser.parse(source, None).ok_or(ParseError::ParseFailed)?;
    let root = tree.root_node();

    if root.has_error() {
        let offset = first_error_offset(&root).unwrap_or(root.start_byte());
        let end = source.len().min(offset + 40);
        let snippet = source.get(offset..end).unwrap_or_default().to_string();
        return Err(ParseError::Syntax { offset, snippet });
    }

    let shared: Arc<str> = Arc::from(source);
    Ok(convert(&root, None, &shared))
}

/// Parse a snippet holding a single expression (e.g. a JSX element) and return
/// the expression node with any enclosing parentheses removed.
pub fn parse_expression(source: &str, dialect: Dialect) -> Result<SyntaxNode, ParseError> {
    let program = parse(source, dialect)?;
    let statement = program
        .named_children()
        .find(|c| c.kind() == "expression_statement")
        .ok_or(ParseError::NoExpression)?;
    let expression = statement
        .named_children()
        .next()
        .ok_or(ParseError::NoExpression)?;
    Ok(expression.unparenthesized().clone())
}

fn first_error_offset(node: &tree_sitter::Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_byte());
    }
    let mut cursor = node.walk();
    let children: Vec<tree_sitter::Node> = node.children(&mut cursor).collect();
    children
        .iter()
        .filter(|c| c.has_error())
        .find_map(first_error_offset)
}

/// Recursively copy a tree-sitter node, keeping anonymous tokens and field names.
fn convert(node: &tree_sitter::Node, field: Option<&'static str>, source: &Arc<str>) -> SyntaxNode {
    let mut children = Vec::new();
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            children.push(convert(&child, cursor.field_name(), source));
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    SyntaxNode {
        id: fresh_id(),
        kind: node.kind(),
        field,
        named: node.is_named(),
        range: node.start_byte()..node.end_byte(),
        source: Arc::clone(source),
        children,
    }
}

impl SyntaxNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Field name this node occupies in its parent, if any.
    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    pub fn is_named(&self) -> bool {
        self.named
    }

    pub fn is_comment(&self) -> bool {
        self.kind == "comment"
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// The full source this node was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.source[self.range.clone()]
    }

    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    /// Named children, comments excluded.
    pub fn named_children(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(|c| c.named && !c.is_comment())
    }

    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &SyntaxNode {
        let mut node = self;
        while node.kind == "parenthesized_expression" {
            match node.named_children().next() {
                Some(inner) => node = inner,
                None => break,
            }
        }
        node
    }

    /// Pre-order walk. `visit` returns whether to descend into the node.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a SyntaxNode) -> bool) {
        if visit(self) {
            for child in &self.children {
                child.walk(visit);
            }
        }
    }

    /// Whether any node in this subtree satisfies `pred`.
    pub fn any(&self, pred: &mut dyn FnMut(&SyntaxNode) -> bool) -> bool {
        pred(self) || self.children.iter().any(|c| c.any(pred))
    }

    /// Clone this subtree to text. Wherever `hook` returns replacement text
    /// the visited node (and its whole subtree) is substituted.
    pub fn print_with(&self, hook: &mut dyn FnMut(&SyntaxNode) -> Option<String>) -> String {
        let mut out = String::with_capacity(self.range.len());
        self.write_with(&mut out, hook);
        out
    }

    /// Like [`print_with`](Self::print_with) but keeps the source text that
    /// lies outside this node, so a root node prints the whole file.
    pub fn print_file_with(&self, hook: &mut dyn FnMut(&SyntaxNode) -> Option<String>) -> String {
        let mut out = String::with_capacity(self.source.len());
        out.push_str(&self.source[..self.range.start]);
        self.write_with(&mut out, hook);
        out.push_str(&self.source[self.range.end..]);
        out
    }

    fn write_with(&self, out: &mut String, hook: &mut dyn FnMut(&SyntaxNode) -> Option<String>) {
        if let Some(replacement) = hook(self) {
            out.push_str(&replacement);
            return;
        }
        let mut cursor = self.range.start;
        for child in &self.children {
            out.push_str(&self.source[cursor..child.range.start]);
            child.write_with(out, hook);
            cursor = child.range.end;
        }
        out.push_str(&self.source[cursor..self.range.end]);
    }

    /// Leading whitespace of the source line this node starts on.
    pub fn line_indent(&self) -> &str {
        let line_start = self.source[..self.range.start].rfind('\n').map_or(0, |i| i + 1);
        let line = &self.source[line_start..self.range.start];
        let width = line.len() - line.trim_start_matches([' ', '\t']).len();
        &line[..width]
    }

    /// Source text with continuation lines made relative to the indentation
    /// of the line the node starts on.
    pub fn relative_text(&self) -> String {
        dedent_continuation(self.text(), self.line_indent().len())
    }

    /// [`print_with`](Self::print_with), in relative indentation. Multi-line
    /// replacements are indented to the line of the node they replace.
    pub fn print_relative_with(&self, hook: &mut dyn FnMut(&SyntaxNode) -> Option<String>) -> String {
        let printed = self.print_with(&mut |node| {
            hook(node).map(|code| indent_continuation(&code, node.line_indent()))
        });
        dedent_continuation(&printed, self.line_indent().len())
    }

    /// Leaf tokens in order, comments skipped and JSX text whitespace-collapsed.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::new();
        self.collect_tokens(&mut tokens);
        tokens
    }

    fn collect_tokens(&self, out: &mut Vec<String>) {
        if self.is_comment() {
            return;
        }
        if self.children.is_empty() {
            let text = self.text();
            if self.kind == "jsx_text" {
                let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !collapsed.is_empty() {
                    out.push(collapsed);
                }
            } else if !text.is_empty() {
                out.push(text.to_string());
            }
            return;
        }
        for child in &self.children {
            child.collect_tokens(out);
        }
    }

    /// Source text with formatting and comments normalized away.
    pub fn normalized_text(&self) -> String {
        self.tokens().join(" ")
    }
}

/// Structural equality ignoring comments and formatting.
pub fn structurally_equal(a: &SyntaxNode, b: &SyntaxNode) -> bool {
    a.tokens() == b.tokens()
}

/// Prefix every line after the first with `prefix`. Blank lines stay empty.
pub fn indent_continuation(text: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.trim().is_empty() {
                out.push_str(prefix);
            }
        }
        out.push_str(line);
    }
    out
}

/// Remove up to `width` leading spaces or tabs from every line after the first.
pub fn dedent_continuation(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            let leading = line.len() - line.trim_start_matches([' ', '\t']).len();
            out.push_str(&line[leading.min(width)..]);
        } else {
            out.push_str(line);
        }
    }
    out
}

/// A replacement of one byte range of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub replacement: String,
}

impl TextEdit {
    pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at..at, text)
    }
}

/// Apply non-overlapping edits to `source`. Overlapping edits are skipped.
pub fn apply_edits(source: &str, mut edits: Vec<TextEdit>) -> String {
    edits.sort_by_key(|e| (e.range.start, e.range.end));
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            tracing::warn!(
                start = edit.range.start,
                end = edit.range.end,
                "skipping overlapping text edit"
            );
            continue;
        }
        out.push_str(&source[cursor..edit.range.start]);
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    out
}
