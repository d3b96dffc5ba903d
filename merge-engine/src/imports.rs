//! Merge of generator-managed import declarations.
//!
//! Managed imports carry a trailing tag comment on the same line:
//!
//! ```text
//! import { Button } from "./Button"; // managed-import: a1b2c3/component
//! ```
//!
//! Declarations are keyed by module id and kind. Specifiers of declarations
//! present on both sides are unioned by local name, edited first.

use std::fmt;

use crate::options::MergeOptions;
use crate::syntax::{SyntaxNode, TextEdit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    Component,
    Css,
    Render,
    GlobalVariant,
    ProjectCss,
    DefaultCss,
    Icon,
}

impl ImportKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "component" => Some(ImportKind::Component),
            "css" => Some(ImportKind::Css),
            "render" => Some(ImportKind::Render),
            "globalVariant" => Some(ImportKind::GlobalVariant),
            "projectcss" => Some(ImportKind::ProjectCss),
            "defaultcss" => Some(ImportKind::DefaultCss),
            "icon" => Some(ImportKind::Icon),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImportKind::Component => "component",
            ImportKind::Css => "css",
            ImportKind::Render => "render",
            ImportKind::GlobalVariant => "globalVariant",
            ImportKind::ProjectCss => "projectcss",
            ImportKind::DefaultCss => "defaultcss",
            ImportKind::Icon => "icon",
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportKey {
    pub module_id: String,
    pub kind: Option<ImportKind>,
}

/// Parse a tag comment such as `// managed-import: a1b2c3/component`.
pub fn parse_tag(comment: &str, prefix: &str) -> Option<ImportKey> {
    let body = comment
        .strip_prefix("//")
        .or_else(|| comment.strip_prefix("/*").map(|c| c.trim_end_matches("*/")))?
        .trim();
    let rest = body.strip_prefix(prefix)?;
    let rest = rest.strip_prefix(':').unwrap_or(rest).trim();
    if rest.is_empty() {
        return None;
    }

    let key = match rest.rsplit_once('/') {
        Some((module_id, kind)) => match ImportKind::parse(kind) {
            Some(kind) => ImportKey {
                module_id: module_id.to_string(),
                kind: Some(kind),
            },
            None => ImportKey {
                module_id: rest.to_string(),
                kind: None,
            },
        },
        None => ImportKey {
            module_id: rest.to_string(),
            kind: None,
        },
    };
    Some(key)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Specifier {
    Default(String),
    /// `name` or `name as local`.
    Named { text: String, local: String },
    Namespace(String),
}

impl Specifier {
    pub fn local(&self) -> &str {
        match self {
            Specifier::Default(local) | Specifier::Namespace(local) => local,
            Specifier::Named { local, .. } => local,
        }
    }
}

/// One tagged import declaration of a file.
#[derive(Debug, Clone)]
pub struct ManagedImport<'a> {
    pub key: ImportKey,
    pub statement: &'a SyntaxNode,
    pub tag: &'a SyntaxNode,
    pub source: String,
    pub type_only: bool,
    pub specifiers: Vec<Specifier>,
}

impl ManagedImport<'_> {
    /// Statement through tag comment.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.statement.range().start..self.tag.range().end
    }

    pub fn text(&self) -> &str {
        &self.statement.source()[self.range()]
    }
}

fn specifiers(statement: &SyntaxNode) -> Vec<Specifier> {
    let mut out = Vec::new();
    let Some(clause) = statement.named_children().find(|c| c.kind() == "import_clause") else {
        return out;
    };
    for part in clause.named_children() {
        match part.kind() {
            "identifier" => out.push(Specifier::Default(part.text().to_string())),
            "namespace_import" => {
                if let Some(local) = part.named_children().next() {
                    out.push(Specifier::Namespace(local.text().to_string()));
                }
            }
            "named_imports" => {
                for spec in part.named_children().filter(|c| c.kind() == "import_specifier") {
                    let local = spec
                        .child_by_field("alias")
                        .or_else(|| spec.child_by_field("name"))
                        .map(|n| n.text().to_string())
                        .unwrap_or_default();
                    out.push(Specifier::Named {
                        text: spec.text().to_string(),
                        local,
                    });
                }
            }
            _ => {}
        }
    }
    out
}

/// Tagged import declarations at the top level of a program.
pub fn managed_imports<'a>(program: &'a SyntaxNode, prefix: &str) -> Vec<ManagedImport<'a>> {
    let children = program.children();
    let mut out = Vec::new();
    for (i, statement) in children.iter().enumerate() {
        if statement.kind() != "import_statement" {
            continue;
        }
        let Some(tag) = children.get(i + 1).filter(|c| c.is_comment()) else {
            continue;
        };
        let gap = &program.source()[statement.range().end..tag.range().start];
        if gap.contains('\n') {
            continue;
        }
        let Some(key) = parse_tag(tag.text(), prefix) else {
            continue;
        };
        let source = statement
            .child_by_field("source")
            .map(|s| s.text().to_string())
            .unwrap_or_default();
        let type_only = statement.children().iter().any(|c| !c.is_named() && c.kind() == "type");
        out.push(ManagedImport {
            key,
            statement,
            tag,
            source,
            type_only,
            specifiers: specifiers(statement),
        });
    }
    out
}

/// Canonical text of one declaration and its tag.
fn print_import(import: &ManagedImport<'_>, specifiers: &[Specifier], prefix: &str) -> String {
    let tag = match import.key.kind {
        Some(kind) => format!("// {prefix}: {}/{kind}", import.key.module_id),
        None => format!("// {prefix}: {}", import.key.module_id),
    };
    let keyword = if import.type_only { "import type" } else { "import" };

    let default = specifiers.iter().find_map(|s| match s {
        Specifier::Default(local) => Some(local.as_str()),
        _ => None,
    });
    let namespace = specifiers.iter().find_map(|s| match s {
        Specifier::Namespace(local) => Some(local.as_str()),
        _ => None,
    });
    let named: Vec<&str> = specifiers
        .iter()
        .filter_map(|s| match s {
            Specifier::Named { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();

    let mut declarations = Vec::new();
    let mut head: Vec<String> = default.map(str::to_string).into_iter().collect();
    if let Some(namespace) = namespace {
        let mut parts = head.clone();
        parts.push(format!("* as {namespace}"));
        declarations.push(parts.join(", "));
        head.clear();
    }
    if !named.is_empty() {
        head.push(format!("{{ {} }}", named.join(", ")));
    }
    if !head.is_empty() || declarations.is_empty() {
        declarations.push(head.join(", "));
    }

    declarations
        .into_iter()
        .map(|clause| {
            if clause.is_empty() {
                format!("{keyword} {}; {tag}", import.source)
            } else {
                format!("{keyword} {clause} from {}; {tag}", import.source)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Union of specifier lists, `edited` first. A namespace import is taken
/// from `new` only when `edited` has none.
fn merge_specifiers(edited: &[Specifier], new: &[Specifier]) -> Vec<Specifier> {
    let mut merged = edited.to_vec();
    for spec in new {
        let present = match spec {
            Specifier::Namespace(_) => merged.iter().any(|s| matches!(s, Specifier::Namespace(_))),
            Specifier::Default(_) => merged
                .iter()
                .any(|s| matches!(s, Specifier::Default(_)) || s.local() == spec.local()),
            Specifier::Named { .. } => merged.iter().any(|s| s.local() == spec.local()),
        };
        if !present {
            merged.push(spec.clone());
        }
    }
    merged
}

/// Edits that bring the edited file's managed imports up to date with the
/// new file. Empty when nothing changed.
pub fn merge_imports(edited: &SyntaxNode, new: &SyntaxNode, options: &MergeOptions) -> Vec<TextEdit> {
    let prefix = &options.managed_import_marker;
    let edited_imports = managed_imports(edited, prefix);
    let new_imports = managed_imports(new, prefix);

    let mut changed = false;
    let mut block = Vec::new();
    for import in &edited_imports {
        let counterpart = new_imports.iter().find(|n| n.key == import.key);
        match counterpart {
            Some(counterpart) => {
                let merged = merge_specifiers(&import.specifiers, &counterpart.specifiers);
                if merged.len() == import.specifiers.len() {
                    block.push(import.text().to_string());
                } else {
                    tracing::debug!(module = %import.key.module_id, "merging import specifiers");
                    changed = true;
                    block.push(print_import(import, &merged, prefix));
                }
            }
            None => block.push(import.text().to_string()),
        }
    }
    for import in &new_imports {
        if !edited_imports.iter().any(|e| e.key == import.key) {
            tracing::debug!(module = %import.key.module_id, "adding managed import");
            changed = true;
            block.push(import.text().to_string());
        }
    }

    if !changed {
        return Vec::new();
    }

    let block = block.join("\n");
    let Some((first, rest)) = edited_imports.split_first() else {
        let at = edited
            .children()
            .iter()
            .find(|c| c.kind() == "import_statement")
            .map_or(0, |c| c.range().start);
        return vec![TextEdit::insert(at, format!("{block}\n"))];
    };

    let source = edited.source();
    let mut edits = vec![TextEdit::replace(first.range(), block)];
    for import in rest {
        let range = import.range();
        let end = if source[range.end..].starts_with('\n') {
            range.end + 1
        } else {
            range.end
        };
        edits.push(TextEdit::replace(range.start..end, ""));
    }
    edits
}
