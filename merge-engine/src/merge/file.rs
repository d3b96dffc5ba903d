//! Whole-file merge of one component.

use std::collections::HashMap;

use super::{Merger, Prior};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{MergeError, Result};
use crate::imports::merge_imports;
use crate::options::MergeOptions;
use crate::region::{ManagedRegion, identity_renames, locate_managed_region, rename_identities, rename_identity_map};
use crate::syntax::{SyntaxNode, TextEdit, apply_edits, indent_continuation, parse};
use crate::version::CodeVersion;

/// The inputs of one component merge.
#[derive(Debug, Clone, Copy)]
pub struct ComponentFiles<'a> {
    /// File content of the last synced snapshot.
    pub base_file: &'a str,
    pub base_identity_map: &'a HashMap<String, String>,
    /// The developer's current file.
    pub edited_file: &'a str,
    /// The freshly generated file.
    pub new_file: &'a str,
    pub new_identity_map: &'a HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFile {
    pub content: String,
    /// Revision recorded in the merged file's marker.
    pub revision: u64,
    pub diagnostics: Vec<Diagnostic>,
}

fn region<'a>(root: &'a SyntaxNode, options: &MergeOptions, version: &'static str) -> Result<ManagedRegion<'a>> {
    locate_managed_region(root, &options.managed_jsx_marker)?.ok_or_else(|| MergeError::MissingManagedRegion {
        marker: options.managed_jsx_marker.clone(),
        version,
    })
}

/// Three-way merge of a component file.
///
/// Identities renamed by the generator are first rewritten in the base and
/// edited files, then the managed expression and the managed imports are
/// merged and spliced into the edited file, and the marker is moved to the
/// new revision.
pub fn merge_component_files(files: &ComponentFiles<'_>, options: &MergeOptions) -> Result<MergedFile> {
    let renames = identity_renames(files.base_identity_map, files.new_identity_map);
    if !renames.is_empty() {
        tracing::debug!(count = renames.len(), "propagating identity renames");
    }

    let base_src = rename_identities(&parse(files.base_file, options.dialect)?, &renames, &options.idioms);
    let edited_src = rename_identities(&parse(files.edited_file, options.dialect)?, &renames, &options.idioms);

    let base_root = parse(&base_src, options.dialect)?;
    let edited_root = parse(&edited_src, options.dialect)?;
    let new_root = parse(files.new_file, options.dialect)?;

    let base_region = region(&base_root, options, "base")?;
    let edited_region = region(&edited_root, options, "edited")?;
    let new_region = region(&new_root, options, "new")?;

    let base_map = rename_identity_map(files.base_identity_map, &renames);
    let base = CodeVersion::new(base_region.expression, base_map.clone(), &options.idioms)?;
    let edited = CodeVersion::new(edited_region.expression, base_map, &options.idioms)?;
    let new = CodeVersion::new(new_region.expression, files.new_identity_map.clone(), &options.idioms)?;

    let mut merger = Merger::new(
        &new,
        Some(Prior {
            edited: &edited,
            base: &base,
        }),
        options,
    );
    let code = merger.merge_root()?;
    let code = indent_continuation(&code, edited_region.expression.line_indent());

    let mut edits = vec![
        TextEdit::replace(edited_region.expression.range(), code),
        TextEdit::replace(edited_region.revision_range.clone(), new_region.revision.to_string()),
    ];
    edits.extend(merge_imports(&edited_root, &new_root, options));

    tracing::info!(
        from = edited_region.revision,
        to = new_region.revision,
        "merged managed region"
    );

    Ok(MergedFile {
        content: apply_edits(&edited_src, edits),
        revision: new_region.revision,
        diagnostics: merger.into_diagnostics(),
    })
}

/// Keep the edited file and append the regenerated managed expression as a
/// line-comment block for the developer to merge by hand.
pub fn append_manual_merge_block(edited_file: &str, new_file: &str, options: &MergeOptions) -> Result<MergedFile> {
    let edited_root = parse(edited_file, options.dialect)?;
    let new_root = parse(new_file, options.dialect)?;
    let edited_region = region(&edited_root, options, "edited")?;
    let new_region = region(&new_root, options, "new")?;

    let mut content = edited_file.to_string();
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&format!(
        "\n// {} revision {}: merge the regenerated markup below by hand\n",
        options.managed_jsx_marker, new_region.revision
    ));
    for line in new_region.expression.text().lines() {
        content.push_str("// ");
        content.push_str(line);
        content.push('\n');
    }

    let mut diagnostics = Diagnostics::new();
    diagnostics.push(
        DiagnosticKind::ManualMergeRequired,
        None,
        format!(
            "no base snapshot for revision {}; regenerated markup appended as a comment",
            edited_region.revision
        ),
    );

    Ok(MergedFile {
        content,
        revision: edited_region.revision,
        diagnostics: diagnostics.into_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(revision: u64, body: &str) -> String {
        format!(
            "import * as React from \"react\";\n\nexport function Card(props) {{\n  const rh = useHelpers(props);\n  // managed-jsx/{revision}\n  return (\n    {body}\n  );\n}}\n"
        )
    }

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn test_marker_moves_to_new_revision() {
        let body = r#"<div className={rh.clsRoot()} />"#;
        let base = file(1, body);
        let new = file(2, body);
        let ids = map(&[("Root", "u1")]);
        let merged = merge_component_files(
            &ComponentFiles {
                base_file: &base,
                base_identity_map: &ids,
                edited_file: &base,
                new_file: &new,
                new_identity_map: &ids,
            },
            &MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(merged.content, new);
        assert_eq!(merged.revision, 2);
        assert!(merged.diagnostics.is_empty());
    }

    #[test]
    fn test_merged_region_keeps_file_indentation() {
        let base_body = "<div className={rh.clsRoot()}>\n      <a className={rh.clsA()} />\n    </div>";
        let edited_body = "<div className={rh.clsRoot()}>\n      <a className={rh.clsA()} />\n      {items.map(i => (\n        <li key={i}>{i}</li>\n      ))}\n    </div>";
        let new_body = "<div className={rh.clsRoot()} title=\"t\">\n      <a className={rh.clsA()} />\n    </div>";
        let expected_body = "<div className={rh.clsRoot()} title=\"t\">\n      <a className={rh.clsA()} />\n      {items.map(i => (\n        <li key={i}>{i}</li>\n      ))}\n    </div>";

        let base = file(1, base_body);
        let edited = file(1, edited_body);
        let new = file(2, new_body);
        let ids = map(&[("Root", "u1"), ("A", "u2")]);
        let merged = merge_component_files(
            &ComponentFiles {
                base_file: &base,
                base_identity_map: &ids,
                edited_file: &edited,
                new_file: &new,
                new_identity_map: &ids,
            },
            &MergeOptions::default(),
        )
        .unwrap();
        assert_eq!(merged.content, file(2, expected_body));
    }

    #[test]
    fn test_missing_region_reported_per_version() {
        let base = file(1, r#"<div className={rh.clsRoot()} />"#);
        let ids = HashMap::new();
        let err = merge_component_files(
            &ComponentFiles {
                base_file: &base,
                base_identity_map: &ids,
                edited_file: "const x = 1;\n",
                new_file: &base,
                new_identity_map: &ids,
            },
            &MergeOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::MissingManagedRegion { version: "edited", .. }));
    }

    #[test]
    fn test_manual_merge_block_appended() {
        let edited = file(3, r#"<div className={rh.clsRoot()} />"#);
        let new = file(4, r#"<span className={rh.clsRoot()} />"#);
        let merged = append_manual_merge_block(&edited, &new, &MergeOptions::default()).unwrap();
        assert!(merged.content.starts_with(&edited));
        assert!(merged.content.ends_with("// managed-jsx revision 4: merge the regenerated markup below by hand\n// <span className={rh.clsRoot()} />\n"));
        assert_eq!(merged.revision, 3);
        assert_eq!(merged.diagnostics[0].kind, DiagnosticKind::ManualMergeRequired);
    }
}
