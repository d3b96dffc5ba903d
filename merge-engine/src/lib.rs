//! # jsxmerge-engine
//!
//! Three-way structural merge of generated JSX/TSX component markup.
//!
//! A design tool regenerates a component's markup every time the design
//! changes, while developers hand-edit the same file. Given the last
//! generated version (*base*), the developer's file (*edited*) and the fresh
//! output (*new*), the engine produces a file containing the new structure
//! with every developer edit preserved.
//!
//! ## Approach
//!
//! 1. **Syntax**: Files are parsed with tree-sitter (TSX or JavaScript) into
//!    owned, immutable syntax trees. Output is always fresh text: nodes are
//!    cloned to text with a substitution hook, never mutated.
//!
//! 2. **Semantic trees**: Elements are identified by the generator's helper
//!    idioms (`className={rh.clsRoot()}`, `{...rh.propsRoot()}`); everything
//!    the engine does not recognize is opaque and passed through verbatim.
//!
//! 3. **Merge**: Driven by the new tree. Elements are correlated by identity
//!    across versions, attributes are resolved by a fixed policy table, child
//!    lists by a forward-only first-fit match, and conditional `show` guards
//!    are added or neutralized without touching developer logic around them.
//!    Conflicts the policy cannot settle keep both sides and are reported as
//!    diagnostics.
//!
//! 4. **File splice**: The merged markup and the managed imports are spliced
//!    into the developer's file and the revision marker is updated.
//!
//! ## Example
//!
//! ```rust,ignore
//! use jsxmerge_engine::{ComponentFiles, MergeOptions, merge_component_files};
//!
//! let merged = merge_component_files(
//!     &ComponentFiles {
//!         base_file: &base,
//!         base_identity_map: &base_ids,
//!         edited_file: &edited,
//!         new_file: &new,
//!         new_identity_map: &new_ids,
//!     },
//!     &MergeOptions::default(),
//! )?;
//!
//! for diagnostic in &merged.diagnostics {
//!     eprintln!("warning: {diagnostic}");
//! }
//! println!("{}", merged.content);
//! ```

pub mod diagnostics;
pub mod error;
pub mod imports;
pub mod merge;
pub mod options;
pub mod region;
pub mod semantic;
pub mod serialize;
pub mod syntax;
pub mod types;
pub mod version;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{MergeError, Result};
pub use imports::{ImportKey, ImportKind, merge_imports};
pub use merge::file::{ComponentFiles, MergedFile, append_manual_merge_block, merge_component_files};
pub use merge::{Merger, Prior, merge_trees, print_tree};
pub use options::{Idioms, MergeOptions};
pub use region::{identity_renames, locate_managed_region, managed_revision, rename_identities};
pub use semantic::TreeBuilder;
pub use syntax::{Dialect, ParseError, SyntaxNode, parse, parse_expression, structurally_equal};
pub use types::{ArgRef, Attribute, ElementBody, Node, NodeKind, TagOrComponent};
pub use version::CodeVersion;
