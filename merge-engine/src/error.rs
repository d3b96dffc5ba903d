//! Error types for the merge engine.

use thiserror::Error;

use crate::syntax::ParseError;

/// Result type alias for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Faults that abort the merge of one component.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Two elements of one tree claim the same stable id.
    #[error("stable id `{0}` appears more than once in one tree")]
    DuplicateIdentity(String),

    /// The class-name idiom and the props-spread idiom name different ids.
    #[error("class-name identity `{class_id}` disagrees with props identity `{props_id}`")]
    IdentityMismatch { class_id: String, props_id: String },

    /// An element exists in the edited and new trees but not in the base.
    #[error("element `{0}` exists in the edited and new versions but not in the base version")]
    MissingBaseElement(String),

    #[error("no `{marker}` marker found in the {version} version")]
    MissingManagedRegion {
        marker: String,
        version: &'static str,
    },

    #[error("invalid revision marker `{0}`")]
    InvalidRevision(String),

    #[error(
        "cannot three-way-merge component {component}: no base snapshot for revision {revision} \
         ({reason}); enable the manual-merge fallback to merge by hand"
    )]
    MissingBase {
        component: String,
        revision: u64,
        reason: String,
    },
}
