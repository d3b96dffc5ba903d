pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod snapshot;

pub use config::Settings;
pub use orchestrator::{merge_files, ComponentError, ComponentInput, ComponentResults, MergedComponent};
pub use snapshot::{
    CachedSnapshotProvider, ComponentSkeletonModel, FsSnapshotProvider, ProjectSyncMetadataModel,
    SnapshotProvider,
};
