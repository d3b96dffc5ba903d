//! Multi-component merge driver.
//!
//! Each component with a managed region is merged on its own task: its base
//! snapshot is fetched for the revision recorded in the edited file, then the
//! synchronous engine merge runs on the blocking pool. One component failing
//! never affects the others.

use crate::snapshot::SnapshotProvider;
use jsxmerge_engine::{
    append_manual_merge_block, managed_revision, merge_component_files, ComponentFiles, Diagnostic, MergeError,
    MergeOptions, MergedFile,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

/// One component to merge.
#[derive(Debug, Clone)]
pub struct ComponentInput {
    pub edited_file: String,
    pub new_file: String,
    /// `stable_id -> uuid` of the freshly generated tree.
    pub new_identity_map: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedComponent {
    pub content: String,
    pub revision: u64,
    pub diagnostics: Vec<Diagnostic>,
    /// The base was unavailable and the new markup was appended as a comment.
    pub manual_merge: bool,
}

#[derive(Error, Debug)]
pub enum ComponentError {
    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("merge task failed: {0}")]
    Join(String),
}

pub type ComponentResults = BTreeMap<String, Result<MergedComponent, ComponentError>>;

/// Merge every component of `inputs` against its base snapshot.
///
/// Returns `None` when no edited file carries a managed-region marker.
/// Components without a marker are left out of the results.
pub async fn merge_files(
    project_id: &str,
    inputs: BTreeMap<String, ComponentInput>,
    provider: Arc<dyn SnapshotProvider>,
    options: Arc<MergeOptions>,
) -> Option<ComponentResults> {
    let mut results = ComponentResults::new();
    let mut pending = Vec::new();

    for (component, input) in inputs {
        match managed_revision(&input.edited_file, &options) {
            Ok(Some(revision)) => pending.push((component, revision, input)),
            Ok(None) => tracing::debug!(%component, "no managed region, skipping"),
            Err(e) => {
                results.insert(component, Err(e.into()));
            }
        }
    }

    if pending.is_empty() && results.is_empty() {
        tracing::info!(project = project_id, "nothing to merge");
        return None;
    }

    tracing::info!(project = project_id, components = pending.len(), "merging components");

    let mut outstanding: Vec<String> = Vec::new();
    let mut tasks = JoinSet::new();
    for (component, revision, input) in pending {
        outstanding.push(component.clone());
        let provider = provider.clone();
        let options = options.clone();
        let project_id = project_id.to_string();
        tasks.spawn(async move {
            let result = merge_component(&project_id, &component, revision, input, provider.as_ref(), options).await;
            (component, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((component, result)) => {
                match &result {
                    Ok(merged) => tracing::info!(
                        %component,
                        revision = merged.revision,
                        diagnostics = merged.diagnostics.len(),
                        manual = merged.manual_merge,
                        "component merged"
                    ),
                    Err(e) => tracing::error!(%component, error = %e, "component merge failed"),
                }
                outstanding.retain(|c| c != &component);
                results.insert(component, result);
            }
            Err(e) => tracing::error!(error = %e, "merge task aborted"),
        }
    }

    // Tasks that panicked never reported their component.
    for component in outstanding {
        results.insert(
            component,
            Err(ComponentError::Join("task panicked before producing a result".into())),
        );
    }

    Some(results)
}

async fn merge_component(
    project_id: &str,
    component: &str,
    revision: u64,
    input: ComponentInput,
    provider: &dyn SnapshotProvider,
    options: Arc<MergeOptions>,
) -> Result<MergedComponent, ComponentError> {
    let snapshot = provider.fetch(project_id, revision).await;
    let base = match &snapshot {
        Ok(snapshot) => snapshot
            .component(component)
            .ok_or_else(|| format!("component missing from the revision {revision} snapshot")),
        Err(e) => Err(e.to_string()),
    };

    let base = match base {
        Ok(base) => base,
        Err(reason) if options.manual_merge_fallback => {
            tracing::warn!(%component, revision, %reason, "no base snapshot, falling back to manual merge");
            let merged = append_manual_merge_block(&input.edited_file, &input.new_file, &options)?;
            return Ok(finish(merged, true));
        }
        Err(reason) => {
            return Err(MergeError::MissingBase {
                component: component.to_string(),
                revision,
                reason,
            }
            .into())
        }
    };

    let base_file = base.file_content.clone();
    let base_identity_map = base.identity_map();
    // Parsing and merging are CPU-bound; keep them off the async workers.
    let merged = tokio::task::spawn_blocking(move || {
        merge_component_files(
            &ComponentFiles {
                base_file: &base_file,
                base_identity_map: &base_identity_map,
                edited_file: &input.edited_file,
                new_file: &input.new_file,
                new_identity_map: &input.new_identity_map,
            },
            &options,
        )
    })
    .await
    .map_err(|e| ComponentError::Join(e.to_string()))??;
    Ok(finish(merged, false))
}

fn finish(merged: MergedFile, manual_merge: bool) -> MergedComponent {
    MergedComponent {
        content: merged.content,
        revision: merged.revision,
        diagnostics: merged.diagnostics,
        manual_merge,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{ComponentSkeletonModel, ProjectSyncMetadataModel};

    struct MemoryProvider {
        snapshots: HashMap<u64, Arc<ProjectSyncMetadataModel>>,
    }

    #[async_trait::async_trait]
    impl SnapshotProvider for MemoryProvider {
        async fn fetch(&self, _project_id: &str, revision: u64) -> anyhow::Result<Arc<ProjectSyncMetadataModel>> {
            self.snapshots
                .get(&revision)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("revision {revision} not stored"))
        }
    }

    fn file(revision: u64, body: &str) -> String {
        format!(
            "export function Card(props) {{\n  const rh = useHelpers(props);\n  // managed-jsx/{revision}\n  return {body};\n}}\n"
        )
    }

    fn ids(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    fn provider(components: &[(&str, String)]) -> Arc<dyn SnapshotProvider> {
        let snapshot = ProjectSyncMetadataModel {
            components: components
                .iter()
                .map(|(uuid, content)| ComponentSkeletonModel {
                    component_uuid: uuid.to_string(),
                    name_in_id_to_uuid: vec![("Root".into(), "r1".into())],
                    file_content: content.clone(),
                })
                .collect(),
        };
        Arc::new(MemoryProvider {
            snapshots: HashMap::from([(1, Arc::new(snapshot))]),
        })
    }

    fn input(edited: String, new: String) -> ComponentInput {
        ComponentInput {
            edited_file: edited,
            new_file: new,
            new_identity_map: ids(&[("Root", "r1")]),
        }
    }

    const ROOT: &str = r#"<div className={rh.clsRoot()} />"#;
    const ROOT_TITLED: &str = r#"<div className={rh.clsRoot()} title="t" />"#;

    #[tokio::test]
    async fn test_nothing_to_do_without_markers() {
        let inputs = BTreeMap::from([(
            "c1".to_string(),
            input("const a = 1;\n".into(), "const a = 2;\n".into()),
        )]);
        let result = merge_files("p", inputs, provider(&[]), Arc::new(MergeOptions::default())).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_merges_against_snapshot() {
        let base = file(1, ROOT);
        let inputs = BTreeMap::from([("c1".to_string(), input(base.clone(), file(2, ROOT_TITLED)))]);
        let results = merge_files("p", inputs, provider(&[("c1", base)]), Arc::new(MergeOptions::default()))
            .await
            .unwrap();

        let merged = results["c1"].as_ref().unwrap();
        assert_eq!(merged.content, file(2, ROOT_TITLED));
        assert_eq!(merged.revision, 2);
        assert!(!merged.manual_merge);
    }

    #[tokio::test]
    async fn test_missing_base_is_reported() {
        let inputs = BTreeMap::from([("c1".to_string(), input(file(5, ROOT), file(6, ROOT)))]);
        let results = merge_files("p", inputs, provider(&[]), Arc::new(MergeOptions::default()))
            .await
            .unwrap();
        assert!(matches!(
            &results["c1"],
            Err(ComponentError::Merge(MergeError::MissingBase { revision: 5, .. }))
        ));
    }

    #[tokio::test]
    async fn test_manual_fallback_appends_new_markup() {
        let options = MergeOptions {
            manual_merge_fallback: true,
            ..MergeOptions::default()
        };
        let edited = file(1, ROOT);
        let inputs = BTreeMap::from([("c9".to_string(), input(edited.clone(), file(2, ROOT_TITLED)))]);
        let results = merge_files("p", inputs, provider(&[("c1", edited.clone())]), Arc::new(options))
            .await
            .unwrap();

        let merged = results["c9"].as_ref().unwrap();
        assert!(merged.manual_merge);
        assert_eq!(merged.revision, 1);
        assert!(merged.content.starts_with(&edited));
        assert!(merged.content.ends_with(&format!("// {ROOT_TITLED}\n")));
    }

    #[tokio::test]
    async fn test_failing_component_does_not_affect_siblings() {
        let base = file(1, ROOT);
        let duplicate = file(2, r#"<div className={rh.clsRoot()}><a className={rh.clsRoot()} /></div>"#);
        let inputs = BTreeMap::from([
            ("bad".to_string(), input(base.clone(), duplicate)),
            ("good".to_string(), input(base.clone(), file(2, ROOT_TITLED))),
            ("plain".to_string(), input("const a = 1;\n".into(), "const a = 1;\n".into())),
        ]);
        let results = merge_files(
            "p",
            inputs,
            provider(&[("bad", base.clone()), ("good", base)]),
            Arc::new(MergeOptions::default()),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 2);
        assert!(matches!(
            &results["bad"],
            Err(ComponentError::Merge(MergeError::DuplicateIdentity(id))) if id == "Root"
        ));
        assert_eq!(results["good"].as_ref().unwrap().content, file(2, ROOT_TITLED));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_many_components_merge_on_blocking_pool() {
        let base = file(1, ROOT);
        let names: Vec<String> = (0..16).map(|i| format!("c{i}")).collect();
        let inputs: BTreeMap<String, ComponentInput> = names
            .iter()
            .map(|name| (name.clone(), input(base.clone(), file(2, ROOT_TITLED))))
            .collect();
        let stored: Vec<(&str, String)> = names.iter().map(|name| (name.as_str(), base.clone())).collect();

        let results = merge_files("p", inputs, provider(&stored), Arc::new(MergeOptions::default()))
            .await
            .unwrap();

        assert_eq!(results.len(), names.len());
        for name in &names {
            assert_eq!(results[name].as_ref().unwrap().content, file(2, ROOT_TITLED));
        }
    }
}
