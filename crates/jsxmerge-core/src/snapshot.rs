//! Persisted sync snapshots and the providers that fetch them.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// One component as it was generated at a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSkeletonModel {
    #[serde(rename = "uuid")]
    pub component_uuid: String,
    /// `stable_id -> uuid` pairs, kept as an ordered list so the document
    /// round-trips exactly.
    pub name_in_id_to_uuid: Vec<(String, String)>,
    pub file_content: String,
}

impl ComponentSkeletonModel {
    pub fn identity_map(&self) -> HashMap<String, String> {
        self.name_in_id_to_uuid.iter().cloned().collect()
    }
}

/// Every component of a project at one revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectSyncMetadataModel {
    pub components: Vec<ComponentSkeletonModel>,
}

impl ProjectSyncMetadataModel {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn component(&self, uuid: &str) -> Option<&ComponentSkeletonModel> {
        self.components.iter().find(|c| c.component_uuid == uuid)
    }
}

/// Source of base snapshots, keyed by project and revision.
#[async_trait::async_trait]
pub trait SnapshotProvider: Send + Sync + 'static {
    async fn fetch(&self, project_id: &str, revision: u64) -> anyhow::Result<Arc<ProjectSyncMetadataModel>>;
}

/// Memoizes another provider. Concurrent requests for the same key share one
/// inner call; failures are not cached.
pub struct CachedSnapshotProvider<P> {
    inner: P,
    cache: DashMap<(String, u64), Arc<OnceCell<Arc<ProjectSyncMetadataModel>>>>,
}

impl<P: SnapshotProvider> CachedSnapshotProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl<P: SnapshotProvider> SnapshotProvider for CachedSnapshotProvider<P> {
    async fn fetch(&self, project_id: &str, revision: u64) -> anyhow::Result<Arc<ProjectSyncMetadataModel>> {
        let cell = self
            .cache
            .entry((project_id.to_string(), revision))
            .or_default()
            .clone();

        let snapshot = cell
            .get_or_try_init(|| async {
                tracing::debug!(project = project_id, revision, "fetching snapshot");
                self.inner.fetch(project_id, revision).await
            })
            .await?;
        Ok(Arc::clone(snapshot))
    }
}

/// Reads `<root>/<project>/<revision>.json`.
pub struct FsSnapshotProvider {
    root: PathBuf,
}

impl FsSnapshotProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, project_id: &str, revision: u64) -> PathBuf {
        self.root.join(project_id).join(format!("{revision}.json"))
    }

    /// Write a snapshot where [`fetch`](SnapshotProvider::fetch) will find it.
    pub async fn store(&self, project_id: &str, revision: u64, snapshot: &ProjectSyncMetadataModel) -> anyhow::Result<()> {
        let path = self.path(project_id, revision);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, snapshot.to_json()?).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SnapshotProvider for FsSnapshotProvider {
    async fn fetch(&self, project_id: &str, revision: u64) -> anyhow::Result<Arc<ProjectSyncMetadataModel>> {
        let path = self.path(project_id, revision);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
        Ok(Arc::new(ProjectSyncMetadataModel::from_json(&content)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> ProjectSyncMetadataModel {
        ProjectSyncMetadataModel {
            components: vec![
                ComponentSkeletonModel {
                    component_uuid: "c1".into(),
                    name_in_id_to_uuid: vec![("Root".into(), "u1".into()), ("Label".into(), "u2".into())],
                    file_content: "// managed-jsx/1\nconst x = <div />;\n".into(),
                },
                ComponentSkeletonModel {
                    component_uuid: "c2".into(),
                    name_in_id_to_uuid: vec![],
                    file_content: String::new(),
                },
            ],
        }
    }

    #[test]
    fn test_json_shape() {
        let json = sample().to_json().unwrap();
        assert!(json.starts_with(r#"[{"uuid":"c1","nameInIdToUuid":[["Root","u1"],["Label","u2"]],"fileContent":"#));
    }

    #[test]
    fn test_round_trip() {
        let original = sample();
        let parsed = ProjectSyncMetadataModel::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.component("c1").unwrap().identity_map()["Label"], "u2");
        assert!(parsed.component("missing").is_none());
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl SnapshotProvider for Counting {
        async fn fetch(&self, _project_id: &str, _revision: u64) -> anyhow::Result<Arc<ProjectSyncMetadataModel>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("unavailable");
            }
            Ok(Arc::new(sample()))
        }
    }

    #[tokio::test]
    async fn test_cache_fetches_once_per_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(CachedSnapshotProvider::new(Counting {
            calls: calls.clone(),
            fail: false,
        }));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let provider = provider.clone();
            handles.push(tokio::spawn(async move { provider.fetch("p", 3).await.unwrap() }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().components.len(), 2);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        provider.fetch("p", 4).await.unwrap();
        provider.fetch("q", 3).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cache_does_not_keep_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = CachedSnapshotProvider::new(Counting {
            calls: calls.clone(),
            fail: true,
        });
        assert!(provider.fetch("p", 1).await.is_err());
        assert!(provider.fetch("p", 1).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fs_provider_reads_stored_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FsSnapshotProvider::new(dir.path());
        provider.store("proj", 7, &sample()).await.unwrap();

        let loaded = provider.fetch("proj", 7).await.unwrap();
        assert_eq!(*loaded, sample());
        assert!(provider.fetch("proj", 8).await.is_err());
    }
}
