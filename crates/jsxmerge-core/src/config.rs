use jsxmerge_engine::{Dialect, Idioms, MergeOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub idioms: IdiomSettings,
    #[serde(default)]
    pub markers: MarkerSettings,
    #[serde(default)]
    pub policy: PolicySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub snapshots: SnapshotSettings,
}

/// Helper-call naming scheme of the generated code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdiomSettings {
    #[serde(default = "default_helper_object")]
    pub helper_object: String,
    #[serde(default = "default_args_object")]
    pub args_object: String,
    #[serde(default = "default_class_prefix")]
    pub class_prefix: String,
    #[serde(default = "default_props_prefix")]
    pub props_prefix: String,
    #[serde(default = "default_show_prefix")]
    pub show_prefix: String,
    #[serde(default = "default_child_str_prefix")]
    pub child_str_prefix: String,
}

impl Default for IdiomSettings {
    fn default() -> Self {
        Self {
            helper_object: default_helper_object(),
            args_object: default_args_object(),
            class_prefix: default_class_prefix(),
            props_prefix: default_props_prefix(),
            show_prefix: default_show_prefix(),
            child_str_prefix: default_child_str_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSettings {
    #[serde(default = "default_managed_jsx")]
    pub managed_jsx: String,
    #[serde(default = "default_managed_import")]
    pub managed_import: String,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            managed_jsx: default_managed_jsx(),
            managed_import: default_managed_import(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySettings {
    #[serde(default = "default_event_handler_prefix")]
    pub event_handler_prefix: String,
    #[serde(default = "default_slot_host_tag")]
    pub slot_host_tag: String,
    #[serde(default)]
    pub manual_merge_fallback: bool,
    /// `tsx` or `jsx`.
    #[serde(default = "default_dialect")]
    pub dialect: String,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            event_handler_prefix: default_event_handler_prefix(),
            slot_host_tag: default_slot_host_tag(),
            manual_merge_fallback: false,
            dialect: default_dialect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    #[serde(default = "default_snapshot_dir")]
    pub directory: PathBuf,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            directory: default_snapshot_dir(),
        }
    }
}

fn default_helper_object() -> String {
    "rh".into()
}
fn default_args_object() -> String {
    "args".into()
}
fn default_class_prefix() -> String {
    "cls".into()
}
fn default_props_prefix() -> String {
    "props".into()
}
fn default_show_prefix() -> String {
    "show".into()
}
fn default_child_str_prefix() -> String {
    "childStr".into()
}
fn default_managed_jsx() -> String {
    "managed-jsx".into()
}
fn default_managed_import() -> String {
    "managed-import".into()
}
fn default_event_handler_prefix() -> String {
    "on".into()
}
fn default_slot_host_tag() -> String {
    "Slot".into()
}
fn default_dialect() -> String {
    "tsx".into()
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(".jsxmerge/snapshots")
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Write a fresh default document to `path`. An existing file is left
    /// untouched and reported as an error.
    pub fn write_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            anyhow::bail!("{} already exists", path.display());
        }
        let settings = Settings::default();
        settings.save(path)?;
        Ok(settings)
    }

    /// Engine options for these settings.
    pub fn merge_options(&self) -> anyhow::Result<MergeOptions> {
        let dialect = Dialect::from_extension(&self.policy.dialect)
            .ok_or_else(|| anyhow::anyhow!("unknown dialect `{}`", self.policy.dialect))?;

        Ok(MergeOptions {
            idioms: Idioms {
                helper_object: self.idioms.helper_object.clone(),
                args_object: self.idioms.args_object.clone(),
                class_prefix: self.idioms.class_prefix.clone(),
                props_prefix: self.idioms.props_prefix.clone(),
                show_prefix: self.idioms.show_prefix.clone(),
                child_str_prefix: self.idioms.child_str_prefix.clone(),
            },
            dialect,
            managed_jsx_marker: self.markers.managed_jsx.clone(),
            managed_import_marker: self.markers.managed_import.clone(),
            event_handler_prefix: self.policy.event_handler_prefix.clone(),
            slot_host_tag: self.policy.slot_host_tag.clone(),
            manual_merge_fallback: self.policy.manual_merge_fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let options = Settings::default().merge_options().unwrap();
        assert_eq!(options, MergeOptions::default());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"idioms": {"helper_object": "helpers"}, "policy": {"manual_merge_fallback": true}}"#)
                .unwrap();
        assert_eq!(settings.idioms.helper_object, "helpers");
        assert_eq!(settings.idioms.class_prefix, "cls");
        assert!(settings.policy.manual_merge_fallback);
        assert_eq!(settings.logging.filter, "info");
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let mut settings = Settings::default();
        settings.policy.dialect = "vue".into();
        assert!(settings.merge_options().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.markers.managed_jsx = "plasmic-managed-jsx".into();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.markers.managed_jsx, "plasmic-managed-jsx");
        assert_eq!(loaded.snapshots.directory, PathBuf::from(".jsxmerge/snapshots"));
    }

    #[test]
    fn test_write_default_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"policy": {"manual_merge_fallback": true}}"#).unwrap();

        assert!(Settings::write_default(&path).is_err());
        assert!(Settings::load(&path).unwrap().policy.manual_merge_fallback);
    }

    #[test]
    fn test_write_default_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".jsxmerge").join("settings.json");

        Settings::write_default(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.merge_options().unwrap(), MergeOptions::default());
    }
}
