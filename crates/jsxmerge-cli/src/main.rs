use clap::{Parser, Subcommand};
use jsxmerge_core::logging::init_logging;
use jsxmerge_core::{
    merge_files, CachedSnapshotProvider, ComponentInput, FsSnapshotProvider, ProjectSyncMetadataModel, Settings,
    SnapshotProvider,
};
use jsxmerge_engine::{locate_managed_region, parse, print_tree, CodeVersion};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "jsxmerge",
    about = "Three-way merge of regenerated JSX markup into developer-edited files"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the settings file
    #[arg(long, default_value = ".jsxmerge/settings.json")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a regenerated component file into the developer's copy
    Merge {
        /// Project the snapshots belong to
        #[arg(long)]
        project: String,
        /// Component uuid inside the snapshot
        #[arg(long)]
        component: String,
        /// The developer's current file
        #[arg(long)]
        edited: PathBuf,
        /// The freshly generated file
        #[arg(long)]
        new: PathBuf,
        /// JSON object mapping stable ids to uuids for the new file
        #[arg(long)]
        identity_map: PathBuf,
        /// Snapshot directory (defaults to the configured one)
        #[arg(long)]
        snapshots: Option<PathBuf>,
        /// Overwrite the edited file instead of printing the result
        #[arg(long)]
        write: bool,
        /// Print a unified diff against the edited file
        #[arg(long, conflicts_with = "write")]
        diff: bool,
    },
    /// Print the canonical form of a file's managed markup
    Print {
        file: PathBuf,
    },
    /// Validate a persisted snapshot document
    SnapshotCheck {
        file: PathBuf,
    },
    /// Write a settings file with the default values
    Init,
}

fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    if path.exists() {
        Settings::load(path)
    } else {
        Ok(Settings::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli.config)?;
    let _guard = init_logging(&settings.logging)?;

    match &cli.command {
        Commands::Merge {
            project,
            component,
            edited,
            new,
            identity_map,
            snapshots,
            write,
            diff,
        } => {
            let snapshots = snapshots.clone().unwrap_or_else(|| settings.snapshots.directory.clone());
            let request = MergeRequest {
                project,
                component,
                edited,
                new,
                identity_map,
                snapshots: &snapshots,
            };
            cmd_merge(&settings, request, *write, *diff).await
        }
        Commands::Print { file } => cmd_print(&settings, file).await,
        Commands::SnapshotCheck { file } => cmd_snapshot_check(file).await,
        Commands::Init => cmd_init(&cli),
    }
}

struct MergeRequest<'a> {
    project: &'a str,
    component: &'a str,
    edited: &'a Path,
    new: &'a Path,
    identity_map: &'a Path,
    snapshots: &'a Path,
}

async fn cmd_merge(settings: &Settings, request: MergeRequest<'_>, write: bool, diff: bool) -> anyhow::Result<()> {
    let options = Arc::new(settings.merge_options()?);

    let edited_file = tokio::fs::read_to_string(request.edited).await?;
    let new_file = tokio::fs::read_to_string(request.new).await?;
    let new_identity_map: HashMap<String, String> =
        serde_json::from_str(&tokio::fs::read_to_string(request.identity_map).await?)?;

    let provider: Arc<dyn SnapshotProvider> =
        Arc::new(CachedSnapshotProvider::new(FsSnapshotProvider::new(request.snapshots)));

    let inputs = BTreeMap::from([(
        request.component.to_string(),
        ComponentInput {
            edited_file: edited_file.clone(),
            new_file,
            new_identity_map,
        },
    )]);

    let Some(mut results) = merge_files(request.project, inputs, provider, options).await else {
        eprintln!(
            "No managed markup in {}; nothing to merge.",
            request.edited.display()
        );
        return Ok(());
    };

    let merged = results
        .remove(request.component)
        .ok_or_else(|| anyhow::anyhow!("no result for component {}", request.component))??;

    for diagnostic in &merged.diagnostics {
        tracing::warn!(component = request.component, "{}", diagnostic);
    }

    if diff {
        let edited_name = request.edited.display().to_string();
        let text_diff = similar::TextDiff::from_lines(&edited_file, &merged.content);
        print!(
            "{}",
            text_diff
                .unified_diff()
                .header(&edited_name, &format!("{edited_name} (merged)"))
        );
    } else if write {
        tokio::fs::write(request.edited, &merged.content).await?;
        println!(
            "Merged {} at revision {}{}",
            request.edited.display(),
            merged.revision,
            if merged.manual_merge { " (manual merge needed)" } else { "" }
        );
    } else {
        print!("{}", merged.content);
    }

    Ok(())
}

async fn cmd_print(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let options = settings.merge_options()?;
    let source = tokio::fs::read_to_string(file).await?;
    let root = parse(&source, options.dialect)?;
    let region = locate_managed_region(&root, &options.managed_jsx_marker)?
        .ok_or_else(|| anyhow::anyhow!("no `{}` marker in {}", options.managed_jsx_marker, file.display()))?;

    let version = CodeVersion::new(region.expression, HashMap::new(), &options.idioms)?;
    println!("{}", print_tree(&version, &options)?);
    Ok(())
}

async fn cmd_snapshot_check(file: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file).await?;
    let snapshot = ProjectSyncMetadataModel::from_json(&content)?;
    let reparsed = ProjectSyncMetadataModel::from_json(&snapshot.to_json()?)?;
    if reparsed != snapshot {
        anyhow::bail!("{} does not round-trip", file.display());
    }

    println!("{}: {} components", file.display(), snapshot.components.len());
    for component in &snapshot.components {
        println!(
            "  {} ({} identities, {} bytes)",
            component.component_uuid,
            component.name_in_id_to_uuid.len(),
            component.file_content.len()
        );
    }
    Ok(())
}

fn cmd_init(cli: &Cli) -> anyhow::Result<()> {
    Settings::write_default(&cli.config)?;
    println!("Configuration saved to {}", cli.config.display());
    Ok(())
}
