//! Show command - render one snapshot variable

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use memlens_core::config::{self, InspectorConfig};
use memlens_core::{FormatterRegistry, InspectSession, Snapshot, SnapshotFile};

#[derive(Args)]
pub struct ShowArgs {
    /// Snapshot document (JSON)
    pub snapshot: PathBuf,

    /// Name of the captured variable to render
    pub variable: String,

    /// Levels of children to expand (defaults to the configured depth)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Print the tree as JSON instead of indented text
    #[arg(long)]
    pub json: bool,

    /// Configuration file to use instead of the platform default
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: ShowArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let snapshot = load_snapshot(&args.snapshot)?;

    let value = snapshot.variable(&args.variable).with_context(|| {
        format!(
            "No variable named '{}' in {}",
            args.variable,
            args.snapshot.display()
        )
    })?;

    let session = InspectSession::new(&snapshot, FormatterRegistry::with_defaults(), config.limits);
    let depth = args.depth.unwrap_or(config.display.tree_depth);
    tracing::debug!("rendering '{}' to depth {}", args.variable, depth);

    let tree = session.render_tree(&args.variable, value, depth);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!("{}", tree.to_text());
    }
    Ok(())
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<InspectorConfig> {
    match path {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => Ok(config::load()),
    }
}

pub(crate) fn load_snapshot(path: &Path) -> Result<Snapshot> {
    SnapshotFile::load(path)
        .and_then(SnapshotFile::into_snapshot)
        .with_context(|| format!("Failed to load snapshot: {}", path.display()))
}
