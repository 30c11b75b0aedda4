//! `tunepatch init` — write a manifest template.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::{TunepatchManifest, MANIFEST_FILE};

/// Write a `tunepatch.toml` template into `project_dir`.
pub fn run(project_dir: &Path) -> Result<()> {
    let manifest_path = project_dir.join(MANIFEST_FILE);
    if manifest_path.exists() {
        bail!("'{}' already exists", manifest_path.display());
    }

    let name = project_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("project");
    fs::write(&manifest_path, TunepatchManifest::template(name))
        .with_context(|| format!("writing {}", manifest_path.display()))?;

    println!("Created {}", manifest_path.display());
    let tunables = TunepatchManifest::default().tunables_path(project_dir);
    if !tunables.is_file() {
        println!("  note: {} does not exist yet", tunables.display());
    }
    Ok(())
}
