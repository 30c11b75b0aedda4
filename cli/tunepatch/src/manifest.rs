//! `tunepatch.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tunepatch_core::declaration::{DEFAULT_MARKER, DEFAULT_VALUE_INDEX};
use tunepatch_core::input::{DEFAULT_NAME_PREFIX, DEFAULT_NAME_SUFFIX};
use tunepatch_core::{Grammar, NameConvention};

/// File name searched for when locating the project root.
pub const MANIFEST_FILE: &str = "tunepatch.toml";

/// Tunables file used when no manifest overrides it.
pub const DEFAULT_TUNABLES_PATH: &str = "illumina/tunablevalues.def";

/// The top-level manifest structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunepatchManifest {
    /// Project metadata.
    #[serde(default)]
    pub project: ProjectConfig,
    /// Where the tunables live and how they are written.
    #[serde(default)]
    pub tunables: TunablesConfig,
}

/// Project metadata section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<String>,
}

/// Tunables section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TunablesConfig {
    /// Tunables file, relative to the project root.
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Marker that opens a declaration.
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Prefix the tuner adds to names.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Suffix the tuner adds to names.
    #[serde(default = "default_name_suffix")]
    pub name_suffix: String,
    /// Position of the value among the declaration fields.
    #[serde(default = "default_value_index")]
    pub value_index: usize,
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_TUNABLES_PATH)
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

fn default_name_prefix() -> String {
    DEFAULT_NAME_PREFIX.to_string()
}

fn default_name_suffix() -> String {
    DEFAULT_NAME_SUFFIX.to_string()
}

fn default_value_index() -> usize {
    DEFAULT_VALUE_INDEX
}

impl Default for TunablesConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            marker: default_marker(),
            name_prefix: default_name_prefix(),
            name_suffix: default_name_suffix(),
            value_index: default_value_index(),
        }
    }
}

impl TunepatchManifest {
    /// Search upward from `start_dir` for a `tunepatch.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: TunepatchManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                manifest
                    .validate()
                    .with_context(|| format!("validating {}", candidate.display()))?;
                tracing::debug!(
                    project = manifest.project.name.as_deref().unwrap_or("-"),
                    "using manifest {}",
                    candidate.display()
                );
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(s).context("parsing tunepatch.toml")?;
        manifest.validate().context("validating tunepatch.toml")?;
        Ok(manifest)
    }

    /// Check settings that would let a patch touch more than the value field.
    pub fn validate(&self) -> Result<()> {
        if self.tunables.value_index == 0 {
            bail!("tunables.value-index must be at least 1; field 0 is the declaration name");
        }
        if self.tunables.marker.trim().is_empty() {
            bail!("tunables.marker must not be empty");
        }
        Ok(())
    }

    /// Absolute location of the tunables file for a project rooted at
    /// `project_dir`.
    pub fn tunables_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.tunables.path)
    }

    /// The declaration grammar described by this manifest.
    pub fn grammar(&self) -> Grammar {
        Grammar::new(self.tunables.marker.clone(), self.tunables.value_index)
    }

    /// The tuner naming convention described by this manifest.
    pub fn convention(&self) -> NameConvention {
        NameConvention::new(
            self.tunables.name_prefix.clone(),
            self.tunables.name_suffix.clone(),
        )
    }

    /// Generate the default template for `tunepatch init`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"

[tunables]
path = "{DEFAULT_TUNABLES_PATH}"
marker = "{DEFAULT_MARKER}"
name-prefix = "{DEFAULT_NAME_PREFIX}"
name-suffix = "{DEFAULT_NAME_SUFFIX}"
value-index = {DEFAULT_VALUE_INDEX}
"#
        )
    }
}

/// Load the manifest for `cwd`, falling back to defaults rooted at `cwd`.
pub fn load_or_default(cwd: &Path) -> Result<(TunepatchManifest, PathBuf)> {
    match TunepatchManifest::find_and_load(cwd)? {
        Some(found) => Ok(found),
        None => {
            tracing::debug!("no {MANIFEST_FILE} found, using defaults");
            Ok((TunepatchManifest::default(), cwd.to_path_buf()))
        }
    }
}
