//! `tunepatch apply` — patch the tunables file with tuner output.

use std::io::BufRead;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tunepatch_core::{collect_updates, patch_file, PatchReport};

use crate::manifest::TunepatchManifest;

/// Read update records from `input` and apply them to the project's tunables
/// file, then print the report.
pub fn run<R: BufRead>(
    project_dir: &Path,
    manifest: &TunepatchManifest,
    input: R,
    dry_run: bool,
    report_format: Option<&str>,
) -> Result<PatchReport> {
    if let Some(format) = report_format {
        if !matches!(format, "human" | "json") {
            bail!("unknown report format '{format}' (expected human or json)");
        }
    }

    let updates = collect_updates(input, &manifest.convention()).context("reading tuner output")?;
    tracing::info!(
        "collected {} update(s) from {} record(s)",
        updates.len(),
        updates.records_read()
    );

    let path = manifest.tunables_path(project_dir);
    let report = patch_file(&path, &updates, &manifest.grammar(), dry_run)
        .with_context(|| format!("patching {}", path.display()))?;

    match report_format {
        Some("json") => println!("{}", report.to_json()?),
        _ => {
            println!("--- {} ---", path.display());
            print!("{report}");
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TUNABLES: &str = "TUNABLE_VALUE(FOO, 10, 5, 1)\nTUNABLE_VALUE(BAR, int, 3, 0, 9)\n";

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("illumina")).unwrap();
        fs::write(dir.path().join("illumina/tunablevalues.def"), TUNABLES).unwrap();
        dir
    }

    fn read(dir: &tempfile::TempDir) -> String {
        fs::read_to_string(dir.path().join("illumina/tunablevalues.def")).unwrap()
    }

    #[test]
    fn apply_patches_default_location() {
        let dir = project();
        let manifest = TunepatchManifest::default();

        let report = run(dir.path(), &manifest, "TUNABLE_FOO_FP,7\n\n".as_bytes(), false, None).unwrap();
        assert!(report.written);
        assert_eq!(
            read(&dir),
            "TUNABLE_VALUE(FOO, 10, 7, 1)\nTUNABLE_VALUE(BAR, int, 3, 0, 9)\n"
        );
    }

    #[test]
    fn apply_dry_run_does_not_write() {
        let dir = project();
        let manifest = TunepatchManifest::default();

        let report = run(dir.path(), &manifest, "TUNABLE_FOO_FP,7\n\n".as_bytes(), true, Some("json")).unwrap();
        assert!(report.file_modified());
        assert!(!report.written);
        assert_eq!(read(&dir), TUNABLES);
    }

    #[test]
    fn apply_rejects_malformed_input_without_writing() {
        let dir = project();
        let manifest = TunepatchManifest::default();

        let err = run(dir.path(), &manifest, "TUNABLE_FOO_FP,7\nfoo,bar,baz\n\n".as_bytes(), false, None)
            .unwrap_err();
        assert!(format!("{err:#}").contains("malformed input on line 2"));
        assert_eq!(read(&dir), TUNABLES);
    }

    #[test]
    fn apply_rejects_unknown_report_format() {
        let dir = project();
        let manifest = TunepatchManifest::default();

        let err = run(dir.path(), &manifest, "\n".as_bytes(), false, Some("xml")).unwrap_err();
        assert!(err.to_string().contains("unknown report format"));
    }

    #[test]
    fn apply_missing_tunables_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = TunepatchManifest::default();

        let err = run(dir.path(), &manifest, "TUNABLE_FOO_FP,7\n\n".as_bytes(), false, None).unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }
}
