//! In-memory patching of a tunables file and the single write-back.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::declaration::{Grammar, ParsedLine};
use crate::error::{PatchError, Result};
use crate::input::UpdateSet;
use crate::report::{PatchReport, ValueChange};

/// The tunables file as an ordered line buffer.
///
/// Each line keeps its own terminator (`\n` or `\r\n`, or none for a final
/// unterminated line), so concatenating the lines reproduces the file exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunablesFile {
    lines: Vec<String>,
}

impl TunablesFile {
    /// Split file content into lines.
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    /// Read a tunables file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PatchError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        let file = Self::parse(&content);
        tracing::debug!("read {} line(s) from {}", file.line_count(), path.display());
        Ok(file)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// The full file content.
    pub fn contents(&self) -> String {
        self.lines.concat()
    }

    /// Classify every line against `grammar`.
    pub fn scan(&self, grammar: &Grammar) -> Vec<ParsedLine> {
        grammar.scan(self.lines.iter().map(String::as_str))
    }

    /// Rewrite the value of every declaration named in `updates`.
    ///
    /// Only the argument list of a matched declaration is replaced; everything
    /// else on the line, and every other line, is left as is. Malformed
    /// declarations are never touched.
    pub fn apply(&mut self, updates: &UpdateSet, grammar: &Grammar) -> PatchReport {
        let mut report = PatchReport::new(updates);
        let mut matched = BTreeSet::new();

        for (index, parsed) in self.scan(grammar).into_iter().enumerate() {
            let decl = match parsed {
                ParsedLine::Passthrough => continue,
                ParsedLine::Malformed(err) => {
                    report.skipped.push(err);
                    continue;
                }
                ParsedLine::Declaration(decl) => decl,
            };

            let Some(new_value) = updates.get(decl.name()) else {
                continue;
            };
            matched.insert(decl.name().to_string());

            let old_value = decl.field(grammar.value_index).unwrap_or_default();
            if old_value == new_value {
                tracing::debug!("{}: already {new_value}", decl.name());
                report.unchanged.push(decl.name().to_string());
                continue;
            }

            let args = decl.args_with(grammar.value_index, new_value);
            self.lines[index].replace_range(decl.args.clone(), &args);
            tracing::info!(
                "{} (line {}): {old_value} -> {new_value}",
                decl.name(),
                decl.line_number
            );
            report.changed.push(ValueChange {
                name: decl.name().to_string(),
                line_number: decl.line_number,
                old_value: old_value.to_string(),
                new_value: new_value.to_string(),
            });
        }

        for name in updates.names().filter(|name| !matched.contains(*name)) {
            tracing::warn!("{name}: no matching declaration");
            report.unmatched.push(name.to_string());
        }

        report
    }

    /// Replace the file at `path` with this content.
    ///
    /// The content goes to a temporary file next to `path` which is then
    /// renamed over it, so the target is either fully old or fully new.
    /// A symlinked `path` is resolved first so the file it points to is the
    /// one replaced and the link survives.
    pub fn write(&self, path: &Path) -> Result<()> {
        let write_err = |source: std::io::Error| PatchError::Write {
            path: path.to_path_buf(),
            source,
        };
        let target = match fs::canonicalize(path) {
            Ok(resolved) => resolved,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => path.to_path_buf(),
            Err(err) => return Err(write_err(err)),
        };
        let path = target.as_path();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(self.contents().as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        if let Ok(meta) = fs::metadata(path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(write_err)?;
        }
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        tracing::debug!("wrote {} line(s) to {}", self.line_count(), path.display());
        Ok(())
    }
}

/// Patch the tunables file at `path` in place.
///
/// The file is written once, after every update has been applied in memory,
/// and only when some value actually changed. With `dry_run` set the file is
/// never written.
pub fn patch_file(
    path: &Path,
    updates: &UpdateSet,
    grammar: &Grammar,
    dry_run: bool,
) -> Result<PatchReport> {
    let mut file = TunablesFile::load(path)?;
    let mut report = file.apply(updates, grammar);

    if report.file_modified() && !dry_run {
        file.write(path)?;
        report.written = true;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::UpdateRecord;

    const SAMPLE: &str = "\
// Search parameters
TUNABLE_VALUE(FOO, 10, 5, 1)
TUNABLE_VALUE(LMR_BASE, double, 0.77, 0.5, 1.5)

    TUNABLE_VALUE(RFP_MARGIN, int, 75, 20, 150)  // indented
TUNABLE_VALUE(BROKEN)
";

    fn updates(pairs: &[(&str, &str)]) -> UpdateSet {
        pairs
            .iter()
            .map(|(name, value)| UpdateRecord {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect()
    }

    #[test]
    fn parse_keeps_terminators() {
        let file = TunablesFile::parse("a\r\nb\nc");
        assert_eq!(file.lines(), ["a\r\n", "b\n", "c"]);
        assert_eq!(file.contents(), "a\r\nb\nc");
    }

    #[test]
    fn apply_rewrites_only_value_field() {
        let mut file = TunablesFile::parse(SAMPLE);
        let report = file.apply(&updates(&[("FOO", "7")]), &Grammar::default());

        assert_eq!(file.lines()[1], "TUNABLE_VALUE(FOO, 10, 7, 1)\n");
        assert_eq!(report.changed.len(), 1);
        assert_eq!(report.changed[0].old_value, "5");
        assert_eq!(report.changed[0].line_number, 2);
        assert_eq!(
            file.contents(),
            SAMPLE.replace("(FOO, 10, 5, 1)", "(FOO, 10, 7, 1)")
        );
    }

    #[test]
    fn apply_preserves_indentation_and_trailing_text() {
        let mut file = TunablesFile::parse(SAMPLE);
        file.apply(&updates(&[("RFP_MARGIN", "82")]), &Grammar::default());
        assert_eq!(
            file.lines()[4],
            "    TUNABLE_VALUE(RFP_MARGIN, int, 82, 20, 150)  // indented\n"
        );
    }

    #[test]
    fn apply_reports_unmatched_names() {
        let mut file = TunablesFile::parse(SAMPLE);
        let report = file.apply(&updates(&[("BAR", "3")]), &Grammar::default());
        assert_eq!(report.unmatched, ["BAR"]);
        assert!(!report.file_modified());
        assert_eq!(file.contents(), SAMPLE);
    }

    #[test]
    fn apply_skips_malformed_declarations() {
        let mut file = TunablesFile::parse(SAMPLE);
        let report = file.apply(&updates(&[("BROKEN", "1")]), &Grammar::default());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line_number, 6);
        assert_eq!(report.unmatched, ["BROKEN"]);
        assert_eq!(file.contents(), SAMPLE);
    }

    #[test]
    fn apply_same_value_is_unchanged() {
        let mut file = TunablesFile::parse(SAMPLE);
        let report = file.apply(&updates(&[("FOO", "5")]), &Grammar::default());
        assert_eq!(report.unchanged, ["FOO"]);
        assert!(report.changed.is_empty());
        assert!(report.unmatched.is_empty());
    }

    #[test]
    fn apply_updates_every_declaration_with_the_name() {
        let mut file = TunablesFile::parse("TUNABLE_VALUE(A, int, 1)\nTUNABLE_VALUE(A, int, 2)\n");
        let report = file.apply(&updates(&[("A", "3")]), &Grammar::default());
        assert_eq!(report.changed.len(), 2);
        assert_eq!(file.contents(), "TUNABLE_VALUE(A, int, 3)\nTUNABLE_VALUE(A, int, 3)\n");
    }

    #[test]
    fn apply_handles_values_of_different_length() {
        let mut file = TunablesFile::parse("TUNABLE_VALUE(X, double, 1.0, 0.0, 2.0)\n");
        file.apply(&updates(&[("X", "1.23456")]), &Grammar::default());
        assert_eq!(file.contents(), "TUNABLE_VALUE(X, double, 1.23456, 0.0, 2.0)\n");
    }

    #[test]
    fn write_replaces_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunablevalues.def");
        fs::write(&path, "old\n").unwrap();

        TunablesFile::parse("new\r\nlines").write(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\r\nlines");
    }

    #[cfg(unix)]
    #[test]
    fn write_goes_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.def");
        let link = dir.path().join("tunablevalues.def");
        fs::write(&real, "TUNABLE_VALUE(FOO, 10, 5, 1)\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let report = patch_file(&link, &updates(&[("FOO", "7")]), &Grammar::default(), false).unwrap();
        assert!(report.written);
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "TUNABLE_VALUE(FOO, 10, 7, 1)\n");
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = TunablesFile::load(&dir.path().join("missing.def")).unwrap_err();
        assert!(matches!(err, PatchError::NotFound { .. }));
    }

    #[test]
    fn patch_file_dry_run_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunablevalues.def");
        fs::write(&path, SAMPLE).unwrap();

        let report = patch_file(&path, &updates(&[("FOO", "7")]), &Grammar::default(), true).unwrap();
        assert!(report.file_modified());
        assert!(!report.written);
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[test]
    fn patch_file_writes_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tunablevalues.def");
        fs::write(&path, SAMPLE).unwrap();

        let report = patch_file(&path, &updates(&[("FOO", "7")]), &Grammar::default(), false).unwrap();
        assert!(report.written);
        assert!(fs::read_to_string(&path)
            .unwrap()
            .contains("TUNABLE_VALUE(FOO, 10, 7, 1)\n"));
    }
}
