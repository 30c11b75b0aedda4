//! Patch report with per-name outcomes.

use std::fmt;

use serde::Serialize;

use crate::declaration::DeclarationParseError;
use crate::error::Result;
use crate::input::UpdateSet;

/// A value that was rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueChange {
    pub name: String,
    pub line_number: usize,
    pub old_value: String,
    pub new_value: String,
}

/// Outcome of applying an update set to a tunables file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    /// Records read from input, duplicates included.
    pub records_read: usize,
    /// Records that replaced an earlier record for the same name.
    pub overwritten_records: usize,
    /// Declarations whose value was rewritten.
    pub changed: Vec<ValueChange>,
    /// Matched declarations that already held the requested value.
    pub unchanged: Vec<String>,
    /// Update names with no declaration in the file.
    pub unmatched: Vec<String>,
    /// Declaration candidates that did not parse and were left alone.
    pub skipped: Vec<DeclarationParseError>,
    /// Whether the patched content was written back.
    pub written: bool,
}

impl PatchReport {
    /// Start a report for `updates`.
    pub fn new(updates: &UpdateSet) -> Self {
        Self {
            records_read: updates.records_read(),
            overwritten_records: updates.overwritten(),
            ..Self::default()
        }
    }

    /// Whether any line of the file differs after patching.
    pub fn file_modified(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Records: {} | Changed: {} | Unchanged: {} | Unmatched: {} | Skipped: {}",
            self.records_read,
            self.changed.len(),
            self.unchanged.len(),
            self.unmatched.len(),
            self.skipped.len(),
        )?;

        for change in &self.changed {
            writeln!(
                f,
                "  {} (line {}): {} -> {}",
                change.name, change.line_number, change.old_value, change.new_value
            )?;
        }
        if !self.unmatched.is_empty() {
            writeln!(f, "--- No matching declaration ---")?;
            for name in &self.unmatched {
                writeln!(f, "  {name}")?;
            }
        }
        if !self.skipped.is_empty() {
            writeln!(f, "--- Skipped malformed declarations ---")?;
            for err in &self.skipped {
                writeln!(f, "  line {}: {}", err.line_number, err.reason)?;
            }
        }
        if self.overwritten_records > 0 {
            writeln!(
                f,
                "{} record(s) were overridden by a later record for the same name",
                self.overwritten_records
            )?;
        }
        if !self.written && self.file_modified() {
            writeln!(f, "Dry run: file not written.")?;
        }
        Ok(())
    }
}
