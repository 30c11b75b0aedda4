//! Update record collection.
//!
//! Records arrive one per line as `name,value`, exactly as a tuner prints its
//! final parameter values. Collection stops at the first empty line or at end
//! of input, whichever comes first.

use std::collections::BTreeMap;
use std::io::BufRead;

use crate::error::{PatchError, Result};

/// Default prefix the tuner puts in front of every parameter name.
pub const DEFAULT_NAME_PREFIX: &str = "TUNABLE_";

/// Default suffix the tuner appends to every parameter name.
pub const DEFAULT_NAME_SUFFIX: &str = "_FP";

/// The naming convention that maps a raw tuner name to a declaration name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConvention {
    /// Literal prefix removed from raw names.
    pub prefix: String,
    /// Literal suffix removed from raw names.
    pub suffix: String,
}

impl Default for NameConvention {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_NAME_PREFIX.to_string(),
            suffix: DEFAULT_NAME_SUFFIX.to_string(),
        }
    }
}

impl NameConvention {
    /// Create a convention from an explicit prefix and suffix.
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Strip the prefix and suffix from a raw name.
    ///
    /// Either token is only removed when present, so a name that already is
    /// canonical comes back unchanged. Whitespace is kept as part of the name.
    pub fn canonical_name(&self, raw: &str) -> String {
        let mut name = raw;
        if !self.prefix.is_empty() {
            name = name.strip_prefix(self.prefix.as_str()).unwrap_or(name);
        }
        if !self.suffix.is_empty() {
            name = name.strip_suffix(self.suffix.as_str()).unwrap_or(name);
        }
        name.to_string()
    }
}

/// One parsed `name,value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRecord {
    /// Canonical declaration name.
    pub name: String,
    /// Replacement value text, trimmed. Never interpreted.
    pub value: String,
}

impl UpdateRecord {
    /// Parse a single record. `line` must not carry a line terminator.
    pub fn parse(line: &str, line_number: usize, convention: &NameConvention) -> Result<Self> {
        let parts: Vec<&str> = line.split(',').collect();
        let [name, value] = parts.as_slice() else {
            return Err(PatchError::MalformedInput {
                line_number,
                line: line.to_string(),
                parts: parts.len(),
            });
        };

        Ok(Self {
            name: convention.canonical_name(name),
            value: value.trim().to_string(),
        })
    }
}

/// The mapping of canonical names to replacement values for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSet {
    values: BTreeMap<String, String>,
    records_read: usize,
    overwritten: usize,
}

impl UpdateSet {
    /// Create an empty update set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record. A record for an existing name replaces the earlier
    /// value, which is returned.
    pub fn insert(&mut self, record: UpdateRecord) -> Option<String> {
        self.records_read += 1;
        let previous = self.values.insert(record.name, record.value);
        if previous.is_some() {
            self.overwritten += 1;
        }
        previous
    }

    /// Replacement value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of records inserted, duplicates included.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Number of records that replaced an earlier value for the same name.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    /// Iterate over the canonical names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl FromIterator<UpdateRecord> for UpdateSet {
    fn from_iter<I: IntoIterator<Item = UpdateRecord>>(iter: I) -> Self {
        let mut set = UpdateSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

/// Read update records from `reader` until an empty line or end of input.
///
/// The first malformed record aborts collection; nothing collected so far is
/// returned.
pub fn collect_updates<R: BufRead>(mut reader: R, convention: &NameConvention) -> Result<UpdateSet> {
    let mut updates = UpdateSet::new();
    let mut buf = String::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            tracing::debug!("input ended without a blank line after {line_number} record(s)");
            break;
        }
        line_number += 1;

        let line = buf.strip_suffix('\n').unwrap_or(buf.as_str());
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            break;
        }

        let record = UpdateRecord::parse(line, line_number, convention)?;
        tracing::trace!(name = %record.name, value = %record.value, "read update record");
        let name = record.name.clone();
        if let Some(previous) = updates.insert(record) {
            tracing::debug!("{name}: earlier value {previous} replaced by a later record");
        }
    }

    Ok(updates)
}
