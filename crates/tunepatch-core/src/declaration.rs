//! Tunable declaration parsing.
//!
//! A declaration is a single line of the form
//!
//! ```text
//! TUNABLE_VALUE(name, type, value, ...)
//! ```
//!
//! The argument list is the text between the first `(` and the last `)` on the
//! line, split on `", "`. Field 0 is the name and field 2 the value; all other
//! fields are opaque. The format carries these constraints, which are not
//! checked:
//!
//! - one declaration per line, never wrapped across lines
//! - no `(`, `)` or `", "` inside any field
//! - nothing after the closing `)` that itself contains a `)`

use std::ops::Range;

use serde::Serialize;

/// Default call-like marker that opens a declaration.
pub const DEFAULT_MARKER: &str = "TUNABLE_VALUE";

/// Default position of the value among the declaration fields.
pub const DEFAULT_VALUE_INDEX: usize = 2;

/// Separator between declaration fields.
pub const FIELD_SEPARATOR: &str = ", ";

/// A line that starts like a declaration but does not follow the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("line {line_number}: malformed declaration: {reason}")]
pub struct DeclarationParseError {
    /// 1-based line number in the tunables file.
    pub line_number: usize,
    /// What is wrong with the line.
    pub reason: String,
}

/// A parsed declaration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// 1-based line number in the tunables file.
    pub line_number: usize,
    /// Byte range of the argument list within the raw line.
    pub args: Range<usize>,
    /// The argument list split into fields.
    pub fields: Vec<String>,
}

impl Declaration {
    /// The declaration name (field 0).
    pub fn name(&self) -> &str {
        &self.fields[0]
    }

    /// The field at `index`, if present.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Rebuild the argument list with the field at `index` replaced by `value`.
    pub fn args_with(&self, index: usize, value: &str) -> String {
        self.fields
            .iter()
            .enumerate()
            .map(|(i, field)| if i == index { value } else { field.as_str() })
            .collect::<Vec<_>>()
            .join(FIELD_SEPARATOR)
    }
}

/// Classification of one line of the tunables file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Not a declaration; copied through untouched.
    Passthrough,
    /// A well-formed declaration.
    Declaration(Declaration),
    /// Looked like a declaration but did not parse. Copied through untouched.
    Malformed(DeclarationParseError),
}

/// The declaration grammar: which marker opens a declaration and where the
/// value sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    /// Marker text immediately followed by `(`.
    pub marker: String,
    /// Index of the value field.
    pub value_index: usize,
}

impl Default for Grammar {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            value_index: DEFAULT_VALUE_INDEX,
        }
    }
}

impl Grammar {
    /// Create a grammar with a custom marker and value position.
    pub fn new(marker: impl Into<String>, value_index: usize) -> Self {
        Self {
            marker: marker.into(),
            value_index,
        }
    }

    /// Whether the trimmed line starts with `MARKER(`.
    pub fn is_candidate(&self, line: &str) -> bool {
        line.trim()
            .strip_prefix(self.marker.as_str())
            .is_some_and(|rest| rest.starts_with('('))
    }

    /// Parse a candidate line into a declaration.
    ///
    /// `line` is the raw line, terminator included; the returned argument
    /// range indexes into it.
    pub fn parse_declaration(
        &self,
        line: &str,
        line_number: usize,
    ) -> Result<Declaration, DeclarationParseError> {
        let malformed = |reason: String| DeclarationParseError {
            line_number,
            reason,
        };

        let open = line
            .find('(')
            .ok_or_else(|| malformed("missing '('".to_string()))?;
        let close = line
            .rfind(')')
            .filter(|&close| close > open)
            .ok_or_else(|| malformed("missing ')'".to_string()))?;

        let args = open + 1..close;
        let text = &line[args.clone()];

        let commas = text.matches(',').count();
        if commas < 2 {
            return Err(malformed(format!(
                "expected at least 3 comma-separated fields, found {}",
                commas + 1
            )));
        }

        let fields: Vec<String> = text.split(FIELD_SEPARATOR).map(str::to_string).collect();
        if fields.len() <= self.value_index {
            return Err(malformed(format!(
                "expected fields separated by {FIELD_SEPARATOR:?} with a value at index {}, found {} field(s)",
                self.value_index,
                fields.len()
            )));
        }
        if fields[0].trim().is_empty() {
            return Err(malformed("empty name".to_string()));
        }

        Ok(Declaration {
            line_number,
            args,
            fields,
        })
    }

    /// Classify a raw line.
    pub fn classify(&self, line: &str, line_number: usize) -> ParsedLine {
        if !self.is_candidate(line) {
            return ParsedLine::Passthrough;
        }
        match self.parse_declaration(line, line_number) {
            Ok(decl) => ParsedLine::Declaration(decl),
            Err(err) => {
                tracing::warn!("{err}; leaving the line unchanged");
                ParsedLine::Malformed(err)
            }
        }
    }

    /// Classify every line, in order. Line numbers are 1-based.
    pub fn scan<'a, I>(&self, lines: I) -> Vec<ParsedLine>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| self.classify(line, i + 1))
            .collect()
    }
}
