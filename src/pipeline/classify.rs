//! Row classification: keep only lines that belong to the situaciones table.
//!
//! A line is cut into coarse columns wherever two or more whitespace
//! characters meet. Table rows are those whose first column opens with a
//! contribution-scheme label; headers, titles, footers and blank lines fall
//! through.

use once_cell::sync::Lazy;
use regex::Regex;

/// Runs of two or more whitespace characters separate coarse columns.
pub(crate) static RE_COLUMN_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// General, special and self-employment scheme labels.
static RE_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:GENERAL|ESPECIAL|AUT[ÓO]NOMOS|RETA)").unwrap());

/// A line accepted as a table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow<'a> {
    /// The full line.
    pub line: &'a str,
    /// Coarse columns, each trimmed. Never empty.
    pub columns: Vec<&'a str>,
}

impl<'a> TableRow<'a> {
    /// The first coarse column: the scheme label as printed.
    pub fn scheme(&self) -> &'a str {
        self.columns[0]
    }
}

/// Split `line` into trimmed coarse columns.
pub fn coarse_columns(line: &str) -> Vec<&str> {
    RE_COLUMN_GAP.split(line).map(str::trim).collect()
}

/// `true` if `column` opens with a known scheme label.
pub fn is_scheme_label(column: &str) -> bool {
    RE_SCHEME.is_match(column)
}

/// Accept `line` as a table row, or reject it.
pub fn classify(line: &str) -> Option<TableRow<'_>> {
    let columns = coarse_columns(line);
    if columns.first().is_some_and(|first| is_scheme_label(first)) {
        Some(TableRow { line, columns })
    } else {
        None
    }
}
