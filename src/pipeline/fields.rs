//! Field extraction: map an accepted table row onto a [`Record`].
//!
//! Steps, in order:
//!
//! 1. collect every `DD.MM.YYYY` substring of the line;
//! 2. remove each date once, collapse whitespace gaps and trim, giving the
//!    residual text;
//! 3. cut the residual into tokens;
//! 4. fill the record from a [`ColumnTemplate`] of `(field, slot)` pairs.
//!
//! Tokens normally come from a plain whitespace split. When the
//! date-stripped line still carries enough two-space gaps to supply every
//! token slot of the template, the gap-separated cells are used instead so
//! multi-word values such as a company name stay in one piece.
//!
//! Nothing is validated. Dates may be impossible or out of order and codes
//! may be non-numeric; the values are copied through as printed.

use super::classify::{TableRow, RE_COLUMN_GAP};
use crate::error::ExtractError;
use crate::output::{Field, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{2}\.[0-9]{2}\.[0-9]{4}").unwrap());

/// Where a field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The row's first coarse column.
    Scheme,
    /// The n-th date found in the line (0-based).
    Date(usize),
    /// The n-th residual token (0-based). Token 0 repeats the scheme label.
    Token(usize),
}

/// An ordered list of `(field, slot)` pairs describing one row layout.
///
/// Fields absent from the template stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTemplate {
    columns: Vec<(Field, Slot)>,
}

impl ColumnTemplate {
    /// Build a template, rejecting duplicate fields.
    pub fn new(columns: Vec<(Field, Slot)>) -> Result<Self, ExtractError> {
        let mut seen = HashSet::new();
        for (field, _) in &columns {
            if !seen.insert(*field) {
                return Err(ExtractError::InvalidConfig(format!(
                    "field '{field}' appears more than once in the column template"
                )));
            }
        }
        Ok(Self { columns })
    }

    /// The layout of the *informe de vida laboral* situaciones table.
    pub fn vida_laboral() -> Self {
        Self {
            columns: vec![
                (Field::Regimen, Slot::Scheme),
                (Field::CodigoEmpresa, Slot::Token(1)),
                (Field::Empresa, Slot::Token(2)),
                (Field::FechaAlta, Slot::Date(0)),
                (Field::FechaEfectoAlta, Slot::Date(1)),
                (Field::FechaBaja, Slot::Date(2)),
                (Field::Ct, Slot::Token(3)),
                (Field::CtpPct, Slot::Token(4)),
                (Field::Gc, Slot::Token(5)),
                (Field::Dias, Slot::Token(6)),
            ],
        }
    }

    pub fn columns(&self) -> &[(Field, Slot)] {
        &self.columns
    }

    /// Number of tokens needed to fill every token slot.
    fn token_span(&self) -> usize {
        self.columns
            .iter()
            .filter_map(|(_, slot)| match slot {
                Slot::Token(n) => Some(n + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }
}

impl Default for ColumnTemplate {
    fn default() -> Self {
        Self::vida_laboral()
    }
}

/// All date substrings of `line`, in order of appearance.
pub fn find_dates(line: &str) -> Vec<&str> {
    RE_DATE.find_iter(line).map(|m| m.as_str()).collect()
}

/// Remove the first occurrence of each date, in order.
fn strip_dates(line: &str, dates: &[&str]) -> String {
    dates
        .iter()
        .fold(line.to_string(), |rest, date| rest.replacen(date, "", 1))
}

/// The line with its dates removed, gaps collapsed to one space and trimmed.
pub fn residual(line: &str) -> String {
    let stripped = strip_dates(line, &find_dates(line));
    RE_COLUMN_GAP.replace_all(&stripped, " ").trim().to_string()
}

fn residual_tokens(stripped: &str, span: usize) -> Vec<String> {
    let cells: Vec<&str> = RE_COLUMN_GAP
        .split(stripped)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if cells.len() >= span.max(2) {
        return cells.into_iter().map(str::to_string).collect();
    }

    RE_COLUMN_GAP
        .replace_all(stripped, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Fill a [`Record`] from an accepted row.
pub fn extract_record(row: &TableRow<'_>, template: &ColumnTemplate) -> Record {
    let dates = find_dates(row.line);
    let stripped = strip_dates(row.line, &dates);
    let tokens = residual_tokens(&stripped, template.token_span());

    let mut record = Record::default();
    for &(field, slot) in template.columns() {
        let value = match slot {
            Slot::Scheme => row.scheme(),
            Slot::Date(n) => dates.get(n).copied().unwrap_or_default(),
            Slot::Token(n) => tokens.get(n).map(String::as_str).unwrap_or_default(),
        };
        *record.slot_mut(field) = value.to_string();
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::classify;

    fn record(line: &str) -> Record {
        let row = classify(line).expect("line should classify as a table row");
        extract_record(&row, &ColumnTemplate::vida_laboral())
    }

    #[test]
    fn assigns_dates_in_order() {
        let r = record("GENERAL 001234 ACME 01.02.2020 X 03.04.2021");
        assert_eq!(r.fecha_alta, "01.02.2020");
        assert_eq!(r.fecha_efecto_alta, "03.04.2021");
        assert_eq!(r.fecha_baja, "");
    }

    #[test]
    fn dates_beyond_third_are_ignored() {
        let dates = find_dates("01.01.2001 02.02.2002 03.03.2003 04.04.2004");
        assert_eq!(dates.len(), 4);
        let r = record("GENERAL 01.01.2001 02.02.2002 03.03.2003 04.04.2004");
        assert_eq!(r.fecha_baja, "03.03.2003");
        // The fourth date is still stripped from the residual.
        assert_eq!(r.codigo_empresa, "");
    }

    #[test]
    fn date_pattern_is_strict() {
        assert!(find_dates("1.02.2020 01-02-2020 01.02.20").is_empty());
        assert_eq!(find_dates("x01.02.2020y"), vec!["01.02.2020"]);
    }

    #[test]
    fn full_row_with_column_gaps() {
        let line = "GENERAL   001234   ACME SL   01.01.2020   01.01.2020   31.12.2020   100   50%   1   365";
        let r = record(line);
        assert_eq!(r.regimen, "GENERAL");
        assert_eq!(r.codigo_empresa, "001234");
        assert_eq!(r.empresa, "ACME SL");
        assert_eq!(r.fecha_alta, "01.01.2020");
        assert_eq!(r.fecha_efecto_alta, "01.01.2020");
        assert_eq!(r.fecha_baja, "31.12.2020");
        assert_eq!(r.ct, "100");
        assert_eq!(r.ctp_pct, "50%");
        assert_eq!(r.gc, "1");
        assert_eq!(r.dias, "365");
    }

    #[test]
    fn single_space_row_uses_whitespace_tokens() {
        let line = "GENERAL 001234 ACME 01.01.2020 01.01.2020 31.12.2020 100 50% 1 365";
        let r = record(line);
        // No two-space gap: the whole line is the first coarse column.
        assert_eq!(r.regimen, line);
        assert_eq!(r.codigo_empresa, "001234");
        assert_eq!(r.empresa, "ACME");
        assert_eq!(r.ct, "100");
        assert_eq!(r.ctp_pct, "50%");
        assert_eq!(r.gc, "1");
        assert_eq!(r.dias, "365");
    }

    #[test]
    fn short_row_leaves_missing_fields_empty() {
        let r = record("GENERAL   001234   01.01.2020");
        assert_eq!(r.regimen, "GENERAL");
        assert_eq!(r.codigo_empresa, "001234");
        assert_eq!(r.empresa, "");
        assert_eq!(r.fecha_alta, "01.01.2020");
        assert_eq!(r.fecha_efecto_alta, "");
        assert_eq!(r.dias, "");
    }

    #[test]
    fn too_few_gap_cells_fall_back_to_tokens() {
        // Five cells after date removal: not enough for the template.
        let r = record("GENERAL   0111 28123456789   ACME   01.01.2020   100   50%");
        assert_eq!(r.codigo_empresa, "0111");
        assert_eq!(r.empresa, "28123456789");
        assert_eq!(r.ct, "ACME");
    }

    #[test]
    fn repeated_date_is_removed_twice() {
        assert_eq!(
            residual("GENERAL  01.01.2020  01.01.2020  X"),
            "GENERAL X"
        );
    }

    #[test]
    fn residual_collapses_and_trims() {
        assert_eq!(residual("  RETA   001   01.01.2020  "), "RETA 001");
    }

    #[test]
    fn template_rejects_duplicate_fields() {
        let err = ColumnTemplate::new(vec![
            (Field::Dias, Slot::Token(6)),
            (Field::Dias, Slot::Token(7)),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("dias"));
    }

    #[test]
    fn custom_template_moves_fields() {
        let template = ColumnTemplate::new(vec![
            (Field::Regimen, Slot::Token(0)),
            (Field::Empresa, Slot::Token(1)),
            (Field::FechaBaja, Slot::Date(0)),
        ])
        .unwrap();
        let row = classify("RETA 0111 01.05.2019").unwrap();
        let r = extract_record(&row, &template);
        assert_eq!(r.regimen, "RETA");
        assert_eq!(r.empresa, "0111");
        assert_eq!(r.fecha_baja, "01.05.2019");
        assert_eq!(r.fecha_alta, "");
        assert_eq!(r.codigo_empresa, "");
    }
}
