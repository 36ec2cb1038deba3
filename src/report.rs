//! Vacation report over extracted records.
//!
//! Paid leave that was not taken ("vacaciones retribuidas y no disfrutadas")
//! shows up in the informe as its own situaciones, alongside the contract
//! periods. The report lists both kinds of period with their dates in
//! `DD/MM/YYYY` form and counts the vacation days that no contract covers.
//!
//! The report only reads records. The record list returned by the
//! extractor is never filtered or reordered.
//!
//! ```rust
//! use chrono::NaiveDate;
//! use situaciones::report::{ReportRules, VacationReport};
//! use situaciones::Record;
//!
//! let records = vec![
//!     Record {
//!         empresa: "VACACIONES RETRIBUIDAS Y NO DISFRUTADAS".into(),
//!         fecha_alta: "01.01.2020".into(),
//!         fecha_baja: "10.01.2020".into(),
//!         ..Record::default()
//!     },
//!     Record {
//!         empresa: "SERVICIO DE SALUD DEL PRINCIPADO".into(),
//!         fecha_alta: "06.01.2020".into(),
//!         fecha_baja: "20.01.2020".into(),
//!         ..Record::default()
//!     },
//! ];
//! let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let report = VacationReport::as_of(&records, &ReportRules::default(), today);
//! assert_eq!(report.total_non_overlapping_vacation_days, 5);
//! ```

use crate::error::ExtractError;
use crate::output::{Field, Record};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Date layout of the informe (`31.12.2020`).
pub const RECORD_DATE_FORMAT: &str = "%d.%m.%Y";

/// Date layout of the report (`31/12/2020`).
pub const REPORT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Employer prefix of vacation rows.
pub const DEFAULT_VACATION_PREFIX: &str = "VACACIONES RETRIBUIDAS Y NO";

/// Employer prefix of the contract rows vacations are checked against.
pub const DEFAULT_CONTRACT_PREFIX: &str = "SERVICIO DE SALUD DEL PRINCIPADO";

/// Parse a record date (`DD.MM.YYYY`).
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), RECORD_DATE_FORMAT).ok()
}

/// Rewrite a record date as `DD/MM/YYYY`, or `""` when it is not a date.
pub fn format_date(value: &str) -> String {
    parse_record_date(value)
        .map(|d| d.format(REPORT_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

fn parse_report_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, REPORT_DATE_FORMAT).ok()
}

// ── Rules ────────────────────────────────────────────────────────────────────

/// Which records feed the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRules {
    /// Records whose employer starts with this are vacation periods.
    pub vacation_prefix: String,
    /// Records whose employer starts with this are contract periods.
    pub contract_prefix: String,
    /// Keep only records whose start date parses and is before this day.
    pub alta_before: Option<NaiveDate>,
}

impl Default for ReportRules {
    fn default() -> Self {
        Self {
            vacation_prefix: DEFAULT_VACATION_PREFIX.to_string(),
            contract_prefix: DEFAULT_CONTRACT_PREFIX.to_string(),
            alta_before: None,
        }
    }
}

impl ReportRules {
    pub fn contract_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.contract_prefix = prefix.into();
        self
    }

    pub fn alta_before(mut self, cutoff: Option<NaiveDate>) -> Self {
        self.alta_before = cutoff;
        self
    }

    /// Select and classify the periods the report works on, in record order.
    pub fn periods(&self, records: &[Record]) -> Vec<Period> {
        records
            .iter()
            .filter(|r| match self.alta_before {
                Some(cutoff) => {
                    parse_record_date(r.get(Field::FechaAlta)).is_some_and(|d| d < cutoff)
                }
                None => true,
            })
            .filter_map(|r| {
                let empresa = r.get(Field::Empresa);
                let is_vacaciones = if empresa.starts_with(&self.vacation_prefix) {
                    true
                } else if empresa.starts_with(&self.contract_prefix) {
                    false
                } else {
                    return None;
                };
                Some(Period {
                    is_vacaciones,
                    fecha_alta: format_date(r.get(Field::FechaAlta)),
                    fecha_baja: format_date(r.get(Field::FechaBaja)),
                })
            })
            .collect()
    }
}

// ── Report types ─────────────────────────────────────────────────────────────

/// A vacation or contract period, dates as `DD/MM/YYYY` or `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub is_vacaciones: bool,
    pub fecha_alta: String,
    pub fecha_baja: String,
}

/// A run of vacation days no contract covers, both ends inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start: String,
    pub end: String,
    pub days: i64,
}

impl Segment {
    fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.format(REPORT_DATE_FORMAT).to_string(),
            end: end.format(REPORT_DATE_FORMAT).to_string(),
            days: (end - start).num_days() + 1,
        }
    }
}

/// The report as written out: periods, total and uncovered segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationReport {
    pub data: Vec<Period>,
    pub total_non_overlapping_vacation_days: i64,
    pub non_overlapping_vacation_periods: Vec<Segment>,
}

impl VacationReport {
    /// Build the report; open-ended contracts run until today.
    pub fn new(records: &[Record], rules: &ReportRules) -> Self {
        Self::as_of(records, rules, Local::now().date_naive())
    }

    /// Build the report with open-ended contracts running until `today`.
    pub fn as_of(records: &[Record], rules: &ReportRules, today: NaiveDate) -> Self {
        let data = rules.periods(records);
        let segments = non_overlapping_segments(&data, today);
        let total = segments.iter().map(|s| s.days).sum();
        debug!(
            "Vacation report: {} periods, {} uncovered segments, {} days",
            data.len(),
            segments.len(),
            total
        );
        Self {
            data,
            total_non_overlapping_vacation_days: total,
            non_overlapping_vacation_periods: segments,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ExtractError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON to `path`, atomically.
    pub async fn write(&self, path: &Path) -> Result<(), ExtractError> {
        let mut json = self.to_json()?;
        json.push('\n');
        crate::extract::write_atomic(path, json).await
    }
}

// ── Overlap arithmetic ───────────────────────────────────────────────────────

/// Vacation days not covered by any contract period.
///
/// Vacations without two valid dates, or ending before they start, are
/// skipped. Contracts need a valid start; an empty end means still open and
/// runs until `today`, an unreadable end skips the contract.
pub fn non_overlapping_segments(periods: &[Period], today: NaiveDate) -> Vec<Segment> {
    let contracts: Vec<(NaiveDate, NaiveDate)> = periods
        .iter()
        .filter(|p| !p.is_vacaciones)
        .filter_map(|p| {
            let start = parse_report_date(&p.fecha_alta)?;
            let end = if p.fecha_baja.is_empty() {
                today
            } else {
                parse_report_date(&p.fecha_baja)?
            };
            Some((start, end))
        })
        .collect();

    let mut segments = Vec::new();
    for vacation in periods.iter().filter(|p| p.is_vacaciones) {
        let (Some(start), Some(end)) = (
            parse_report_date(&vacation.fecha_alta),
            parse_report_date(&vacation.fecha_baja),
        ) else {
            continue;
        };
        if end < start {
            continue;
        }

        let mut overlaps: Vec<(NaiveDate, NaiveDate)> = contracts
            .iter()
            .filter(|(c_start, c_end)| start <= *c_end && end >= *c_start)
            .map(|(c_start, c_end)| (start.max(*c_start), end.min(*c_end)))
            .collect();
        overlaps.sort_unstable();

        let mut cursor = Some(start);
        for (o_start, o_end) in merge(overlaps) {
            let Some(from) = cursor else { break };
            if from < o_start {
                if let Some(to) = o_start.pred_opt() {
                    segments.push(Segment::new(from, to));
                }
            }
            cursor = o_end.succ_opt();
        }
        if let Some(from) = cursor.filter(|from| *from <= end) {
            segments.push(Segment::new(from, end));
        }
    }
    segments
}

/// Merge sorted intervals that share at least one day.
fn merge(sorted: Vec<(NaiveDate, NaiveDate)>) -> Vec<(NaiveDate, NaiveDate)> {
    let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::with_capacity(sorted.len());
    for (start, end) in sorted {
        match merged.last_mut() {
            Some(last) if last.1 >= start => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}
