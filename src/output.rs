//! Output types: extracted records plus per-run statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One employment-period entry ("situación") of the history table.
///
/// Every field is a plain string and defaults to `""` when the source row
/// is too short to supply it. Values are copied verbatim from the page;
/// nothing is parsed or checked.
///
/// Serialises with camelCase keys in declaration order:
/// `regimen, codigoEmpresa, empresa, fechaAlta, fechaEfectoAlta, fechaBaja,
/// ct, ctpPct, gc, dias`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub regimen: String,
    pub codigo_empresa: String,
    pub empresa: String,
    pub fecha_alta: String,
    pub fecha_efecto_alta: String,
    pub fecha_baja: String,
    pub ct: String,
    pub ctp_pct: String,
    pub gc: String,
    pub dias: String,
}

impl Record {
    /// Mutable access to the slot for `field`.
    pub(crate) fn slot_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Regimen => &mut self.regimen,
            Field::CodigoEmpresa => &mut self.codigo_empresa,
            Field::Empresa => &mut self.empresa,
            Field::FechaAlta => &mut self.fecha_alta,
            Field::FechaEfectoAlta => &mut self.fecha_efecto_alta,
            Field::FechaBaja => &mut self.fecha_baja,
            Field::Ct => &mut self.ct,
            Field::CtpPct => &mut self.ctp_pct,
            Field::Gc => &mut self.gc,
            Field::Dias => &mut self.dias,
        }
    }

    /// Read the value of `field`.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Regimen => &self.regimen,
            Field::CodigoEmpresa => &self.codigo_empresa,
            Field::Empresa => &self.empresa,
            Field::FechaAlta => &self.fecha_alta,
            Field::FechaEfectoAlta => &self.fecha_efecto_alta,
            Field::FechaBaja => &self.fecha_baja,
            Field::Ct => &self.ct,
            Field::CtpPct => &self.ctp_pct,
            Field::Gc => &self.gc,
            Field::Dias => &self.dias,
        }
    }
}

/// Names of the [`Record`] fields, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Regimen,
    CodigoEmpresa,
    Empresa,
    FechaAlta,
    FechaEfectoAlta,
    FechaBaja,
    Ct,
    CtpPct,
    Gc,
    Dias,
}

impl Field {
    /// All fields in output order.
    #[cfg(test)]
    pub(crate) const ALL: [Field; 10] = [
        Field::Regimen,
        Field::CodigoEmpresa,
        Field::Empresa,
        Field::FechaAlta,
        Field::FechaEfectoAlta,
        Field::FechaBaja,
        Field::Ct,
        Field::CtpPct,
        Field::Gc,
        Field::Dias,
    ];

    /// The JSON key used for this field.
    pub fn key(self) -> &'static str {
        match self {
            Field::Regimen => "regimen",
            Field::CodigoEmpresa => "codigoEmpresa",
            Field::Empresa => "empresa",
            Field::FechaAlta => "fechaAlta",
            Field::FechaEfectoAlta => "fechaEfectoAlta",
            Field::FechaBaja => "fechaBaja",
            Field::Ct => "ct",
            Field::CtpPct => "ctpPct",
            Field::Gc => "gc",
            Field::Dias => "dias",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How the collection wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionOutcome {
    /// The producer signalled end-of-stream before the deadline.
    #[default]
    Completed,
    /// The deadline fired first; records reflect a partial fragment set.
    TimedOut,
}

/// Counters and timings for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Fragments inserted into the coordinate index.
    pub fragments_accepted: usize,
    /// Fragments dropped for missing coordinates or text.
    pub fragments_dropped: usize,
    /// Accepted fragments that replaced an earlier one at the same position.
    pub fragments_overwritten: usize,
    /// Producer events that were not fragments (page markers etc.).
    pub events_ignored: usize,
    /// Lines produced by the row assembler.
    pub lines_assembled: usize,
    /// Lines accepted as table rows; equals the number of records.
    pub rows_accepted: usize,
    /// Whether collection completed or timed out.
    pub outcome: CollectionOutcome,
    /// Wall-clock time spent waiting for fragments.
    pub collection_duration_ms: u64,
    /// Wall-clock time for the whole run.
    pub total_duration_ms: u64,
}

/// The result of an extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Records in visual document order.
    pub records: Vec<Record>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// Pretty-printed JSON array of the records, two-space indented.
    pub fn records_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }

    /// `true` when collection hit the deadline before end-of-stream.
    pub fn is_partial(&self) -> bool {
        self.stats.outcome == CollectionOutcome::TimedOut
    }
}
