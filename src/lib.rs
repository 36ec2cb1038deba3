//! # situaciones
//!
//! Rebuild the employment-history table ("situaciones") of a Spanish
//! *informe de vida laboral* from the positioned text a PDF layout engine
//! reports.
//!
//! The engine hands over an unordered bag of `(page, x, y, text)`
//! fragments. This crate puts them back into visual rows, keeps the rows
//! that belong to the table and maps each one onto a [`Record`].
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Engine    pdfium text segments → fragments (spawn_blocking)
//!  ├─ 3. Collect   page → y → x index, until end-of-stream or timeout
//!  ├─ 4. Assemble  one line per (page, y), fragments joined by x
//!  ├─ 5. Classify  keep lines whose first column is a scheme label
//!  └─ 6. Extract   dates + residual tokens → Record via a column template
//! ```
//!
//! The optional [`report`] module works on the finished records: it
//! counts vacation days that no contract period covers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use situaciones::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let output = extract("vida_laboral.pdf", &ExtractionConfig::default()).await?;
//!     println!("{}", output.records_json()?);
//!     if output.is_partial() {
//!         eprintln!("warning: layout engine timed out, records may be incomplete");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Bring your own engine
//!
//! Anything that can report positioned text implements
//! [`FragmentSource`]; [`extract_from_source`] runs the same pipeline over
//! it.
//!
//! ```rust
//! use situaciones::{extract_from_source, ExtractionConfig, Fragment, MemorySource};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), situaciones::ExtractError> {
//! let source = MemorySource::new(vec![
//!     Fragment::new(1, 40.0, 300.0, "GENERAL  "),
//!     Fragment::new(1, 90.0, 300.0, "0111  "),
//!     Fragment::new(1, 130.0, 300.0, "01.03.2019"),
//! ]);
//! let output = extract_from_source(source, &ExtractionConfig::default()).await?;
//! assert_eq!(output.records[0].codigo_empresa, "0111");
//! assert_eq!(output.records[0].fecha_alta, "01.03.2019");
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `situaciones` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageSelection};
pub use error::ExtractError;
pub use extract::{
    extract, extract_from_bytes, extract_from_source, extract_lines, extract_sync,
    extract_to_file, records_from_lines, write_records,
};
pub use output::{CollectionOutcome, ExtractionOutput, ExtractionStats, Field, Record};
pub use pipeline::assemble::Line;
pub use pipeline::fields::{ColumnTemplate, Slot};
pub use pipeline::pdfium::PdfiumSource;
pub use pipeline::source::{Fragment, FragmentSink, FragmentSource, MemorySource};
pub use report::{ReportRules, VacationReport};
