//! Extraction entry points.
//!
//! Every entry point funnels into [`extract_from_source`], which runs the
//! stages in a fixed order:
//!
//! ```text
//! Collecting ──▶ Assembling ──▶ Classifying ──▶ Extracting ──▶ Done
//!  (async,        (sync, from here on)
//!   end-of-stream or timeout)
//! ```
//!
//! The coordinate index is created inside the call and dropped at its end,
//! so two runs never share state.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{ExtractionOutput, ExtractionStats, Record};
use crate::pipeline::assemble::{self, Line};
use crate::pipeline::classify;
use crate::pipeline::collect::{self, Collected};
use crate::pipeline::fields::{self, ColumnTemplate};
use crate::pipeline::input;
use crate::pipeline::pdfium::PdfiumSource;
use crate::pipeline::source::FragmentSource;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Extract the situaciones table from a PDF file or URL.
///
/// # Errors
/// Returns `Err(ExtractError)` only for fatal errors: unreadable input, a
/// document pdfium cannot open, or a terminal engine error. A collection
/// timeout is not an error; see [`ExtractionOutput::is_partial`].
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    extract_from_source(pdfium_source(resolved.path(), config), config).await
}

/// Run the pipeline over fragments from any [`FragmentSource`].
pub async fn extract_from_source(
    source: impl FragmentSource,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();

    // ── Collecting ───────────────────────────────────────────────────────
    let collected = collect::collect(Box::new(source), config.collection_timeout()).await?;

    // ── Assembling ───────────────────────────────────────────────────────
    let lines = assemble::assemble(&collected.index);
    debug!("Assembled {} lines", lines.len());

    // ── Classifying + Extracting ─────────────────────────────────────────
    let records = records_from_lines(&lines, &config.template);

    let stats = stats_for(&collected, lines.len(), records.len(), total_start);
    info!(
        "Extraction complete: {} records from {} lines, {}ms total",
        stats.rows_accepted, stats.lines_assembled, stats.total_duration_ms
    );

    Ok(ExtractionOutput { records, stats })
}

/// Classify `lines` and extract one record per accepted line, in order.
pub fn records_from_lines(lines: &[Line], template: &ColumnTemplate) -> Vec<Record> {
    let records: Vec<Record> = lines
        .iter()
        .filter_map(|line| classify::classify(&line.text))
        .map(|row| fields::extract_record(&row, template))
        .collect();
    debug!(
        "Accepted {}/{} lines as table rows",
        records.len(),
        lines.len()
    );
    records
}

/// Assemble the lines of a PDF without classifying them.
///
/// Useful when adapting a [`ColumnTemplate`] to a new layout.
pub async fn extract_lines(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<Vec<Line>, ExtractError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let collected = collect::collect(
        Box::new(pdfium_source(resolved.path(), config)),
        config.collection_timeout(),
    )
    .await?;
    Ok(assemble::assemble(&collected.index))
}

/// Extract and write the records as a pretty JSON array to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, ExtractError> {
    let output = extract(input_str, config).await?;
    write_records(&output, output_path.as_ref()).await?;
    Ok(output.stats)
}

/// Write `output.records` as pretty JSON to `path`, atomically.
pub async fn write_records(output: &ExtractionOutput, path: &Path) -> Result<(), ExtractError> {
    let mut json = output.records_json()?;
    json.push('\n');
    write_atomic(path, json).await
}

/// Write `contents` to `path` through a temp file and a rename, creating
/// parent directories as needed.
pub(crate) async fn write_atomic(path: &Path, contents: String) -> Result<(), ExtractError> {
    let write_failed = |source| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(write_failed)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_failed)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(write_failed)?;
    Ok(())
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally. When collection times out
/// the engine thread may still be running; it is left behind so the call
/// returns at the deadline.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    block_on_detached(extract(input_str, config))
}

/// Run `future` on a fresh runtime, then shut the runtime down without
/// waiting for blocking tasks that are still running.
pub(crate) fn block_on_detached<T>(
    future: impl std::future::Future<Output = Result<T, ExtractError>>,
) -> Result<T, ExtractError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    let result = rt.block_on(future);
    rt.shutdown_background();
    result
}

/// Extract from PDF bytes held in memory.
///
/// The bytes are written to a managed temp file that is removed on return.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ExtractError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ExtractError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    extract(&path, config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn pdfium_source(path: &Path, config: &ExtractionConfig) -> PdfiumSource {
    PdfiumSource::new(path)
        .password(config.password.clone())
        .pages(config.pages.clone())
}

fn stats_for(
    collected: &Collected,
    lines_assembled: usize,
    rows_accepted: usize,
    total_start: Instant,
) -> ExtractionStats {
    ExtractionStats {
        fragments_accepted: collected.index.accepted(),
        fragments_dropped: collected.index.dropped(),
        fragments_overwritten: collected.index.overwritten(),
        events_ignored: collected.events_ignored,
        lines_assembled,
        rows_accepted,
        outcome: collected.outcome,
        collection_duration_ms: collected.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    }
}
