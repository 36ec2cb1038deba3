//! Integration tests for the situaciones pipeline.
//!
//! These drive the public API with in-memory fragment sources, so they need
//! neither pdfium nor a real PDF.

use situaciones::{
    extract_from_source, CollectionOutcome, ExtractError, ExtractionConfig, Fragment,
    FragmentSink, FragmentSource, MemorySource, Record,
};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Split `text` at two-space gaps into fragments laid out left to right.
/// Each fragment keeps its gap minus one space, which the row join adds
/// back, so the assembled line equals `text`.
fn row_fragments(page: u32, y: f64, text: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut rest = text;
    let mut x = 40.0;
    while !rest.is_empty() {
        let piece = match rest.find("  ") {
            Some(gap) => {
                let next = rest[gap..]
                    .find(|c: char| c != ' ')
                    .map_or(rest.len(), |i| gap + i);
                let piece = &rest[..next - 1];
                rest = &rest[next..];
                piece
            }
            None => std::mem::take(&mut rest),
        };
        fragments.push(Fragment::new(page, x, y, piece));
        x += 50.0;
    }
    fragments
}

fn informe() -> Vec<Fragment> {
    let mut fragments = vec![
        Fragment::new(1, 200.0, 30.0, "INFORME DE VIDA LABORAL"),
        Fragment::new(1, 40.0, 60.0, "SITUACIÓN/ES"),
    ];
    fragments.extend(row_fragments(
        1,
        80.0,
        "RÉGIMEN   CÓDIGO EMPRESA   EMPRESA   F.ALTA",
    ));
    fragments.extend(row_fragments(
        1,
        100.0,
        "GENERAL   001234   ACME SL   01.01.2020   01.01.2020   31.12.2020   100   50%   1   365",
    ));
    fragments.extend(row_fragments(
        1,
        120.0,
        "RETA   07   TRABAJO AUTONOMO   01.02.2021   01.02.2021   200   100%   2   30",
    ));
    fragments.push(Fragment::new(1, 500.0, 800.0, "Página 1 de 2"));
    fragments.extend(row_fragments(
        2,
        100.0,
        "ESPECIAL AGRARIO   0111   FINCA   05.06.2022   05.06.2022   300   0%   3   12",
    ));
    fragments
}

async fn run(fragments: Vec<Fragment>) -> Vec<Record> {
    extract_from_source(MemorySource::new(fragments), &ExtractionConfig::default())
        .await
        .expect("extraction should succeed")
        .records
}

// ── Properties ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_single_line() {
    let line =
        "GENERAL   001234   ACME SL   01.01.2020   01.01.2020   31.12.2020   100   50%   1   365";
    let records = run(vec![Fragment::new(1, 10.0, 10.0, line)]).await;

    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.regimen, "GENERAL");
    assert_eq!(r.codigo_empresa, "001234");
    assert_eq!(r.empresa, "ACME SL");
    assert_eq!(r.fecha_alta, "01.01.2020");
    assert_eq!(r.fecha_efecto_alta, "01.01.2020");
    assert_eq!(r.fecha_baja, "31.12.2020");
    assert_eq!(r.dias, "365");
}

#[tokio::test]
async fn fragments_rebuild_the_same_line() {
    let line =
        "GENERAL   001234   ACME SL   01.01.2020   01.01.2020   31.12.2020   100   50%   1   365";
    let split = run(row_fragments(1, 10.0, line)).await;
    let whole = run(vec![Fragment::new(1, 10.0, 10.0, line)]).await;
    assert_eq!(split, whole);
}

#[tokio::test]
async fn document_order_and_row_filtering() {
    let records = run(informe()).await;
    let regimens: Vec<&str> = records.iter().map(|r| r.regimen.as_str()).collect();
    assert_eq!(regimens, vec!["GENERAL", "RETA", "ESPECIAL AGRARIO"]);

    let reta = &records[1];
    assert_eq!(reta.empresa, "TRABAJO AUTONOMO");
    assert_eq!(reta.fecha_alta, "01.02.2021");
    assert_eq!(reta.fecha_baja, "");
    assert_eq!(reta.dias, "30");

    let especial = &records[2];
    assert_eq!(especial.codigo_empresa, "0111");
    assert_eq!(especial.fecha_alta, "05.06.2022");
    assert_eq!(especial.fecha_baja, "");
    assert_eq!(especial.dias, "12");
}

#[tokio::test]
async fn arrival_order_does_not_change_output() {
    let expected = run(informe()).await;
    let mut reversed = informe();
    reversed.reverse();
    assert_eq!(run(reversed).await, expected);

    let mut interleaved = informe();
    let len = interleaved.len();
    interleaved.rotate_left(len / 2);
    assert_eq!(run(interleaved).await, expected);
}

#[tokio::test]
async fn repeated_runs_are_byte_identical() {
    let config = ExtractionConfig::default();
    let first = extract_from_source(MemorySource::new(informe()), &config)
        .await
        .unwrap();
    let second = extract_from_source(MemorySource::new(informe()), &config)
        .await
        .unwrap();
    assert_eq!(
        first.records_json().unwrap(),
        second.records_json().unwrap()
    );
}

#[tokio::test]
async fn no_table_rows_yields_empty_array() {
    let output = extract_from_source(
        MemorySource::new(vec![Fragment::new(1, 0.0, 0.0, "FOO   001234")]),
        &ExtractionConfig::default(),
    )
    .await
    .unwrap();
    assert!(output.records.is_empty());
    assert_eq!(output.records_json().unwrap(), "[]");
}

// ── Completion race ──────────────────────────────────────────────────────────

/// Emits its fragments, then never signals end-of-stream until cancelled.
struct StalledSource {
    fragments: Vec<Fragment>,
}

impl FragmentSource for StalledSource {
    fn produce(self: Box<Self>, sink: &FragmentSink) -> Result<(), ExtractError> {
        for fragment in self.fragments {
            sink.emit(fragment);
        }
        while !sink.is_cancelled() {
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }
}

fn short_timeout() -> ExtractionConfig {
    ExtractionConfig::builder()
        .collection_timeout_ms(100)
        .build()
        .unwrap()
}

#[tokio::test]
async fn timeout_returns_partial_records() {
    let source = StalledSource {
        fragments: row_fragments(1, 10.0, "GENERAL   001234   ACME   01.01.2020"),
    };
    let output = extract_from_source(source, &short_timeout()).await.unwrap();

    assert!(output.is_partial());
    assert_eq!(output.stats.outcome, CollectionOutcome::TimedOut);
    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].codigo_empresa, "001234");
}

#[tokio::test]
async fn timeout_with_nothing_collected_is_still_valid() {
    let source = StalledSource { fragments: vec![] };
    let output = extract_from_source(source, &short_timeout()).await.unwrap();
    assert!(output.is_partial());
    assert_eq!(output.records_json().unwrap(), "[]");
}

/// Emits a table row, then fails.
struct BrokenSource;

impl FragmentSource for BrokenSource {
    fn produce(self: Box<Self>, sink: &FragmentSink) -> Result<(), ExtractError> {
        for fragment in row_fragments(1, 10.0, "GENERAL   001234   ACME") {
            sink.emit(fragment);
        }
        Err(ExtractError::SourceFailed {
            detail: "stream truncated".into(),
        })
    }
}

#[tokio::test]
async fn source_error_produces_no_output() {
    let err = extract_from_source(BrokenSource, &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ExtractError::SourceFailed { ref detail } if detail == "stream truncated"),
        "got {err:?}"
    );
}

// ── Malformed input ──────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_fragments_are_dropped_silently() {
    let mut fragments = row_fragments(1, 10.0, "GENERAL   001234   ACME");
    fragments.push(Fragment {
        x: None,
        ..Fragment::new(1, 0.0, 10.0, "RETA   999")
    });
    fragments.push(Fragment {
        text: None,
        ..Fragment::new(1, 0.0, 20.0, "")
    });
    let output = extract_from_source(MemorySource::new(fragments), &ExtractionConfig::default())
        .await
        .unwrap();
    assert_eq!(output.records.len(), 1);
    assert_eq!(output.stats.fragments_dropped, 2);
}

#[tokio::test]
async fn fragments_from_json_dump() {
    let dump = r#"[
        {"page": 1, "x": 10.5, "y": 4.2, "text": "GENERAL  "},
        {"page": 1, "x": 30.0, "y": 4.2, "text": "0111  "},
        {"page": 1, "x": 55.0, "y": 4.2, "text": "01.01.2015"},
        {"page": 1, "x": 55.0, "text": "no y"},
        {"page": 1}
    ]"#;
    let fragments: Vec<Fragment> = serde_json::from_str(dump).unwrap();
    let output = extract_from_source(MemorySource::new(fragments), &ExtractionConfig::default())
        .await
        .unwrap();
    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].fecha_alta, "01.01.2015");
    assert_eq!(output.stats.fragments_dropped, 2);
}
