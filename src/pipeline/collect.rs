//! Fragment collection into the page → y → x coordinate index.
//!
//! The producer runs on a blocking thread and pushes [`SourceEvent`]s over a
//! bounded channel. [`collect`] drains the channel into a fresh
//! [`CoordinateIndex`] while racing a deadline:
//!
//! ```text
//!   producer ──emit──▶ channel ──recv──▶ CoordinateIndex
//!                                 ▲
//!                  deadline ──────┘  first one wins; the channel is then
//!                                    closed so later emits are refused
//! ```
//!
//! Keys are exact coordinates. Two fragments at the same `(page, y, x)`
//! keep only the later text, and rows whose `y` differ by any amount stay
//! separate rows.

use super::source::{Fragment, FragmentSink, FragmentSource, SourceEvent, SINK_CAPACITY};
use crate::error::ExtractError;
use crate::output::CollectionOutcome;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A finite coordinate usable as an ordered map key.
///
/// `-0.0` is folded into `0.0` so both land on the same row or column.
#[derive(Debug, Clone, Copy)]
pub struct Coord(f64);

impl Coord {
    /// `None` for NaN and infinities.
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self(if value == 0.0 { 0.0 } else { value }))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Coord {}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// One row of the index: x → text.
pub type Row = BTreeMap<Coord, String>;

/// What [`CoordinateIndex::ingest`] did with a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Inserted,
    /// Replaced the text already stored at the same position.
    Overwrote,
    /// Missing coordinates or text.
    Dropped,
}

/// Fragments keyed by page, then y, then x.
///
/// Created empty for every extraction run and handed from the collector to
/// the assembler by value.
#[derive(Debug, Default, Clone)]
pub struct CoordinateIndex {
    pages: BTreeMap<u32, BTreeMap<Coord, Row>>,
    accepted: usize,
    dropped: usize,
    overwritten: usize,
}

impl CoordinateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one fragment. Malformed fragments are counted and dropped.
    pub fn ingest(&mut self, fragment: Fragment) -> Ingested {
        let (Some(x), Some(y), Some(text)) = (
            fragment.x.and_then(Coord::new),
            fragment.y.and_then(Coord::new),
            fragment.text,
        ) else {
            self.dropped += 1;
            return Ingested::Dropped;
        };
        let page = fragment.page.unwrap_or(0);

        self.accepted += 1;
        let row = self.pages.entry(page).or_default().entry(y).or_default();
        match row.insert(x, text) {
            Some(_) => {
                self.overwritten += 1;
                Ingested::Overwrote
            }
            None => Ingested::Inserted,
        }
    }

    /// Rows in reading order: pages ascending, then y ascending.
    pub fn rows(&self) -> impl Iterator<Item = (u32, Coord, &Row)> + '_ {
        self.pages
            .iter()
            .flat_map(|(&page, rows)| rows.iter().map(move |(&y, row)| (page, y, row)))
    }

    /// Distinct `(page, y, x)` positions held.
    pub fn len(&self) -> usize {
        self.pages
            .values()
            .flat_map(|rows| rows.values())
            .map(|row| row.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn overwritten(&self) -> usize {
        self.overwritten
    }
}

/// The result of a collection wait.
#[derive(Debug)]
pub struct Collected {
    pub index: CoordinateIndex,
    pub outcome: CollectionOutcome,
    /// Non-fragment events received.
    pub events_ignored: usize,
    pub duration_ms: u64,
}

enum Stop {
    Outcome(CollectionOutcome),
    ProducerGone,
}

/// Run `source` on a blocking thread and gather its fragments until it
/// finishes or `timeout` elapses.
///
/// # Errors
/// Returns the producer's error as soon as it reports one; nothing
/// collected so far is returned in that case.
pub async fn collect(
    source: Box<dyn FragmentSource>,
    timeout: Duration,
) -> Result<Collected, ExtractError> {
    let start = Instant::now();
    let (tx, mut rx) = mpsc::channel(SINK_CAPACITY);
    let sink = FragmentSink::new(tx);

    let producer = tokio::task::spawn_blocking(move || match source.produce(&sink) {
        Ok(()) => sink.finish(),
        Err(e) => sink.fail(e),
    });

    let mut index = CoordinateIndex::new();
    let mut events_ignored = 0usize;
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let stop = loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(SourceEvent::Fragment(fragment)) => {
                    index.ingest(fragment);
                }
                Some(SourceEvent::Marker) => events_ignored += 1,
                Some(SourceEvent::End) => break Stop::Outcome(CollectionOutcome::Completed),
                Some(SourceEvent::Failed(e)) => {
                    rx.close();
                    return Err(e);
                }
                None => break Stop::ProducerGone,
            },
            () = &mut deadline => {
                warn!(
                    "Fragment source did not finish within {}ms; continuing with {} fragments",
                    timeout.as_millis(),
                    index.accepted()
                );
                break Stop::Outcome(CollectionOutcome::TimedOut);
            }
        }
    };

    // Unsubscribe: anything the producer emits from here on is refused.
    rx.close();
    drop(rx);

    let outcome = match stop {
        Stop::Outcome(outcome) => outcome,
        Stop::ProducerGone => {
            producer
                .await
                .map_err(|e| ExtractError::Internal(format!("Fragment source panicked: {e}")))?;
            CollectionOutcome::Completed
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Collected {} fragments ({} dropped, {} overwritten) in {}ms",
        index.accepted(),
        index.dropped(),
        index.overwritten(),
        duration_ms
    );
    debug!("Collection outcome: {:?}", outcome);

    Ok(Collected {
        index,
        outcome,
        events_ignored,
        duration_ms,
    })
}
