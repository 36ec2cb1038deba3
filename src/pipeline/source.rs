//! The fragment producer contract.
//!
//! A layout engine decodes a PDF and reports every positioned text run as a
//! [`Fragment`]. It talks to the collector through a [`FragmentSink`]:
//! one [`FragmentSink::emit`] per fragment, then either
//! [`FragmentSink::finish`] (end-of-stream) or [`FragmentSink::fail`]
//! (terminal error). Producers run on a blocking thread, so the sink's
//! methods block on a bounded channel rather than awaiting.
//!
//! Once the collector stops listening (it reached its deadline) the channel
//! is closed. Every later `emit` returns `false` and nothing more reaches
//! the coordinate index; producers should check the return value, or
//! [`FragmentSink::is_cancelled`], and stop early.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One positioned text run as reported by the layout engine.
///
/// Fields are optional because engines are not trusted to fill them:
/// the collector drops any fragment without finite `x`/`y` or without
/// `text`, and files a missing `page` under page 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Fragment {
    /// A fully populated fragment.
    pub fn new(page: u32, x: f64, y: f64, text: impl Into<String>) -> Self {
        Self {
            page: Some(page),
            x: Some(x),
            y: Some(y),
            text: Some(text.into()),
        }
    }
}

/// A message from producer to collector.
#[derive(Debug)]
pub enum SourceEvent {
    /// A positioned text run.
    Fragment(Fragment),
    /// Any other item the engine reports (page breaks, file metadata).
    /// Counted, otherwise ignored.
    Marker,
    /// End-of-stream.
    End,
    /// Terminal error; aborts the whole extraction.
    Failed(ExtractError),
}

/// Channel capacity between producer and collector.
pub(crate) const SINK_CAPACITY: usize = 1024;

/// The producer's handle for delivering events to the collector.
#[derive(Debug, Clone)]
pub struct FragmentSink {
    tx: mpsc::Sender<SourceEvent>,
}

impl FragmentSink {
    pub(crate) fn new(tx: mpsc::Sender<SourceEvent>) -> Self {
        Self { tx }
    }

    /// Deliver one fragment. Returns `false` once the collector has stopped
    /// listening.
    pub fn emit(&self, fragment: Fragment) -> bool {
        self.send(SourceEvent::Fragment(fragment))
    }

    /// Deliver a non-fragment item.
    pub fn marker(&self) -> bool {
        self.send(SourceEvent::Marker)
    }

    /// Signal end-of-stream.
    pub fn finish(&self) {
        self.send(SourceEvent::End);
    }

    /// Signal a terminal error.
    pub fn fail(&self, error: ExtractError) {
        self.send(SourceEvent::Failed(error));
    }

    /// `true` once the collector has given up (timeout) or gone away.
    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: SourceEvent) -> bool {
        self.tx.blocking_send(event).is_ok()
    }
}

/// A layout engine that can stream the fragments of one document.
///
/// `produce` runs on a blocking thread. Returning `Ok(())` signals
/// end-of-stream and `Err` signals a terminal error; implementations only
/// need the sink for the fragments themselves. A producer that neither
/// returns nor emits leaves the collector to its deadline.
pub trait FragmentSource: Send + 'static {
    fn produce(self: Box<Self>, sink: &FragmentSink) -> Result<(), ExtractError>;
}

/// A source replaying a fixed list of fragments.
///
/// Useful for tests and for callers that already hold fragments from
/// another engine.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    fragments: Vec<Fragment>,
}

impl MemorySource {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }
}

impl FragmentSource for MemorySource {
    fn produce(self: Box<Self>, sink: &FragmentSink) -> Result<(), ExtractError> {
        for fragment in self.fragments {
            if !sink.emit(fragment) {
                break;
            }
        }
        Ok(())
    }
}

impl FromIterator<Fragment> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Fragment>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
