//! Progress and warning events emitted by the pipeline.
//!
//! Core code pushes events into an [`EventSink`] and never renders them;
//! console or log output belongs to the embedding binary.

use crate::coords::Coordinates;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolve,
    Download,
    Lock,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Download => "download",
            Self::Lock => "lock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PhaseStarted(Phase),
    PhaseFinished(Phase),
    DownloadStarted { coordinates: Coordinates },
    DownloadFinished { coordinates: Coordinates, bytes: u64 },
    Warning { message: String },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Emit a warning through a sink.
pub fn warn(sink: &dyn EventSink, message: impl Into<String>) {
    sink.emit(Event::Warning {
        message: message.into(),
    });
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Sink that forwards events to an unbounded channel, for embedders that
/// render progress themselves.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: Event) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event);
    }
}
