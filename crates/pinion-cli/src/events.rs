//! Event rendering for the CLI: pipeline events become tracing records.

use pinion_core::events::{Event, EventSink};

/// Sink that forwards pipeline events to `tracing` at matching levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: Event) {
        match event {
            Event::PhaseStarted(phase) => tracing::debug!(phase = phase.as_str(), "phase started"),
            Event::PhaseFinished(phase) => {
                tracing::debug!(phase = phase.as_str(), "phase finished");
            }
            Event::DownloadStarted { coordinates } => {
                tracing::debug!(%coordinates, "downloading");
            }
            Event::DownloadFinished { coordinates, bytes } => {
                tracing::debug!(%coordinates, bytes, "downloaded");
            }
            Event::Warning { message } => tracing::warn!("{message}"),
        }
    }
}
