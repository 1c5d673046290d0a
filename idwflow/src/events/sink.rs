//! Event sink trait and implementations.

use super::PipelineEvent;
use std::sync::Arc;
use tracing::{debug, info, Level};

/// Receiver of pipeline lifecycle events.
///
/// Emission must never fail the run: implementations swallow their own
/// errors.
pub trait EventSink {
    /// Delivers one event.
    fn emit(&self, event: &PipelineEvent);
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn emit(&self, event: &PipelineEvent) {
        (**self).emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&self, event: &PipelineEvent) {
        (**self).emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: &PipelineEvent) {
        (**self).emit(event);
    }
}

/// A sink that discards every event.
///
/// Used when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &PipelineEvent) {}
}

/// A sink that forwards events to `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a sink logging at `level`.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    /// Returns the configured level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        let event_type = event.event_type();
        let data = event.to_json();
        if self.level == Level::DEBUG || self.level == Level::TRACE {
            debug!(event_type, event_data = %data, "Event: {}", event_type);
        } else {
            info!(event_type, event_data = %data, "Event: {}", event_type);
        }
    }
}

/// A sink that keeps every event, for tests and summaries.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<PipelineEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.read().clone()
    }

    /// Returns the event types in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(PipelineEvent::event_type).collect()
    }

    /// Returns the events whose type starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<PipelineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type().starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Returns the number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Drops every event.
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &PipelineEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageId;
    use uuid::Uuid;

    fn started(stage: StageId) -> PipelineEvent {
        PipelineEvent::StageStarted {
            run_id: Uuid::nil(),
            stage,
        }
    }

    #[test]
    fn test_noop_and_logging_sinks_accept_events() {
        NoOpEventSink.emit(&started(StageId::Join));
        LoggingEventSink::default().emit(&started(StageId::Join));
        LoggingEventSink::debug().emit(&started(StageId::Render));
        assert_eq!(LoggingEventSink::info().level(), Level::INFO);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(&PipelineEvent::PipelineStarted {
            run_id: Uuid::nil(),
            k: 3,
        });
        sink.emit(&started(StageId::Interpolate));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.event_types(), vec!["pipeline.started", "stage.started"]);
        assert_eq!(sink.events_of_type("stage.").len(), 1);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_boxed_and_borrowed_sinks_forward() {
        let sink = CollectingEventSink::new();
        (&sink).emit(&started(StageId::Aggregate));
        let boxed: Box<dyn EventSink + '_> = Box::new(&sink);
        boxed.emit(&started(StageId::Regress));
        assert_eq!(sink.len(), 2);
    }
}
