use crate::classifier::FeedbackVerdict;
use crate::error::EventBusError;
use crate::exercise::ExerciseKind;
use crate::presentation::SpeechSource;
use crate::report::SessionSummary;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Events emitted by a coaching session
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoachEvent {
    /// A repetition was completed
    RepetitionCompleted { exercise: ExerciseKind, count: u32 },
    /// A plank frame inside the hold band was counted
    HoldProgress { count: u32 },
    /// The speech sink should say something
    SpeechRequested { text: String, source: SpeechSource },
    /// Technical analysis produced a verdict
    TechnicalFeedback { verdict: FeedbackVerdict, count: u32 },
    /// The user switched exercise
    ExerciseChanged { from: ExerciseKind, to: ExerciseKind },
    /// Summary of a finished session, for the report exporter
    SessionSummary(SessionSummary),
    /// A frame was dropped without touching session state
    FrameSkipped { reason: String },
}

impl CoachEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            CoachEvent::RepetitionCompleted { exercise, count } => {
                format!("{} repetition {}", exercise, count)
            }
            CoachEvent::HoldProgress { count } => format!("Hold frame {}", count),
            CoachEvent::SpeechRequested { text, .. } => format!("Speak: {}", text),
            CoachEvent::TechnicalFeedback { verdict, count } => {
                format!("Technical feedback at {}: {}", count, verdict.message)
            }
            CoachEvent::ExerciseChanged { from, to } => {
                format!("Exercise changed from {} to {}", from, to)
            }
            CoachEvent::SessionSummary(summary) => format!(
                "Session summary: {} x{}",
                summary.exercise, summary.count
            ),
            CoachEvent::FrameSkipped { reason } => format!("Frame skipped: {}", reason),
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CoachEvent::RepetitionCompleted { .. } => "repetition_completed",
            CoachEvent::HoldProgress { .. } => "hold_progress",
            CoachEvent::SpeechRequested { .. } => "speech_requested",
            CoachEvent::TechnicalFeedback { .. } => "technical_feedback",
            CoachEvent::ExerciseChanged { .. } => "exercise_changed",
            CoachEvent::SessionSummary(_) => "session_summary",
            CoachEvent::FrameSkipped { .. } => "frame_skipped",
        }
    }
}

/// Event bus for fanning session events out to collaborators
///
/// Publishing never blocks; with no subscribers the event is dropped.
pub struct EventBus {
    sender: broadcast::Sender<CoachEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        Self {
            debug_logging: true,
            ..Self::new(capacity)
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<CoachEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, event: CoachEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            CoachEvent::ExerciseChanged { from, to } => {
                info!("Exercise changed: {} -> {}", from, to);
            }
            CoachEvent::FrameSkipped { reason } => {
                debug!("Frame skipped: {}", reason);
            }
            _ => {}
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Publish, treating "no subscribers" as a normal outcome
    pub fn emit(&self, event: CoachEvent) {
        if self.has_subscribers() {
            if let Err(e) = self.publish(event) {
                warn!("Failed to publish event: {}", e);
            }
        } else if self.debug_logging {
            debug!("No subscribers for event: {}", event.description());
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&CoachEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &CoachEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<CoachEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(receiver: broadcast::Receiver<CoachEvent>, filter: EventFilter, name: String) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    ///
    /// A lagging receiver skips the dropped events and keeps going.
    pub async fn recv(&mut self) -> Result<CoachEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!("Receiver '{}' received event: {}", self.name, event.description());
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<CoachEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

/// Collaborator that consumes session events (speech sink, report exporter)
#[async_trait::async_trait]
pub trait EventHandler: Send {
    /// Handle an incoming event
    async fn handle_event(&mut self, event: CoachEvent) -> Result<(), EventBusError>;

    /// Get the name of this handler for logging
    fn handler_name(&self) -> &str;

    /// Get the event filter for this handler
    fn event_filter(&self) -> EventFilter {
        EventFilter::All
    }
}

/// Drive `handler` from a fresh subscription until the bus closes
///
/// Returns the handler once the bus has shut down so callers can inspect it.
pub fn spawn_handler<H>(bus: &EventBus, mut handler: H) -> JoinHandle<H>
where
    H: EventHandler + 'static,
{
    let mut receiver = EventReceiver::new(
        bus.subscribe(),
        handler.event_filter(),
        handler.handler_name().to_string(),
    );

    tokio::spawn(async move {
        info!("Event handler '{}' started", handler.handler_name());
        while let Ok(event) = receiver.recv().await {
            if let Err(e) = handler.handle_event(event).await {
                warn!("Handler '{}' failed: {}", handler.handler_name(), e);
            }
        }
        debug!("Event handler '{}' stopped", handler.handler_name());
        handler
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    struct Collector {
        seen: Vec<String>,
    }

    #[async_trait::async_trait]
    impl EventHandler for Collector {
        async fn handle_event(&mut self, event: CoachEvent) -> Result<(), EventBusError> {
            self.seen.push(event.event_type().to_string());
            Ok(())
        }

        fn handler_name(&self) -> &str {
            "collector"
        }

        fn event_filter(&self) -> EventFilter {
            EventFilter::EventTypes(vec!["speech_requested"])
        }
    }

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let delivered = event_bus
            .publish(CoachEvent::RepetitionCompleted {
                exercise: ExerciseKind::Squat,
                count: 3,
            })
            .unwrap();
        assert_eq!(delivered, 1);

        match receiver.recv().await.unwrap() {
            CoachEvent::RepetitionCompleted { exercise, count } => {
                assert_eq!(exercise, ExerciseKind::Squat);
                assert_eq!(count, 3);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_without_subscribers_fails_but_emit_does_not() {
        let event_bus = EventBus::new(4);
        assert!(event_bus
            .publish(CoachEvent::HoldProgress { count: 1 })
            .is_err());
        event_bus.emit(CoachEvent::HoldProgress { count: 1 });
        assert!(!event_bus.has_subscribers());
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::EventTypes(vec!["speech_requested"]);
        let speech = CoachEvent::SpeechRequested {
            text: "Go deeper".to_string(),
            source: SpeechSource::Immediate,
        };
        let hold = CoachEvent::HoldProgress { count: 2 };

        assert!(filter.matches(&speech));
        assert!(!filter.matches(&hold));
        assert!(EventFilter::Custom(|e| matches!(e, CoachEvent::HoldProgress { .. })).matches(&hold));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let mut filtered = EventReceiver::new(
            event_bus.subscribe(),
            EventFilter::EventTypes(vec!["exercise_changed"]),
            "test".to_string(),
        );

        event_bus.emit(CoachEvent::HoldProgress { count: 1 });
        event_bus.emit(CoachEvent::ExerciseChanged {
            from: ExerciseKind::PushUp,
            to: ExerciseKind::Plank,
        });

        let received = timeout(Duration::from_millis(100), filtered.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type(), "exercise_changed");
        assert!(filtered.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_spawned_handler_sees_filtered_events() {
        let event_bus = EventBus::new(10);
        let handle = spawn_handler(&event_bus, Collector { seen: Vec::new() });

        event_bus.emit(CoachEvent::SpeechRequested {
            text: "Raise your hips".to_string(),
            source: SpeechSource::Immediate,
        });
        event_bus.emit(CoachEvent::HoldProgress { count: 1 });
        drop(event_bus);

        let collector = timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert_eq!(collector.seen, vec!["speech_requested".to_string()]);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = CoachEvent::RepetitionCompleted {
            exercise: ExerciseKind::BicepCurl,
            count: 6,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "repetition_completed");
        assert_eq!(json["exercise"], "bicep_curl");
        assert_eq!(json["count"], 6);
    }
}
