//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`WorkflowEvent`]s. It is
//! shared via `Arc<EventBus>` between the workflow session and whatever
//! renders notifications.

use chrono::{DateTime, Utc};
use listcast_core::draft::DraftKey;
use listcast_core::types::PropertyId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// WorkflowEvent
// ---------------------------------------------------------------------------

/// Something that happened in the publishing workflow.
///
/// Constructed via [`WorkflowEvent::new`] and enriched with
/// [`with_property`](WorkflowEvent::with_property),
/// [`with_draft`](WorkflowEvent::with_draft) and
/// [`with_payload`](WorkflowEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// One of the names in [`crate::event_types`].
    pub event_type: String,

    pub property_id: Option<PropertyId>,

    /// The language/channel pair the event concerns, if any.
    pub draft: Option<DraftKey>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            property_id: None,
            draft: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_property(mut self, property_id: impl Into<PropertyId>) -> Self {
        self.property_id = Some(property_id.into());
        self
    }

    pub fn with_draft(mut self, key: DraftKey) -> Self {
        self.draft = Some(key);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Read a string field from the payload.
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(|v| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// ```rust
/// use listcast_events::bus::{EventBus, WorkflowEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(WorkflowEvent::new("generation.started"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers. Dropped silently when
    /// nobody listens.
    pub fn publish(&self, event: WorkflowEvent) {
        tracing::debug!(event_type = %event.event_type, "Workflow event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
