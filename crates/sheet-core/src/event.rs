//! Sheet Events
//!
//! A fixed vocabulary of events broadcast to external listeners.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::record::FieldMap;

/// Events a listener can observe
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SheetEvent {
    /// The user picked a different shipping option
    ShippingOptionChange { id: String },

    /// The user committed a new shipping address
    ShippingAddressChange { address: FieldMap },

    /// The session was aborted
    Abort { reason: String },
}

impl SheetEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SheetEvent::ShippingOptionChange { .. } => "shippingoptionchange",
            SheetEvent::ShippingAddressChange { .. } => "shippingaddresschange",
            SheetEvent::Abort { .. } => "abort",
        }
    }
}

/// Sending half handed to anything that publishes sheet events
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: broadcast::Sender<SheetEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event; having no listeners is fine
    pub fn emit(&self, event: SheetEvent) {
        tracing::debug!(event = event.name(), listeners = self.tx.receiver_count(), "Emitting sheet event");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SheetEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let sink = EventSink::new(4);
        let mut rx = sink.subscribe();
        sink.emit(SheetEvent::ShippingOptionChange { id: "express".into() });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "shippingoptionchange");
    }

    #[test]
    fn test_emit_without_listeners() {
        let sink = EventSink::new(4);
        sink.emit(SheetEvent::Abort { reason: "nobody cares".into() });
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(SheetEvent::Abort { reason: "x".into() }).unwrap();
        assert_eq!(json["type"], "abort");
    }
}
