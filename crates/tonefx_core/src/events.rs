//! Controller Events
//!
//! Events flow from the controllers to the presentation layer over a
//! broadcast channel. `Error` is the user-facing failure channel: every
//! failed controller operation is reported here as well as returned.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::EffectDomain;

/// Events published by the controllers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Initial state loaded from the store and applied to the engine
    Hydrated { domain: EffectDomain },

    /// A mutation was applied and persisted
    ConfigurationSaved { domain: EffectDomain },

    /// The persisted record was changed by another writer and re-applied
    ExternalChange { domain: EffectDomain },

    /// An operation failed; the in-memory configuration is unchanged
    Error { domain: EffectDomain, message: String },
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(domain: EffectDomain, err: E) -> Self {
        Event::Error {
            domain,
            message: err.to_string(),
        }
    }

    pub fn domain(&self) -> EffectDomain {
        match self {
            Event::Hydrated { domain }
            | Event::ConfigurationSaved { domain }
            | Event::ExternalChange { domain }
            | Event::Error { domain, .. } => *domain,
        }
    }
}

/// Sending half shared by every controller
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: broadcast::Sender<Event>,
}

impl EventSender {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; having no subscriber is not an error
    pub fn send(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::ConfigurationSaved {
            domain: EffectDomain::BassBoost,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ConfigurationSaved"));
        assert!(json.contains("BassBoost"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_error_event() {
        let event = Event::error(EffectDomain::Equalizer, "disk full");
        if let Event::Error { domain, message } = &event {
            assert_eq!(*domain, EffectDomain::Equalizer);
            assert_eq!(message, "disk full");
        } else {
            panic!("Should be Error variant");
        }
        assert_eq!(event.domain(), EffectDomain::Equalizer);
    }

    #[tokio::test]
    async fn test_send_without_subscribers() {
        let events = EventSender::new(4);
        events.send(Event::Hydrated {
            domain: EffectDomain::Virtualizer,
        });

        let mut rx = events.subscribe();
        events.send(Event::Hydrated {
            domain: EffectDomain::Equalizer,
        });
        assert_eq!(rx.recv().await.unwrap().domain(), EffectDomain::Equalizer);
    }
}
