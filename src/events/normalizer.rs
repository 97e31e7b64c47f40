//! Device event extraction and occupancy classification

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::ClassificationConfig;
use crate::models::{CanonicalEvent, RawDeviceEvent};

/// One known layout of the EVENT payload
struct EnvelopeShape {
    name: &'static str,
    extract: fn(&Map<String, Value>) -> Option<Vec<RawDeviceEvent>>,
}

/// Tried in order, first match wins
const SHAPES: &[EnvelopeShape] = &[
    EnvelopeShape {
        name: "deviceEvents",
        extract: flat_device_events,
    },
    EnvelopeShape {
        name: "events",
        extract: typed_events,
    },
];

fn parse_device_event(value: &Value) -> Option<RawDeviceEvent> {
    match RawDeviceEvent::deserialize(value) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!("[Normalize] Skipping unparseable device event: {}", e);
            None
        }
    }
}

/// `{"deviceEvents": [{deviceId, capability, attribute, value}, ...]}`
fn flat_device_events(body: &Map<String, Value>) -> Option<Vec<RawDeviceEvent>> {
    let items = body.get("deviceEvents")?.as_array()?;
    Some(items.iter().filter_map(parse_device_event).collect())
}

/// `{"events": [{eventType: "DEVICE_EVENT", eventTime, deviceEvent: {...}}, ...]}`
fn typed_events(body: &Map<String, Value>) -> Option<Vec<RawDeviceEvent>> {
    let items = body.get("events")?.as_array()?;
    let events = items
        .iter()
        .filter(|item| item.get("eventType").and_then(Value::as_str) == Some("DEVICE_EVENT"))
        .filter_map(|item| {
            let mut event = parse_device_event(item.get("deviceEvent")?)?;
            if event.event_time.is_none() {
                event.event_time = item
                    .get("eventTime")
                    .and_then(|t| DateTime::<Utc>::deserialize(t).ok());
            }
            Some(event)
        })
        .collect();
    Some(events)
}

/// Pull device events out of whichever envelope shape is present.
/// No recognizable list yields an empty vec.
pub fn extract_device_events(body: &Map<String, Value>) -> Vec<RawDeviceEvent> {
    for shape in SHAPES {
        if let Some(events) = (shape.extract)(body) {
            tracing::debug!(
                "[Normalize] Envelope shape '{}' with {} device events",
                shape.name,
                events.len()
            );
            return events;
        }
    }
    tracing::debug!("[Normalize] No device event list in envelope");
    Vec::new()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// in / out / ready
    DirectionalPresence,
    /// active / inactive
    Motion,
}

impl EventClass {
    pub fn occupied(&self, value: &str) -> bool {
        match self {
            EventClass::DirectionalPresence => matches!(value, "in" | "out"),
            EventClass::Motion => value == "active",
        }
    }
}

pub struct EventNormalizer {
    config: ClassificationConfig,
}

impl EventNormalizer {
    pub fn new(config: ClassificationConfig) -> Self {
        Self { config }
    }

    /// Classify by (capability, attribute). Without a capability the
    /// attribute alone decides.
    pub fn classify(&self, capability: Option<&str>, attribute: Option<&str>) -> Option<EventClass> {
        let attribute = attribute?;
        let matches = |cap: &str, attr: &str| {
            attribute == attr && capability.map_or(true, |c| c == cap)
        };

        if matches(&self.config.presence_capability, &self.config.presence_attribute) {
            Some(EventClass::DirectionalPresence)
        } else if matches(&self.config.motion_capability, &self.config.motion_attribute) {
            Some(EventClass::Motion)
        } else {
            None
        }
    }

    /// Convert a raw event, or `None` when it carries no occupancy meaning
    pub fn normalize(&self, event: &RawDeviceEvent) -> Option<CanonicalEvent> {
        let class = match self.classify(event.capability.as_deref(), event.attribute.as_deref()) {
            Some(class) => class,
            None => {
                tracing::debug!(
                    "[Normalize] Ignoring {} {}/{}",
                    event.device_id,
                    event.capability.as_deref().unwrap_or("-"),
                    event.attribute.as_deref().unwrap_or("-")
                );
                return None;
            }
        };

        let raw_value = event.value_text();
        Some(CanonicalEvent {
            device_id: event.device_id.clone(),
            occupied: class.occupied(&raw_value),
            raw_value,
            timestamp: event.event_time.unwrap_or_else(Utc::now),
        })
    }
}
