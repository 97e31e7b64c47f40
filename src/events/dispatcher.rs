//! EVENT fan-out: broadcast every occupancy signal, switch mapped lights

use std::sync::Arc;

use super::normalizer::{extract_device_events, EventNormalizer};
use crate::commands::{CommandDispatcher, RoomMapping, SwitchCommand};
use crate::models::{EventEnvelope, SensorUpdate};
use crate::realtime::Broadcaster;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub device_events: usize,
    pub broadcasts: usize,
    pub commands_sent: usize,
    pub commands_failed: usize,
}

pub struct EventDispatcher {
    normalizer: EventNormalizer,
    broadcaster: Broadcaster,
    commands: CommandDispatcher,
    room_mapping: Arc<RoomMapping>,
}

impl EventDispatcher {
    pub fn new(
        normalizer: EventNormalizer,
        broadcaster: Broadcaster,
        commands: CommandDispatcher,
        room_mapping: Arc<RoomMapping>,
    ) -> Self {
        Self {
            normalizer,
            broadcaster,
            commands,
            room_mapping,
        }
    }

    pub async fn dispatch(&self, envelope: &EventEnvelope) -> DispatchReport {
        let raw_events = extract_device_events(&envelope.body);
        let mut report = DispatchReport {
            device_events: raw_events.len(),
            ..Default::default()
        };

        for raw in &raw_events {
            let event = match self.normalizer.normalize(raw) {
                Some(event) => event,
                None => continue,
            };

            tracing::info!(
                "[Dispatch] {} = {} (occupied: {})",
                event.device_id,
                event.raw_value,
                event.occupied
            );

            self.broadcaster.publish(SensorUpdate::from(&event));
            report.broadcasts += 1;

            let light = match self.room_mapping.light_for(&event.device_id) {
                Some(light) => light,
                None => {
                    tracing::warn!("[Dispatch] No light mapped for sensor {}", event.device_id);
                    continue;
                }
            };

            let credential = match &envelope.auth_token {
                Some(token) => token,
                None => {
                    tracing::warn!(
                        "[Dispatch] Event has no auth token, cannot switch {}",
                        light
                    );
                    continue;
                }
            };

            let command = SwitchCommand::for_occupancy(event.occupied);
            if self.commands.send_command(light, command, credential).await {
                report.commands_sent += 1;
            } else {
                report.commands_failed += 1;
            }
        }

        report
    }
}
