//! Follow-up device commands driven by occupancy

mod room_mapping;

pub use self::room_mapping::RoomMapping;

use std::sync::Arc;

use crate::models::AuthToken;
use crate::smartthings::{DeviceCommand, DirectoryClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    On,
    Off,
}

impl SwitchCommand {
    pub fn for_occupancy(occupied: bool) -> Self {
        if occupied {
            SwitchCommand::On
        } else {
            SwitchCommand::Off
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchCommand::On => "on",
            SwitchCommand::Off => "off",
        }
    }
}

/// Sends switch commands to mapped lights. Fire-and-forget: failures are
/// logged and never retried.
pub struct CommandDispatcher {
    client: Arc<dyn DirectoryClient>,
    component: String,
}

impl CommandDispatcher {
    pub fn new(client: Arc<dyn DirectoryClient>) -> Self {
        Self {
            client,
            component: "main".to_string(),
        }
    }

    /// Returns whether the platform accepted the command
    pub async fn send_command(
        &self,
        device_id: &str,
        command: SwitchCommand,
        credential: &AuthToken,
    ) -> bool {
        let request = DeviceCommand {
            component: self.component.clone(),
            capability: "switch".to_string(),
            command: command.as_str().to_string(),
        };

        match self.client.send_command(device_id, &request, credential).await {
            Ok(()) => {
                tracing::info!("[Command] {} -> {}", device_id, command.as_str());
                true
            }
            Err(e) => {
                tracing::error!(
                    "[Command] Failed to send '{}' to {}: {}",
                    command.as_str(),
                    device_id,
                    e
                );
                false
            }
        }
    }
}
