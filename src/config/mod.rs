//! Configuration module

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub smartthings: SmartThingsConfig,
    #[serde(default)]
    pub app: AppManifestConfig,
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Sensor deviceId -> light deviceId
    #[serde(default)]
    pub room_mapping: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
    /// Largest webhook body accepted; bigger EVENT batches are rejected with 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// When set, the keep-alive task GETs this URL periodically
    #[serde(default)]
    pub keepalive_url: Option<String>,
    #[serde(default = "default_keepalive_interval")]
    pub keepalive_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
            max_body_bytes: default_max_body_bytes(),
            keepalive_url: None,
            keepalive_interval_secs: default_keepalive_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmartThingsConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// GET the confirmation URL ourselves after answering CONFIRMATION
    #[serde(default = "default_true")]
    pub auto_confirm: bool,
}

impl Default for SmartThingsConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            auto_confirm: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppManifestConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_description")]
    pub description: String,
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_first_page_id")]
    pub first_page_id: String,
    /// Setting id of the device picker on the configuration page
    #[serde(default = "default_device_role")]
    pub device_role: String,
    #[serde(default = "default_picker_capabilities")]
    pub picker_capabilities: Vec<String>,
}

impl Default for AppManifestConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            description: default_app_description(),
            app_id: default_app_id(),
            first_page_id: default_first_page_id(),
            device_role: default_device_role(),
            picker_capabilities: default_picker_capabilities(),
        }
    }
}

/// The (component, capability, attribute) every selected device is subscribed for
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "default_component")]
    pub component: String,
    #[serde(default = "default_motion_capability")]
    pub capability: String,
    #[serde(default = "default_motion_attribute")]
    pub attribute: String,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            component: default_component(),
            capability: default_motion_capability(),
            attribute: default_motion_attribute(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationConfig {
    #[serde(default = "default_presence_capability")]
    pub presence_capability: String,
    #[serde(default = "default_presence_attribute")]
    pub presence_attribute: String,
    #[serde(default = "default_motion_capability")]
    pub motion_capability: String,
    #[serde(default = "default_motion_attribute")]
    pub motion_attribute: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            presence_capability: default_presence_capability(),
            presence_attribute: default_presence_attribute(),
            motion_capability: default_motion_capability(),
            motion_attribute: default_motion_attribute(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            topic: default_topic(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_keepalive_interval() -> u64 {
    600
}

fn default_api_base_url() -> String {
    "https://api.smartthings.com/v1".to_string()
}

fn default_true() -> bool {
    true
}

fn default_app_name() -> String {
    "Room Occupancy Bridge".to_string()
}

fn default_app_description() -> String {
    "Streams room occupancy to connected clients and switches lights".to_string()
}

fn default_app_id() -> String {
    "room-occupancy-bridge".to_string()
}

fn default_first_page_id() -> String {
    "1".to_string()
}

fn default_device_role() -> String {
    "sensors".to_string()
}

fn default_picker_capabilities() -> Vec<String> {
    vec!["motionSensor".to_string(), "refresh".to_string()]
}

fn default_component() -> String {
    "main".to_string()
}

fn default_presence_capability() -> String {
    "custom.directionalPresence".to_string()
}

fn default_presence_attribute() -> String {
    "direction".to_string()
}

fn default_motion_capability() -> String {
    "motionSensor".to_string()
}

fn default_motion_attribute() -> String {
    "motion".to_string()
}

fn default_channel_capacity() -> usize {
    256
}

fn default_topic() -> String {
    "sensor-update".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("SMARTAPP_BRIDGE").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!("Invalid configuration, falling back to defaults: {}", e);
            Config::default()
        });

        Ok(config)
    }
}
