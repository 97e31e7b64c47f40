//! Data models for the SmartApp bridge

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

// ============================================================================
// Lifecycle phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Ping,
    Confirmation,
    Configuration,
    Install,
    Update,
    Event,
    Uninstall,
    OauthCallback,
}

impl Phase {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "PING" => Some(Phase::Ping),
            "CONFIRMATION" => Some(Phase::Confirmation),
            "CONFIGURATION" => Some(Phase::Configuration),
            "INSTALL" => Some(Phase::Install),
            "UPDATE" => Some(Phase::Update),
            "EVENT" => Some(Phase::Event),
            "UNINSTALL" => Some(Phase::Uninstall),
            "OAUTH_CALLBACK" => Some(Phase::OauthCallback),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Ping => "PING",
            Phase::Confirmation => "CONFIRMATION",
            Phase::Configuration => "CONFIGURATION",
            Phase::Install => "INSTALL",
            Phase::Update => "UPDATE",
            Phase::Event => "EVENT",
            Phase::Uninstall => "UNINSTALL",
            Phase::OauthCallback => "OAUTH_CALLBACK",
        }
    }

    /// Response key of this phase's empty acknowledgement, e.g. `{"installData":{}}`
    pub fn ack_key(&self) -> Option<&'static str> {
        match self {
            Phase::Ping => Some("pingData"),
            Phase::Confirmation => None,
            Phase::Configuration => Some("configurationData"),
            Phase::Install => Some("installData"),
            Phase::Update => Some("updateData"),
            Phase::Event => Some("eventData"),
            Phase::Uninstall => Some("uninstallData"),
            Phase::OauthCallback => Some("oAuthCallbackData"),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Inbound lifecycle messages
// ============================================================================

/// One webhook call from the platform, decoded by its `lifecycle` tag
#[derive(Debug, Clone)]
pub enum LifecycleMessage {
    Ping(PingData),
    Confirmation(ConfirmationData),
    Configuration(ConfigurationRequest),
    Install(LifecycleData),
    Update(LifecycleData),
    Event(EventEnvelope),
    Uninstall { installed_app_id: Option<String> },
    OauthCallback,
    Unknown(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingData {
    pub challenge: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationData {
    #[serde(default)]
    pub app_id: Option<String>,
    pub confirmation_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationRequest {
    Initialize { installed_app_id: Option<String> },
    Page { page_id: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigurationData {
    #[serde(default)]
    installed_app_id: Option<String>,
    phase: String,
    #[serde(default)]
    page_id: Option<String>,
}

/// Shared payload of INSTALL and UPDATE
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleData {
    pub auth_token: AuthToken,
    pub installed_app: InstalledApp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledApp {
    pub installed_app_id: String,
    #[serde(default)]
    pub location_id: Option<String>,
    #[serde(default)]
    pub config: HashMap<String, Vec<ConfigEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    #[serde(default)]
    pub value_type: String,
    #[serde(default)]
    pub device_config: Option<DeviceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub device_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PingWire {
    ping_data: PingData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationWire {
    confirmation_data: ConfirmationData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigurationWire {
    configuration_data: ConfigurationData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallWire {
    install_data: LifecycleData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateWire {
    update_data: LifecycleData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventWire {
    event_data: serde_json::Map<String, Value>,
}

fn payload<T: DeserializeOwned>(value: Value, phase: Phase) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::MalformedPayload { phase, source })
}

impl LifecycleMessage {
    /// Decode a raw webhook body.
    ///
    /// An unrecognized `lifecycle` tag is not an error and yields `Unknown`.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(body).map_err(DecodeError::InvalidJson)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let tag = value
            .get("lifecycle")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingLifecycle)?;

        let phase = match Phase::parse(tag) {
            Some(phase) => phase,
            None => return Ok(LifecycleMessage::Unknown(tag.to_string())),
        };

        let message = match phase {
            Phase::Ping => {
                let wire: PingWire = payload(value, phase)?;
                LifecycleMessage::Ping(wire.ping_data)
            }
            Phase::Confirmation => {
                let wire: ConfirmationWire = payload(value, phase)?;
                LifecycleMessage::Confirmation(wire.confirmation_data)
            }
            Phase::Configuration => {
                let wire: ConfigurationWire = payload(value, phase)?;
                let data = wire.configuration_data;
                match data.phase.as_str() {
                    "INITIALIZE" => LifecycleMessage::Configuration(ConfigurationRequest::Initialize {
                        installed_app_id: data.installed_app_id,
                    }),
                    "PAGE" => LifecycleMessage::Configuration(ConfigurationRequest::Page {
                        page_id: data.page_id.unwrap_or_default(),
                    }),
                    other => {
                        return Err(DecodeError::UnsupportedConfigurationPhase(other.to_string()))
                    }
                }
            }
            Phase::Install => {
                let wire: InstallWire = payload(value, phase)?;
                LifecycleMessage::Install(wire.install_data)
            }
            Phase::Update => {
                let wire: UpdateWire = payload(value, phase)?;
                LifecycleMessage::Update(wire.update_data)
            }
            Phase::Event => {
                let wire: EventWire = payload(value, phase)?;
                LifecycleMessage::Event(EventEnvelope::from_event_data(wire.event_data))
            }
            Phase::Uninstall => LifecycleMessage::Uninstall {
                installed_app_id: value
                    .pointer("/uninstallData/installedApp/installedAppId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            Phase::OauthCallback => LifecycleMessage::OauthCallback,
        };

        Ok(message)
    }
}

// ============================================================================
// Installed app context
// ============================================================================

/// Bearer token issued by the platform for one lifecycle call.
/// Never printed.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Devices picked by the user, keyed by setting id ("sensors", "lights", ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelection {
    roles: BTreeMap<String, Vec<String>>,
}

impl DeviceSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device under a role, ignoring duplicates
    pub fn insert(&mut self, role: impl Into<String>, device_id: impl Into<String>) {
        let devices = self.roles.entry(role.into()).or_default();
        let device_id = device_id.into();
        if !devices.contains(&device_id) {
            devices.push(device_id);
        }
    }

    pub fn from_config(config: &HashMap<String, Vec<ConfigEntry>>) -> Self {
        let mut selection = Self::new();
        for (role, entries) in config {
            for entry in entries {
                if entry.value_type != "DEVICE" {
                    continue;
                }
                if let Some(device) = &entry.device_config {
                    selection.insert(role.as_str(), device.device_id.as_str());
                }
            }
        }
        selection
    }

    /// Every selected device across all roles, first occurrence wins
    pub fn devices(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for device_id in self.roles.values().flatten() {
            if !out.contains(&device_id.as_str()) {
                out.push(device_id);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.roles.values().all(Vec::is_empty)
    }
}

impl<R, D> FromIterator<(R, D)> for DeviceSelection
where
    R: Into<String>,
    D: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (R, D)>>(iter: I) -> Self {
        let mut selection = Self::new();
        for (role, device_id) in iter {
            selection.insert(role, device_id);
        }
        selection
    }
}

#[derive(Debug, Clone)]
pub struct InstalledAppContext {
    pub installed_app_id: String,
    pub credential: AuthToken,
    pub selection: DeviceSelection,
}

impl From<LifecycleData> for InstalledAppContext {
    fn from(data: LifecycleData) -> Self {
        Self {
            selection: DeviceSelection::from_config(&data.installed_app.config),
            installed_app_id: data.installed_app.installed_app_id,
            credential: data.auth_token,
        }
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// A subscription as held by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub id: String,
    pub device_id: String,
    pub component_id: String,
    pub capability: String,
    pub attribute: String,
    pub subscription_name: Option<String>,
}

impl SubscriptionRecord {
    /// A subscription we can only identify, not describe
    pub fn id_only(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_id: String::new(),
            component_id: String::new(),
            capability: String::new(),
            attribute: String::new(),
            subscription_name: None,
        }
    }
}

/// Subscription to create for one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub device_id: String,
    pub component_id: String,
    pub capability: String,
    pub attribute: String,
    pub subscription_name: String,
}

// ============================================================================
// Events
// ============================================================================

/// EVENT payload, kept as raw JSON so that envelope shapes can be matched later
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub auth_token: Option<AuthToken>,
    pub installed_app_id: Option<String>,
    pub body: serde_json::Map<String, Value>,
}

impl EventEnvelope {
    pub fn from_event_data(body: serde_json::Map<String, Value>) -> Self {
        let auth_token = body
            .get("authToken")
            .and_then(Value::as_str)
            .map(AuthToken::new);
        let installed_app_id = body
            .get("installedApp")
            .and_then(|app| app.get("installedAppId"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            auth_token,
            installed_app_id,
            body,
        }
    }
}

/// A device event as delivered by the platform, in either envelope shape
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDeviceEvent {
    pub device_id: String,
    #[serde(default)]
    pub capability: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
}

impl RawDeviceEvent {
    /// The value as text; strings are taken verbatim
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Normalized occupancy signal derived from one device event
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEvent {
    pub device_id: String,
    pub raw_value: String,
    pub occupied: bool,
    pub timestamp: DateTime<Utc>,
}

/// Payload broadcast to real-time clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SensorUpdate {
    pub device_id: String,
    pub status: String,
    pub is_occupied: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<&CanonicalEvent> for SensorUpdate {
    fn from(event: &CanonicalEvent) -> Self {
        Self {
            device_id: event.device_id.clone(),
            status: event.raw_value.clone(),
            is_occupied: event.occupied,
            timestamp: event.timestamp,
        }
    }
}
