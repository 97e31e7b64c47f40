//! Static CONFIGURATION responses: app manifest and device-picker page

use serde::Serialize;

use crate::config::AppManifestConfig;

/// Read and execute on every device the user picks
const PERMISSIONS: [&str; 2] = ["r:devices:*", "x:devices:*"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    pub name: String,
    pub description: String,
    pub id: String,
    pub permissions: Vec<String>,
    pub first_page_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub page_id: String,
    pub name: String,
    pub next_page_id: Option<String>,
    pub previous_page_id: Option<String>,
    pub complete: bool,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub name: String,
    pub settings: Vec<DeviceSetting>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSetting {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub setting_type: &'static str,
    pub required: bool,
    pub multiple: bool,
    pub capabilities: Vec<String>,
    pub permissions: Vec<String>,
}

pub fn initialize(config: &AppManifestConfig) -> InitializeResponse {
    InitializeResponse {
        name: config.name.clone(),
        description: config.description.clone(),
        id: config.app_id.clone(),
        permissions: PERMISSIONS.iter().map(|p| p.to_string()).collect(),
        first_page_id: config.first_page_id.clone(),
    }
}

/// The single configuration page. It is always complete.
pub fn page(config: &AppManifestConfig) -> PageResponse {
    PageResponse {
        page_id: config.first_page_id.clone(),
        name: config.name.clone(),
        next_page_id: None,
        previous_page_id: None,
        complete: true,
        sections: vec![Section {
            name: "Sensors".to_string(),
            settings: vec![DeviceSetting {
                id: config.device_role.clone(),
                name: "Occupancy sensors".to_string(),
                description: "Tap to select motion or presence sensors".to_string(),
                setting_type: "DEVICE",
                required: true,
                multiple: true,
                capabilities: config.picker_capabilities.clone(),
                permissions: vec!["r".to_string(), "x".to_string()],
            }],
        }],
    }
}
