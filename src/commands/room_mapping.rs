//! Sensor -> light mapping, loaded once at startup

use std::collections::HashMap;

/// Immutable after construction. Device ids compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct RoomMapping {
    lights: HashMap<String, String>,
}

impl RoomMapping {
    pub fn new(entries: &HashMap<String, String>) -> Self {
        let lights = entries
            .iter()
            .map(|(sensor, light)| (sensor.to_ascii_lowercase(), light.clone()))
            .collect();
        Self { lights }
    }

    /// Light mapped to a sensor, if any
    pub fn light_for(&self, sensor_id: &str) -> Option<&str> {
        self.lights
            .get(&sensor_id.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

impl<S, L> FromIterator<(S, L)> for RoomMapping
where
    S: Into<String>,
    L: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (S, L)>>(iter: I) -> Self {
        let lights = iter
            .into_iter()
            .map(|(sensor, light)| {
                let sensor: String = sensor.into();
                (sensor.to_ascii_lowercase(), light.into())
            })
            .collect();
        Self { lights }
    }
}
