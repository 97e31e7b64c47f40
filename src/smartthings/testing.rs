//! In-memory `DirectoryClient` used by unit tests

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{CreateOutcome, DeviceCommand, DirectoryClient};
use crate::error::DirectoryError;
use crate::models::{AuthToken, NewSubscription, SubscriptionRecord};

#[derive(Default)]
struct Inner {
    roster: Vec<SubscriptionRecord>,
    commands: Vec<(String, DeviceCommand)>,
    next_id: u32,
    failing_creates: HashSet<String>,
    failing_deletes: HashSet<String>,
    failing_commands: HashSet<String>,
    fail_list: bool,
}

/// Behaves like the platform: names are unique per installed app and a
/// duplicate create answers "already exists".
#[derive(Default)]
pub struct InMemoryDirectory {
    inner: Mutex<Inner>,
}

fn failure() -> DirectoryError {
    DirectoryError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "injected failure".to_string(),
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a subscription as if an earlier install had created it
    pub fn seed(&self, device_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("seed-{}", inner.next_id);
        inner.roster.push(SubscriptionRecord {
            id,
            device_id: device_id.to_string(),
            component_id: "main".to_string(),
            capability: "motionSensor".to_string(),
            attribute: "motion".to_string(),
            subscription_name: None,
        });
    }

    pub fn fail_create_for(&self, device_id: &str) {
        self.inner.lock().unwrap().failing_creates.insert(device_id.to_string());
    }

    pub fn fail_delete_for(&self, device_id: &str) {
        self.inner.lock().unwrap().failing_deletes.insert(device_id.to_string());
    }

    pub fn fail_command_for(&self, device_id: &str) {
        self.inner.lock().unwrap().failing_commands.insert(device_id.to_string());
    }

    pub fn fail_list(&self) {
        self.inner.lock().unwrap().fail_list = true;
    }

    /// Device ids currently subscribed, sorted
    pub fn subscribed_devices(&self) -> Vec<String> {
        let mut devices: Vec<String> = self
            .inner
            .lock()
            .unwrap()
            .roster
            .iter()
            .map(|r| r.device_id.clone())
            .collect();
        devices.sort();
        devices
    }

    pub fn roster(&self) -> Vec<SubscriptionRecord> {
        self.inner.lock().unwrap().roster.clone()
    }

    pub fn commands(&self) -> Vec<(String, DeviceCommand)> {
        self.inner.lock().unwrap().commands.clone()
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn list_subscriptions(
        &self,
        _installed_app_id: &str,
        _credential: &AuthToken,
    ) -> Result<Vec<SubscriptionRecord>, DirectoryError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_list {
            return Err(failure());
        }
        Ok(inner.roster.clone())
    }

    async fn create_subscription(
        &self,
        _installed_app_id: &str,
        subscription: &NewSubscription,
        _credential: &AuthToken,
    ) -> Result<CreateOutcome, DirectoryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_creates.contains(&subscription.device_id) {
            return Err(failure());
        }
        let exists = inner
            .roster
            .iter()
            .any(|r| r.subscription_name.as_deref() == Some(subscription.subscription_name.as_str()));
        if exists {
            return Ok(CreateOutcome::AlreadyExists);
        }

        inner.next_id += 1;
        let record = SubscriptionRecord {
            id: format!("sub-{}", inner.next_id),
            device_id: subscription.device_id.clone(),
            component_id: subscription.component_id.clone(),
            capability: subscription.capability.clone(),
            attribute: subscription.attribute.clone(),
            subscription_name: Some(subscription.subscription_name.clone()),
        };
        inner.roster.push(record.clone());
        Ok(CreateOutcome::Created(record))
    }

    async fn delete_subscription(
        &self,
        _installed_app_id: &str,
        subscription_id: &str,
        _credential: &AuthToken,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.inner.lock().unwrap();
        let position = inner.roster.iter().position(|r| r.id == subscription_id);
        match position {
            Some(index) if inner.failing_deletes.contains(&inner.roster[index].device_id) => {
                Err(failure())
            }
            Some(index) => {
                inner.roster.remove(index);
                Ok(())
            }
            None => Err(DirectoryError::Status {
                status: StatusCode::NOT_FOUND,
                body: String::new(),
            }),
        }
    }

    async fn send_command(
        &self,
        device_id: &str,
        command: &DeviceCommand,
        _credential: &AuthToken,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_commands.contains(device_id) {
            return Err(failure());
        }
        inner.commands.push((device_id.to_string(), command.clone()));
        Ok(())
    }
}
