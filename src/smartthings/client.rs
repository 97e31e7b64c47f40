//! reqwest-backed SmartThings API client

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{CreateOutcome, DeviceCommand, DirectoryClient};
use crate::error::DirectoryError;
use crate::models::{AuthToken, NewSubscription, SubscriptionRecord};

pub struct SmartThingsClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct PagedItems<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "_links", default)]
    links: Option<PageLinks>,
}

#[derive(Debug, Deserialize)]
struct PageLinks {
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionItem {
    id: String,
    #[serde(default)]
    source_type: Option<String>,
    #[serde(default)]
    device: Option<DeviceSubscription>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceSubscription {
    device_id: String,
    #[serde(default)]
    component_id: Option<String>,
    #[serde(default)]
    capability: Option<String>,
    #[serde(default)]
    attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    state_change_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    subscription_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSubscriptionRequest<'a> {
    source_type: &'static str,
    device: &'a DeviceSubscription,
}

#[derive(Debug, Serialize)]
struct CommandRequest<'a> {
    commands: Vec<CommandItem<'a>>,
}

#[derive(Debug, Serialize)]
struct CommandItem<'a> {
    component: &'a str,
    capability: &'a str,
    command: &'a str,
    arguments: Vec<serde_json::Value>,
}

impl SubscriptionItem {
    fn into_record(self) -> Option<SubscriptionRecord> {
        let id = self.id;
        let device = self.device?;
        Some(SubscriptionRecord {
            id,
            device_id: device.device_id,
            component_id: device.component_id.unwrap_or_else(|| "main".to_string()),
            capability: device.capability.unwrap_or_default(),
            attribute: device.attribute.unwrap_or_default(),
            subscription_name: device.subscription_name,
        })
    }
}

impl SmartThingsClient {
    pub fn new(base_url: &str) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, DirectoryError> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };

        Ok(Self {
            client,
            base_url: Url::parse(&normalized)?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DirectoryError> {
        Ok(self.base_url.join(path)?)
    }

    fn subscriptions_url(&self, installed_app_id: &str) -> Result<Url, DirectoryError> {
        self.endpoint(&format!("installedapps/{}/subscriptions", installed_app_id))
    }

    async fn check(response: Response) -> Result<Response, DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(DirectoryError::Status { status, body })
    }
}

#[async_trait]
impl DirectoryClient for SmartThingsClient {
    async fn list_subscriptions(
        &self,
        installed_app_id: &str,
        credential: &AuthToken,
    ) -> Result<Vec<SubscriptionRecord>, DirectoryError> {
        let mut records = Vec::new();
        let mut next = Some(self.subscriptions_url(installed_app_id)?);

        while let Some(url) = next.take() {
            let response = self
                .client
                .get(url)
                .bearer_auth(credential.expose())
                .send()
                .await?;
            let page: PagedItems<SubscriptionItem> = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| DirectoryError::Decode(e.to_string()))?;

            for item in page.items {
                let id = item.id.clone();
                let is_device = item.source_type.as_deref().map_or(true, |t| t == "DEVICE");
                match item.into_record() {
                    Some(record) if is_device => records.push(record),
                    _ => {
                        // Non-device and incomplete subscriptions are still ours to remove
                        tracing::debug!("Subscription {} kept by id only", id);
                        records.push(SubscriptionRecord::id_only(id));
                    }
                }
            }

            next = match page.links.and_then(|l| l.next) {
                Some(link) => Some(Url::parse(&link.href)?),
                None => None,
            };
        }

        Ok(records)
    }

    async fn create_subscription(
        &self,
        installed_app_id: &str,
        subscription: &NewSubscription,
        credential: &AuthToken,
    ) -> Result<CreateOutcome, DirectoryError> {
        let device = DeviceSubscription {
            device_id: subscription.device_id.clone(),
            component_id: Some(subscription.component_id.clone()),
            capability: Some(subscription.capability.clone()),
            attribute: Some(subscription.attribute.clone()),
            value: Some("*".to_string()),
            state_change_only: Some(true),
            subscription_name: Some(subscription.subscription_name.clone()),
        };
        let body = CreateSubscriptionRequest {
            source_type: "DEVICE",
            device: &device,
        };

        let response = self
            .client
            .post(self.subscriptions_url(installed_app_id)?)
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let item: SubscriptionItem = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))?;

        item.into_record()
            .map(CreateOutcome::Created)
            .ok_or_else(|| DirectoryError::Decode("created subscription has no device".to_string()))
    }

    async fn delete_subscription(
        &self,
        installed_app_id: &str,
        subscription_id: &str,
        credential: &AuthToken,
    ) -> Result<(), DirectoryError> {
        let url = self.endpoint(&format!(
            "installedapps/{}/subscriptions/{}",
            installed_app_id, subscription_id
        ))?;

        let response = self
            .client
            .delete(url)
            .bearer_auth(credential.expose())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn send_command(
        &self,
        device_id: &str,
        command: &DeviceCommand,
        credential: &AuthToken,
    ) -> Result<(), DirectoryError> {
        let url = self.endpoint(&format!("devices/{}/commands", device_id))?;
        let body = CommandRequest {
            commands: vec![CommandItem {
                component: &command.component,
                capability: &command.capability,
                command: &command.command,
                arguments: Vec::new(),
            }],
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
