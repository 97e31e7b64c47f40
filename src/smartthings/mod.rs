//! SmartThings platform API - subscriptions and device commands

mod client;
#[cfg(test)]
pub(crate) mod testing;

pub use self::client::SmartThingsClient;

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::models::{AuthToken, NewSubscription, SubscriptionRecord};

/// Result of a subscription create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(SubscriptionRecord),
    /// The platform already holds an equivalent subscription (HTTP 409)
    AlreadyExists,
}

/// A single capability command sent to a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    pub component: String,
    pub capability: String,
    pub command: String,
}

/// Remote directory of subscriptions and device commands.
///
/// Every call is authenticated with the bearer token handed to us by the
/// lifecycle call that triggered it.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn list_subscriptions(
        &self,
        installed_app_id: &str,
        credential: &AuthToken,
    ) -> Result<Vec<SubscriptionRecord>, DirectoryError>;

    async fn create_subscription(
        &self,
        installed_app_id: &str,
        subscription: &NewSubscription,
        credential: &AuthToken,
    ) -> Result<CreateOutcome, DirectoryError>;

    async fn delete_subscription(
        &self,
        installed_app_id: &str,
        subscription_id: &str,
        credential: &AuthToken,
    ) -> Result<(), DirectoryError>;

    async fn send_command(
        &self,
        device_id: &str,
        command: &DeviceCommand,
        credential: &AuthToken,
    ) -> Result<(), DirectoryError>;
}
