//! Makes the platform's subscription roster match a device selection
//!
//! Runs delete-all-then-create-all on every INSTALL/UPDATE. The remote
//! roster is the only source of truth; nothing is cached locally.
//! Overlapping runs for the same app are not coordinated, the last one
//! to finish wins.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::SubscriptionConfig;
use crate::models::{InstalledAppContext, NewSubscription};
use crate::smartthings::{CreateOutcome, DirectoryClient};

const NAME_PREFIX: &str = "occ_";

/// Namespace for name-based device UUIDs
const SUBSCRIPTION_NAMESPACE: Uuid = Uuid::from_u128(0x6f63_6375_7061_4e63_8b1d_7375_6273_6372);

/// Deterministic subscription name for a device.
///
/// `occ_` followed by the hex form of a v5 UUID over the device id. Fits
/// the platform's 36 character limit without truncating the id away.
pub fn subscription_name(device_id: &str) -> String {
    let hash = Uuid::new_v5(&SUBSCRIPTION_NAMESPACE, device_id.as_bytes());
    format!("{}{}", NAME_PREFIX, hash.simple())
}

/// Counters from one reconcile run, used for logging
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub deleted: usize,
    pub delete_failed: usize,
    pub created: usize,
    pub already_existed: usize,
    pub create_failed: usize,
}

pub struct SubscriptionReconciler {
    client: Arc<dyn DirectoryClient>,
    target: SubscriptionConfig,
}

impl SubscriptionReconciler {
    pub fn new(client: Arc<dyn DirectoryClient>, target: SubscriptionConfig) -> Self {
        Self { client, target }
    }

    /// Replace every subscription of the installed app with one per selected device.
    ///
    /// Remote failures are logged per call and never abort the run.
    pub async fn reconcile(&self, ctx: &InstalledAppContext) -> ReconcileReport {
        let app_id = ctx.installed_app_id.as_str();
        let mut report = ReconcileReport::default();

        if ctx.selection.is_empty() {
            tracing::info!("[Reconcile] {}: no devices selected, clearing subscriptions", app_id);
        }

        match self.client.list_subscriptions(app_id, &ctx.credential).await {
            Ok(existing) => {
                tracing::debug!(
                    "[Reconcile] {}: removing {} existing subscriptions",
                    app_id,
                    existing.len()
                );
                for record in existing {
                    match self
                        .client
                        .delete_subscription(app_id, &record.id, &ctx.credential)
                        .await
                    {
                        Ok(()) => report.deleted += 1,
                        Err(e) => {
                            report.delete_failed += 1;
                            tracing::warn!(
                                "[Reconcile] {}: failed to delete subscription {} ({}): {}",
                                app_id,
                                record.id,
                                record.device_id,
                                e
                            );
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "[Reconcile] {}: listing subscriptions failed, skipping cleanup: {}",
                    app_id,
                    e
                );
            }
        }

        for device_id in ctx.selection.devices() {
            let subscription = NewSubscription {
                device_id: device_id.to_string(),
                component_id: self.target.component.clone(),
                capability: self.target.capability.clone(),
                attribute: self.target.attribute.clone(),
                subscription_name: subscription_name(device_id),
            };

            match self
                .client
                .create_subscription(app_id, &subscription, &ctx.credential)
                .await
            {
                Ok(CreateOutcome::Created(record)) => {
                    report.created += 1;
                    tracing::debug!(
                        "[Reconcile] {}: subscribed {} as {}",
                        app_id,
                        device_id,
                        record.id
                    );
                }
                Ok(CreateOutcome::AlreadyExists) => {
                    report.already_existed += 1;
                    tracing::debug!("[Reconcile] {}: {} already subscribed", app_id, device_id);
                }
                Err(e) => {
                    report.create_failed += 1;
                    tracing::warn!(
                        "[Reconcile] {}: failed to subscribe {}: {}",
                        app_id,
                        device_id,
                        e
                    );
                }
            }
        }

        tracing::info!(
            "[Reconcile] {}: deleted={} created={} existing={} failed={}",
            app_id,
            report.deleted,
            report.created,
            report.already_existed,
            report.delete_failed + report.create_failed
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthToken, DeviceSelection};
    use crate::smartthings::testing::InMemoryDirectory;

    const MAX_NAME_LEN: usize = 36;

    fn context(devices: &[&str]) -> InstalledAppContext {
        InstalledAppContext {
            installed_app_id: "A1".to_string(),
            credential: AuthToken::new("token"),
            selection: devices.iter().map(|d| ("sensors", *d)).collect::<DeviceSelection>(),
        }
    }

    fn reconciler(directory: &Arc<InMemoryDirectory>) -> SubscriptionReconciler {
        SubscriptionReconciler::new(directory.clone(), SubscriptionConfig::default())
    }

    #[test]
    fn test_subscription_name_is_deterministic() {
        let id = "3f1b5a8e-1c2d-4e5f-8a9b-0c1d2e3f4a5b";
        assert_eq!(subscription_name(id), subscription_name(id));
        assert!(subscription_name("d1").starts_with("occ_"));
        assert_eq!(subscription_name(id).len(), MAX_NAME_LEN);
        assert!(subscription_name(id).chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_subscription_name_separates_similar_ids() {
        let long_a = format!("{}A", "x".repeat(40));
        let long_b = format!("{}B", "x".repeat(40));
        assert_ne!(subscription_name("a-1"), subscription_name("a1"));
        assert_ne!(subscription_name(&long_a), subscription_name(&long_b));
        assert_ne!(subscription_name("D1"), subscription_name("d1"));
    }

    #[tokio::test]
    async fn test_similar_ids_each_get_a_subscription() {
        let directory = Arc::new(InMemoryDirectory::new());
        let long_a = format!("{}A", "x".repeat(40));
        let long_b = format!("{}B", "x".repeat(40));
        let devices = ["a-1", "a1", long_a.as_str(), long_b.as_str()];

        let report = reconciler(&directory).reconcile(&context(&devices)).await;

        assert_eq!(report.created, 4);
        assert_eq!(report.already_existed, 0);
        let mut expected: Vec<String> = devices.iter().map(|d| d.to_string()).collect();
        expected.sort();
        assert_eq!(directory.subscribed_devices(), expected);
    }

    #[tokio::test]
    async fn test_update_replaces_roster() {
        let directory = Arc::new(InMemoryDirectory::new());
        let reconciler = reconciler(&directory);

        let report = reconciler.reconcile(&context(&["d1", "d2"])).await;
        assert_eq!(report.created, 2);
        assert_eq!(report.deleted, 0);
        assert_eq!(directory.subscribed_devices(), vec!["d1", "d2"]);

        let report = reconciler.reconcile(&context(&["d2", "d3"])).await;
        assert_eq!(report.deleted, 2);
        assert_eq!(report.created, 2);
        assert_eq!(directory.subscribed_devices(), vec!["d2", "d3"]);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let directory = Arc::new(InMemoryDirectory::new());
        let reconciler = reconciler(&directory);

        reconciler.reconcile(&context(&["d1", "d2"])).await;
        reconciler.reconcile(&context(&["d1", "d2"])).await;

        assert_eq!(directory.subscribed_devices(), vec!["d1", "d2"]);
        for record in directory.roster() {
            assert_eq!(record.capability, "motionSensor");
            assert_eq!(record.attribute, "motion");
        }
    }

    #[tokio::test]
    async fn test_already_exists_counts_as_success() {
        let directory = Arc::new(InMemoryDirectory::new());
        // Deletion of d1's subscription fails, so the create conflicts
        reconciler(&directory).reconcile(&context(&["d1"])).await;
        directory.fail_delete_for("d1");

        let report = reconciler(&directory).reconcile(&context(&["d1"])).await;
        assert_eq!(report.delete_failed, 1);
        assert_eq!(report.already_existed, 1);
        assert_eq!(report.create_failed, 0);
        assert_eq!(directory.subscribed_devices(), vec!["d1"]);
    }

    #[tokio::test]
    async fn test_empty_selection_clears_roster() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.seed("old1");
        directory.seed("old2");

        let report = reconciler(&directory).reconcile(&context(&[])).await;
        assert_eq!(report.deleted, 2);
        assert!(directory.subscribed_devices().is_empty());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.seed("stale1");
        directory.seed("stale2");
        directory.fail_delete_for("stale1");
        directory.fail_create_for("d2");

        let report = reconciler(&directory)
            .reconcile(&context(&["d1", "d2", "d3"]))
            .await;

        assert_eq!(report.delete_failed, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.create_failed, 1);
        assert_eq!(report.created, 2);
        assert_eq!(directory.subscribed_devices(), vec!["d1", "d3", "stale1"]);
    }

    #[tokio::test]
    async fn test_list_failure_still_creates() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.fail_list();

        let report = reconciler(&directory).reconcile(&context(&["d1"])).await;
        assert_eq!(report.deleted, 0);
        assert_eq!(report.created, 1);
    }
}
