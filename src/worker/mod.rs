//! Background execution of lifecycle follow-up work
//!
//! Each submitted unit runs on its own tokio task. Units are independent:
//! no ordering between them and no cancellation.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::events::EventDispatcher;
use crate::lifecycle::AsyncWork;
use crate::subscription::SubscriptionReconciler;

#[derive(Clone)]
pub struct TaskRunner {
    reconciler: Arc<SubscriptionReconciler>,
    dispatcher: Arc<EventDispatcher>,
    http_client: reqwest::Client,
}

impl TaskRunner {
    pub fn new(
        reconciler: Arc<SubscriptionReconciler>,
        dispatcher: Arc<EventDispatcher>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            reconciler,
            dispatcher,
            http_client,
        }
    }

    /// Spawn the work and return immediately
    pub fn submit(&self, work: AsyncWork) -> JoinHandle<()> {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(work).await })
    }

    async fn run(&self, work: AsyncWork) {
        let kind = work.kind();
        let start_time = Instant::now();

        match work {
            AsyncWork::Confirm(url) => self.confirm(&url).await,
            AsyncWork::Reconcile(ctx) => {
                self.reconciler.reconcile(&ctx).await;
            }
            AsyncWork::Dispatch(envelope) => {
                let report = self.dispatcher.dispatch(&envelope).await;
                tracing::debug!(
                    "[Worker] Dispatched {} device events: {} broadcasts, {} commands ({} failed)",
                    report.device_events,
                    report.broadcasts,
                    report.commands_sent,
                    report.commands_failed
                );
            }
        }

        tracing::debug!(
            "[Worker] {} finished in {}ms",
            kind,
            start_time.elapsed().as_millis()
        );
    }

    /// GET the confirmation URL once. Failure is logged, never retried.
    async fn confirm(&self, url: &str) {
        match self.http_client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("[Worker] App registration confirmed");
            }
            Ok(response) => {
                tracing::warn!("[Worker] Confirmation URL returned {}", response.status());
            }
            Err(e) => {
                tracing::warn!("[Worker] Failed to fetch confirmation URL: {}", e);
            }
        }
    }
}
