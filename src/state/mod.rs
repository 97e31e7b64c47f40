//! Shared application state

use std::sync::Arc;

use crate::commands::{CommandDispatcher, RoomMapping};
use crate::config::Config;
use crate::events::{EventDispatcher, EventNormalizer};
use crate::lifecycle::LifecycleRouter;
use crate::realtime::Broadcaster;
use crate::smartthings::DirectoryClient;
use crate::subscription::SubscriptionReconciler;
use crate::worker::TaskRunner;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<LifecycleRouter>,
    pub runner: TaskRunner,
    pub broadcaster: Broadcaster,
}

impl AppState {
    /// Wire every component around one directory client
    pub fn new(
        config: &Config,
        directory: Arc<dyn DirectoryClient>,
        http_client: reqwest::Client,
    ) -> Self {
        let broadcaster = Broadcaster::new(
            config.realtime.channel_capacity,
            config.realtime.topic.clone(),
        );
        let room_mapping = Arc::new(RoomMapping::new(&config.room_mapping));
        if room_mapping.is_empty() {
            tracing::info!("[Dispatch] No room mapping configured, lights will not be switched");
        } else {
            tracing::info!("[Dispatch] {} sensors mapped to lights", room_mapping.len());
        }

        let reconciler = Arc::new(SubscriptionReconciler::new(
            directory.clone(),
            config.subscription.clone(),
        ));
        let dispatcher = Arc::new(EventDispatcher::new(
            EventNormalizer::new(config.classification.clone()),
            broadcaster.clone(),
            CommandDispatcher::new(directory),
            room_mapping,
        ));

        let router = Arc::new(LifecycleRouter::new(
            config.app.clone(),
            config.smartthings.auto_confirm,
        ));

        Self {
            router,
            runner: TaskRunner::new(reconciler, dispatcher, http_client),
            broadcaster,
        }
    }
}
