//! Webhook handler - the platform's single entry point

use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;

use crate::state::AppState;

/// POST /webhook - answer the lifecycle handshake, queue its side effect.
///
/// Always 200: the platform treats anything else as a delivery failure
/// and may disable the app. The body is taken raw so that malformed JSON
/// reaches the router instead of being rejected by an extractor. Only
/// bodies above `server.max_body_bytes` are refused, with 413.
pub async fn webhook(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let (response, work) = state.router.route(&body);

    if let Some(work) = work {
        tracing::debug!("Queueing {} work", work.kind());
        state.runner.submit(work);
    }

    Json(response.to_json())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::json;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use crate::api;
    use crate::config::Config;
    use crate::error::DirectoryError;
    use crate::models::{AuthToken, NewSubscription, SubscriptionRecord};
    use crate::smartthings::testing::InMemoryDirectory;
    use crate::smartthings::{CreateOutcome, DeviceCommand, DirectoryClient};
    use crate::state::AppState;

    fn app(config: &Config, directory: Arc<dyn DirectoryClient>) -> (Router, AppState) {
        let state = AppState::new(config, directory, reqwest::Client::new());
        let router = api::routes(&config.server.webhook_path, config.server.max_body_bytes)
            .with_state(state.clone());
        (router, state)
    }

    /// Directory whose listing blocks until the test releases it
    #[derive(Default)]
    struct StalledDirectory {
        listing: Notify,
        release: Notify,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl DirectoryClient for StalledDirectory {
        async fn list_subscriptions(
            &self,
            _installed_app_id: &str,
            _credential: &AuthToken,
        ) -> Result<Vec<SubscriptionRecord>, DirectoryError> {
            self.listing.notify_one();
            self.release.notified().await;
            Ok(Vec::new())
        }

        async fn create_subscription(
            &self,
            _installed_app_id: &str,
            _subscription: &NewSubscription,
            _credential: &AuthToken,
        ) -> Result<CreateOutcome, DirectoryError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(CreateOutcome::AlreadyExists)
        }

        async fn delete_subscription(
            &self,
            _installed_app_id: &str,
            _subscription_id: &str,
            _credential: &AuthToken,
        ) -> Result<(), DirectoryError> {
            Ok(())
        }

        async fn send_command(
            &self,
            _device_id: &str,
            _command: &DeviceCommand,
            _credential: &AuthToken,
        ) -> Result<(), DirectoryError> {
            Ok(())
        }
    }

    async fn post(app: Router, body: impl Into<Body>) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/json")
                    .body(body.into())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met in time");
    }

    #[tokio::test]
    async fn test_ping_over_http() {
        let directory = Arc::new(InMemoryDirectory::new());
        let (app, _) = app(&Config::default(), directory.clone());

        let (status, body) = post(
            app,
            json!({ "lifecycle": "PING", "pingData": { "challenge": "c-1" } }).to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "pingData": { "challenge": "c-1" } }));
    }

    #[tokio::test]
    async fn test_garbage_still_returns_200() {
        let directory = Arc::new(InMemoryDirectory::new());
        let (app, _) = app(&Config::default(), directory.clone());

        let (status, body) = post(app, "definitely not json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_install_then_update_reconciles_in_background() {
        let directory = Arc::new(InMemoryDirectory::new());
        let config = Config::default();

        let install = |lifecycle: &str, key: &str, devices: &[&str]| {
            let entries: Vec<_> = devices
                .iter()
                .map(|d| json!({ "valueType": "DEVICE", "deviceConfig": { "deviceId": d, "componentId": "main" } }))
                .collect();
            json!({
                "lifecycle": lifecycle,
                key: {
                    "authToken": "tok",
                    "installedApp": { "installedAppId": "A1", "config": { "sensors": entries } }
                }
            })
            .to_string()
        };

        let (app_router, _) = app(&config, directory.clone());
        let (status, body) = post(app_router, install("INSTALL", "installData", &["d1", "d2"])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "installData": {} }));
        wait_for(|| directory.subscribed_devices() == ["d1", "d2"]).await;

        let (app_router, _) = app(&config, directory.clone());
        let (_, body) = post(app_router, install("UPDATE", "updateData", &["d2", "d3"])).await;
        assert_eq!(body, json!({ "updateData": {} }));
        wait_for(|| directory.subscribed_devices() == ["d2", "d3"]).await;
    }

    #[tokio::test]
    async fn test_event_is_broadcast_and_switches_light() {
        let directory = Arc::new(InMemoryDirectory::new());
        let mut config = Config::default();
        config.room_mapping.insert("s1".to_string(), "l1".to_string());
        let (app, state) = app(&config, directory.clone());
        let mut rx = state.broadcaster.subscribe();

        let (status, body) = post(
            app,
            json!({
                "lifecycle": "EVENT",
                "eventData": {
                    "authToken": "tok",
                    "installedApp": { "installedAppId": "A1" },
                    "events": [{
                        "eventTime": "2024-05-01T10:00:00Z",
                        "eventType": "DEVICE_EVENT",
                        "deviceEvent": {
                            "deviceId": "s1", "componentId": "main",
                            "capability": "motionSensor", "attribute": "motion", "value": "active"
                        }
                    }]
                }
            })
            .to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "eventData": {} }));

        let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.event, "sensor-update");
        assert_eq!(message.data.device_id, "s1");
        assert!(message.data.is_occupied);

        wait_for(|| !directory.commands().is_empty()).await;
        let commands = directory.commands();
        assert_eq!(commands[0].0, "l1");
        assert_eq!(commands[0].1.command, "on");
    }

    #[tokio::test]
    async fn test_response_does_not_wait_for_reconcile() {
        let directory = Arc::new(StalledDirectory::default());
        let (app, _) = app(&Config::default(), directory.clone());

        let (status, body) = post(
            app,
            json!({
                "lifecycle": "INSTALL",
                "installData": {
                    "authToken": "tok",
                    "installedApp": {
                        "installedAppId": "A1",
                        "config": { "sensors": [
                            { "valueType": "DEVICE", "deviceConfig": { "deviceId": "d1" } }
                        ] }
                    }
                }
            })
            .to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "installData": {} }));

        // The reconcile has started but is still parked on the listing
        tokio::time::timeout(Duration::from_secs(1), directory.listing.notified())
            .await
            .unwrap();
        assert_eq!(directory.creates.load(Ordering::SeqCst), 0);

        directory.release.notify_one();
        wait_for(|| directory.creates.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn test_large_event_body_is_accepted() {
        let directory = Arc::new(InMemoryDirectory::new());
        let (app, _) = app(&Config::default(), directory.clone());

        // Above axum's 2 MB default, below the configured limit
        let padding = "x".repeat(3 * 1024 * 1024);
        let (status, body) = post(
            app,
            json!({
                "lifecycle": "EVENT",
                "eventData": { "authToken": "tok", "events": [], "padding": padding }
            })
            .to_string(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "eventData": {} }));
    }

    #[tokio::test]
    async fn test_health() {
        let directory = Arc::new(InMemoryDirectory::new());
        let (app, _) = app(&Config::default(), directory.clone());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }
}
