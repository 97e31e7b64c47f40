//! Lifecycle router - maps a webhook call to its handshake response and
//! the background work it triggers
//!
//! Routing is pure: no I/O happens here. Anything that talks to the
//! platform is returned as `AsyncWork` and executed after the response
//! has been produced.

pub mod manifest;

use serde_json::{json, Map, Value};

use self::manifest::{InitializeResponse, PageResponse};
use crate::config::AppManifestConfig;
use crate::models::{
    ConfigurationRequest, EventEnvelope, InstalledAppContext, LifecycleMessage, Phase, PingData,
};

/// Body returned to the platform for one lifecycle call
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeResponse {
    Ping(PingData),
    Confirmation { target_url: String },
    Initialize(InitializeResponse),
    Page(PageResponse),
    /// Empty acknowledgement; `None` when the phase is unknown
    Ack(Option<Phase>),
}

impl HandshakeResponse {
    pub fn to_json(&self) -> Value {
        match self {
            HandshakeResponse::Ping(data) => json!({ "pingData": data }),
            HandshakeResponse::Confirmation { target_url } => json!({ "targetUrl": target_url }),
            HandshakeResponse::Initialize(init) => {
                json!({ "configurationData": { "initialize": init } })
            }
            HandshakeResponse::Page(page) => json!({ "configurationData": { "page": page } }),
            HandshakeResponse::Ack(phase) => {
                let mut body = Map::new();
                if let Some(key) = phase.and_then(|p| p.ack_key()) {
                    body.insert(key.to_string(), Value::Object(Map::new()));
                }
                Value::Object(body)
            }
        }
    }
}

/// Follow-up work to run off the request path
#[derive(Debug, Clone)]
pub enum AsyncWork {
    /// Visit the CONFIRMATION url
    Confirm(String),
    Reconcile(InstalledAppContext),
    Dispatch(EventEnvelope),
}

impl AsyncWork {
    pub fn kind(&self) -> &'static str {
        match self {
            AsyncWork::Confirm(_) => "confirm",
            AsyncWork::Reconcile(_) => "reconcile",
            AsyncWork::Dispatch(_) => "dispatch",
        }
    }
}

pub struct LifecycleRouter {
    manifest: AppManifestConfig,
    auto_confirm: bool,
}

impl LifecycleRouter {
    pub fn new(manifest: AppManifestConfig, auto_confirm: bool) -> Self {
        Self {
            manifest,
            auto_confirm,
        }
    }

    /// Decode and handle a raw body. Never fails: undecodable payloads get
    /// the acknowledgement of whatever phase they declared.
    pub fn route(&self, body: &[u8]) -> (HandshakeResponse, Option<AsyncWork>) {
        match LifecycleMessage::decode(body) {
            Ok(msg) => self.handle(msg),
            Err(e) => {
                tracing::warn!("[Lifecycle] Malformed webhook payload: {}", e);
                (HandshakeResponse::Ack(e.phase()), None)
            }
        }
    }

    pub fn handle(&self, msg: LifecycleMessage) -> (HandshakeResponse, Option<AsyncWork>) {
        match msg {
            LifecycleMessage::Ping(data) => {
                tracing::info!("[Lifecycle] PING");
                (HandshakeResponse::Ping(data), None)
            }
            LifecycleMessage::Confirmation(data) => {
                tracing::info!(
                    "[Lifecycle] CONFIRMATION for app {}: {}",
                    data.app_id.as_deref().unwrap_or("-"),
                    data.confirmation_url
                );
                let work = self
                    .auto_confirm
                    .then(|| AsyncWork::Confirm(data.confirmation_url.clone()));
                (
                    HandshakeResponse::Confirmation {
                        target_url: data.confirmation_url,
                    },
                    work,
                )
            }
            LifecycleMessage::Configuration(ConfigurationRequest::Initialize { installed_app_id }) => {
                tracing::debug!(
                    "[Lifecycle] CONFIGURATION/INITIALIZE for {}",
                    installed_app_id.as_deref().unwrap_or("new install")
                );
                (
                    HandshakeResponse::Initialize(manifest::initialize(&self.manifest)),
                    None,
                )
            }
            LifecycleMessage::Configuration(ConfigurationRequest::Page { page_id }) => {
                if page_id != self.manifest.first_page_id {
                    tracing::debug!(
                        "[Lifecycle] Unknown page '{}', serving page {}",
                        page_id,
                        self.manifest.first_page_id
                    );
                }
                (HandshakeResponse::Page(manifest::page(&self.manifest)), None)
            }
            LifecycleMessage::Install(data) => {
                let location = data.installed_app.location_id.clone();
                let ctx = InstalledAppContext::from(data);
                tracing::info!(
                    "[Lifecycle] INSTALL {} (location {}) with {} devices",
                    ctx.installed_app_id,
                    location.as_deref().unwrap_or("-"),
                    ctx.selection.devices().len()
                );
                (
                    HandshakeResponse::Ack(Some(Phase::Install)),
                    Some(AsyncWork::Reconcile(ctx)),
                )
            }
            LifecycleMessage::Update(data) => {
                let location = data.installed_app.location_id.clone();
                let ctx = InstalledAppContext::from(data);
                tracing::info!(
                    "[Lifecycle] UPDATE {} (location {}) with {} devices",
                    ctx.installed_app_id,
                    location.as_deref().unwrap_or("-"),
                    ctx.selection.devices().len()
                );
                (
                    HandshakeResponse::Ack(Some(Phase::Update)),
                    Some(AsyncWork::Reconcile(ctx)),
                )
            }
            LifecycleMessage::Event(envelope) => {
                tracing::debug!(
                    "[Lifecycle] EVENT for {}",
                    envelope.installed_app_id.as_deref().unwrap_or("-")
                );
                (
                    HandshakeResponse::Ack(Some(Phase::Event)),
                    Some(AsyncWork::Dispatch(envelope)),
                )
            }
            LifecycleMessage::Uninstall { installed_app_id } => {
                tracing::info!(
                    "[Lifecycle] UNINSTALL {}",
                    installed_app_id.as_deref().unwrap_or("-")
                );
                (HandshakeResponse::Ack(Some(Phase::Uninstall)), None)
            }
            LifecycleMessage::OauthCallback => {
                tracing::debug!("[Lifecycle] OAUTH_CALLBACK");
                (HandshakeResponse::Ack(Some(Phase::OauthCallback)), None)
            }
            LifecycleMessage::Unknown(tag) => {
                tracing::warn!("[Lifecycle] Unexpected lifecycle phase: {}", tag);
                (HandshakeResponse::Ack(None), None)
            }
        }
    }
}
