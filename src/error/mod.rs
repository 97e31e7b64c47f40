//! Error handling module

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::Phase;

/// Failure talking to the platform's subscription/command API
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Platform returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Inbound lifecycle payload that could not be decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Missing lifecycle field")]
    MissingLifecycle,

    #[error("Malformed {phase} payload: {source}")]
    MalformedPayload {
        phase: Phase,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported configuration phase: {0}")]
    UnsupportedConfigurationPhase(String),
}

impl DecodeError {
    /// Phase declared by the payload, when it got that far
    pub fn phase(&self) -> Option<Phase> {
        match self {
            DecodeError::MalformedPayload { phase, .. } => Some(*phase),
            DecodeError::UnsupportedConfigurationPhase(_) => Some(Phase::Configuration),
            DecodeError::InvalidJson(_) | DecodeError::MissingLifecycle => None,
        }
    }
}
