//! Trait abstraction for the remote verification and submission endpoints

use crate::state::FormValues;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Transport-level failure of a gateway call.
///
/// Application-level outcomes (wrong code, invalid GSTIN, rejected
/// application) are successful calls carrying a negative answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl GatewayError {
    /// Transport failures and timeouts may succeed on a second attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Timeout(_))
    }
}

/// Backend answer to a form submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub success: bool,
    pub message: String,
}

/// Backend answer to a GSTIN lookup
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GstinDetails {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_slab: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_state: Option<String>,
}

impl GstinDetails {
    pub fn invalid() -> Self {
        Self::default()
    }
}

/// Phone verification by one-time code
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Send a code to the phone; `false` when the backend refused
    async fn send_code(&self, phone: &str) -> Result<bool, GatewayError>;

    /// Check a code for the phone; `false` when it is wrong
    async fn verify_code(&self, phone: &str, code: &str) -> Result<bool, GatewayError>;
}

/// GSTIN registry lookup
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GstinGateway: Send + Sync {
    async fn verify(&self, gstin: &str) -> Result<GstinDetails, GatewayError>;
}

/// Final application submission
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(&self, values: &FormValues) -> Result<SubmissionReceipt, GatewayError>;
}
