//! Remote verification and submission endpoints
//!
//! The wizard talks to three collaborators: OTP delivery, GSTIN lookup and
//! application submission. Each call is bounded by a timeout; submissions
//! may additionally be retried on transport failures.

mod demo;
mod traits;

pub use demo::{state_for_code, DemoBackend, SUBMISSION_MESSAGE};
pub use traits::*;

use crate::state::FormValues;
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Default time limit for a single gateway call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout and retry settings applied to gateway calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Extra submission attempts after a retryable failure
    pub retries: usize,
    /// First backoff delay; doubles on each retry
    pub retry_delay: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl CallPolicy {
    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.retry_delay)
            .with_max_delay(self.retry_delay * 8)
            .with_max_times(self.retries)
    }
}

/// Run a gateway call, turning expiry of `limit` into [`GatewayError::Timeout`]
pub async fn call_with_timeout<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout(limit)),
    }
}

/// Submit with the policy's timeout, retrying transport failures only.
///
/// A receipt with `success: false` is a successful call and is never retried.
pub async fn submit_with_retry(
    gateway: &dyn SubmissionGateway,
    values: &FormValues,
    policy: CallPolicy,
) -> Result<SubmissionReceipt, GatewayError> {
    let op = || async move { call_with_timeout(policy.timeout, gateway.submit(values)).await };

    op.retry(policy.retry_strategy())
        .when(GatewayError::is_retryable)
        .notify(|err, dur| {
            warn!("Retrying submission after {:?}: {}", dur, err);
        })
        .await
}

/// Shared handles to the three collaborators.
///
/// Cloning is cheap so calls can be spawned without borrowing the wizard.
#[derive(Clone)]
pub struct Gateways {
    pub otp: Arc<dyn OtpGateway>,
    pub gstin: Arc<dyn GstinGateway>,
    pub submission: Arc<dyn SubmissionGateway>,
}

impl Gateways {
    pub fn new(
        otp: Arc<dyn OtpGateway>,
        gstin: Arc<dyn GstinGateway>,
        submission: Arc<dyn SubmissionGateway>,
    ) -> Self {
        Self {
            otp,
            gstin,
            submission,
        }
    }

    /// All three endpoints served by one [`DemoBackend`]
    pub fn demo(latency: Duration) -> Self {
        let backend = Arc::new(DemoBackend::new(latency));
        Self::new(backend.clone(), backend.clone(), backend)
    }
}

impl std::fmt::Debug for Gateways {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateways").finish_non_exhaustive()
    }
}
