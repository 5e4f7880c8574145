// ABOUTME: Bounded fixed-delay retry for network connect and disconnect calls.
// ABOUTME: Honors the shared cancellation token before every attempt and while waiting.

use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::runtime::{NetworkError, NetworkOps};
use crate::types::{ContainerId, NetworkRef};

use super::error::ReconcileError;

/// Fixed attempt count with a constant delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    Cancelled,
    Exhausted { attempts: u32, last: E },
}

impl RetryPolicy {
    /// Run `op` until it succeeds, attempts run out, or `cancel` fires.
    ///
    /// An attempt already issued is never interrupted; cancellation is
    /// observed before each attempt and during the delay.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(last) if attempt >= attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last,
                    });
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "attempt failed, retrying");
                    if !sleep_or_cancel(self.delay, cancel).await {
                        return Err(RetryError::Cancelled);
                    }
                }
            }
        }
    }
}

/// Sleep for `duration`. Returns false if cancelled first.
pub(crate) async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn into_reconcile_error(
    operation: &'static str,
    network: &NetworkRef,
    err: RetryError<NetworkError>,
) -> ReconcileError {
    match err {
        RetryError::Cancelled => ReconcileError::Cancelled,
        RetryError::Exhausted { attempts, last } => ReconcileError::RetryExhausted {
            operation,
            network: network.to_string(),
            attempts,
            message: last.to_string(),
        },
    }
}

/// Connect with retry. An existing membership counts as success.
pub(crate) async fn connect_network<R: NetworkOps>(
    runtime: &R,
    container: &ContainerId,
    network: &NetworkRef,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<(), ReconcileError> {
    policy
        .run(cancel, || async move {
            match runtime.connect_to_network(container, &network.id).await {
                Ok(()) | Err(NetworkError::AlreadyConnected(_)) => Ok(()),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| into_reconcile_error("connect", network, e))
}

/// Forced disconnect with retry. A missing membership counts as success.
pub(crate) async fn disconnect_network<R: NetworkOps>(
    runtime: &R,
    container: &ContainerId,
    network: &NetworkRef,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<(), ReconcileError> {
    policy
        .run(cancel, || async move {
            match runtime
                .disconnect_from_network(container, &network.id, true)
                .await
            {
                Ok(()) | Err(NetworkError::NotConnected(_)) => Ok(()),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| into_reconcile_error("disconnect", network, e))
}
