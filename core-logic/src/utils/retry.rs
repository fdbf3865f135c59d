//! Fixed retry escalation for a single transfer.
//!
//! Each step names the pool slot to use and the pause taken before it.
//! The pauses are fixed, never sampled.

use crate::utils::clock::{pause, Clock};
use crate::utils::endpoint_pool::{EndpointPool, EndpointSlot, RpcEndpoint};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryStep {
    pub slot: EndpointSlot,
    pub pause: Duration,
}

impl RetryStep {
    pub const fn new(slot: EndpointSlot, pause: Duration) -> Self {
        Self { slot, pause }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationPolicy {
    steps: Vec<RetryStep>,
}

/// Primary now, secondary after 10s, primary again after 120s.
impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            steps: vec![
                RetryStep::new(EndpointSlot::Primary, Duration::ZERO),
                RetryStep::new(EndpointSlot::Secondary, Duration::from_secs(10)),
                RetryStep::new(EndpointSlot::Primary, Duration::from_secs(120)),
            ],
        }
    }
}

impl EscalationPolicy {
    pub fn new(steps: Vec<RetryStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[RetryStep] {
        &self.steps
    }

    pub fn max_attempts(&self) -> usize {
        self.steps.len()
    }
}

/// How an escalated operation ended.
#[derive(Debug)]
pub enum Escalation<T, E> {
    Succeeded { value: T, attempts: usize },
    Exhausted { last_error: Option<E>, attempts: usize },
    Cancelled { attempts: usize },
}

impl<T, E> Escalation<T, E> {
    pub fn attempts(&self) -> usize {
        match self {
            Escalation::Succeeded { attempts, .. }
            | Escalation::Exhausted { attempts, .. }
            | Escalation::Cancelled { attempts } => *attempts,
        }
    }
}

/// Runs `operation` through the policy's steps until one succeeds.
///
/// Health bookkeeping on the pool is updated after every attempt.
pub async fn escalate<T, E, F, Fut>(
    policy: &EscalationPolicy,
    pool: &EndpointPool,
    clock: &dyn Clock,
    token: &CancellationToken,
    operation_name: &str,
    mut operation: F,
) -> Escalation<T, E>
where
    E: std::fmt::Display,
    F: FnMut(RpcEndpoint, usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error = None;
    let mut attempts = 0;

    for (i, step) in policy.steps().iter().enumerate() {
        if i > 0 && !pause(clock, step.pause, token).await {
            return Escalation::Cancelled { attempts };
        }

        let Some(endpoint) = pool.slot(step.slot) else {
            warn!("{}: no endpoint for {:?} slot", operation_name, step.slot);
            continue;
        };

        attempts += 1;
        let url = endpoint.as_str().to_string();
        match operation(endpoint.clone(), attempts).await {
            Ok(value) => {
                pool.record_success(&url);
                if attempts > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempts);
                }
                return Escalation::Succeeded { value, attempts };
            }
            Err(e) => {
                pool.record_failure(&url);
                let next = policy.steps().get(i + 1);
                match next {
                    Some(next) => warn!(
                        "{} failed (attempt {}/{}) via {}: {}. Retrying via {:?} in {}s",
                        operation_name,
                        attempts,
                        policy.max_attempts(),
                        url,
                        e,
                        next.slot,
                        next.pause.as_secs()
                    ),
                    None => debug!(
                        "{} failed on final attempt {} via {}: {}",
                        operation_name, attempts, url, e
                    ),
                }
                last_error = Some(e);
            }
        }
    }

    Escalation::Exhausted {
        last_error,
        attempts,
    }
}
