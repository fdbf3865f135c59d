//! # Randomized Dispatch Loop
//!
//! Sends a fixed number of transfers for one account. Each transfer goes to
//! a random recipient with a random amount, is retried through the
//! escalation policy, and is followed by a random delay. A transfer that
//! exhausts its retries is logged and skipped; it never stops the batch.

use crate::config::DispatchConfig;
use crate::error::{ContractQueryError, DispatchError};
use crate::traits::{DispatchStats, TransferClient};
use crate::types::TokenTarget;
use crate::utils::clock::{pause, Clock};
use crate::utils::endpoint_pool::EndpointPool;
use crate::utils::logger::{SESSION_TARGET, TRANSFER_TARGET};
use crate::utils::retry::{escalate, Escalation};
use crate::utils::wallet_manager::Account;
use ethers::types::Address;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Dispatcher {
    config: DispatchConfig,
    pool: Arc<EndpointPool>,
    client: Arc<dyn TransferClient>,
    clock: Arc<dyn Clock>,
    precision: Mutex<HashMap<TokenTarget, u8>>,
    seed: Option<u64>,
    invocations: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        config: DispatchConfig,
        pool: Arc<EndpointPool>,
        client: Arc<dyn TransferClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            pool,
            client,
            clock,
            precision: Mutex::new(HashMap::new()),
            seed: None,
            invocations: AtomicU64::new(0),
        }
    }

    /// Makes recipient, amount and delay sampling reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn rng(&self) -> StdRng {
        let n = self.invocations.fetch_add(1, Ordering::SeqCst);
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(n)),
            None => StdRng::from_entropy(),
        }
    }

    fn cached_precision(&self, target: &TokenTarget) -> Option<u8> {
        self.precision
            .lock()
            .ok()
            .and_then(|cache| cache.get(target).copied())
    }

    /// Decimal precision for the account's token, queried on the primary
    /// and then the secondary endpoint. Only successes are cached.
    pub async fn precision_for(&self, account: &Account) -> Result<u8, ContractQueryError> {
        if let Some(decimals) = self.cached_precision(&account.target) {
            return Ok(decimals);
        }

        let mut candidates = Vec::new();
        if let Some(primary) = self.pool.primary() {
            candidates.push(primary);
        }
        if let Some(secondary) = self.pool.secondary() {
            if candidates.iter().all(|c| c.as_str() != secondary.as_str()) {
                candidates.push(secondary);
            }
        }

        let mut last_error = ContractQueryError {
            token: account.target.asset.to_string(),
            endpoint: "-".to_string(),
            reason: "endpoint pool is empty".to_string(),
        };

        for endpoint in candidates {
            match self
                .client
                .fetch_precision(endpoint, &account.target, &account.credential)
                .await
            {
                Ok(decimals) => {
                    if let Ok(mut cache) = self.precision.lock() {
                        cache.insert(account.target, decimals);
                    }
                    debug!("{} uses {} decimals", account.target, decimals);
                    return Ok(decimals);
                }
                Err(e) => {
                    warn!("{}", e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Sends exactly `count` transfers from one account, unless cancelled.
    pub async fn run_batch(
        &self,
        account: &Account,
        recipients: &[Address],
        count: u32,
        token: &CancellationToken,
    ) -> Result<DispatchStats, DispatchError> {
        if recipients.is_empty() {
            return Err(DispatchError::EmptyRecipientList);
        }

        let decimals = self.precision_for(account).await?;
        self.config.amount.check_precision(decimals)?;
        let wallet = account.credential.label();
        let mut rng = self.rng();
        let mut stats = DispatchStats::default();

        let client = self.client.as_ref();
        let credential = &account.credential;
        let target = &account.target;

        for i in 1..=count {
            if token.is_cancelled() {
                info!(target: SESSION_TARGET, "[{}] Stopping at transfer {}/{} (cancelled)", wallet, i, count);
                break;
            }

            let Some(&recipient) = recipients.choose(&mut rng) else {
                break;
            };
            let amount = self.config.amount.sample(&mut rng, decimals)?;
            let amount_ref = &amount;

            let started = Instant::now();
            let op_name = format!("[{}] transfer {}/{}", wallet, i, count);
            let outcome = escalate(
                &self.config.retry,
                &self.pool,
                self.clock.as_ref(),
                token,
                &op_name,
                move |endpoint, _attempt| async move {
                    client
                        .transfer(&endpoint, target, credential, recipient, amount_ref)
                        .await
                },
            )
            .await;

            stats.attempts += outcome.attempts() as u64;

            match outcome {
                Escalation::Succeeded { value, attempts } => {
                    stats.success += 1;
                    info!(
                        target: TRANSFER_TARGET,
                        "[{}] SUCCESS #{}/{} sent {} {} to {:?} | tx {:?} | via {} (try {}) in {:.1}s",
                        wallet,
                        i,
                        count,
                        amount,
                        target.asset,
                        recipient,
                        value.tx_hash,
                        value.endpoint,
                        attempts,
                        started.elapsed().as_secs_f64()
                    );
                }
                Escalation::Exhausted {
                    last_error,
                    attempts,
                } => {
                    stats.failed += 1;
                    let reason = last_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "no endpoint available".to_string());
                    error!(
                        target: TRANSFER_TARGET,
                        "[{}] FAILED #{}/{} {} {} to {:?} after {} tries: {}",
                        wallet,
                        i,
                        count,
                        amount,
                        target.asset,
                        recipient,
                        attempts,
                        reason
                    );
                }
                Escalation::Cancelled { .. } => {
                    info!(target: SESSION_TARGET, "[{}] Transfer {}/{} abandoned (cancelled)", wallet, i, count);
                    break;
                }
            }

            if i < count {
                let delay = self.config.delay.sample(&mut rng);
                debug!("[{}] waiting {}s before next transfer", wallet, delay.as_secs());
                if !pause(self.clock.as_ref(), delay, token).await {
                    break;
                }
            }
        }

        Ok(stats)
    }

    /// Runs one batch of `count` for every account in scope. Accounts that
    /// share a credential run one after another; distinct credentials run
    /// side by side.
    pub async fn run_session(
        &self,
        label: &str,
        recipients: &[Address],
        count: u32,
        token: &CancellationToken,
    ) -> DispatchStats {
        let runs = group_by_credential(self.config.accounts_in_scope())
            .into_iter()
            .map(|group| async move {
                let mut stats = DispatchStats::default();
                for account in group {
                    if token.is_cancelled() {
                        break;
                    }
                    stats += self.run_account(label, account, recipients, count, token).await;
                }
                stats
            });

        let mut total = DispatchStats::default();
        for stats in join_all(runs).await {
            total += stats;
        }

        for status in self.pool.health_status() {
            info!(
                target: SESSION_TARGET,
                "{} RPC {} | healthy: {} | failures: {} | latency: {}ms",
                label,
                status.url,
                status.healthy,
                status.failure_count,
                status.latency_ms
            );
        }
        total
    }

    async fn run_account(
        &self,
        label: &str,
        account: &Account,
        recipients: &[Address],
        count: u32,
        token: &CancellationToken,
    ) -> DispatchStats {
        match self.run_batch(account, recipients, count, token).await {
            Ok(stats) => stats,
            Err(e) => {
                error!(
                    target: SESSION_TARGET,
                    "{} skipped for {}: {}",
                    label,
                    account.credential.label(),
                    e
                );
                DispatchStats::default()
            }
        }
    }
}

/// Groups accounts by signing address, keeping first-seen order.
fn group_by_credential(accounts: &[Account]) -> Vec<Vec<&Account>> {
    let mut groups: Vec<Vec<&Account>> = Vec::new();
    for account in accounts {
        let address = account.credential.address();
        match groups
            .iter_mut()
            .find(|g| g[0].credential.address() == address)
        {
            Some(group) => group.push(account),
            None => groups.push(vec![account]),
        }
    }
    groups
}
