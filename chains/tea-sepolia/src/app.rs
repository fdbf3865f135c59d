//! Wires configuration, stores and the ethers client into a dispatcher.

use crate::client::EvmTransferClient;
use crate::config::TeaConfig;
use crate::probe::RpcProbe;
use anyhow::{Context, Result};
use core_logic::{
    parse_account_pairs, Account, CredentialStore, DispatchConfig, DispatchError, DispatchStats,
    Dispatcher, EndpointProbe, FileCredentialStore, FileRecipientStore, RecipientStore,
    SessionScheduler, TokioClock, WorkerRunner,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct App {
    pub config: TeaConfig,
    chain_id: u64,
    probe: RpcProbe,
    credentials: FileCredentialStore,
    recipients: Arc<FileRecipientStore>,
}

impl App {
    /// Probes the configured endpoints and resolves the chain id.
    /// Fails when no endpoint answers.
    pub async fn connect(config: TeaConfig) -> Result<Self> {
        let pool = config.endpoint_pool()?;
        let probe = RpcProbe::new(PROBE_TIMEOUT)?;
        let live = pool.probe(&probe).await?;

        let chain_id = match config.chain_id {
            Some(id) => id,
            None => probe
                .chain_id(live)
                .await
                .context("Could not query chain id")?,
        };
        info!(
            "Connected to chain {} via {} ({} endpoint(s) configured)",
            chain_id,
            live.as_str(),
            pool.len()
        );

        Ok(Self {
            credentials: FileCredentialStore::new(&config.accounts_file),
            recipients: Arc::new(FileRecipientStore::new(&config.recipients_file)),
            config,
            chain_id,
            probe,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn credentials(&self) -> &FileCredentialStore {
        &self.credentials
    }

    pub fn recipients(&self) -> &FileRecipientStore {
        &self.recipients
    }

    /// Adds `url` to the endpoint list, then checks whether it answers.
    /// A silent endpoint is kept; it only gets a warning.
    pub async fn add_endpoint(&mut self, url: &str) -> Result<Option<u64>> {
        let endpoint = self.config.add_rpc_url(url)?;
        match self.probe.check(&endpoint).await {
            Ok(block) => Ok(Some(block)),
            Err(e) => {
                warn!("{} did not respond: {:#}", endpoint.as_str(), e);
                Ok(None)
            }
        }
    }

    /// Accounts from the credential file followed by inline config pairs.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = self.credentials.load(self.chain_id).await?;

        if let Some(inline) = self.config.accounts.as_deref() {
            let parsed = parse_account_pairs(inline, self.chain_id);
            for err in &parsed.rejected {
                warn!("Skipping inline account: {}", err);
            }
            accounts.extend(parsed.accounts);
        }

        Ok(accounts)
    }

    /// Snapshot of the current settings as a ready dispatcher.
    pub async fn dispatcher(&self) -> Result<Dispatcher> {
        let config = DispatchConfig::new(
            self.accounts().await?,
            self.config.amount_range()?,
            self.config.delay_range()?,
            self.config.schedule()?,
            self.config.credential_scope,
        )?;
        let pool = Arc::new(self.config.endpoint_pool()?);
        let client = Arc::new(EvmTransferClient::new(self.config.confirmation_timeout())?);

        for account in config.accounts_in_scope() {
            if let Some(primary) = pool.primary() {
                match client
                    .balance_of(primary, &account.target, account.credential.address())
                    .await
                {
                    Ok(balance) => info!(
                        "{} holds {} base units of {}",
                        account.credential.label(),
                        balance,
                        account.target.asset
                    ),
                    Err(e) => warn!(
                        "Balance check failed for {}: {:#}",
                        account.credential.label(),
                        e
                    ),
                }
            }
        }

        Ok(Dispatcher::new(config, pool, client, Arc::new(TokioClock)))
    }

    /// One immediate dispatch of `count` transfers per account in scope.
    pub async fn run_batch(&self, count: u32) -> Result<DispatchStats> {
        let recipients = self.recipients.load().await?;
        if recipients.is_empty() {
            return Err(DispatchError::EmptyRecipientList.into());
        }
        let dispatcher = self.dispatcher().await?;

        info!(
            "Starting batch of {} transfer(s) across {} recipient(s)",
            count,
            recipients.len()
        );
        let stats = WorkerRunner::run_until_shutdown(|token| async move {
            dispatcher
                .run_session("Batch", &recipients, count, &token)
                .await
        })
        .await;
        Ok(stats)
    }

    /// The daily schedule, until Ctrl+C.
    pub async fn run_schedule(&self) -> Result<DispatchStats> {
        let dispatcher = Arc::new(self.dispatcher().await?);
        let recipients: Arc<dyn RecipientStore> = self.recipients.clone();
        let scheduler = SessionScheduler::new(dispatcher, recipients);

        let stats =
            WorkerRunner::run_until_shutdown(|token| async move { scheduler.run(&token).await })
                .await;
        Ok(stats)
    }
}
