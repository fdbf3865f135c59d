use crate::error::{ContractQueryError, TransferError};
use crate::types::{Receipt, TokenAmount, TokenTarget};
use crate::utils::endpoint_pool::RpcEndpoint;
use crate::utils::wallet_manager::{Account, Credential};
use anyhow::Result;
use async_trait::async_trait;
use ethers::types::Address;
use std::ops::AddAssign;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub success: u64,
    pub failed: u64,
    pub attempts: u64,
}

impl DispatchStats {
    pub fn total(&self) -> u64 {
        self.success + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            (self.success as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

impl AddAssign for DispatchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.success += rhs.success;
        self.failed += rhs.failed;
        self.attempts += rhs.attempts;
    }
}

/// Submits single token transfers. Implementations never retry.
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Decimal precision of the target asset.
    async fn fetch_precision(
        &self,
        endpoint: &RpcEndpoint,
        target: &TokenTarget,
        credential: &Credential,
    ) -> Result<u8, ContractQueryError>;

    /// Sends `amount` to `recipient` and waits for confirmation.
    async fn transfer(
        &self,
        endpoint: &RpcEndpoint,
        target: &TokenTarget,
        credential: &Credential,
        recipient: Address,
        amount: &TokenAmount,
    ) -> Result<Receipt, TransferError>;
}

/// Cheap liveness check against one endpoint.
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    /// Returns the latest block number the endpoint reports.
    async fn check(&self, endpoint: &RpcEndpoint) -> Result<u64>;
}

/// Persisted ordered list of recipient addresses.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Address>>;

    async fn save(&self, recipients: &[Address]) -> Result<()>;

    /// Appends to the stored list, keeping existing order.
    async fn append(&self, recipients: &[Address]) -> Result<usize> {
        let mut all = self.load().await?;
        all.extend_from_slice(recipients);
        self.save(&all).await?;
        Ok(all.len())
    }
}

/// Source of already-validated signing accounts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self, chain_id: u64) -> Result<Vec<Account>>;

    async fn append(&self, accounts: &[Account]) -> Result<()>;
}
