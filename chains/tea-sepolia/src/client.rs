use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{
    Asset, ContractQueryError, Credential, FailureReason, Receipt, RpcEndpoint, TokenAmount,
    TokenTarget, TransferClient, TransferError, NATIVE_DECIMALS,
};
use ethers::prelude::*;
use ethers::types::transaction::eip2718::TypedTransaction;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

ethers::contract::abigen!(
    IERC20,
    r#"[
        function transfer(address to, uint256 amount) returns (bool)
        function balanceOf(address owner) view returns (uint256)
        function decimals() view returns (uint8)
    ]"#
);

/// Shared HTTP client for every provider this process creates.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}

pub fn provider_for(endpoint: &RpcEndpoint, http: &Client) -> Provider<Http> {
    Provider::new(Http::new_with_client(endpoint.url.clone(), http.clone()))
}

/// Sends native or ERC-20 transfers as EIP-1559 transactions and waits for
/// one confirmation.
pub struct EvmTransferClient {
    http: Client,
    confirmation_timeout: Duration,
}

impl EvmTransferClient {
    pub fn new(confirmation_timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            confirmation_timeout,
        })
    }

    /// Token balance of `owner`, in base units.
    pub async fn balance_of(
        &self,
        endpoint: &RpcEndpoint,
        target: &TokenTarget,
        owner: Address,
    ) -> Result<U256> {
        let provider = provider_for(endpoint, &self.http);
        match target.asset {
            Asset::Native => Ok(provider.get_balance(owner, None).await?),
            Asset::Erc20(contract) => {
                let token = IERC20::new(contract, Arc::new(provider));
                Ok(token.balance_of(owner).call().await?)
            }
        }
    }
}

#[async_trait]
impl TransferClient for EvmTransferClient {
    async fn fetch_precision(
        &self,
        endpoint: &RpcEndpoint,
        target: &TokenTarget,
        _credential: &Credential,
    ) -> Result<u8, ContractQueryError> {
        match target.asset {
            Asset::Native => Ok(NATIVE_DECIMALS),
            Asset::Erc20(contract) => {
                let token = IERC20::new(contract, Arc::new(provider_for(endpoint, &self.http)));
                token
                    .decimals()
                    .call()
                    .await
                    .map_err(|e| ContractQueryError {
                        token: target.asset.to_string(),
                        endpoint: endpoint.as_str().to_string(),
                        reason: e.to_string(),
                    })
            }
        }
    }

    async fn transfer(
        &self,
        endpoint: &RpcEndpoint,
        target: &TokenTarget,
        credential: &Credential,
        recipient: Address,
        amount: &TokenAmount,
    ) -> Result<Receipt, TransferError> {
        let value = amount
            .to_base_units()
            .map_err(|e| TransferError::new(FailureReason::Other, format!("{:#}", e)))?;

        let wallet = credential.wallet().clone().with_chain_id(target.chain_id);
        let client = Arc::new(SignerMiddleware::new(
            provider_for(endpoint, &self.http),
            wallet,
        ));

        let tx: TypedTransaction = match target.asset {
            Asset::Native => Eip1559TransactionRequest::new()
                .to(recipient)
                .value(value)
                .into(),
            Asset::Erc20(contract) => IERC20::new(contract, client.clone())
                .transfer(recipient, value)
                .tx,
        };

        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(|e| TransferError::from_message(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        debug!("Submitted {:?} via {}", tx_hash, endpoint.as_str());

        let receipt = tokio::time::timeout(self.confirmation_timeout, pending)
            .await
            .map_err(|_| {
                TransferError::new(
                    FailureReason::ConfirmationTimeout,
                    format!(
                        "{:?} not confirmed within {}s",
                        tx_hash,
                        self.confirmation_timeout.as_secs()
                    ),
                )
            })?
            .map_err(|e| TransferError::from_message(e.to_string()))?
            .ok_or_else(|| {
                TransferError::new(
                    FailureReason::Other,
                    format!("{:?} dropped from the mempool", tx_hash),
                )
            })?;

        if receipt.status != Some(U64::from(1)) {
            return Err(TransferError::new(
                FailureReason::Reverted,
                format!("{:?} reverted in block {:?}", tx_hash, receipt.block_number),
            ));
        }

        Ok(Receipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|b| b.as_u64()),
            endpoint: endpoint.as_str().to_string(),
        })
    }
}
