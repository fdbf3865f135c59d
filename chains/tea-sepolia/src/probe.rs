use crate::client::{http_client, provider_for};
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{EndpointProbe, RpcEndpoint};
use ethers::providers::Middleware;
use reqwest::Client;
use std::time::Duration;

/// Liveness check via `eth_blockNumber`, bounded by a timeout.
pub struct RpcProbe {
    http: Client,
    timeout: Duration,
}

impl RpcProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            timeout,
        })
    }

    pub async fn chain_id(&self, endpoint: &RpcEndpoint) -> Result<u64> {
        let provider = provider_for(endpoint, &self.http);
        let id = tokio::time::timeout(self.timeout, provider.get_chainid())
            .await
            .with_context(|| format!("eth_chainId timed out on {}", endpoint.as_str()))??;
        Ok(id.as_u64())
    }
}

#[async_trait]
impl EndpointProbe for RpcProbe {
    async fn check(&self, endpoint: &RpcEndpoint) -> Result<u64> {
        let provider = provider_for(endpoint, &self.http);
        let block = tokio::time::timeout(self.timeout, provider.get_block_number())
            .await
            .with_context(|| format!("eth_blockNumber timed out on {}", endpoint.as_str()))??;
        Ok(block.as_u64())
    }
}
