//! # Core Logic - Endpoint Pool
//!
//! Ordered RPC endpoints. Index 0 is the primary, index 1 the secondary.
//! Transfers only ever fail over between those two; `probe` is the one
//! operation that scans the whole list.

use crate::error::{ConfigError, NetworkError};
use crate::traits::EndpointProbe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};
use url::Url;

/// Consecutive failures before an endpoint is reported unhealthy.
const UNHEALTHY_AFTER: u64 = 3;

/// RPC endpoint information
#[derive(Debug)]
pub struct RpcEndpoint {
    pub url: Url,
    last_latency_ms: AtomicU64,
    failure_count: AtomicU64,
    healthy: AtomicBool,
}

impl Clone for RpcEndpoint {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            last_latency_ms: AtomicU64::new(self.latency_ms()),
            failure_count: AtomicU64::new(self.failures()),
            healthy: AtomicBool::new(self.is_healthy()),
        }
    }
}

impl RpcEndpoint {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            last_latency_ms: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            healthy: AtomicBool::new(true),
        }
    }

    /// Validates `raw` as an http(s) URL.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidRpcUrl {
            url: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(Self::new(url)),
            "http" | "https" => Err(ConfigError::InvalidRpcUrl {
                url: trimmed.to_string(),
                reason: "missing host".to_string(),
            }),
            other => Err(ConfigError::InvalidRpcUrl {
                url: trimmed.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn latency_ms(&self) -> u64 {
        self.last_latency_ms.load(Ordering::SeqCst)
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failure_count.load(Ordering::SeqCst)
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        self.healthy.store(true, Ordering::SeqCst);
    }

    fn record_failure(&self) {
        let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= UNHEALTHY_AFTER && self.healthy.swap(false, Ordering::SeqCst) {
            warn!(
                "Marking RPC {} as unhealthy after {} failures",
                self.url, failures
            );
        }
    }
}

/// Health status of an RPC endpoint
#[derive(Debug, Clone)]
pub struct RpcHealthStatus {
    pub url: String,
    pub latency_ms: u64,
    pub healthy: bool,
    pub failure_count: u64,
}

/// Which pool slot a transfer attempt goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSlot {
    Primary,
    Secondary,
}

/// Ordered endpoint list with primary/secondary failover.
#[derive(Debug, Clone, Default)]
pub struct EndpointPool {
    endpoints: Vec<RpcEndpoint>,
}

impl EndpointPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pool from URL strings, rejecting the first malformed one.
    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> Result<Self, ConfigError> {
        let mut pool = Self::new();
        for url in urls {
            pool.add(url.as_ref())?;
        }
        Ok(pool)
    }

    /// Appends a candidate endpoint.
    pub fn add(&mut self, url: &str) -> Result<&RpcEndpoint, ConfigError> {
        let endpoint = RpcEndpoint::parse(url)?;
        self.endpoints.push(endpoint);
        Ok(&self.endpoints[self.endpoints.len() - 1])
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn primary(&self) -> Option<&RpcEndpoint> {
        self.endpoints.first()
    }

    /// Index 1, or the primary when the pool holds a single endpoint.
    pub fn secondary(&self) -> Option<&RpcEndpoint> {
        self.endpoints.get(1).or_else(|| self.primary())
    }

    pub fn slot(&self, slot: EndpointSlot) -> Option<&RpcEndpoint> {
        match slot {
            EndpointSlot::Primary => self.primary(),
            EndpointSlot::Secondary => self.secondary(),
        }
    }

    /// Get all endpoint URLs
    pub fn urls(&self) -> Vec<&str> {
        self.endpoints.iter().map(|e| e.as_str()).collect()
    }

    /// Returns the first endpoint, in order, that answers the probe.
    pub async fn probe(&self, prober: &dyn EndpointProbe) -> Result<&RpcEndpoint, NetworkError> {
        for endpoint in &self.endpoints {
            let start = Instant::now();
            let outcome = prober.check(endpoint).await;
            let latency_ms = start.elapsed().as_millis() as u64;
            endpoint.last_latency_ms.store(latency_ms, Ordering::SeqCst);

            match outcome {
                Ok(block) => {
                    endpoint.record_success();
                    info!(
                        "RPC {} is healthy (block {}, latency {}ms)",
                        endpoint.url, block, latency_ms
                    );
                    return Ok(endpoint);
                }
                Err(e) => {
                    endpoint.record_failure();
                    warn!(
                        "RPC {} did not respond ({}ms): {:#}",
                        endpoint.url, latency_ms, e
                    );
                }
            }
        }

        Err(NetworkError::NoResponsiveEndpoint {
            tried: self.endpoints.len(),
        })
    }

    /// Record a successful request for an endpoint
    pub fn record_success(&self, url: &str) {
        if let Some(endpoint) = self.find(url) {
            endpoint.record_success();
        }
    }

    /// Record a failed request for an endpoint
    pub fn record_failure(&self, url: &str) {
        if let Some(endpoint) = self.find(url) {
            endpoint.record_failure();
        }
    }

    fn find(&self, url: &str) -> Option<&RpcEndpoint> {
        self.endpoints.iter().find(|e| e.as_str() == url)
    }

    /// Get all health statuses
    pub fn health_status(&self) -> Vec<RpcHealthStatus> {
        self.endpoints
            .iter()
            .map(|e| RpcHealthStatus {
                url: e.as_str().to_string(),
                latency_ms: e.latency_ms(),
                healthy: e.is_healthy(),
                failure_count: e.failures(),
            })
            .collect()
    }
}
