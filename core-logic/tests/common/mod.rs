#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use core_logic::{
    Account, Clock, ContractQueryError, Credential, FailureReason, Receipt, RpcEndpoint,
    TokenAmount, TokenTarget, TransferClient, TransferError,
};
use ethers::types::{Address, H256};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const KEY_A: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const KEY_B: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const TOKEN: &str = "0x20c0000000000000000000000000000000000001";
pub const PRIMARY: &str = "http://primary.test";
pub const SECONDARY: &str = "http://secondary.test";

pub fn account(key: &str) -> Account {
    let credential = Credential::from_private_key(key).unwrap();
    Account::new(credential, TokenTarget::erc20(10218, TOKEN.parse().unwrap()))
}

pub fn recipients(n: u8) -> Vec<Address> {
    (1..=n).map(|i| Address::repeat_byte(i)).collect()
}

/// Clock that never really sleeps. Sleeping records the duration and moves
/// `now` forward. Optionally cancels a token once a number of sleeps happened.
pub struct FakeClock {
    now: Mutex<DateTime<Local>>,
    sleeps: Mutex<Vec<Duration>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl FakeClock {
    pub fn starting_at(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
            cancel_after: Mutex::new(None),
        }
    }

    pub fn morning() -> Self {
        Self::starting_at(Local.with_ymd_and_hms(2026, 6, 10, 6, 0, 0).single().unwrap())
    }

    pub fn cancel_after(&self, sleeps: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((sleeps, token));
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(duration);
            sleeps.len()
        };
        {
            let mut now = self.now.lock().unwrap();
            *now += ChronoDuration::from_std(duration).unwrap();
        }
        if let Some((limit, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if count >= *limit {
                token.cancel();
            }
        }
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone)]
pub struct SentTransfer {
    pub host: String,
    pub sender: Address,
    pub recipient: Address,
    pub amount: TokenAmount,
}

/// Scripted transfer client. Hosts listed in `failing` always fail.
pub struct MockClient {
    decimals: Option<u8>,
    failing: HashSet<String>,
    precision_queries: AtomicUsize,
    sent: Mutex<Vec<SentTransfer>>,
    in_flight: Mutex<HashMap<Address, usize>>,
    max_in_flight_per_sender: AtomicUsize,
}

impl MockClient {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: Some(decimals),
            failing: HashSet::new(),
            precision_queries: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            in_flight: Mutex::new(HashMap::new()),
            max_in_flight_per_sender: AtomicUsize::new(0),
        }
    }

    pub fn without_decimals() -> Self {
        Self {
            decimals: None,
            ..Self::new(0)
        }
    }

    pub fn failing_on(mut self, host: &str) -> Self {
        self.failing.insert(host.to_string());
        self
    }

    pub fn precision_queries(&self) -> usize {
        self.precision_queries.load(Ordering::SeqCst)
    }

    /// Highest number of transfers one sender ever had open at once.
    pub fn max_in_flight_per_sender(&self) -> usize {
        self.max_in_flight_per_sender.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<SentTransfer> {
        self.sent.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<SentTransfer> {
        self.sent()
            .into_iter()
            .filter(|t| !self.failing.contains(&t.host))
            .collect()
    }
}

fn host(endpoint: &RpcEndpoint) -> String {
    endpoint.url.host_str().unwrap_or_default().to_string()
}

#[async_trait]
impl TransferClient for MockClient {
    async fn fetch_precision(
        &self,
        endpoint: &RpcEndpoint,
        target: &TokenTarget,
        _credential: &Credential,
    ) -> Result<u8, ContractQueryError> {
        self.precision_queries.fetch_add(1, Ordering::SeqCst);
        self.decimals.ok_or_else(|| ContractQueryError {
            token: target.asset.to_string(),
            endpoint: endpoint.as_str().to_string(),
            reason: "execution reverted".to_string(),
        })
    }

    async fn transfer(
        &self,
        endpoint: &RpcEndpoint,
        _target: &TokenTarget,
        credential: &Credential,
        recipient: Address,
        amount: &TokenAmount,
    ) -> Result<Receipt, TransferError> {
        let host = host(endpoint);
        let sender = credential.address();
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            let open = in_flight.entry(sender).or_insert(0);
            *open += 1;
            self.max_in_flight_per_sender.fetch_max(*open, Ordering::SeqCst);
        }
        // Give other tasks a chance to start a transfer while this one is open.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        if let Some(open) = self.in_flight.lock().unwrap().get_mut(&sender) {
            *open -= 1;
        }

        let n = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentTransfer {
                host: host.clone(),
                sender,
                recipient,
                amount: amount.clone(),
            });
            sent.len()
        };

        if self.failing.contains(&host) {
            return Err(TransferError::new(
                FailureReason::Network,
                format!("connection refused by {}", host),
            ));
        }

        Ok(Receipt {
            tx_hash: H256::from_low_u64_be(n as u64),
            block_number: Some(100 + n as u64),
            endpoint: endpoint.as_str().to_string(),
        })
    }
}

/// In-memory log sink for asserting on emitted lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
