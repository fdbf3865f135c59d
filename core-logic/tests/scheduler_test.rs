mod common;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveTime};
use common::*;
use core_logic::{
    next_occurrence, until, AmountRange, Clock, CredentialScope, DelayRange, DispatchConfig,
    Dispatcher, EndpointPool, RecipientStore, ScheduleConfig, SchedulerState, SessionScheduler,
};
use ethers::types::Address;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PAUSE: Duration = Duration::from_secs(65 * 60);

/// Hands out queued lists first, then `fallback` forever.
struct ScriptedStore {
    queued: Mutex<VecDeque<Vec<Address>>>,
    fallback: Vec<Address>,
    loads: AtomicUsize,
}

impl ScriptedStore {
    fn always(list: Vec<Address>) -> Self {
        Self::queued(Vec::new(), list)
    }

    fn queued(queued: Vec<Vec<Address>>, fallback: Vec<Address>) -> Self {
        Self {
            queued: Mutex::new(queued.into()),
            fallback,
            loads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecipientStore for ScriptedStore {
    async fn load(&self) -> anyhow::Result<Vec<Address>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let next = self.queued.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    async fn save(&self, _recipients: &[Address]) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Harness {
    scheduler: SessionScheduler,
    client: Arc<MockClient>,
    clock: Arc<FakeClock>,
    store: Arc<ScriptedStore>,
}

fn harness(daily_transfers: u32, store: ScriptedStore) -> Harness {
    let client = Arc::new(MockClient::new(18));
    let clock = Arc::new(FakeClock::morning());
    let store = Arc::new(store);

    let config = DispatchConfig::new(
        vec![account(KEY_A)],
        AmountRange::new(1.0, 2.0).unwrap(),
        DelayRange::new(0, 0).unwrap(),
        ScheduleConfig::default().with_daily_transfers(daily_transfers),
        CredentialScope::First,
    )
    .unwrap();
    let pool = EndpointPool::from_urls(&[PRIMARY]).unwrap();
    let dispatcher = Dispatcher::new(config, Arc::new(pool), client.clone(), clock.clone());
    let scheduler = SessionScheduler::new(Arc::new(dispatcher), store.clone());

    Harness {
        scheduler,
        client,
        clock,
        store,
    }
}

fn wake_at() -> NaiveTime {
    NaiveTime::from_hms_opt(7, 30, 0).unwrap()
}

#[tokio::test]
async fn test_cycle_pauses_between_sessions_then_waits_for_wake_time() {
    let h = harness(10, ScriptedStore::always(recipients(3)));
    let start = h.clock.now();
    let token = CancellationToken::new();
    h.clock.cancel_after(4, token.clone());

    let stats = h.scheduler.run(&token).await;

    assert_eq!(stats.success, 10);
    assert_eq!(h.client.sent().len(), 10);
    assert_eq!(h.store.loads.load(Ordering::SeqCst), 4);

    let after_sessions = start + ChronoDuration::minutes(3 * 65);
    let wait = until(&after_sessions, &next_occurrence(&after_sessions, wake_at()));
    assert_eq!(h.clock.sleeps(), vec![PAUSE, PAUSE, PAUSE, wait]);
    assert_eq!(h.scheduler.state(), SchedulerState::Idle);
}

#[tokio::test]
async fn test_empty_recipients_skip_straight_to_next_day() {
    let h = harness(10, ScriptedStore::always(Vec::new()));
    let token = CancellationToken::new();
    h.clock.cancel_after(1, token.clone());

    let stats = h.scheduler.run(&token).await;

    assert_eq!(stats.total(), 0);
    assert!(h.client.sent().is_empty());
    // 06:00 -> 07:30 the same morning
    assert_eq!(h.clock.sleeps(), vec![Duration::from_secs(90 * 60)]);
}

#[tokio::test]
async fn test_recipients_emptied_mid_cycle_abort_remaining_sessions() {
    let store = ScriptedStore::queued(vec![recipients(2)], Vec::new());
    let h = harness(10, store);
    let token = CancellationToken::new();
    h.clock.cancel_after(2, token.clone());

    let stats = h.scheduler.run(&token).await;

    // only the first sub-session (20% of 10) ran
    assert_eq!(stats.success, 2);
    // 06:00 + 65m = 07:05, leaving 25m until 07:30
    assert_eq!(
        h.clock.sleeps(),
        vec![PAUSE, Duration::from_secs(25 * 60)]
    );
}

#[tokio::test]
async fn test_zero_transfer_sessions_still_pause() {
    let h = harness(0, ScriptedStore::always(recipients(1)));

    let stats = h.scheduler.run_cycle(1, &CancellationToken::new()).await;

    assert_eq!(stats.total(), 0);
    assert!(h.client.sent().is_empty());
    assert_eq!(h.clock.sleeps(), vec![PAUSE, PAUSE, PAUSE]);
}

#[tokio::test]
async fn test_cancelled_scheduler_does_nothing() {
    let h = harness(10, ScriptedStore::always(recipients(3)));
    let token = CancellationToken::new();
    token.cancel();

    let stats = h.scheduler.run(&token).await;

    assert_eq!(stats.total(), 0);
    assert!(h.clock.sleeps().is_empty());
    assert_eq!(h.store.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_session_pause_is_cancellable() {
    let h = harness(10, ScriptedStore::always(recipients(3)));
    let token = CancellationToken::new();
    h.clock.cancel_after(1, token.clone());

    let stats = h.scheduler.run(&token).await;

    // first sub-session finished, the rest never started
    assert_eq!(stats.success, 2);
    assert_eq!(h.store.loads.load(Ordering::SeqCst), 1);
}
