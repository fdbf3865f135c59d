//! Wall clock and suspension, behind a trait so multi-hour waits can be
//! faked in tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Local, LocalResult, NaiveTime, TimeZone};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by `tokio::time`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sleeps unless cancelled first. Returns `false` when cancelled.
pub async fn pause(clock: &dyn Clock, duration: Duration, token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        _ = token.cancelled() => false,
        _ = clock.sleep(duration) => true,
    }
}

/// Next time the wall clock reads `at`, strictly after `now`.
///
/// A wake time that falls in a DST gap moves forward by an hour.
pub fn next_occurrence<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();

    loop {
        let naive = date.and_time(at);
        let resolved = match tz.from_local_datetime(&naive) {
            LocalResult::Single(t) => Some(t),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => tz
                .from_local_datetime(&(naive + ChronoDuration::hours(1)))
                .earliest(),
        };

        if let Some(candidate) = resolved {
            if candidate > *now {
                return candidate;
            }
        }

        date = match date.succ_opt() {
            Some(d) => d,
            None => return now.clone(),
        };
    }
}

/// Time left until `target`, zero if it already passed.
pub fn until<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> Duration {
    target
        .clone()
        .signed_duration_since(now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}
