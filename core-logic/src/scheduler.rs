//! # Session Scheduler
//!
//! Runs the daily plan forever: four sub-sessions separated by a fixed
//! pause, then sleep until the next wake time and start over. The loop only
//! ends when the cancellation token fires.

use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::traits::{DispatchStats, RecipientStore};
use crate::utils::clock::{next_occurrence, pause, until, Clock};
use crate::utils::logger::SESSION_TARGET;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningSession(u8),
    WaitingForNextDay,
}

pub struct SessionScheduler {
    dispatcher: Arc<Dispatcher>,
    recipients: Arc<dyn RecipientStore>,
    state: Mutex<SchedulerState>,
}

impl SessionScheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, recipients: Arc<dyn RecipientStore>) -> Self {
        Self {
            dispatcher,
            recipients,
            state: Mutex::new(SchedulerState::Idle),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(SchedulerState::Idle)
    }

    fn set_state(&self, next: SchedulerState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }

    fn clock(&self) -> &dyn Clock {
        self.dispatcher.clock().as_ref()
    }

    /// Repeats the daily cycle until cancelled.
    pub async fn run(&self, token: &CancellationToken) -> DispatchStats {
        let schedule = self.dispatcher.config().schedule;
        let mut total = DispatchStats::default();
        let mut cycle: u64 = 0;

        while !token.is_cancelled() {
            cycle += 1;
            total += self.run_cycle(cycle, token).await;
            if token.is_cancelled() {
                break;
            }

            self.set_state(SchedulerState::WaitingForNextDay);
            let now = self.clock().now();
            let wake = next_occurrence(&now, schedule.wake_at);
            let wait = until(&now, &wake);
            info!(
                target: SESSION_TARGET,
                "Cycle {} finished. Next run at {} (in {}h {}m)",
                cycle,
                wake.format("%Y-%m-%d %H:%M"),
                wait.as_secs() / 3600,
                (wait.as_secs() % 3600) / 60
            );

            if !pause(self.clock(), wait, token).await {
                break;
            }
            self.set_state(SchedulerState::Idle);
        }

        self.set_state(SchedulerState::Idle);
        total
    }

    /// One day's four sub-sessions.
    pub async fn run_cycle(&self, cycle: u64, token: &CancellationToken) -> DispatchStats {
        let schedule = self.dispatcher.config().schedule;
        let plan = schedule.plan();
        let counts = plan.counts();
        let sessions = counts.len();
        let mut stats = DispatchStats::default();

        info!(
            target: SESSION_TARGET,
            "Cycle {}: {} transfers split as {:?}", cycle, plan.total(), counts
        );

        for (i, count) in counts.into_iter().enumerate() {
            if token.is_cancelled() {
                break;
            }
            let session = i + 1;
            self.set_state(SchedulerState::RunningSession(session as u8));

            let recipients = match self.recipients.load().await {
                Ok(list) if list.is_empty() => {
                    error!(
                        target: SESSION_TARGET,
                        "Cycle {} session {}/{} aborted: {}",
                        cycle,
                        session,
                        sessions,
                        DispatchError::EmptyRecipientList
                    );
                    break;
                }
                Ok(list) => list,
                Err(e) => {
                    error!(
                        target: SESSION_TARGET,
                        "Cycle {} session {}/{} aborted: cannot load recipients: {:#}",
                        cycle,
                        session,
                        sessions,
                        e
                    );
                    break;
                }
            };

            info!(
                target: SESSION_TARGET,
                "Cycle {} session {}/{}: {} transfers across {} recipients",
                cycle,
                session,
                sessions,
                count,
                recipients.len()
            );

            let label = format!("Cycle {} session {}/{}", cycle, session, sessions);
            let session_stats = self
                .dispatcher
                .run_session(&label, &recipients, count, token)
                .await;
            info!(
                target: SESSION_TARGET,
                "{} done: {} ok, {} failed",
                label,
                session_stats.success,
                session_stats.failed
            );
            stats += session_stats;

            if session < sessions {
                info!(
                    target: SESSION_TARGET,
                    "Pausing {}m before session {}/{}",
                    schedule.session_pause.as_secs() / 60,
                    session + 1,
                    sessions
                );
                if !pause(self.clock(), schedule.session_pause, token).await {
                    break;
                }
            }
        }

        stats
    }
}
