use crate::traits::DispatchStats;
use crate::utils::logger::SESSION_TARGET;
use std::future::Future;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct WorkerRunner;

impl WorkerRunner {
    /// Runs `work` until it finishes or Ctrl+C cancels its token, then logs
    /// a summary of the returned stats.
    pub async fn run_until_shutdown<F, Fut>(work: F) -> DispatchStats
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = DispatchStats>,
    {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        let listener = tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!(target: SESSION_TARGET, "🛑 Received Ctrl+C. Stopping after the current transfer...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        let start_time = std::time::Instant::now();
        let stats = work(token).await;
        listener.abort();

        info!(
            target: SESSION_TARGET,
            "Total Time: {:.1}s | Success: {} | Failed: {} | Attempts: {} | Success Rate: {:.2}%",
            start_time.elapsed().as_secs_f64(),
            stats.success,
            stats.failed,
            stats.attempts,
            stats.success_rate()
        );

        stats
    }
}
