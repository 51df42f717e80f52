use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::outbox_service::OutboxService;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_secs(120);

/// Background loop that drains the outbox on a fixed interval.
///
/// Each cycle runs on the blocking pool and processes items one at a time.
/// Cancellation is checked between cycles; a cycle that has started runs to
/// completion.
pub struct Dispatcher {
    service: Arc<OutboxService>,
    poll_interval: Duration,
    error_cooldown: Duration,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        service: Arc<OutboxService>,
        poll_interval: Duration,
        error_cooldown: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            service,
            poll_interval,
            error_cooldown,
            shutdown,
        }
    }

    pub async fn run(self) {
        log::info!(
            "Outbox dispatcher started (interval {:?}, cooldown {:?})",
            self.poll_interval,
            self.error_cooldown
        );

        while !self.shutdown.is_cancelled() {
            let service = self.service.clone();
            let wait = match tokio::task::spawn_blocking(move || service.run_cycle()).await {
                Ok(Ok(report)) => {
                    if report.fetched > 0 {
                        log::info!(
                            "Outbox cycle: {} fetched, {} completed, {} retried, {} failed, {} skipped",
                            report.fetched,
                            report.completed,
                            report.retried,
                            report.failed,
                            report.skipped
                        );
                    }
                    self.poll_interval
                }
                Ok(Err(e)) => {
                    log::error!("Outbox cycle failed: {}", e);
                    self.error_cooldown
                }
                Err(e) => {
                    log::error!("Outbox cycle panicked: {}", e);
                    self.error_cooldown
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }

        log::info!("Outbox dispatcher stopped");
    }
}
