use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use shoal_core::QueueType;
use tokio::{sync::watch, task::JoinHandle, time::sleep};

use crate::{ops::GetQueueState, session::Session};

/// Polling cadence bounds for queue observation.
#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    /// Interval while the queue is running with pending work.
    pub fast: Duration,
    /// Interval while the queue is idle or empty.
    pub slow: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            fast: Duration::from_millis(10_000),
            slow: Duration::from_millis(25_000),
        }
    }
}

/// One observation of a queue's aggregate state. Only the latest per
/// queue type is retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueObservation {
    pub queue_type: QueueType,
    pub running: bool,
    pub size: u64,
    pub observed_at: Instant,
}

/// Interval to arm after `observation`. Pure, so the cadence rule is
/// testable without timers: fast while work is in flight, slow while
/// the queue is idle or empty.
pub fn next_interval(observation: Option<&QueueObservation>, config: &PollerConfig) -> Duration {
    match observation {
        Some(observation) if observation.running && observation.size > 0 => config.fast,
        _ => config.slow,
    }
}

/// Adaptive poller for one queue type.
///
/// Each tick issues one queue-state call, records the observation and
/// re-arms with the interval derived from it. Ticks never overlap: the
/// next sleep is not armed until the current call has returned. An
/// unsubscribed poller never re-arms; a call in flight at that moment
/// completes but its result is discarded.
pub struct QueuePoller {
    queue_type: QueueType,
    latest: watch::Receiver<Option<QueueObservation>>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl QueuePoller {
    /// Starts polling immediately; the first tick fires right away.
    pub fn subscribe(session: Arc<Session>, queue_type: QueueType, config: PollerConfig) -> Self {
        let (latest_tx, latest_rx) = watch::channel(None);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                let result = session
                    .queue_state(GetQueueState {
                        queue_type,
                        include_finished: Some(false),
                    })
                    .await;

                if *stop_rx.borrow() {
                    // Unsubscribed while the call was in flight.
                    return;
                }

                let interval = match result {
                    Ok(state) => {
                        let observation = QueueObservation {
                            queue_type,
                            running: state.running,
                            size: state.size,
                            observed_at: Instant::now(),
                        };
                        let interval = next_interval(Some(&observation), &config);
                        if latest_tx.send(Some(observation)).is_err() {
                            return;
                        }
                        interval
                    }
                    Err(err) => {
                        tracing::warn!(
                            queue = queue_type.as_str(),
                            error = %err,
                            "queue poll failed"
                        );
                        config.slow
                    }
                };

                tokio::select! {
                    _ = sleep(interval) => {}
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            return;
                        }
                    }
                }
            }
        });

        Self {
            queue_type,
            latest: latest_rx,
            stop: stop_tx,
            task,
        }
    }

    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Latest observation, if any tick has completed yet.
    pub fn latest(&self) -> Option<QueueObservation> {
        *self.latest.borrow()
    }

    /// Waits until an observation newer than the last seen arrives.
    /// Returns `false` once the poller has stopped.
    pub async fn changed(&mut self) -> bool {
        self.latest.changed().await.is_ok()
    }

    /// Stops polling. Idempotent.
    pub fn unsubscribe(&self) {
        let _ = self.stop.send(true);
    }
}

impl Drop for QueuePoller {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
        self.task.abort();
    }
}

/// Independent pollers for several queue types plus the derived
/// UI-facing aggregate. Totals are computed from the latest
/// observations on demand, never stored as separate truth.
pub struct QueueMonitor {
    pollers: Vec<QueuePoller>,
}

/// Aggregate over all monitored queues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueTotals {
    /// Combined pending entry count.
    pub size: u64,
    /// Whether any monitored queue is running.
    pub any_running: bool,
}

impl QueueMonitor {
    pub fn subscribe(
        session: &Arc<Session>,
        queue_types: &[QueueType],
        config: PollerConfig,
    ) -> Self {
        let pollers = queue_types
            .iter()
            .map(|&queue_type| QueuePoller::subscribe(Arc::clone(session), queue_type, config))
            .collect();
        Self { pollers }
    }

    pub fn latest(&self, queue_type: QueueType) -> Option<QueueObservation> {
        self.pollers
            .iter()
            .find(|poller| poller.queue_type() == queue_type)
            .and_then(QueuePoller::latest)
    }

    pub fn totals(&self) -> QueueTotals {
        self.pollers
            .iter()
            .filter_map(QueuePoller::latest)
            .fold(QueueTotals::default(), |totals, observation| QueueTotals {
                size: totals.size + observation.size,
                any_running: totals.any_running || observation.running,
            })
    }

    pub fn unsubscribe_all(&self) {
        for poller in &self.pollers {
            poller.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use shoal_core::QueueType;

    use super::{next_interval, PollerConfig, QueueObservation};

    fn config() -> PollerConfig {
        PollerConfig {
            fast: Duration::from_millis(10_000),
            slow: Duration::from_millis(25_000),
        }
    }

    fn observation(running: bool, size: u64) -> QueueObservation {
        QueueObservation {
            queue_type: QueueType::Metadata,
            running,
            size,
            observed_at: Instant::now(),
        }
    }

    #[test]
    fn busy_queue_polls_fast() {
        let config = config();
        assert_eq!(
            next_interval(Some(&observation(true, 5)), &config),
            config.fast
        );
    }

    #[test]
    fn idle_or_empty_queue_polls_slow() {
        let config = config();
        assert_eq!(
            next_interval(Some(&observation(false, 0)), &config),
            config.slow
        );
        assert_eq!(
            next_interval(Some(&observation(true, 0)), &config),
            config.slow
        );
        assert_eq!(
            next_interval(Some(&observation(false, 7)), &config),
            config.slow
        );
    }

    #[test]
    fn no_observation_polls_slow() {
        let config = config();
        assert_eq!(next_interval(None, &config), config.slow);
    }
}
