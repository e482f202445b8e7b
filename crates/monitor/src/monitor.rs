//! The poll loop and its timer lifecycle.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chirp_api::HealthError;
use chirp_types::HealthState;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::classify::classify;
use crate::probe::HealthProbe;

/// Budget for one health exchange. When it elapses the in-flight request is
/// cancelled and the poll classifies as a timeout.
pub const REQUEST_DEADLINE: Duration = Duration::from_millis(7_000);

/// Single source of truth for backend liveness.
///
/// Owns one loop task that polls, classifies, publishes, and reschedules
/// itself at the cadence carried by each published state. There is never more
/// than one outstanding request and never more than one pending timer: both
/// live inside the loop body, strictly sequenced.
///
/// `stop()` is terminal for an instance; a remounted UI builds a fresh
/// monitor.
pub struct HealthMonitor<P> {
    probe: Arc<P>,
    tx: Arc<watch::Sender<HealthState>>,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<P> HealthMonitor<P>
where
    P: HealthProbe + 'static,
{
    /// Build a monitor around a probe. No polling starts until [`start`].
    ///
    /// [`start`]: HealthMonitor::start
    pub fn new(probe: P) -> Self {
        Self {
            probe: Arc::new(probe),
            tx: Arc::new(watch::Sender::new(HealthState::checking())),
            shutdown: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Subscribe to state publications. The receiver immediately holds the
    /// current state (`checking` before the first poll resolves).
    pub fn subscribe(&self) -> watch::Receiver<HealthState> {
        self.tx.subscribe()
    }

    /// A snapshot of the latest published state.
    pub fn state(&self) -> HealthState {
        self.tx.borrow().clone()
    }

    /// Begin polling: one immediate poll, then recursive rescheduling at the
    /// cadence implied by each poll's own result.
    ///
    /// Calling `start()` while the loop is live is a no-op, as is calling it
    /// after [`stop`].
    ///
    /// [`stop`]: HealthMonitor::stop
    pub fn start(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.as_ref()
            && !handle.is_finished()
        {
            return;
        }
        let probe = Arc::clone(&self.probe);
        let tx = Arc::clone(&self.tx);
        let shutdown = self.shutdown.clone();
        *slot = Some(tokio::spawn(run_loop(probe, tx, shutdown)));
    }

    /// Halt the loop: cancels the pending timer and, through the child
    /// token, any in-flight request. Safe to call repeatedly and before
    /// `start()`. No state is published afterwards.
    pub fn stop(&self) {
        self.shutdown.cancel();
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl<P> Drop for HealthMonitor<P> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

async fn run_loop<P: HealthProbe>(probe: Arc<P>, tx: Arc<watch::Sender<HealthState>>, shutdown: CancellationToken) {
    loop {
        let Some(state) = poll_once(probe.as_ref(), &shutdown).await else {
            break;
        };
        if shutdown.is_cancelled() {
            break;
        }
        debug!(status = ?state.status, interval = ?state.poll_interval(), "publishing health state");
        let interval = state.poll_interval();
        tx.send_replace(state);
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = time::sleep(interval) => {}
        }
    }
}

/// One tick: a bounded probe exchange classified into a state.
///
/// Returns `None` when shutdown interrupted the poll, in which case nothing
/// is published. A deadline expiry cancels the child token (aborting the
/// request best-effort) without touching the shutdown token, which is what
/// keeps the two cancellation causes distinguishable.
async fn poll_once<P: HealthProbe + ?Sized>(probe: &P, shutdown: &CancellationToken) -> Option<HealthState> {
    let deadline = shutdown.child_token();
    let outcome = tokio::select! {
        checked = probe.check(&deadline) => checked,
        _ = time::sleep(REQUEST_DEADLINE) => {
            deadline.cancel();
            Err(HealthError::DeadlineExceeded)
        }
        _ = shutdown.cancelled() => return None,
    };
    match outcome {
        Err(HealthError::Cancelled) => None,
        other => Some(classify(other)),
    }
}

/// One bounded, classified health check outside of any loop, for one-shot
/// callers such as the CLI probe command.
pub async fn check_now<P: HealthProbe + ?Sized>(probe: &P) -> HealthState {
    let never_cancelled = CancellationToken::new();
    poll_once(probe, &never_cancelled)
        .await
        .unwrap_or_else(|| classify(Err(HealthError::Cancelled)))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chirp_types::{FAST_POLL_INTERVAL, HealthStatus, SLOW_POLL_INTERVAL};

    use super::*;
    use crate::classify::{TIMEOUT_MESSAGE, UNAVAILABLE_MESSAGE};

    #[derive(Clone)]
    enum Step {
        /// Respond with a parsed report after `delay`.
        Report {
            status: &'static str,
            message: &'static str,
            delay: Duration,
        },
        /// Fail immediately as if the connection was refused.
        Unreachable,
        /// Never respond; only cancellation ends the call.
        Hang,
    }

    struct FakeProbe {
        steps: Mutex<VecDeque<Step>>,
        /// Repeated once the scripted steps run out.
        last: Step,
        polls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeProbe {
        fn sequence(steps: Vec<Step>) -> Arc<Self> {
            let last = steps.last().cloned().unwrap_or(Step::Unreachable);
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                last,
                polls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn always(step: Step) -> Arc<Self> {
            Self::sequence(vec![step])
        }

        fn healthy(message: &'static str) -> Arc<Self> {
            Self::always(Step::Report {
                status: "healthy",
                message,
                delay: Duration::ZERO,
            })
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealthProbe for FakeProbe {
        async fn check(&self, cancel: &CancellationToken) -> Result<chirp_types::HealthReport, HealthError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let step = self
                .steps
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| self.last.clone());

            let result = match step {
                Step::Report { status, message, delay } => {
                    tokio::select! {
                        _ = cancel.cancelled() => Err(HealthError::Cancelled),
                        _ = time::sleep(delay) => Ok(chirp_types::HealthReport {
                            status: status.into(),
                            message: message.into(),
                        }),
                    }
                }
                Step::Unreachable => Err(HealthError::Unavailable("connection refused".into())),
                Step::Hang => {
                    cancel.cancelled().await;
                    Err(HealthError::Cancelled)
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    async fn next_state(rx: &mut watch::Receiver<HealthState>) -> HealthState {
        rx.changed().await.expect("monitor alive");
        rx.borrow_and_update().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_response_publishes_ok_at_slow_cadence() {
        let probe = FakeProbe::healthy("All good");
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let mut rx = monitor.subscribe();
        assert_eq!(rx.borrow().status, HealthStatus::Checking);

        monitor.start();
        let state = next_state(&mut rx).await;
        assert_eq!(state.status, HealthStatus::Ok);
        assert_eq!(state.message, "All good");
        assert_eq!(state.poll_interval(), SLOW_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_response_publishes_wait_at_fast_cadence() {
        let probe = FakeProbe::always(Step::Report {
            status: "wait",
            message: "Warming up",
            delay: Duration::ZERO,
        });
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let mut rx = monitor.subscribe();

        monitor.start();
        let state = next_state(&mut rx).await;
        assert_eq!(state.status, HealthStatus::Wait);
        assert_eq!(state.message, "Warming up");
        assert_eq!(state.poll_interval(), FAST_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_request_is_cut_at_the_deadline() {
        let probe = FakeProbe::always(Step::Hang);
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let mut rx = monitor.subscribe();

        monitor.start();
        let state = next_state(&mut rx).await;
        assert_eq!(state.status, HealthStatus::Fail);
        assert_eq!(state.message, TIMEOUT_MESSAGE);
        assert_eq!(state.poll_interval(), FAST_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn connection_refused_publishes_unavailable() {
        let probe = FakeProbe::always(Step::Unreachable);
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let mut rx = monitor.subscribe();

        monitor.start();
        let state = next_state(&mut rx).await;
        assert_eq!(state.status, HealthStatus::Fail);
        assert_eq!(state.message, UNAVAILABLE_MESSAGE);
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_status_publishes_fail() {
        let probe = FakeProbe::always(Step::Report {
            status: "bogus",
            message: "",
            delay: Duration::ZERO,
        });
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let mut rx = monitor.subscribe();

        monitor.start();
        let state = next_state(&mut rx).await;
        assert_eq!(state.status, HealthStatus::Fail);
        assert_eq!(state.poll_interval(), FAST_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn ok_reschedules_at_slow_and_recovers_to_fast() {
        let probe = FakeProbe::sequence(vec![
            Step::Report {
                status: "healthy",
                message: "up",
                delay: Duration::ZERO,
            },
            Step::Report {
                status: "wait",
                message: "hold on",
                delay: Duration::ZERO,
            },
        ]);
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let mut rx = monitor.subscribe();

        monitor.start();
        let first = next_state(&mut rx).await;
        assert_eq!(first.status, HealthStatus::Ok);
        assert_eq!(probe.polls(), 1);

        // Nothing happens before the slow interval elapses.
        time::sleep(SLOW_POLL_INTERVAL - Duration::from_secs(1)).await;
        assert!(!rx.has_changed().expect("monitor alive"));
        assert_eq!(probe.polls(), 1);

        time::sleep(Duration::from_secs(2)).await;
        let second = next_state(&mut rx).await;
        assert_eq!(second.status, HealthStatus::Wait);
        assert_eq!(probe.polls(), 2);

        // The wait state switches the loop back to the fast cadence.
        time::sleep(FAST_POLL_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(probe.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn at_most_one_poll_in_flight() {
        let probe = FakeProbe::always(Step::Report {
            status: "healthy",
            message: "up",
            delay: Duration::from_secs(5),
        });
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let mut rx = monitor.subscribe();

        monitor.start();
        let _ = next_state(&mut rx).await;
        time::sleep(SLOW_POLL_INTERVAL * 4).await;

        assert!(probe.polls() >= 3);
        assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_twice_does_not_double_the_poll_rate() {
        let probe = FakeProbe::always(Step::Report {
            status: "wait",
            message: "hold on",
            delay: Duration::ZERO,
        });
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let mut rx = monitor.subscribe();

        monitor.start();
        monitor.start();
        let _ = next_state(&mut rx).await;
        assert_eq!(probe.polls(), 1);

        // Three fast intervals: exactly three more polls, not six.
        time::sleep(FAST_POLL_INTERVAL * 3 + Duration::from_secs(1)).await;
        assert_eq!(probe.polls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_all_future_publications() {
        let probe = FakeProbe::healthy("up");
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let mut rx = monitor.subscribe();

        monitor.start();
        let _ = next_state(&mut rx).await;
        let polls_at_stop = probe.polls();
        monitor.stop();

        time::advance(SLOW_POLL_INTERVAL * 10).await;
        assert!(!rx.has_changed().expect("sender still held by monitor"));
        assert_eq!(probe.polls(), polls_at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_safe_when_never_started_and_when_repeated() {
        let probe = FakeProbe::healthy("up");
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        monitor.stop();
        monitor.stop();

        // start after stop is a no-op: the loop never runs.
        monitor.start();
        time::advance(FAST_POLL_INTERVAL * 2).await;
        assert_eq!(probe.polls(), 0);
        assert_eq!(monitor.state().status, HealthStatus::Checking);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_an_in_flight_poll_publishes_nothing() {
        let probe = FakeProbe::always(Step::Report {
            status: "healthy",
            message: "up",
            delay: Duration::from_secs(5),
        });
        let monitor = HealthMonitor::new(Arc::clone(&probe));
        let rx = monitor.subscribe();

        monitor.start();
        time::advance(Duration::from_secs(1)).await;
        monitor.stop();
        time::advance(SLOW_POLL_INTERVAL).await;

        assert!(!rx.has_changed().expect("sender still held by monitor"));
    }
}
