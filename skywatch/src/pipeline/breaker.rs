//! Circuit breaker for the durable store.
//!
//! Guards the store against being hammered while it is down: after a
//! threshold of consecutive failures the circuit opens and sends fail fast
//! until a cooldown elapses, then a single trial send probes whether the
//! store has recovered.
//!
//! # State Machine
//!
//! ```text
//! Closed --[threshold consecutive failures]--> Open
//! Open --[cooldown elapsed]--> HalfOpen (one trial send admitted)
//! HalfOpen --[trial succeeds]--> Closed
//! HalfOpen --[trial fails]--> Open (cooldown restarts)
//! ```
//!
//! The consecutive-failure count spans batches: two failures on one batch and
//! three on the next trip a threshold of five.
//!
//! # Thread Safety
//!
//! Interior mutability via `parking_lot::Mutex`; the breaker is shared
//! through `Arc` between the scheduled flush path and the shutdown flush.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Normal operation, sends pass through.
    Closed,
    /// Failing fast, sends are rejected until the cooldown elapses.
    Open,
    /// One trial send is in flight to probe recovery.
    HalfOpen,
}

impl BreakerState {
    /// User-facing status string for the dashboard.
    pub fn display_status(&self) -> &'static str {
        match self {
            BreakerState::Closed => "Healthy",
            BreakerState::Open => "Failing fast",
            BreakerState::HalfOpen => "Probing...",
        }
    }
}

/// Why a send was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Circuit closed; normal send.
    Normal,
    /// Circuit half-open; this send is the single recovery probe.
    Trial,
}

/// Outcome of recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Failure counted; circuit still closed.
    Counted,
    /// This failure tripped the circuit open.
    Opened,
    /// A half-open trial failed; circuit re-opened and the cooldown restarted.
    Reopened,
}

impl FailureOutcome {
    /// Whether this failure transitioned the circuit into Open.
    ///
    /// Exactly one alert is sent per such transition.
    pub fn opened_circuit(&self) -> bool {
        matches!(self, FailureOutcome::Opened | FailureOutcome::Reopened)
    }
}

/// Point-in-time breaker status for the dashboard.
#[derive(Debug, Clone, Copy)]
pub struct BreakerStatus {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    /// Time since the most recent failure, if any.
    pub last_failure_age: Option<Duration>,
    /// Times the circuit has opened since startup.
    pub times_opened: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    last_failure_at: Option<Instant>,
    trial_in_flight: bool,
    times_opened: u64,
}

/// Circuit breaker guarding store writes.
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    ///
    /// `threshold` is the number of consecutive failures that opens the
    /// circuit; `cooldown` is how long it stays open before a trial send.
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                last_failure_at: None,
                trial_in_flight: false,
                times_opened: 0,
            }),
        }
    }

    /// Ask whether a send may proceed.
    ///
    /// While Open, returns the remaining cooldown as the error. When the
    /// cooldown has elapsed the circuit moves to HalfOpen and exactly one
    /// caller receives [`Admission::Trial`]; concurrent callers are rejected
    /// until the trial resolves.
    pub fn try_admit(&self) -> Result<Admission, Duration> {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => Ok(Admission::Normal),
            BreakerState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.cooldown {
                    inner.state = BreakerState::HalfOpen;
                    inner.trial_in_flight = true;
                    info!("Circuit breaker half-open, admitting trial send");
                    Ok(Admission::Trial)
                } else {
                    Err(self.cooldown - elapsed)
                }
            }
            BreakerState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(self.cooldown)
                } else {
                    inner.trial_in_flight = true;
                    Ok(Admission::Trial)
                }
            }
        }
    }

    /// Record a successful send: reset the failure count and close the
    /// circuit if a trial was in flight.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        if inner.state != BreakerState::Closed {
            info!("Circuit breaker closed, store recovered");
        }
        inner.state = BreakerState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    /// Record a failed send.
    pub fn record_failure(&self) -> FailureOutcome {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());

        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.trial_in_flight = false;
                inner.times_opened += 1;
                warn!("Circuit breaker re-opened, trial send failed");
                FailureOutcome::Reopened
            }
            BreakerState::Closed if inner.consecutive_failures >= self.threshold => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                inner.times_opened += 1;
                warn!(
                    failures = inner.consecutive_failures,
                    cooldown_secs = self.cooldown.as_secs(),
                    "Circuit breaker OPENED"
                );
                FailureOutcome::Opened
            }
            _ => FailureOutcome::Counted,
        }
    }

    /// Current circuit state.
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    /// Point-in-time status for the dashboard.
    pub fn status(&self) -> BreakerStatus {
        let inner = self.inner.lock();
        BreakerStatus {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure_age: inner.last_failure_at.map(|t| t.elapsed()),
            times_opened: inner.times_opened,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_initial_state_is_closed() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.try_admit(), Ok(Admission::Normal));
    }

    #[test]
    fn test_opens_after_exactly_threshold_failures() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));

        for _ in 0..4 {
            assert_eq!(breaker.record_failure(), FailureOutcome::Counted);
            assert_eq!(breaker.state(), BreakerState::Closed);
        }
        assert_eq!(breaker.record_failure(), FailureOutcome::Opened);
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(breaker.try_admit().is_err());
    }

    #[test]
    fn test_failure_count_spans_batches() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));

        // Two failures from one batch, success never intervenes
        breaker.record_failure();
        breaker.record_failure();
        // Three more from the next batch cross the threshold
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.record_failure(), FailureOutcome::Opened);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn test_cooldown_admits_single_trial() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        assert_eq!(breaker.record_failure(), FailureOutcome::Opened);
        assert!(breaker.try_admit().is_err());

        thread::sleep(Duration::from_millis(30));
        assert_eq!(breaker.try_admit(), Ok(Admission::Trial));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        // Second caller is rejected while the trial is in flight
        assert!(breaker.try_admit().is_err());
    }

    #[test]
    fn test_trial_success_closes_circuit() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.try_admit(), Ok(Admission::Trial));

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert_eq!(breaker.try_admit(), Ok(Admission::Normal));
    }

    #[test]
    fn test_trial_failure_reopens_and_restarts_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(30));
        breaker.record_failure();
        thread::sleep(Duration::from_millis(40));
        assert_eq!(breaker.try_admit(), Ok(Admission::Trial));

        assert_eq!(breaker.record_failure(), FailureOutcome::Reopened);
        assert_eq!(breaker.state(), BreakerState::Open);

        // Cooldown restarted: still rejected right away
        assert!(breaker.try_admit().is_err());
        thread::sleep(Duration::from_millis(40));
        assert_eq!(breaker.try_admit(), Ok(Admission::Trial));
    }

    #[test]
    fn test_opened_circuit_flag() {
        assert!(!FailureOutcome::Counted.opened_circuit());
        assert!(FailureOutcome::Opened.opened_circuit());
        assert!(FailureOutcome::Reopened.opened_circuit());
    }

    #[test]
    fn test_status_reporting() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();

        let status = breaker.status();
        assert_eq!(status.state, BreakerState::Open);
        assert_eq!(status.consecutive_failures, 2);
        assert_eq!(status.times_opened, 1);
        assert!(status.last_failure_age.is_some());
    }

    #[test]
    fn test_display_status() {
        assert_eq!(BreakerState::Closed.display_status(), "Healthy");
        assert_eq!(BreakerState::Open.display_status(), "Failing fast");
        assert_eq!(BreakerState::HalfOpen.display_status(), "Probing...");
    }
}
