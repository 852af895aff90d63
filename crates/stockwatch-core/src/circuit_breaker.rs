use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Runtime circuit state for the real-time provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are short-circuited until the cooldown expires.
    Open,
    /// Cooldown expired; one trial request is let through while the failure
    /// streak is kept until the next success.
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(5 * 60),
        }
    }
}

/// Copy of the breaker counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub consecutive_failures: u32,
    pub disabled_until: Option<Instant>,
}

/// Outcome of recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Streak grew but stayed below the threshold.
    Counted(u32),
    /// This failure opened (or re-opened) the circuit.
    Opened(u32),
    /// The circuit was already open; the failure was not counted again.
    AlreadyOpen,
}

#[derive(Debug, Default)]
struct CircuitInner {
    consecutive_failures: u32,
    disabled_until: Option<Instant>,
    /// When the current half-open trial call was handed out.
    trial_started: Option<Instant>,
}

impl CircuitInner {
    fn state(&self, now: Instant) -> CircuitState {
        match self.disabled_until {
            None => CircuitState::Closed,
            Some(until) if now < until => CircuitState::Open,
            Some(_) => CircuitState::HalfOpen,
        }
    }
}

/// Thread-safe circuit breaker shared by every symbol in a cycle.
///
/// `disabled_until` is only ever set once `consecutive_failures` reaches the
/// threshold, and a success clears both under the same lock.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    pub const fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    pub fn allow_request(&self) -> bool {
        self.allow_request_at(Instant::now())
    }

    /// Whether a call may go to the provider now.
    ///
    /// Once the cooldown has expired only the first caller is admitted as a
    /// trial call; the rest are refused until it records its outcome. A
    /// trial call that never reports back is replaced after another cooldown.
    pub fn allow_request_at(&self, now: Instant) -> bool {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        match inner.state(now) {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => match inner.trial_started {
                Some(started) if now < started + self.config.cooldown => false,
                _ => {
                    inner.trial_started = Some(now);
                    true
                }
            },
        }
    }

    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.consecutive_failures = 0;
        inner.disabled_until = None;
        inner.trial_started = None;
    }

    pub fn record_failure(&self) -> FailureOutcome {
        self.record_failure_at(Instant::now())
    }

    pub fn record_failure_at(&self, now: Instant) -> FailureOutcome {
        let mut inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");

        // In-flight calls that started before the circuit opened must not
        // push the cooldown further out.
        if inner.state(now) == CircuitState::Open {
            return FailureOutcome::AlreadyOpen;
        }

        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        if inner.consecutive_failures >= self.config.failure_threshold {
            inner.disabled_until = Some(now + self.config.cooldown);
            inner.trial_started = None;
            FailureOutcome::Opened(inner.consecutive_failures)
        } else {
            FailureOutcome::Counted(inner.consecutive_failures)
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state_at(Instant::now())
    }

    pub fn state_at(&self, now: Instant) -> CircuitState {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        inner.state(now)
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.snapshot().consecutive_failures
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self
            .inner
            .lock()
            .expect("circuit breaker lock is not poisoned");
        CircuitSnapshot {
            consecutive_failures: inner.consecutive_failures,
            disabled_until: inner.disabled_until,
        }
    }
}
