//! Retry policy and circuit breaker around hotel service calls.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::HotelClientError;

/// Upper bound for a single backoff delay.
const BACKOFF_MAX: Duration = Duration::from_secs(5);

/// Bounded retries with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one, at least 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubled after each further one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(BACKOFF_MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls fail fast until the cool-down elapses.
    Open,
    /// One probe call is let through to test recovery.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Set while the half-open probe is out.
    probe_started: Option<Instant>,
}

/// Consecutive-failure circuit breaker.
///
/// Opens after `failure_threshold` consecutive transient failures, rejects
/// calls while open, and after `open_for` lets a single probe through. The
/// probe's result closes or re-opens the circuit. A probe that reports
/// nothing within `probe_timeout` (its caller went away) is abandoned and the
/// next caller becomes the probe.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    open_for: Duration,
    probe_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, open_for: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            open_for,
            probe_timeout: open_for,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_started: None,
            }),
        }
    }

    /// Sets how long a half-open probe may stay unanswered before another
    /// caller replaces it. Defaults to `open_for`.
    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Asks permission to make a call. Fails with `CircuitOpen` when the
    /// circuit is open, or half-open with a live probe in flight.
    pub async fn acquire(&self) -> Result<(), HotelClientError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .is_none_or(|opened| opened.elapsed() >= self.open_for);
                if !cooled_down {
                    return Err(HotelClientError::CircuitOpen);
                }
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.probe_started = Some(Instant::now());
                Ok(())
            }
            CircuitState::HalfOpen => match inner.probe_started {
                Some(started) if started.elapsed() < self.probe_timeout => {
                    Err(HotelClientError::CircuitOpen)
                }
                abandoned => {
                    if abandoned.is_some() {
                        tracing::warn!(breaker = %self.name, "half-open probe never reported, admitting another");
                    }
                    inner.probe_started = Some(Instant::now());
                    Ok(())
                }
            },
        }
    }

    /// Records a call that reached the service and got an answer.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;
        inner.probe_started = None;
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed);
            inner.opened_at = None;
        }
    }

    /// Records a transient failure.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.probe_started = None;

        let trip = inner.state == CircuitState::HalfOpen
            || (inner.state == CircuitState::Closed
                && inner.consecutive_failures >= self.failure_threshold);
        if trip {
            self.transition(&mut inner, CircuitState::Open);
            inner.opened_at = Some(Instant::now());
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        metrics::counter!(
            "circuit_breaker_transitions_total",
            "breaker" => self.name.clone(),
            "state" => to.as_str()
        )
        .increment(1);
        match to {
            CircuitState::Open => tracing::error!(
                breaker = %self.name,
                from = from.as_str(),
                failures = inner.consecutive_failures,
                "circuit breaker opened"
            ),
            _ => tracing::info!(
                breaker = %self.name,
                from = from.as_str(),
                to = to.as_str(),
                "circuit breaker state changed"
            ),
        }
    }
}

/// Retry, breaker and per-attempt timeout applied to every hotel call.
///
/// Retry is the outer layer: each attempt asks the breaker for permission
/// and is bounded by `call_timeout`. Non-transient errors (conflicts, unknown
/// rooms, an open breaker) end the call immediately.
#[derive(Debug)]
pub struct HotelCallPolicy {
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    call_timeout: Duration,
}

impl HotelCallPolicy {
    /// The breaker's probe timeout is set to `call_timeout`: a probe still
    /// unanswered after that long was dropped by its caller.
    pub fn new(retry: RetryPolicy, breaker: CircuitBreaker, call_timeout: Duration) -> Self {
        Self {
            retry,
            breaker: breaker.with_probe_timeout(call_timeout),
            call_timeout,
        }
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Runs `call` under the policy. `operation` names the call in logs and
    /// metrics.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, HotelClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HotelClientError>>,
    {
        let mut attempt = 1;
        loop {
            self.breaker.acquire().await?;

            let result = tokio::time::timeout(self.call_timeout, call())
                .await
                .unwrap_or(Err(HotelClientError::Timeout));

            let error = match result {
                Ok(value) => {
                    self.breaker.record_success().await;
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    // The service answered; only the request was refused
                    self.breaker.record_success().await;
                    return Err(e);
                }
                Err(e) => e,
            };

            self.breaker.record_failure().await;
            if attempt >= self.retry.max_attempts {
                tracing::warn!(operation, attempts = attempt, error = %error, "hotel call failed, giving up");
                return Err(error);
            }

            let delay = self.retry.delay_for(attempt);
            metrics::counter!("hotel_rpc_retries_total", "operation" => operation).increment(1);
            tracing::warn!(operation, attempt, ?delay, error = %error, "hotel call failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for HotelCallPolicy {
    fn default() -> Self {
        Self::new(
            RetryPolicy::default(),
            CircuitBreaker::new("hotel", 5, Duration::from_secs(10)),
            Duration::from_secs(2),
        )
    }
}
