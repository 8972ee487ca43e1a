//! Rolling-window rate limiting for outbound API calls.
//!
//! A [`RateLimiter`] admits at most `max_calls` calls per rolling `period`.
//! When the window is full the caller is delayed until the oldest recorded
//! call ages out; calls are never rejected.
//!
//! The window lock is held while sleeping, so concurrent callers are admitted
//! strictly in the order they acquired the lock. The wrapped operation itself
//! runs after the lock is released.
//!
//! Windows live in process memory only. Several processes sharing one TDX
//! account each get their own budget.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;

use crate::clock::{to_delta, Clock, SystemClock};
use crate::error::TdxError;

/// Default number of calls per window (TDX documents 60 calls per 60 seconds).
pub const DEFAULT_MAX_CALLS: usize = 60;

/// Default window length.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// A calls-per-window gate shared by every clone.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_calls: usize,
    period: TimeDelta,
    window: Arc<Mutex<VecDeque<DateTime<Utc>>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Creates a limiter backed by the system clock.
    ///
    /// # Errors
    ///
    /// Returns `TdxError::Config` if `max_calls` or `period` is zero.
    pub fn new(max_calls: usize, period: Duration) -> Result<Self, TdxError> {
        Self::with_clock(max_calls, period, Arc::new(SystemClock))
    }

    /// Creates a limiter that reads time from `clock`.
    pub fn with_clock(
        max_calls: usize,
        period: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TdxError> {
        if max_calls == 0 {
            return Err(TdxError::invalid_config(
                "rate limit max_calls must be positive",
            ));
        }
        if period.is_zero() {
            return Err(TdxError::invalid_config("rate limit period must be positive"));
        }

        Ok(Self {
            max_calls,
            period: to_delta(period),
            window: Arc::new(Mutex::new(VecDeque::with_capacity(max_calls + 1))),
            clock,
        })
    }

    /// Maximum calls admitted per window.
    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    /// Window length.
    pub fn period(&self) -> Duration {
        self.period.to_std().unwrap_or(DEFAULT_PERIOD)
    }

    /// Waits until a call may proceed and records it.
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;
        let mut now = self.clock.now();
        self.prune(&mut window, now);

        if window.len() >= self.max_calls {
            if let Some(&oldest) = window.front() {
                let wait = self.period - now.signed_duration_since(oldest);
                if wait > TimeDelta::zero() {
                    let wait = wait.to_std().unwrap_or_default();
                    tracing::debug!(
                        max_calls = self.max_calls,
                        in_window = window.len(),
                        wait_ms = wait.as_millis() as u64,
                        "Rate limit reached, delaying call"
                    );
                    self.clock.sleep(wait).await;
                    now = self.clock.now();
                    self.prune(&mut window, now);
                }
            }
        }

        window.push_back(now);
    }

    /// Runs `operation` once the gate admits it.
    ///
    /// The window lock is released before `operation` starts.
    pub async fn call<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        operation().await
    }

    /// Number of calls recorded within the current window.
    pub async fn in_window(&self) -> usize {
        let mut window = self.window.lock().await;
        self.prune(&mut window, self.clock.now());
        window.len()
    }

    fn prune(&self, window: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        window.retain(|ts| now.signed_duration_since(*ts) < self.period);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            max_calls: DEFAULT_MAX_CALLS,
            period: to_delta(DEFAULT_PERIOD),
            window: Arc::new(Mutex::new(VecDeque::with_capacity(DEFAULT_MAX_CALLS + 1))),
            clock: Arc::new(SystemClock),
        }
    }
}
