//! Bounded polling
//!
//! Three timers share one clock: the overall deadline, the check tick and the
//! log tick. The first check happens one interval after the wait starts.

use acrun_cloud::{CloudError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of one checker call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Check {
    pub done: bool,
    /// Replaces the attributes shown on later log ticks when non-empty
    pub attributes: Vec<(String, String)>,
}

impl Check {
    pub fn done() -> Self {
        Self {
            done: true,
            attributes: Vec::new(),
        }
    }

    pub fn pending() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Waiter {
    message: String,
    attributes: Vec<(String, String)>,
    max_duration: Duration,
    check_interval: Duration,
    log_interval: Duration,
    cancel: CancellationToken,
}

impl Waiter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attributes: Vec::new(),
            max_duration: DEFAULT_MAX_DURATION,
            check_interval: DEFAULT_CHECK_INTERVAL,
            log_interval: DEFAULT_LOG_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn log_interval(mut self, interval: Duration) -> Self {
        self.log_interval = interval;
        self
    }

    /// Attribute shown on every log tick
    pub fn attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Poll `checker` until it reports done
    ///
    /// Returns the number of checks performed. A checker error ends the wait
    /// immediately. The deadline yields `CloudError::Timeout`; the cancellation
    /// token yields `CloudError::Cancelled`, also while a check is in flight.
    pub async fn wait<F, Fut>(&self, mut checker: F) -> Result<u32>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Check>>,
    {
        let check_interval = self.check_interval.max(Duration::from_millis(1));
        let log_interval = self.log_interval.max(check_interval);

        let start = Instant::now();
        let deadline = sleep(self.max_duration);
        tokio::pin!(deadline);
        let mut check_tick = interval_at(start + check_interval, check_interval);
        check_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut log_tick = interval_at(start + log_interval, log_interval);
        log_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut shown = self.attributes.clone();
        let mut checks = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(CloudError::Cancelled),
                _ = &mut deadline => {
                    return Err(CloudError::Timeout(format!(
                        "{}: gave up after {:?}",
                        self.message, self.max_duration
                    )));
                }
                _ = check_tick.tick() => {
                    checks += 1;
                    let check = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(CloudError::Cancelled),
                        check = checker() => check?,
                    };
                    if !check.attributes.is_empty() {
                        shown = self.attributes.iter().cloned().chain(check.attributes).collect();
                    }
                    if check.done {
                        tracing::debug!(checks, elapsed = ?start.elapsed(), "{}: done", self.message);
                        return Ok(checks);
                    }
                }
                _ = log_tick.tick() => {
                    tracing::info!(
                        elapsed = ?start.elapsed(),
                        status = %format_attributes(&shown),
                        "{}",
                        self.message
                    );
                }
            }
        }
    }
}

fn format_attributes(attributes: &[(String, String)]) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_done_on_second_tick() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let waiter = Waiter::new("waiting for runtime");
        let checks = waiter
            .wait(|| {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(if n == 2 {
                        Check::done()
                    } else {
                        Check::pending().with("status", "CREATING")
                    })
                }
            })
            .await
            .unwrap();

        assert_eq!(checks, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), DEFAULT_CHECK_INTERVAL * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_max_duration() {
        let start = Instant::now();
        let waiter = Waiter::new("waiting forever")
            .max_duration(Duration::from_secs(60))
            .check_interval(Duration::from_secs(5));

        let err = waiter
            .wait(|| async { Ok(Check::pending()) })
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_checker_error_is_fatal() {
        let calls = Arc::new(AtomicU32::new(0));
        let waiter = Waiter::new("failing");

        let err = waiter
            .wait(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<Check, _>(CloudError::Remote("throttled".into()))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Remote(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_is_not_timeout() {
        let token = CancellationToken::new();
        let waiter = Waiter::new("cancelled").cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            sleep(Duration::from_secs(12)).await;
            token.cancel();
        });

        let err = waiter
            .wait(|| async { Ok(Check::pending()) })
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(err.is_cancelled());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_format_attributes() {
        let attributes = vec![
            ("name".to_string(), "agent".to_string()),
            ("status".to_string(), "UPDATING".to_string()),
        ];
        assert_eq!(format_attributes(&attributes), "name=agent status=UPDATING");
    }
}
