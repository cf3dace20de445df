// Bounded polling for vendor APIs that complete asynchronously

use std::future::Future;
use std::time::Duration;

/// Fixed number of attempts separated by a fixed interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }

    /// Upper bound on time spent sleeping between attempts
    pub fn max_wait(&self) -> Duration {
        self.interval * self.attempts.saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    /// Every attempt reported "not ready yet"
    Exhausted { attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            PollOutcome::Ready(value) => Some(value),
            PollOutcome::Exhausted { .. } => None,
        }
    }
}

/// Run `fetch` until it yields a value or the attempt budget is spent.
///
/// The fetch returns `Ok(Some(_))` when the result is ready, `Ok(None)` when the
/// vendor is still working, and `Err(_)` to stop polling immediately. The fetch
/// receives the zero-based attempt number. No sleep follows the final attempt.
pub async fn poll_until_ready<T, E, F, Fut>(
    policy: PollPolicy,
    mut fetch: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let attempts = policy.attempts.max(1);

    for attempt in 0..attempts {
        if let Some(value) = fetch(attempt).await? {
            return Ok(PollOutcome::Ready(value));
        }

        if attempt + 1 < attempts {
            tracing::debug!(attempt = attempt + 1, attempts, "Result not ready, polling again");
            tokio::time::sleep(policy.interval).await;
        }
    }

    Ok(PollOutcome::Exhausted { attempts })
}
