use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Upper bound on the total wait. `None` polls until a terminal value shows up.
    pub max_wait: Option<Duration>,
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_wait: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

#[derive(Debug, Clone, Error)]
#[error("Gave up after {attempts} status checks over {waited:?}")]
pub struct PollTimeout {
    pub attempts: u32,
    pub waited: Duration,
}

/// Call `fetch` until `is_terminal` accepts its value, sleeping `policy.interval`
/// between calls. A fetch error ends the loop immediately.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: PollPolicy,
    mut fetch: F,
    is_terminal: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
    E: From<PollTimeout>,
{
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        let value = fetch().await?;
        attempts += 1;

        if is_terminal(&value) {
            return Ok(value);
        }

        if let Some(max_wait) = policy.max_wait {
            let waited = started.elapsed();
            if waited + policy.interval > max_wait {
                return Err(PollTimeout { attempts, waited }.into());
            }
        }

        tokio::time::sleep(policy.interval).await;
    }
}
