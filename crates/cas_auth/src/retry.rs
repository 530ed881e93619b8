use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

pub const LOGIN_ATTEMPTS: u32 = 3;
pub const LOGIN_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Fixed-delay retry policy for whole login runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginRetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for LoginRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: LOGIN_ATTEMPTS,
            delay: LOGIN_RETRY_DELAY,
        }
    }
}

impl LoginRetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Runs `operation` until it succeeds or the attempts run out.
    ///
    /// At least one attempt is always made. The pause only happens between
    /// attempts, never after the last one. `operation` receives the 1-based
    /// attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < max_attempts => {
                    tracing::error!(attempt, max_attempts, %error, "login attempt failed");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    tracing::error!(attempt, max_attempts, %error, "login attempt failed");
                    return Err(error);
                }
            }
        }
    }
}
