//! Request deadlines and cooperative cancellation.
//!
//! A [`Deadline`] is minted once per public call. Every network-bound step
//! below it receives the same deadline, so nested calls share one budget
//! instead of restarting the clock.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, Web3NameError};

#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Option<Instant>,
    budget_ms: u64,
    token: CancellationToken,
}

impl Deadline {
    /// `timeout_ms <= 0` or `None` disables the deadline.
    pub fn new(timeout_ms: Option<i64>) -> Self {
        match timeout_ms {
            Some(ms) if ms > 0 => {
                let budget_ms = ms as u64;
                Self {
                    expires_at: Some(Instant::now() + Duration::from_millis(budget_ms)),
                    budget_ms,
                    token: CancellationToken::new(),
                }
            }
            _ => Self::unbounded(),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            expires_at: None,
            budget_ms: 0,
            token: CancellationToken::new(),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Token handed to transports so they can abort in-flight requests.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_cancelled() || self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    fn timeout_error(&self) -> Web3NameError {
        Web3NameError::Timeout {
            after_ms: self.budget_ms,
        }
    }

    /// Race `fut` against the deadline. On expiry the token is cancelled
    /// and the future is dropped.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.token.is_cancelled() {
            return Err(self.timeout_error());
        }

        let Some(expires_at) = self.expires_at else {
            return fut.await;
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(self.timeout_error()),
            _ = tokio::time::sleep_until(expires_at) => {
                self.token.cancel();
                Err(self.timeout_error())
            }
            res = fut => match res {
                Err(e) if e.is_timeout() => Err(self.timeout_error()),
                other => other,
            },
        }
    }
}

/// Effective timeout for a call: the per-call value wins over the instance
/// default.
pub fn effective_timeout(per_call: Option<i64>, default: Option<i64>) -> Option<i64> {
    per_call.or(default)
}

/// Run an operation under a freshly minted deadline.
pub async fn with_timeout<T, F, Fut>(timeout_ms: Option<i64>, op: F) -> Result<T>
where
    F: FnOnce(Deadline) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline = Deadline::new(timeout_ms);
    let fut = op(deadline.clone());
    deadline.run(fut).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_completes_before_deadline() {
        let res = with_timeout(Some(1_000), |_| async { Ok::<_, Web3NameError>(42) }).await;
        assert_eq!(assert_ok!(res), 42);
    }

    #[tokio::test]
    async fn test_times_out_without_waiting_for_operation() {
        let started = std::time::Instant::now();
        let res = with_timeout(Some(50), |_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, Web3NameError>(())
        })
        .await;

        let err = assert_err!(res);
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_expiry_cancels_token() {
        let deadline = Deadline::new(Some(20));
        let token = deadline.token().clone();
        let res = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, Web3NameError>(())
            })
            .await;
        assert!(res.unwrap_err().is_timeout());
        assert!(token.is_cancelled());
        assert!(deadline.is_expired());
    }

    #[tokio::test]
    async fn test_non_positive_timeout_disables_deadline() {
        for timeout in [None, Some(0), Some(-1)] {
            let deadline = Deadline::new(timeout);
            assert!(!deadline.is_bounded());
            let res = deadline
                .run(async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok::<_, Web3NameError>("done")
                })
                .await;
            assert_eq!(res.unwrap(), "done");
        }
    }

    #[tokio::test]
    async fn test_nested_calls_share_one_deadline() {
        let started = std::time::Instant::now();
        let res = with_timeout(Some(100), |deadline| async move {
            // each inner step alone fits in the budget, together they do not
            for _ in 0..5 {
                deadline
                    .run(async {
                        tokio::time::sleep(Duration::from_millis(60)).await;
                        Ok::<_, Web3NameError>(())
                    })
                    .await?;
            }
            Ok(())
        })
        .await;

        assert!(res.unwrap_err().is_timeout());
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[test]
    fn test_effective_timeout() {
        assert_eq!(effective_timeout(Some(10), Some(500)), Some(10));
        assert_eq!(effective_timeout(None, Some(500)), Some(500));
        assert_eq!(effective_timeout(Some(-1), Some(500)), Some(-1));
        assert_eq!(effective_timeout(None, None), None);
    }
}
