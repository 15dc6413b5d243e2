use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::{self, Instant};

/// Returned when no attempt succeeded before the deadline.
#[derive(Debug)]
pub struct TimedOut<E> {
    pub last_error: Option<E>,
}

/// Runs `attempt` right away and then every `interval` until it succeeds or
/// `timeout` has passed. A running attempt is cut off at the deadline.
pub async fn poll_until_timeout<T, E, F, Fut>(
    interval: Duration,
    timeout: Duration,
    mut attempt: F,
) -> Result<T, TimedOut<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let deadline = Instant::now() + timeout;
    let mut last_error = None;

    for round in 1.. {
        match time::timeout_at(deadline, attempt()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => {
                tracing::warn!(round, %error, "attempt failed, retrying");
                last_error = Some(error);
            }
            Err(_) => {
                tracing::warn!(round, "attempt still running at deadline");
                break;
            }
        }

        if Instant::now() + interval > deadline {
            break;
        }
        time::sleep(interval).await;
    }

    Err(TimedOut { last_error })
}
