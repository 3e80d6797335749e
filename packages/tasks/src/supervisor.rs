// ABOUTME: Timeout supervision for task workers
// ABOUTME: Races a unit of work against a warning timer and a hard deadline

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, TaskError};

/// Race `work` against a warning timer and a hard deadline.
///
/// The warning future runs at most once, after `warn_after`, while the
/// work is still in flight; it must not alter status. When `deadline`
/// elapses first, the work future is dropped and the call resolves with
/// `TaskError::Timeout`. This is a logical timeout: any in-flight
/// provider call keeps running on the provider side, the caller just
/// stops waiting.
/// Both timers are owned by this call and dropped with it, and exactly
/// one terminal outcome is produced per invocation.
pub async fn supervise<T, W, F>(
    warn_after: Duration,
    deadline: Duration,
    on_warn: W,
    work: F,
) -> Result<T>
where
    W: Future<Output = ()>,
    F: Future<Output = Result<T>>,
{
    let warn = async move {
        tokio::time::sleep(warn_after).await;
        on_warn.await;
    };
    let hard = tokio::time::sleep(deadline);

    tokio::pin!(work, warn, hard);

    let mut warned = false;
    loop {
        tokio::select! {
            result = &mut work => return result,
            _ = &mut warn, if !warned => {
                warned = true;
            }
            _ = &mut hard => {
                return Err(TaskError::Timeout {
                    seconds: deadline.as_secs(),
                });
            }
        }
    }
}
