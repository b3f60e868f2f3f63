//! A framework that loops a workflow until it returns a value, is cancelled, or runs out of
//! retries.

mod state;

pub use state::*;

use tracing::{error, info, warn};

/// Runs an attempt repeatedly under a [`RetryPolicy`].
///
/// `f` is called once per attempt. [`StateError::Retry`] sleeps for [`RetryPolicy::delay`] and
/// tries again while the policy allows it, [`StateError::Cancelled`] stops at once.
///
/// # Errors
///
/// Returns the last attempt's error once the workflow is cancelled or out of retries.
pub async fn run_with_retry<T, F, Fut>(
    name: &str,
    policy: RetryPolicy,
    mut f: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StateResult<T>>,
{
    let mut retry: u8 = 0;

    loop {
        match f().await {
            Ok(value) => {
                info!("workflow {name} succeed!");
                return Ok(value);
            }
            Err(StateError::Retry(err)) => {
                warn!("workflow {name} failed: {err:#}");
                if policy.retry_if_possible(&mut retry) {
                    tokio::time::sleep(policy.delay).await;
                    continue;
                }
                error!("workflow {name} failed!");
                return Err(err.context(format!(
                    "workflow {name} failed after {retry} attempts"
                )));
            }
            Err(err) => {
                error!("workflow {name} failed!");
                return Err(err.into_inner().context(format!("workflow {name} failed")));
            }
        }
    }
}
