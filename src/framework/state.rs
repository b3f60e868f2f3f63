use std::time::Duration;

use thiserror::Error;
use tracing::{error, warn};

use crate::env::{MAX_RETRIES, RETRY_DELAY};

/// An error that controls the flow of a workflow.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StateError {
    /// The workflow should retry if possible.
    ///
    /// See: [`RetryPolicy::retry_if_possible`]
    #[error("{0:#}")]
    Retry(anyhow::Error),
    /// The workflow should exit immediately.
    #[error("{0:#}")]
    Cancelled(anyhow::Error),
}

impl StateError {
    /// Consumes the state, returning the underlying error.
    pub fn into_inner(self) -> anyhow::Error {
        match self {
            Self::Retry(err) | Self::Cancelled(err) => err,
        }
    }
}

/// The result of a single attempt of a workflow.
pub type StateResult<T> = Result<T, StateError>;

/// Converts any error into a [`StateError`] with a chosen flow.
pub trait IntoState<T> {
    /// Maps the error to [`StateError::Retry`].
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Retry`] if `self` is an error.
    fn or_retry(self) -> StateResult<T>;

    /// Maps the error to [`StateError::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Cancelled`] if `self` is an error.
    fn or_cancel(self) -> StateResult<T>;
}

impl<T, E> IntoState<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_retry(self) -> StateResult<T> {
        self.map_err(|e| StateError::Retry(e.into()))
    }

    fn or_cancel(self) -> StateResult<T> {
        self.map_err(|e| StateError::Cancelled(e.into()))
    }
}

/// How many times, and how often, a workflow may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// The maximum number of retries after the first attempt.
    pub max_retries: u8,
    /// The delay before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy from the [`MAX_RETRIES`] and [`RETRY_DELAY`] environment variables.
    pub fn from_env() -> Self {
        Self {
            max_retries: *MAX_RETRIES,
            delay: *RETRY_DELAY,
        }
    }

    /// Returns the same policy with a different retry limit.
    pub const fn with_max_retries(self, max_retries: u8) -> Self {
        Self {
            max_retries,
            delay: self.delay,
        }
    }

    /// Decides whether retrying is allowed based on a provided retry count, incrementing it.
    pub fn retry_if_possible(&self, retry: &mut u8) -> bool {
        *retry = retry.saturating_add(1);
        if *retry > self.max_retries {
            error!("retried for too many times ({}), stopping!", self.max_retries);
            false
        } else {
            warn!("retrying… ({retry} / {})", self.max_retries);
            true
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_env()
    }
}
