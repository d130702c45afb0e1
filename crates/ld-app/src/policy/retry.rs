//! Classification and retry policy for leads page fetches.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use ld_core::ports::LeadsApiError;

/// Class of a failed leads fetch; each class maps to one user message and one
/// retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// HTTP 500.
    Server,
    /// HTTP 400, usually an unsupported filter/sort combination.
    BadRequest,
    /// HTTP 404.
    NotFound,
    /// Timeout or aborted connection.
    Network,
    Generic,
}

impl FailureClass {
    pub fn of(error: &LeadsApiError) -> Self {
        match error {
            LeadsApiError::Status { status: 500, .. } => FailureClass::Server,
            LeadsApiError::Status { status: 400, .. } => FailureClass::BadRequest,
            LeadsApiError::Status { status: 404, .. } => FailureClass::NotFound,
            LeadsApiError::Timeout | LeadsApiError::Connection(_) => FailureClass::Network,
            _ => FailureClass::Generic,
        }
    }

    /// Automatic retries after the first failed attempt.
    pub fn max_retries(&self) -> u32 {
        match self {
            FailureClass::Server => 1,
            FailureClass::BadRequest | FailureClass::NotFound => 0,
            FailureClass::Network | FailureClass::Generic => 2,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            FailureClass::Server => "Server error while loading leads. Please try again shortly.",
            FailureClass::BadRequest => "Invalid filter or sort combination.",
            FailureClass::NotFound => "The requested leads could not be found.",
            FailureClass::Network => "Network error or timeout while loading leads.",
            FailureClass::Generic => "Failed to load leads.",
        }
    }
}

/// Final failure of a fetch after the retry budget is spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub class: FailureClass,
    pub error: LeadsApiError,
    pub attempts: u32,
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} attempt(s)): {}", self.class.user_message(), self.attempts, self.error)
    }
}

/// Delay between fetch attempts: `base * 2^n`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `failures` (0-based count of failures so far).
    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures.min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
