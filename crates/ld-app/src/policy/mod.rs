//! Retry and backoff policies used by the sync use cases.

mod backoff;
mod retry;

pub use backoff::BackoffSchedule;
pub use retry::{FailureClass, FetchFailure, RetryPolicy};
