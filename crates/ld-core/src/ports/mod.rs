//! Port interfaces for the application layer
//!
//! Ports define the contract between the sync use cases and the outside world:
//! the leads HTTP API, durable local storage, the browser location, the
//! notification surface and the wall clock. Use cases depend on these traits
//! only; concrete adapters live in `ld-infra`.

mod clock;
pub mod leads_api;
mod location;
mod notifier;
pub mod storage;

pub use clock::ClockPort;
pub use leads_api::{LeadsApiError, LeadsApiPort};
pub use location::LocationPort;
pub use notifier::NotifierPort;
pub use storage::{DurableStoragePort, StorageError};
