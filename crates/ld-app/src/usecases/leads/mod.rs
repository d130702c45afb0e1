mod controller;
mod invalidation;
mod view;

pub use controller::{LeadsSyncController, LeadsSyncDeps};
pub use invalidation::InvalidationEvent;
pub use view::LeadsView;
