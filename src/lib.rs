//! Headless client for the leads list: configuration, logging and wiring of
//! the sync use cases onto their infrastructure adapters.

pub mod bootstrap;
