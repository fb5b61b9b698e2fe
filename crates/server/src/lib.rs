//! HTTP surface of the maintenance ticket service.

pub mod api;
pub mod metrics;
pub mod state;
