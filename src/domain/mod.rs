//! Domain layer for the basin-watch detector
//!
//! Core data model (state vectors, trajectories, attractors, basins) and the
//! persistence port.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
