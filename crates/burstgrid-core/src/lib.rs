//! Core domain model for burstgrid.
//!
//! Resource shapes (the class keys everything clusters on), the typed
//! records built from external ads, and the daemon configuration. No I/O
//! lives here; the queue and pool crates produce these types, the
//! clustering and autoscale crates consume them.

pub mod config;
pub mod records;
pub mod shape;

pub use config::BurstConfig;
pub use records::{ClaimRecord, ClaimState, JobRecord, PodRecord, PodStatus, RawAd};
pub use shape::ResourceShape;
