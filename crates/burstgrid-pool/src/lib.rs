//! Supply-side client for burstgrid.
//!
//! Drives the lease-platform CLI: lists the pods we already pay for and
//! launches new ones with the labels, environment, and resource requests
//! a worker needs to find its way back to the scheduler.

pub mod client;
pub mod error;
pub mod submit;

pub use client::{LeaseClient, PodPlatform};
pub use error::{PoolError, PoolResult};
