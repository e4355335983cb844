//! Demand-side client for burstgrid.
//!
//! Talks to the grid portal CLI: discovers queue endpoints, filters them
//! through the operator's trust rules, and reads idle jobs and worker
//! claims. Produces the typed records the clustering crate consumes.

pub mod client;
pub mod error;
pub mod trust;

pub use client::{MIN_REQUEST_DISK_KB, MIN_REQUEST_MEMORY_MB, PortalQueue, QueueSource};
pub use error::{QueueError, QueueResult};
pub use trust::TrustRules;
