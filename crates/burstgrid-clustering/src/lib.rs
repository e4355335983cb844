//! Resource-class clustering for the burstgrid decision engine.
//!
//! Three pure stages, run once per iteration:
//!
//! ```text
//!   idle jobs ──► cluster_demand ──► {shape → DemandCluster}
//!                                          │ fold_demand(catalog)
//!   pods + claims ──► cluster_supply ──►   ▼
//!                     {shape → SupplyCluster}   [(catalog shape, demand)]
//! ```
//!
//! Everything here is data in, data out; queries and submissions live in
//! the queue/pool crates, sizing in the autoscale crate.

pub mod demand;
pub mod fold;
pub mod supply;

pub use demand::{DemandCluster, cluster_demand};
pub use fold::fold_demand;
pub use supply::{PodSlot, StateCounts, SupplyCluster, cluster_supply};
