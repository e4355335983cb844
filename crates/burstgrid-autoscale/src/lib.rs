//! Autoscale engine: decide how many pods each resource class needs and
//! ask the platform for the difference.
//!
//! The policy is deliberately conservative. Batch pods are reusable, so
//! the target grows at a quarter of the queue depth, flattens again past
//! twenty, and is clamped by operator ceilings. See [`policy`] for the
//! exact curve and [`engine`] for the iteration that applies it.

pub mod engine;
pub mod error;
pub mod policy;

pub use engine::Provisioner;
pub use error::IterationError;
pub use policy::{ScaleDecision, SizingPolicy};
