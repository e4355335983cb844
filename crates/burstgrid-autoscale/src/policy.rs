//! Per-class sizing policy.
//!
//! Pods are reused: a worker that finishes one job picks up the next, so
//! the target is deliberately far below one pod per job. The curve is
//! damped twice, then clamped:
//!
//! ```text
//!   target = 1 + idle/4
//!   target > 20  →  target = 20 + (target - 20)/4
//!   target = min(target, max_pods_per_class)
//! ```
//!
//! The submission delta against existing idle capacity is clamped once
//! more by `max_submit_per_class` so a burst of demand cannot flood the
//! platform in a single iteration.

/// What to do for one resource class this iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Launch this many additional pods.
    Submit(u32),
    /// Demand is zero or already covered.
    NoChange,
}

/// One pod is expected to work through about this many queued jobs.
const REUSE_DIVISOR: u32 = 4;
/// Above this target the curve flattens a second time.
const DAMP_KNEE: u32 = 20;

#[derive(Debug, Clone, Copy)]
pub struct SizingPolicy {
    /// Hard ceiling on any one class's pod target.
    pub max_pods_per_class: u32,
    /// Ceiling on pods submitted for one class in one iteration.
    pub max_submit_per_class: u32,
}

impl SizingPolicy {
    pub fn new(max_pods_per_class: u32, max_submit_per_class: u32) -> Self {
        Self {
            max_pods_per_class,
            max_submit_per_class,
        }
    }

    /// Damped pod target for `idle` queued jobs of one class.
    pub fn target_pods(&self, idle: u32) -> u32 {
        let mut target = 1 + idle / REUSE_DIVISOR;
        if target > DAMP_KNEE {
            target = DAMP_KNEE + (target - DAMP_KNEE) / REUSE_DIVISOR;
        }
        target.min(self.max_pods_per_class)
    }

    /// Decision for one class given its measured demand and idle supply.
    pub fn evaluate(&self, idle: u32, unclaimed: u32) -> ScaleDecision {
        if idle == 0 {
            return ScaleDecision::NoChange;
        }
        let target = self.target_pods(idle);
        if unclaimed >= target {
            return ScaleDecision::NoChange;
        }
        ScaleDecision::Submit((target - unclaimed).min(self.max_submit_per_class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> SizingPolicy {
        SizingPolicy::new(20, 400)
    }

    #[test]
    fn zero_demand_is_no_change() {
        assert_eq!(policy().evaluate(0, 0), ScaleDecision::NoChange);
        assert_eq!(policy().evaluate(0, 7), ScaleDecision::NoChange);
    }

    #[test]
    fn target_follows_the_damping_curve() {
        let policy = SizingPolicy::new(u32::MAX, 400);
        assert_eq!(policy.target_pods(0), 1);
        assert_eq!(policy.target_pods(4), 2);
        assert_eq!(policy.target_pods(19), 5);
        assert_eq!(policy.target_pods(76), 20);
        assert_eq!(policy.target_pods(80), 20);
        assert_eq!(policy.target_pods(100), 21);
        assert_eq!(policy.target_pods(400), 40);
    }

    #[test]
    fn small_queue_gets_a_small_target() {
        assert_eq!(policy().evaluate(4, 0), ScaleDecision::Submit(2));
        assert_eq!(policy().evaluate(1, 0), ScaleDecision::Submit(1));
    }

    #[test]
    fn large_queue_is_damped_twice() {
        let policy = SizingPolicy::new(100, 400);
        assert_eq!(policy.evaluate(80, 0), ScaleDecision::Submit(20));
        assert_eq!(policy.evaluate(100, 0), ScaleDecision::Submit(21));
    }

    #[test]
    fn class_ceiling_clamps_the_target() {
        let policy = SizingPolicy::new(10, 400);
        // Undamped the target would be 21.
        assert_eq!(policy.evaluate(100, 0), ScaleDecision::Submit(10));
    }

    #[test]
    fn existing_capacity_reduces_the_delta() {
        assert_eq!(policy().evaluate(80, 5), ScaleDecision::Submit(15));
    }

    #[test]
    fn sufficient_capacity_is_no_change() {
        assert_eq!(policy().evaluate(80, 20), ScaleDecision::NoChange);
        assert_eq!(policy().evaluate(80, 25), ScaleDecision::NoChange);
        assert_eq!(policy().evaluate(1, 1), ScaleDecision::NoChange);
    }

    #[test]
    fn submit_ceiling_clamps_one_iteration() {
        let policy = SizingPolicy::new(100, 5);
        assert_eq!(policy.evaluate(100, 0), ScaleDecision::Submit(5));
        // The ceiling clamps the delta, not the target.
        assert_eq!(policy.evaluate(100, 18), ScaleDecision::Submit(3));
    }
}
