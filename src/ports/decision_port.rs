//! Decision callback port trait.
//!
//! Once per trading day the engine hands a read-only market snapshot to a
//! decision collaborator and receives target allocations back. The engine
//! is agnostic to how the targets are derived.

use crate::domain::engine::MarketView;
use crate::domain::execution::TargetAllocation;

pub trait DecisionPort {
    /// Produce target allocations given a market snapshot. An empty vector
    /// means hold the current portfolio.
    fn target_allocations(&mut self, view: &MarketView) -> Vec<TargetAllocation>;
}
