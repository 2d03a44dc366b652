//! Statistics observer.
//!
//! The engine emits decision telemetry through these callbacks instead of
//! writing anything itself.  All methods have no-op defaults so implementors
//! only override what they record.

use rmfs_core::{BotId, OrderId, PodId, SimTime, StationId};
use rmfs_score::ScoreRecord;

pub trait ControlObserver {
    /// A pod was assigned to a station by a scorer tournament; `scores` is
    /// the winning criterion vector.
    fn on_assignment(
        &mut self,
        _station: StationId,
        _bot: BotId,
        _pod: PodId,
        _scores: &ScoreRecord,
    ) {
    }

    /// A single-pod assignment was made outside a tournament (fully-demand,
    /// HADOD, SA).
    fn on_single_pod(&mut self, _station: StationId, _pod: PodId) {}

    /// A pod set of `pods` pods was reserved to cover `order`.
    fn on_pod_set(&mut self, _station: StationId, _order: OrderId, _pods: usize) {}

    fn on_order_allocated(&mut self, _order: OrderId, _station: StationId) {}

    /// A `find_paths` round overran its wall budget.
    fn on_planner_timeout(&mut self, _now: SimTime) {}

    /// One optimizer update finished: how many stations got solutions and
    /// how many Metropolis moves were accepted.
    fn on_sa_update(&mut self, _now: SimTime, _solutions: usize, _accepted: usize) {}
}

/// A [`ControlObserver`] that does nothing.
pub struct NoopObserver;

impl ControlObserver for NoopObserver {}
