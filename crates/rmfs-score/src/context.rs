//! Explicit scoring context.
//!
//! Everything a scorer may consult is passed in, per invocation, instead of
//! living in mutable "current bot / current pod" fields on the strategy.
//! The environment is mutable because two scorers genuinely mutate state:
//! Random draws from the seeded RNG and Congestion runs planner searches.

use std::collections::HashMap;

use rmfs_core::{BotId, ItemId, PodId, SimRng, SimTime, StationId};
use rmfs_graph::WaypointGraph;
use rmfs_model::Warehouse;
use rmfs_plan::Planner;

/// The `(bot, pod, station)` triple under evaluation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub bot: BotId,
    pub pod: PodId,
    pub station: StationId,
}

/// Shared, mutable scoring environment for one selection round.
pub struct SelectionEnv<'a> {
    pub warehouse: &'a Warehouse,
    pub graph: &'a WaypointGraph,
    pub planner: &'a mut Planner,
    pub rng: &'a mut SimRng,
    /// Open backlog demand per item, aggregated by the order book.
    pub demand: &'a HashMap<ItemId, u32>,
    pub now: SimTime,
}
