//! Planner-side view of an agent and its timed path.

use rmfs_core::{BotId, SimTime, WaypointId};

use crate::interval::Interval;

/// What the planner needs to know about a bot.  Built by the engine from the
/// bot read-model; the planner never touches warehouse state.
#[derive(Copy, Clone, Debug)]
pub struct PlanAgent {
    pub id: BotId,
    /// Waypoint the bot currently occupies (or last departed).
    pub start: WaypointId,
    /// First waypoint the bot will occupy; equals `start` unless mid-edge.
    pub next: WaypointId,
    pub destination: WaypointId,
    /// Cruise speed in metres per second.
    pub speed: f64,
    pub carrying_pod: bool,
    /// Constrained bots (cannot drive under stored pods) plan first.
    pub can_pass_obstacles: bool,
    /// Parked / queued agents only block their position; no search.
    pub fixed_position: bool,
    /// Scheduled priority; 0 means none.
    pub priority: u32,
}

/// One reservation the planner hands back: `bot` occupies `node` over `span`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reservation {
    pub node: WaypointId,
    pub span: Interval,
}

impl Reservation {
    pub fn new(node: WaypointId, span: Interval) -> Self {
        Self { node, span }
    }
}

/// A visit to one waypoint: arrive, possibly wait, depart.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PathStep {
    pub waypoint: WaypointId,
    pub arrival: SimTime,
    pub depart: SimTime,
}

/// A timed path through the waypoint graph.  Steps are in travel order;
/// `steps[i].depart` is when the bot leaves for `steps[i + 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub steps: Vec<PathStep>,
}

impl Path {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn first_waypoint(&self) -> Option<WaypointId> {
        self.steps.first().map(|s| s.waypoint)
    }

    pub fn last_waypoint(&self) -> Option<WaypointId> {
        self.steps.last().map(|s| s.waypoint)
    }

    /// Arrival time at the final step.
    pub fn end_time(&self) -> Option<SimTime> {
        self.steps.last().map(|s| s.arrival)
    }

    /// Convert to reservations: each step is occupied from its arrival until
    /// the arrival at the following step; the final step becomes a tail.
    pub fn reservations(&self) -> Vec<Reservation> {
        let mut out = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            let span = match self.steps.get(i + 1) {
                Some(next) => Interval::new(step.arrival, next.arrival),
                None => Interval::tail(step.arrival),
            };
            out.push(Reservation::new(step.waypoint, span));
        }
        out
    }
}
