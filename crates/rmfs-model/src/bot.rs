//! Bots: the mobile robots that carry pods.

use rmfs_core::{BotId, PodId, WaypointId};

/// Motion parameters the planner needs.  The physical simulation
/// (acceleration, turning) stays outside the engine.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BotPhysics {
    /// Cruise speed in metres per second.
    pub max_speed: f64,
    /// Whether the bot may drive underneath stored pods (affects planning
    /// order: constrained bots plan first).
    pub can_pass_obstacles: bool,
}

impl Default for BotPhysics {
    fn default() -> Self {
        Self { max_speed: 1.5, can_pass_obstacles: false }
    }
}

/// Read-model of a robot as the engine sees it.  Movement itself is
/// simulated outside; the engine updates `carried_pod` and reads waypoints.
#[derive(Debug, Clone)]
pub struct Bot {
    pub id: BotId,
    pub tier: u16,
    /// Waypoint the bot currently occupies (or last departed).
    pub waypoint: WaypointId,
    /// Waypoint the bot is headed to; equals `waypoint` when idle.
    pub target_waypoint: WaypointId,
    pub carried_pod: Option<PodId>,
    pub physics: BotPhysics,
}

impl Bot {
    pub fn new(id: BotId, waypoint: WaypointId, tier: u16, physics: BotPhysics) -> Self {
        Self {
            id,
            tier,
            waypoint,
            target_waypoint: waypoint,
            carried_pod: None,
            physics,
        }
    }
}
