//! `rmfs-plan` — windowed cooperative path planning (WHCA*).
//!
//! # How the pieces fit
//!
//! ```text
//! ReservationTable   per-waypoint disjoint time intervals of bot occupancy
//!        │
//! ReverseResumable   untimed reverse search from the goal; perfect heuristic
//!        │
//! space_time_astar   timed A* within a look-ahead window; waiting is an action
//!        │
//! Planner            committed table (binds the next tick) + scheduled table
//!                    (deep copy for speculative what-ifs by selection / SA)
//! ```
//!
//! The committed table is rebuilt by every [`Planner::find_paths`] call; the
//! scheduled table is refreshed from it by [`Planner::schedule_init`] and then
//! mutated freely without ever touching commitments (speculative isolation).

pub mod agent;
pub mod config;
pub mod error;
pub mod interval;
pub mod planner;
pub mod rra;
pub mod search;

#[cfg(test)]
mod tests;

pub use agent::{Path, PathStep, PlanAgent, Reservation};
pub use config::PlannerConfig;
pub use error::{PlanError, PlanResult};
pub use interval::{Interval, ReservationTable};
pub use planner::{FindPathsOutcome, Planner};
pub use rra::ReverseResumable;
