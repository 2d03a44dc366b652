//! `rmfs-core` — foundational types for the rmfs allocation engine.
//!
//! This crate is a dependency of every other `rmfs-*` crate.  It intentionally
//! has no `rmfs-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                                  |
//! |-----------|-----------------------------------------------------------|
//! | [`ids`]   | `BotId`, `PodId`, `StationId`, `OrderId`, `ItemId`, `WaypointId` |
//! | [`time`]  | `SimTime` (continuous simulated seconds, totally ordered) |
//! | [`rng`]   | `SimRng` (deterministic, seeded)                          |
//! | [`error`] | `CoreError`, `CoreResult`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod error;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use ids::{BotId, ItemId, OrderId, PodId, StationId, WaypointId};
pub use rng::SimRng;
pub use time::SimTime;
