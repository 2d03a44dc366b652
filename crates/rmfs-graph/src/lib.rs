//! `rmfs-graph` — the directed waypoint graph the engine plans on.
//!
//! The simulator owns warehouse geometry; the engine only sees waypoints
//! (position, tier) and directed edges between them.  This crate provides the
//! CSR graph, straight-line metrics, and the untimed shortest-path distance
//! the scorers and selection strategies consume.
//!
//! Timed, reservation-aware search lives in `rmfs-plan`; this crate is purely
//! static structure.

pub mod dijkstra;
pub mod graph;

#[cfg(test)]
mod tests;

pub use graph::{WaypointGraph, WaypointGraphBuilder};
