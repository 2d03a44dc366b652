//! Reverse Resumable A* — the planner's heuristic.
//!
//! An untimed backward search from the goal over the graph's incoming edges.
//! `estimate(node)` returns the exact shortest **travel time** from `node` to
//! the goal, expanding only as much of the graph as queries demand and
//! resuming from its frontier on the next query.
//!
//! With no time dimension and a fixed goal there is nothing to inform an
//! admissible heuristic better than the true distance, so this degenerates to
//! resumable Dijkstra; the space-time search on top is what pays for the
//! exactness.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use rmfs_core::WaypointId;
use rmfs_graph::WaypointGraph;

#[derive(Copy, Clone, PartialEq)]
struct FrontierEntry {
    cost: f64,
    node: WaypointId,
}

impl Eq for FrontierEntry {}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Resumable reverse search state for one (goal, speed) pair.
///
/// The planner caches one per agent and rebuilds it when the agent's
/// destination changes or a deadlock detour invalidates it.
pub struct ReverseResumable {
    goal: WaypointId,
    speed: f64,
    /// Settled shortest times to goal, in seconds.  `INFINITY` = not settled.
    dist: Vec<f64>,
    settled: Vec<bool>,
    open: BinaryHeap<Reverse<FrontierEntry>>,
}

impl ReverseResumable {
    pub fn new(graph: &WaypointGraph, goal: WaypointId, speed: f64) -> Self {
        let mut open = BinaryHeap::new();
        let mut dist = vec![f64::INFINITY; graph.node_count()];
        dist[goal.index()] = 0.0;
        open.push(Reverse(FrontierEntry { cost: 0.0, node: goal }));
        Self {
            goal,
            speed,
            dist,
            settled: vec![false; graph.node_count()],
            open,
        }
    }

    #[inline]
    pub fn goal(&self) -> WaypointId {
        self.goal
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Shortest travel time in seconds from `node` to the goal, or `None` if
    /// the goal is unreachable from `node`.
    ///
    /// Resumes the reverse search until `node` is settled.
    pub fn estimate(&mut self, graph: &WaypointGraph, node: WaypointId) -> Option<f64> {
        if self.settled[node.index()] {
            return Some(self.dist[node.index()]);
        }

        while let Some(Reverse(FrontierEntry { cost, node: n })) = self.open.pop() {
            if cost > self.dist[n.index()] {
                continue; // stale
            }
            self.settled[n.index()] = true;

            // Reverse expansion: predecessors of n reach the goal through n.
            for (prev, len) in graph.in_neighbors(n) {
                let new_cost = cost + len / self.speed;
                if new_cost < self.dist[prev.index()] {
                    self.dist[prev.index()] = new_cost;
                    self.open.push(Reverse(FrontierEntry { cost: new_cost, node: prev }));
                }
            }

            if n == node {
                return Some(cost);
            }
        }

        None
    }
}
