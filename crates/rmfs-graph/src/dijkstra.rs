//! Untimed shortest-path distance queries.
//!
//! This is the `get_distance(a, b)` surface of the engine: plain Dijkstra
//! over edge lengths, ignoring reservations and time.  The scorers, the
//! HADOD strategy, and the dispatch augmentation ordering all consume it.
//! Reservation-aware search lives in `rmfs-plan`.

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rmfs_core::WaypointId;

use crate::WaypointGraph;

/// Heap entry ordered by `f64` cost with a deterministic waypoint tie-break.
#[derive(Copy, Clone, PartialEq)]
struct HeapEntry {
    cost: f64,
    node: WaypointId,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl WaypointGraph {
    /// Shortest-path distance (metres) from `from` to `to`, or `None` if `to`
    /// is unreachable.
    ///
    /// Early-exits when `to` is settled; use [`distances_from`][Self::distances_from]
    /// when many targets share a source.
    pub fn shortest_distance(&self, from: WaypointId, to: WaypointId) -> Option<f64> {
        if from == to {
            return Some(0.0);
        }

        let mut dist = vec![f64::INFINITY; self.node_count()];
        dist[from.index()] = 0.0;

        let mut heap = BinaryHeap::new();
        heap.push(Reverse(HeapEntry { cost: 0.0, node: from }));

        while let Some(Reverse(HeapEntry { cost, node })) = heap.pop() {
            if node == to {
                return Some(cost);
            }
            // Skip stale heap entries.
            if cost > dist[node.index()] {
                continue;
            }
            for (next, len) in self.out_neighbors(node) {
                let new_cost = cost + len;
                if new_cost < dist[next.index()] {
                    dist[next.index()] = new_cost;
                    heap.push(Reverse(HeapEntry { cost: new_cost, node: next }));
                }
            }
        }

        None
    }

    /// Full single-source distance array from `from`.
    ///
    /// Unreachable waypoints hold `f64::INFINITY`.
    pub fn distances_from(&self, from: WaypointId) -> Vec<f64> {
        let mut dist = vec![f64::INFINITY; self.node_count()];
        dist[from.index()] = 0.0;

        let mut heap = BinaryHeap::new();
        heap.push(Reverse(HeapEntry { cost: 0.0, node: from }));

        while let Some(Reverse(HeapEntry { cost, node })) = heap.pop() {
            if cost > dist[node.index()] {
                continue;
            }
            for (next, len) in self.out_neighbors(node) {
                let new_cost = cost + len;
                if new_cost < dist[next.index()] {
                    dist[next.index()] = new_cost;
                    heap.push(Reverse(HeapEntry { cost: new_cost, node: next }));
                }
            }
        }

        dist
    }
}
