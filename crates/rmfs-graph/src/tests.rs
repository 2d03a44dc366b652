//! Unit tests for rmfs-graph.
//!
//! All tests use a hand-crafted grid so no geometry loader is needed.

#[cfg(test)]
mod helpers {
    use rmfs_core::WaypointId;
    use crate::{WaypointGraph, WaypointGraphBuilder};

    /// Build a 4×4 grid tier with unit spacing and two-way lanes.
    ///
    /// Waypoint (col, row) has id `row * 4 + col`.  Every horizontal and
    /// vertical neighbor pair is connected in both directions, so the
    /// shortest path between any two waypoints equals their Manhattan
    /// distance.
    pub fn grid_4x4() -> WaypointGraph {
        let mut b = WaypointGraphBuilder::new();
        for row in 0..4 {
            for col in 0..4 {
                b.add_waypoint(col as f64, row as f64, 0);
            }
        }
        for row in 0..4u32 {
            for col in 0..4u32 {
                let id = WaypointId(row * 4 + col);
                if col < 3 {
                    b.add_lane(id, WaypointId(row * 4 + col + 1));
                }
                if row < 3 {
                    b.add_lane(id, WaypointId((row + 1) * 4 + col));
                }
            }
        }
        b.build()
    }

    pub fn wp(col: u32, row: u32) -> WaypointId {
        WaypointId(row * 4 + col)
    }
}

// ── Builder & structure ───────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use rmfs_core::WaypointId;
    use crate::WaypointGraphBuilder;

    #[test]
    fn empty_build() {
        let g = WaypointGraphBuilder::new().build();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.is_empty());
    }

    #[test]
    fn grid_dimensions() {
        let g = super::helpers::grid_4x4();
        assert_eq!(g.node_count(), 16);
        // 24 lanes, each two directed edges.
        assert_eq!(g.edge_count(), 48);
    }

    #[test]
    fn out_neighbors_of_corner_and_center() {
        let g = super::helpers::grid_4x4();
        assert_eq!(g.out_degree(super::helpers::wp(0, 0)), 2);
        assert_eq!(g.out_degree(super::helpers::wp(1, 1)), 4);
    }

    #[test]
    fn backward_mirror_matches_forward() {
        let g = super::helpers::grid_4x4();
        // For every forward edge a→b there is an entry b's in_neighbors
        // containing a with the same length.
        for a in 0..g.node_count() {
            let a = WaypointId(a as u32);
            for (b, len) in g.out_neighbors(a) {
                let mirrored = g
                    .in_neighbors(b)
                    .any(|(from, l)| from == a && (l - len).abs() < 1e-12);
                assert!(mirrored, "missing backward edge {b}→{a}");
            }
        }
    }

    #[test]
    fn directed_edge_has_no_reverse() {
        let mut b = WaypointGraphBuilder::new();
        let a = b.add_waypoint(0.0, 0.0, 0);
        let c = b.add_waypoint(1.0, 0.0, 0);
        b.add_directed_edge(a, c);
        let g = b.build();
        assert_eq!(g.out_degree(a), 1);
        assert_eq!(g.out_degree(c), 0);
    }

    #[test]
    fn explicit_length_edge() {
        let mut b = WaypointGraphBuilder::new();
        let a = b.add_waypoint(0.0, 0.0, 0);
        let c = b.add_waypoint(0.0, 0.0, 1); // elevator: same position, other tier
        b.add_directed_edge_with_length(a, c, 5.0);
        let g = b.build();
        let (_, len) = g.out_neighbors(a).next().unwrap();
        assert_eq!(len, 5.0);
        assert_eq!(g.tier(c), 1);
    }
}

// ── Metrics ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod metrics {
    use super::helpers::{grid_4x4, wp};

    #[test]
    fn euclidean_and_manhattan() {
        let g = grid_4x4();
        assert_eq!(g.manhattan(wp(0, 0), wp(3, 3)), 6.0);
        let e = g.euclidean(wp(0, 0), wp(3, 3));
        assert!((e - 18.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn min_edge_length() {
        let g = grid_4x4();
        assert_eq!(g.min_edge_length(), Some(1.0));
    }
}

// ── Shortest paths ────────────────────────────────────────────────────────────

#[cfg(test)]
mod shortest {
    use rmfs_core::WaypointId;
    use crate::WaypointGraphBuilder;
    use super::helpers::{grid_4x4, wp};

    #[test]
    fn same_node_is_zero() {
        let g = grid_4x4();
        assert_eq!(g.shortest_distance(wp(2, 2), wp(2, 2)), Some(0.0));
    }

    #[test]
    fn grid_distance_equals_manhattan() {
        let g = grid_4x4();
        let d = g.shortest_distance(wp(0, 0), wp(3, 3)).unwrap();
        assert!((d - 6.0).abs() < 1e-9);
    }

    #[test]
    fn unreachable_is_none() {
        let mut b = WaypointGraphBuilder::new();
        let a = b.add_waypoint(0.0, 0.0, 0);
        let c = b.add_waypoint(1.0, 0.0, 0);
        b.add_directed_edge(a, c); // one-way
        let g = b.build();
        assert!(g.shortest_distance(c, a).is_none());
        assert_eq!(g.shortest_distance(a, c), Some(1.0));
    }

    #[test]
    fn distances_from_whole_grid() {
        let g = grid_4x4();
        let dist = g.distances_from(wp(0, 0));
        for row in 0..4u32 {
            for col in 0..4u32 {
                let expected = (row + col) as f64;
                assert!(
                    (dist[WaypointId(row * 4 + col).index()] - expected).abs() < 1e-9,
                    "wrong distance to ({col},{row})"
                );
            }
        }
    }
}
