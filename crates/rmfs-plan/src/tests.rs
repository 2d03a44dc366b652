//! Unit tests for rmfs-plan.

#[cfg(test)]
mod helpers {
    use rmfs_core::{BotId, WaypointId};
    use rmfs_graph::{WaypointGraph, WaypointGraphBuilder};

    use crate::PlanAgent;

    /// 4×4 grid with unit spacing, two-way lanes (same layout the end-to-end
    /// scenarios use).  Waypoint (col, row) = `row * 4 + col`.
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

    /// Straight corridor a—b—c—d (two-way), unit spacing.
    pub fn corridor() -> (WaypointGraph, [WaypointId; 4]) {
        let mut b = WaypointGraphBuilder::new();
        let n: Vec<WaypointId> = (0..4).map(|i| b.add_waypoint(i as f64, 0.0, 0)).collect();
        b.add_lane(n[0], n[1]);
        b.add_lane(n[1], n[2]);
        b.add_lane(n[2], n[3]);
        (b.build(), [n[0], n[1], n[2], n[3]])
    }

    pub fn wp(col: u32, row: u32) -> WaypointId {
        WaypointId(row * 4 + col)
    }

    pub fn agent(id: u32, at: WaypointId, to: WaypointId) -> PlanAgent {
        PlanAgent {
            id: BotId(id),
            start: at,
            next: at,
            destination: to,
            speed: 1.0,
            carrying_pod: false,
            can_pass_obstacles: false,
            fixed_position: false,
            priority: 0,
        }
    }
}

// ── Reservation intervals ─────────────────────────────────────────────────────

#[cfg(test)]
mod intervals {
    use rmfs_core::{SimTime, WaypointId};

    use crate::{Interval, ReservationTable};

    const N: WaypointId = WaypointId(0);

    #[test]
    fn point_and_range_queries() {
        let mut t = ReservationTable::new(1);
        t.insert(N, Interval::new(SimTime(1.0), SimTime(3.0))).unwrap();

        assert!(t.is_free_at(N, SimTime(0.5)));
        assert!(!t.is_free_at(N, SimTime(1.0)));
        assert!(!t.is_free_at(N, SimTime(2.9)));
        // Half-open: free exactly at the end.
        assert!(t.is_free_at(N, SimTime(3.0)));

        assert!(t.is_free_during(N, Interval::new(SimTime(3.0), SimTime(5.0))));
        assert!(!t.is_free_during(N, Interval::new(SimTime(0.0), SimTime(1.5))));
    }

    #[test]
    fn overlap_rejected_disjoint_kept() {
        let mut t = ReservationTable::new(1);
        t.insert(N, Interval::new(SimTime(1.0), SimTime(3.0))).unwrap();
        assert!(t.insert(N, Interval::new(SimTime(2.0), SimTime(4.0))).is_err());
        // The failed insert must not have been partially applied.
        assert!(t.is_free_during(N, Interval::new(SimTime(3.0), SimTime(4.0))));
        t.insert(N, Interval::new(SimTime(3.0), SimTime(4.0))).unwrap();
    }

    #[test]
    fn tail_overlap_is_suppressed() {
        let mut t = ReservationTable::new(1);
        t.insert(N, Interval::new(SimTime(5.0), SimTime(7.0))).unwrap();
        // Tail collides with the existing span: suppressed, not an error.
        assert!(!t.insert_suppressed(N, Interval::tail(SimTime(6.0))));
        assert!(t.insert_suppressed(N, Interval::tail(SimTime(7.0))));
        assert_eq!(t.end_reservation_start(N), Some(SimTime(7.0)));
    }

    #[test]
    fn add_remove_roundtrip_restores_state() {
        let mut t = ReservationTable::new(2);
        t.insert(N, Interval::new(SimTime(0.0), SimTime(2.0))).unwrap();
        let before = t.fingerprint();

        let iv = Interval::new(SimTime(4.0), SimTime(6.0));
        t.insert(N, iv).unwrap();
        assert_ne!(t.fingerprint(), before);
        assert!(t.remove(N, iv));
        assert_eq!(t.fingerprint(), before);

        // Careful-remove: an interval that was never added is not removed.
        assert!(!t.remove(N, Interval::new(SimTime(0.0), SimTime(1.0))));
        assert_eq!(t.fingerprint(), before);
    }

    #[test]
    fn next_block_after() {
        let mut t = ReservationTable::new(1);
        t.insert(N, Interval::new(SimTime(2.0), SimTime(3.0))).unwrap();
        t.insert(N, Interval::new(SimTime(5.0), SimTime(6.0))).unwrap();
        let blk = t.next_block_after(N, SimTime(3.5)).unwrap();
        assert_eq!(blk.start, SimTime(5.0));
    }

    #[test]
    fn deep_copy_is_independent() {
        let mut t = ReservationTable::new(1);
        t.insert(N, Interval::new(SimTime(0.0), SimTime(1.0))).unwrap();
        let copy = t.clone();
        t.insert(N, Interval::new(SimTime(2.0), SimTime(3.0))).unwrap();
        assert_ne!(t.fingerprint(), copy.fingerprint());
    }
}

// ── RRA* heuristic ────────────────────────────────────────────────────────────

#[cfg(test)]
mod rra {
    use crate::ReverseResumable;

    use super::helpers::{grid_4x4, wp};

    #[test]
    fn exact_travel_time_on_grid() {
        let g = grid_4x4();
        let mut rra = ReverseResumable::new(&g, wp(3, 3), 1.0);
        assert_eq!(rra.estimate(&g, wp(3, 3)), Some(0.0));
        assert_eq!(rra.estimate(&g, wp(0, 0)), Some(6.0));
        // Resumed queries reuse settled state.
        assert_eq!(rra.estimate(&g, wp(2, 3)), Some(1.0));
    }

    #[test]
    fn speed_scales_estimates() {
        let g = grid_4x4();
        let mut rra = ReverseResumable::new(&g, wp(3, 0), 2.0);
        assert_eq!(rra.estimate(&g, wp(0, 0)), Some(1.5));
    }

    #[test]
    fn unreachable_is_none() {
        use rmfs_graph::WaypointGraphBuilder;
        let mut b = WaypointGraphBuilder::new();
        let a = b.add_waypoint(0.0, 0.0, 0);
        let c = b.add_waypoint(1.0, 0.0, 0);
        b.add_directed_edge(a, c); // no way back
        let g = b.build();
        let mut rra = ReverseResumable::new(&g, a, 1.0);
        assert_eq!(rra.estimate(&g, c), None);
    }
}

// ── Single-agent planning ─────────────────────────────────────────────────────

#[cfg(test)]
mod single_agent {
    use rmfs_core::{SimRng, SimTime};

    use crate::{Planner, PlannerConfig};

    use super::helpers::{agent, grid_4x4, wp};

    #[test]
    fn straight_path_on_empty_grid() {
        let g = grid_4x4();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        let mut rng = SimRng::new(1);
        let a = agent(0, wp(0, 0), wp(3, 3));

        let out = planner.find_paths(SimTime::ZERO, &[a], &g, &mut rng).unwrap();
        assert!(!out.timed_out);
        let path = &out.paths[&a.id];
        assert_eq!(path.first_waypoint(), Some(wp(0, 0)));
        assert_eq!(path.last_waypoint(), Some(wp(3, 3)));
        // 6 unit edges at 1 m/s.
        assert_eq!(path.end_time(), Some(SimTime(6.0)));
    }

    #[test]
    fn destination_gets_tail_reservation() {
        let g = grid_4x4();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        let mut rng = SimRng::new(1);
        let a = agent(0, wp(0, 0), wp(2, 0));

        planner.find_paths(SimTime::ZERO, &[a], &g, &mut rng).unwrap();
        assert_eq!(planner.find_end_reservation(wp(2, 0)), Some(SimTime(2.0)));
        assert_eq!(planner.find_end_reservation(wp(1, 0)), None);
    }

    #[test]
    fn estimator_reports_time_without_reserving() {
        let g = grid_4x4();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        let a = agent(0, wp(0, 0), wp(3, 3));

        let before = planner.committed_fingerprint();
        let (end, found) = planner.find_path(&a, SimTime::ZERO, wp(0, 0), wp(3, 3), false, &g);
        assert!(found);
        assert_eq!(end, SimTime(6.0));
        assert_eq!(planner.committed_fingerprint(), before);
    }

    #[test]
    fn zero_window_one_step_rule() {
        let g = grid_4x4();
        let config = PlannerConfig { window: 0.0, ..PlannerConfig::default() };
        let mut planner = Planner::new(config, &g);

        // Adjacent goal: reachable in one step.
        let near = agent(0, wp(0, 0), wp(1, 0));
        let (_, found) = planner.find_path(&near, SimTime::ZERO, wp(0, 0), wp(1, 0), false, &g);
        assert!(found);

        // Two steps away: no path under a zero window.
        let far = agent(1, wp(0, 0), wp(2, 0));
        let (_, found) = planner.find_path(&far, SimTime::ZERO, wp(0, 0), wp(2, 0), false, &g);
        assert!(!found);
    }
}

// ── Multi-agent planning ──────────────────────────────────────────────────────

#[cfg(test)]
mod multi_agent {
    use std::collections::HashMap;

    use rmfs_core::{BotId, SimRng, SimTime};

    use crate::{Interval, Planner, PlannerConfig, Reservation};

    use super::helpers::{agent, corridor, grid_4x4, wp};

    /// Head-on traffic on the same row: both bots must end up with paths and
    /// the reservation insertion (which rejects overlap) must not error.
    #[test]
    fn crossing_agents_resolve() {
        let g = grid_4x4();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        let mut rng = SimRng::new(7);
        let a = agent(0, wp(0, 1), wp(3, 1));
        let b = agent(1, wp(3, 1), wp(0, 1));

        let out = planner.find_paths(SimTime::ZERO, &[a, b], &g, &mut rng).unwrap();
        assert!(out.paths.contains_key(&a.id), "first agent unplanned");
        assert!(out.paths.contains_key(&b.id), "second agent unplanned");

        // No two steps of different agents may overlap in space-time.
        let mut res: Vec<(u32, Reservation)> = Vec::new();
        for (bot, path) in &out.paths {
            for r in path.reservations() {
                res.push((bot.0, r));
            }
        }
        for (i, (bot_i, ri)) in res.iter().enumerate() {
            for (bot_j, rj) in res.iter().skip(i + 1) {
                if bot_i != bot_j && ri.node == rj.node {
                    assert!(
                        !ri.span.overlaps(&rj.span),
                        "overlap at {:?}: {:?} vs {:?}",
                        ri.node,
                        ri.span,
                        rj.span
                    );
                }
            }
        }
    }

    /// A follower planning second trails the leader with one wait step of
    /// spacing: a cell only opens up once the leader has fully left it.
    #[test]
    fn follower_trails_leader_through_corridor() {
        let (g, [a0, a1, a2, a3]) = corridor();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        let mut rng = SimRng::new(3);

        let leader = agent(0, a1, a3);
        let follower = agent(1, a0, a2);

        let out = planner
            .find_paths(SimTime::ZERO, &[leader, follower], &g, &mut rng)
            .unwrap();
        // Leader goes straight: 2 edges.
        assert_eq!(out.paths[&BotId(0)].end_time(), Some(SimTime(2.0)));
        // Follower waits out the leader's occupancy of a1, then follows:
        // wait [0,1], a1 at 2, a2 at 3.
        assert_eq!(out.paths[&BotId(1)].end_time(), Some(SimTime(3.0)));
        let _ = a2;
    }

    /// A scheduled priority makes the prioritized agent plan first even when
    /// it is farther from its goal.
    #[test]
    fn scheduled_priority_orders_service() {
        let g = grid_4x4();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        let mut rng = SimRng::new(5);

        // Both want to cross the middle; bot 1 is farther but prioritized.
        let a = agent(0, wp(1, 1), wp(3, 1));
        let b = agent(1, wp(0, 1), wp(3, 1));
        planner.update_agent_priority(BotId(1), 5);

        let out = planner.find_paths(SimTime::ZERO, &[a, b], &g, &mut rng).unwrap();
        // The prioritized bot gets the unobstructed straight run: 3 edges.
        assert_eq!(out.paths[&BotId(1)].end_time(), Some(SimTime(3.0)));
        assert_eq!(planner.priority_of(BotId(1)), 5);
    }

    /// A bot standing forever at the only through-node leaves the other no
    /// progress: its best windowed plan is to wait in place, holding its
    /// cell, and planning must degrade rather than error.
    #[test]
    fn blocked_agent_waits_in_place() {
        let (g, [a0, a1, _a2, a3]) = corridor();
        let config = PlannerConfig {
            use_deadlock_handler: false,
            ..PlannerConfig::default()
        };
        let mut planner = Planner::new(config, &g);
        let mut rng = SimRng::new(9);

        let parked = agent(0, a1, a1); // stands at its own goal
        let mover = agent(1, a0, a3);

        let out = planner
            .find_paths(SimTime::ZERO, &[parked, mover], &g, &mut rng)
            .unwrap();
        let path = &out.paths[&BotId(1)];
        // No movement: the window exit is the start cell itself.
        assert_eq!(path.last_waypoint(), Some(a0));
        assert_eq!(path.steps.len(), 1);
        // The mover keeps holding its cell from now on.
        assert_eq!(planner.find_end_reservation(a0), Some(SimTime::ZERO));
    }

    // ── Speculative isolation ─────────────────────────────────────────────

    #[test]
    fn scheduled_operations_never_touch_committed() {
        let g = grid_4x4();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        let mut rng = SimRng::new(11);
        let a = agent(0, wp(0, 0), wp(3, 0));
        let b = agent(1, wp(0, 3), wp(3, 3));

        planner.find_paths(SimTime::ZERO, &[a, b], &g, &mut rng).unwrap();
        let committed = planner.committed_fingerprint();

        planner.schedule_init();
        assert_eq!(planner.scheduled_fingerprint(), committed);

        // Speculate: reroute bot 0, then plan bot 1 on top of it.
        let (_, res, found) =
            planner.schedule_path(&a, SimTime::ZERO, wp(0, 0), wp(0, 2), false, &[], &g);
        assert!(found);
        planner.overwrite_scheduled_path(a.id, res);
        let (_, res_b, found_b) =
            planner.schedule_path(&b, SimTime::ZERO, wp(0, 3), wp(2, 0), false, &[], &g);
        assert!(found_b);
        planner.overwrite_scheduled_path(b.id, res_b);

        assert_ne!(planner.scheduled_fingerprint(), committed);
        assert_eq!(planner.committed_fingerprint(), committed);

        // A second init resets the speculation wholesale.
        planner.schedule_init();
        assert_eq!(planner.scheduled_fingerprint(), committed);
    }

    #[test]
    fn schedule_path_restores_table_on_probe() {
        let g = grid_4x4();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        planner.schedule_init();
        let probe = planner.scheduled_fingerprint();

        let a = agent(0, wp(0, 0), wp(3, 0));
        let (_, res, found) =
            planner.schedule_path(&a, SimTime::ZERO, wp(0, 0), wp(3, 0), false, &[], &g);
        assert!(found);
        assert!(!res.is_empty());
        // Probing alone must leave the scheduled table untouched.
        assert_eq!(planner.scheduled_fingerprint(), probe);
    }

    // ── Scheduled priorities from the sequence ────────────────────────────

    #[test]
    fn output_scheduled_priority_honors_task_match() {
        let g = grid_4x4();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        planner.schedule_init();

        let a = agent(0, wp(0, 0), wp(3, 0));
        let b = agent(1, wp(0, 1), wp(3, 1));
        for ag in [&a, &b] {
            let (_, res, found) =
                planner.schedule_path(ag, SimTime::ZERO, ag.start, ag.destination, false, &[], &g);
            assert!(found);
            planner.overwrite_scheduled_path(ag.id, res);
        }
        planner.record_scheduled_task(a.id, 100);
        planner.record_scheduled_task(b.id, 200);

        // Bot b scheduled last → highest priority; bot a's task changed since
        // scheduling → no priority.
        let current: HashMap<_, _> = [(a.id, 999), (b.id, 200)].into_iter().collect();
        planner.output_scheduled_priority(&current);
        assert_eq!(planner.priority_of(b.id), 2);
        assert_eq!(planner.priority_of(a.id), 0);
    }

    #[test]
    fn extra_reservations_shape_the_second_leg() {
        let (g, [a0, a1, a2, a3]) = corridor();
        let mut planner = Planner::new(PlannerConfig::default(), &g);
        planner.schedule_init();

        let a = agent(0, a0, a3);
        // Pretend another leg occupies a1 during [0, 5): the plan for a0→a3
        // must wait it out.
        let blocker = Reservation::new(a1, Interval::new(SimTime::ZERO, SimTime(5.0)));
        let (end, res, found) =
            planner.schedule_path(&a, SimTime::ZERO, a0, a3, false, &[blocker], &g);
        assert!(found);
        assert!(end > SimTime(5.0), "leg ignored the extra reservation: {end}");
        assert!(!res.is_empty());
        let _ = a2;
    }
}
