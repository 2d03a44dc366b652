//! Unit tests for rmfs-score.

#[cfg(test)]
mod helpers {
    use std::collections::HashMap;

    use rmfs_core::{BotId, ItemId, OrderId, PodId, SimRng, SimTime, StationId, WaypointId};
    use rmfs_graph::{WaypointGraph, WaypointGraphBuilder};
    use rmfs_model::{StationKind, Warehouse};
    use rmfs_plan::{Planner, PlannerConfig};

    pub const A: ItemId = ItemId(0);
    pub const B: ItemId = ItemId(1);

    /// 4×4 unit grid on tier 0.
    pub fn grid() -> WaypointGraph {
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

    /// Bot at (0,0), pod `{A:2, B:1}` at (2,0), output station at (3,3).
    pub struct World {
        pub warehouse: Warehouse,
        pub graph: WaypointGraph,
        pub planner: Planner,
        pub rng: SimRng,
        pub demand: HashMap<ItemId, u32>,
        pub bot: BotId,
        pub pod: PodId,
        pub station: StationId,
    }

    pub fn world() -> World {
        let graph = grid();
        let planner = Planner::new(PlannerConfig::default(), &graph);
        let mut warehouse = Warehouse::new();
        let bot = warehouse.add_bot(wp(0, 0), 0, Default::default());
        let pod = warehouse.add_pod(wp(2, 0), 0, 10);
        warehouse.pod_mut(pod).add_items(A, 2);
        warehouse.pod_mut(pod).add_items(B, 1);
        let station = warehouse.add_station(StationKind::Output, wp(3, 3), 0, 4);
        World {
            warehouse,
            graph,
            planner,
            rng: SimRng::new(42),
            demand: HashMap::new(),
            bot,
            pod,
            station,
        }
    }

    pub fn add_order(w: &mut Warehouse, st: StationId, positions: &[(ItemId, u32)]) -> OrderId {
        let map: HashMap<ItemId, u32> = positions.iter().copied().collect();
        let o = w.add_order(map, SimTime::ZERO, SimTime(600.0), SimTime::ZERO);
        w.station_mut(st).queued_orders.push(o);
        o
    }

    /// Split a `World` into the scoring environment (disjoint field borrows).
    pub fn env_of(w: &mut World) -> crate::SelectionEnv<'_> {
        crate::SelectionEnv {
            warehouse: &w.warehouse,
            graph: &w.graph,
            planner: &mut w.planner,
            rng: &mut w.rng,
            demand: &w.demand,
            now: SimTime::ZERO,
        }
    }
}

// ── BestOf ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod best_of {
    use crate::{BestOf, Objective};

    #[test]
    fn lexicographic_order_decides() {
        let mut best = BestOf::new(2, Objective::Minimize);
        // Candidates: (primary, tiebreak)
        let scores = [(1.0, 9.0), (1.0, 2.0), (2.0, 0.0)];
        for (i, _) in scores.iter().enumerate() {
            best.reassess(i, |c, cand| match c {
                0 => scores[cand].0,
                _ => scores[cand].1,
            });
        }
        // Candidate 1 ties the primary and wins the tie-breaker; candidate 2
        // loses the primary outright.
        assert_eq!(best.best(), Some(1));
        assert_eq!(best.best_scores(), &[1.0, 2.0]);
    }

    #[test]
    fn full_tie_keeps_first_seen() {
        let mut best = BestOf::new(2, Objective::Minimize);
        best.reassess("first", |_, _| 5.0);
        let took_lead = best.reassess("second", |_, _| 5.0);
        assert!(!took_lead);
        assert_eq!(best.best(), Some("first"));
    }

    #[test]
    fn short_circuits_after_primary_loss() {
        let mut best = BestOf::new(3, Objective::Minimize);
        best.reassess(0usize, |_, _| 1.0);

        let mut evaluations = 0;
        best.reassess(1usize, |i, _| {
            evaluations += 1;
            match i {
                0 => 2.0, // strictly worse → stop here
                _ => unreachable!("tie-breakers must not be evaluated"),
            }
        });
        assert_eq!(evaluations, 1);
        assert_eq!(best.best(), Some(0));
    }

    #[test]
    fn maximize_flips_direction() {
        let mut best = BestOf::new(1, Objective::Maximize);
        best.reassess(10, |_, c| c as f64);
        best.reassess(30, |_, c| c as f64);
        best.reassess(20, |_, c| c as f64);
        assert_eq!(best.best(), Some(30));
    }

    #[test]
    fn recycle_resets_the_round() {
        let mut best = BestOf::new(1, Objective::Minimize);
        best.reassess(1, |_, _| 0.0);
        best.recycle();
        assert_eq!(best.best(), None);
        assert!(best.best_scores().is_empty());
        assert!(best.reassess(2, |_, _| 9.0));
        assert_eq!(best.best(), Some(2));
    }
}

// ── Scorers ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scorers {
    use rmfs_model::RequestFilter;

    use crate::scorer::{
        build_scorer, DistanceMetric, FillPreference, ScorerKind, WorkValue,
    };
    use crate::Candidate;

    use super::helpers::{add_order, env_of, world, A, B};

    fn candidate(w: &super::helpers::World) -> Candidate {
        Candidate { bot: w.bot, pod: w.pod, station: w.station }
    }

    #[test]
    fn random_is_unit_interval_and_tier_signed() {
        let mut w = world();
        let cand = candidate(&w);
        let plain = build_scorer(ScorerKind::Random { prefer_same_tier: false });
        let tiered = build_scorer(ScorerKind::Random { prefer_same_tier: true });

        let mut env = env_of(&mut w);
        for _ in 0..32 {
            let s = plain(&mut env, cand);
            assert!((0.0..1.0).contains(&s));
            // All tiers match here, so the preferring variant negates.
            let t = tiered(&mut env, cand);
            assert!((-1.0..=0.0).contains(&t));
        }
    }

    #[test]
    fn nearest_composes_hops() {
        let mut w = world();
        let cand = candidate(&w);
        let scorer = build_scorer(ScorerKind::Nearest {
            metric: DistanceMetric::Manhattan,
            prefer_same_tier: false,
            wrong_tier_penalty: 100.0,
        });
        let mut env = env_of(&mut w);
        // bot (0,0) → pod (2,0): 2; pod (2,0) → station (3,3): 4.
        assert_eq!(scorer(&mut env, cand), 6.0);
    }

    #[test]
    fn nearest_shortest_path_equals_grid_distance() {
        let mut w = world();
        let cand = candidate(&w);
        let scorer = build_scorer(ScorerKind::Nearest {
            metric: DistanceMetric::ShortestPath,
            prefer_same_tier: false,
            wrong_tier_penalty: 100.0,
        });
        let mut env = env_of(&mut w);
        assert_eq!(scorer(&mut env, cand), 6.0);
    }

    #[test]
    fn nearest_tier_penalty_applied_per_mismatched_adjacency() {
        let mut w = world();
        let cand = candidate(&w);
        let scorer = build_scorer(ScorerKind::Nearest {
            metric: DistanceMetric::Manhattan,
            prefer_same_tier: true,
            wrong_tier_penalty: 100.0,
        });

        // Pod on another tier: both adjacencies (bot—pod, pod—station) break.
        w.warehouse.pod_mut(w.pod).tier = 1;
        let mut env = env_of(&mut w);
        assert_eq!(scorer(&mut env, cand), 6.0 + 200.0);
        drop(env);

        // Only the bot mismatches: one broken adjacency.
        w.warehouse.pod_mut(w.pod).tier = 0;
        w.warehouse.bot_mut(w.bot).tier = 1;
        let mut env = env_of(&mut w);
        assert_eq!(scorer(&mut env, cand), 6.0 + 100.0);
    }

    #[test]
    fn work_amount_counts_realizable_picks() {
        let mut w = world();
        let cand = candidate(&w);
        // Orders need {A:3, B:1}; the pod offers {A:2, B:1} → 3 picks.
        add_order(&mut w.warehouse, w.station, &[(A, 3)]);
        add_order(&mut w.warehouse, w.station, &[(B, 1)]);

        let scorer = build_scorer(ScorerKind::WorkAmount {
            value: WorkValue::Picks,
            filter: RequestFilter::AssignedAndQueuedEqually,
        });
        let mut env = env_of(&mut w);
        assert_eq!(scorer(&mut env, cand), -3.0);
    }

    #[test]
    fn work_amount_order_age() {
        let mut w = world();
        let cand = candidate(&w);
        add_order(&mut w.warehouse, w.station, &[(B, 1)]);

        let scorer = build_scorer(ScorerKind::WorkAmount {
            value: WorkValue::OrderAge,
            filter: RequestFilter::AssignedAndQueuedEqually,
        });
        let mut env = env_of(&mut w);
        env.now = rmfs_core::SimTime(30.0);
        // One realizable pick for an order 30 s old.
        assert_eq!(scorer(&mut env, cand), -30.0);
    }

    #[test]
    fn demand_overlap() {
        let mut w = world();
        let cand = candidate(&w);
        w.demand.insert(A, 1); // backlog wants 1×A; pod has 2×A, 1×B
        let scorer = build_scorer(ScorerKind::Demand);
        let mut env = env_of(&mut w);
        assert_eq!(scorer(&mut env, cand), -1.0);
    }

    #[test]
    fn completeable_counts_orders_pod_can_finish() {
        let mut w = world();
        let cand = candidate(&w);
        add_order(&mut w.warehouse, w.station, &[(A, 2)]); // pod covers
        add_order(&mut w.warehouse, w.station, &[(A, 1), (B, 1)]); // pod covers
        add_order(&mut w.warehouse, w.station, &[(B, 2)]); // pod has only 1×B

        let scorer = build_scorer(ScorerKind::Completeable { include_queued: true });
        let mut env = env_of(&mut w);
        // Orders are checked independently: {A:2} ✓, {A:1,B:1} ✓, {B:2} ✗.
        assert_eq!(scorer(&mut env, cand), -2.0);
    }

    #[test]
    fn fill_analog_and_binary() {
        let mut w = world();
        let cand = candidate(&w);
        // 3 units on capacity 10.
        let fullest = build_scorer(ScorerKind::Fill {
            preference: FillPreference::Fullest,
            binary: false,
            threshold: 0.0,
        });
        let binary = build_scorer(ScorerKind::Fill {
            preference: FillPreference::Fullest,
            binary: true,
            threshold: 0.5,
        });
        let mut env = env_of(&mut w);
        assert!((fullest(&mut env, cand) + 0.3).abs() < 1e-12);
        assert_eq!(binary(&mut env, cand), 0.0); // below threshold
    }

    #[test]
    fn congestion_sums_leg_estimates() {
        let mut w = world();
        let cand = candidate(&w);
        let scorer = build_scorer(ScorerKind::Congestion);
        let mut env = env_of(&mut w);
        // Empty table, unit speed: bot→pod = 2 s, pod→station = 4 s.
        let s = scorer(&mut env, cand);
        assert!((s - 6.0).abs() < 1e-9, "unexpected congestion estimate {s}");
    }
}

// ── Telemetry records ─────────────────────────────────────────────────────────

#[cfg(test)]
mod records {
    use rmfs_model::RequestFilter;

    use crate::scorer::{DistanceMetric, ScorerKind, ScorerStack, WorkValue};

    #[test]
    fn named_entries_follow_stack_order() {
        let stack = ScorerStack::new(vec![
            ScorerKind::WorkAmount {
                value: WorkValue::Picks,
                filter: RequestFilter::AssignedOnly,
            },
            ScorerKind::Nearest {
                metric: DistanceMetric::Euclidean,
                prefer_same_tier: false,
                wrong_tier_penalty: 0.0,
            },
        ]);
        let record = stack.record(&[-4.0, 2.5]);
        assert_eq!(
            record.entries,
            vec![("work_amount".to_owned(), -4.0), ("nearest".to_owned(), 2.5)]
        );
    }
}
