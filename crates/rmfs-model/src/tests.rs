//! Unit tests for rmfs-model.

#[cfg(test)]
mod helpers {
    use std::collections::HashMap;

    use rmfs_core::{ItemId, OrderId, PodId, SimTime, StationId, WaypointId};

    use crate::{StationKind, Warehouse};

    pub const A: ItemId = ItemId(0);
    pub const B: ItemId = ItemId(1);

    /// One output station, one pod stocked with `{A:2, B:1}`, one bot.
    pub fn small_world() -> (Warehouse, PodId, StationId) {
        let mut w = Warehouse::new();
        let pod = w.add_pod(WaypointId(0), 0, 16);
        w.pod_mut(pod).add_items(A, 2);
        w.pod_mut(pod).add_items(B, 1);
        let station = w.add_station(StationKind::Output, WaypointId(1), 0, 4);
        w.add_bot(WaypointId(2), 0, Default::default());
        (w, pod, station)
    }

    pub fn order(w: &mut Warehouse, positions: &[(ItemId, u32)]) -> OrderId {
        let map: HashMap<ItemId, u32> = positions.iter().copied().collect();
        w.add_order(map, SimTime::ZERO, SimTime(600.0), SimTime::ZERO)
    }
}

// ── Pod inventory ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod pod {
    use super::helpers::{small_world, A, B};
    use crate::ModelError;

    #[test]
    fn available_is_contained_minus_registered() {
        let (mut w, pod, _) = small_world();
        assert_eq!(w.pod(pod).available(A), 2);
        w.pod_mut(pod).register_item(A).unwrap();
        assert_eq!(w.pod(pod).available(A), 1);
        assert_eq!(w.pod(pod).contained(A), 2);
        assert_eq!(w.pod(pod).registered(A), 1);
    }

    #[test]
    fn register_beyond_contained_fails() {
        let (mut w, pod, _) = small_world();
        w.pod_mut(pod).register_item(B).unwrap();
        let err = w.pod_mut(pod).register_item(B).unwrap_err();
        assert!(matches!(err, ModelError::RegisterWithoutStock { .. }));
        // Invariant intact: 0 ≤ registered ≤ contained.
        assert_eq!(w.pod(pod).registered(B), 1);
        assert_eq!(w.pod(pod).contained(B), 1);
    }

    #[test]
    fn extract_consumes_both_counts() {
        let (mut w, pod, _) = small_world();
        w.pod_mut(pod).register_item(A).unwrap();
        w.pod_mut(pod).extract_item(A).unwrap();
        assert_eq!(w.pod(pod).contained(A), 1);
        assert_eq!(w.pod(pod).registered(A), 0);
        assert_eq!(w.pod(pod).available(A), 1);
    }

    #[test]
    fn fill_level() {
        let (w, pod, _) = small_world();
        // 3 units on a 16-unit shelf.
        assert!((w.pod(pod).fill_level() - 3.0 / 16.0).abs() < 1e-12);
        assert_eq!(w.pod(pod).free_capacity(), 13);
    }
}

// ── Station capacity ──────────────────────────────────────────────────────────

#[cfg(test)]
mod station {
    use super::helpers::{order, small_world, A};
    use crate::ModelError;

    #[test]
    fn reserve_within_capacity() {
        let (mut w, _, st) = small_world();
        for _ in 0..4 {
            w.station_mut(st).reserve_slot().unwrap();
        }
        let err = w.station_mut(st).reserve_slot().unwrap_err();
        assert!(matches!(err, ModelError::CapacityExceeded { .. }));
        assert_eq!(w.station(st).remaining_capacity(), 0);
    }

    #[test]
    fn promote_converts_reserved_to_used() {
        let (mut w, _, st) = small_world();
        let o = order(&mut w, &[(A, 1)]);
        w.station_mut(st).reserve_slot().unwrap();
        w.station_mut(st).queued_orders.push(o);

        w.station_mut(st).promote_order(o).unwrap();
        assert_eq!(w.station(st).used(), 1);
        assert_eq!(w.station(st).reserved(), 0);
        assert_eq!(w.station(st).assigned_orders, vec![o]);

        w.station_mut(st).complete_order(o).unwrap();
        assert_eq!(w.station(st).used(), 0);
    }

    #[test]
    fn inbound_pod_multiset() {
        let (mut w, pod, st) = small_world();
        w.station_mut(st).add_inbound_pod(pod);
        w.station_mut(st).add_inbound_pod(pod);
        w.station_mut(st).remove_inbound_pod(pod).unwrap();
        assert!(w.station(st).has_inbound_pod(pod));
        w.station_mut(st).remove_inbound_pod(pod).unwrap();
        assert!(w.station_mut(st).remove_inbound_pod(pod).is_err());
    }
}

// ── Pod claiming ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod claims {
    use rmfs_core::{BotId, WaypointId};

    use super::helpers::small_world;
    use crate::{ClaimReason, PodState};

    #[test]
    fn claim_release_cycle() {
        let (mut w, pod, _) = small_world();
        assert!(w.unused_pods().contains(&pod));

        w.claim_pod(pod, Some(BotId(0)), ClaimReason::Extract).unwrap();
        assert!(!w.unused_pods().contains(&pod));
        // Second claim is rejected: claims are exclusive.
        assert!(w.claim_pod(pod, None, ClaimReason::PodSet).is_err());

        w.release_pod(pod).unwrap();
        assert!(w.unused_pods().contains(&pod));
        assert_eq!(w.pod(pod).state, PodState::Unused);
    }

    #[test]
    fn pickup_and_setdown() {
        let (mut w, pod, _) = small_world();
        let bot = BotId(0);
        w.claim_pod(pod, Some(bot), ClaimReason::Extract).unwrap();
        w.pickup_pod(pod, bot).unwrap();
        assert_eq!(w.bot(bot).carried_pod, Some(pod));
        assert_eq!(w.pod(pod).carrier(), Some(bot));

        w.setdown_pod(pod, WaypointId(5)).unwrap();
        assert_eq!(w.bot(bot).carried_pod, None);
        assert_eq!(w.pod(pod).waypoint, WaypointId(5));
        assert!(w.unused_pods().contains(&pod));
    }

    #[test]
    fn pickup_requires_claim() {
        let (mut w, pod, _) = small_world();
        assert!(w.pickup_pod(pod, BotId(0)).is_err());
    }
}

// ── Request binding ───────────────────────────────────────────────────────────

#[cfg(test)]
mod requests {
    use super::helpers::{order, small_world, A};
    use crate::ExtractRequest;

    #[test]
    fn register_extract_binds_both_sides() {
        let (mut w, pod, st) = small_world();
        let o = order(&mut w, &[(A, 2)]);
        let req = ExtractRequest::new(A, o, Some(st));

        w.register_extract(pod, req).unwrap();
        assert_eq!(w.pod(pod).registered(A), 1);
        assert_eq!(w.order(o).in_flight(A), 1);
        assert_eq!(w.order(o).open(A), 1);

        w.complete_extract(pod, req).unwrap();
        assert_eq!(w.order(o).served(A), 1);
        assert_eq!(w.pod(pod).contained(A), 1);
        assert!(!w.order(o).is_complete());
    }

    #[test]
    fn unregister_roundtrip() {
        let (mut w, pod, st) = small_world();
        let o = order(&mut w, &[(A, 1)]);
        let req = ExtractRequest::new(A, o, Some(st));

        w.register_extract(pod, req).unwrap();
        w.unregister_extract(pod, req).unwrap();
        assert_eq!(w.pod(pod).registered(A), 0);
        assert_eq!(w.order(o).in_flight(A), 0);
        assert_eq!(w.order(o).open(A), 1);
    }

    #[test]
    fn bind_failure_rolls_back_pod_registration() {
        let (mut w, pod, st) = small_world();
        let o = order(&mut w, &[(A, 1)]);
        let req = ExtractRequest::new(A, o, Some(st));

        w.register_extract(pod, req).unwrap();
        // Order has no open A left; the second register must fail and leave
        // the pod registration count untouched.
        assert!(w.register_extract(pod, req).is_err());
        assert_eq!(w.pod(pod).registered(A), 1);
    }
}

// ── Fitting-request materialization ───────────────────────────────────────────

#[cfg(test)]
mod fitting {
    use super::helpers::{order, small_world, A, B};
    use crate::RequestFilter;

    #[test]
    fn assigned_before_queued() {
        let (mut w, pod, st) = small_world();
        let assigned = order(&mut w, &[(A, 1)]);
        let queued = order(&mut w, &[(A, 2)]);
        w.station_mut(st).assigned_orders.push(assigned);
        w.station_mut(st).queued_orders.push(queued);

        let reqs =
            w.possible_extract_requests(pod, st, RequestFilter::AssignedAndQueuedEqually);
        // Pod has A:2 → one unit to the assigned order, one to the queued.
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].order, assigned);
        assert_eq!(reqs[1].order, queued);
    }

    #[test]
    fn assigned_only_ignores_queue() {
        let (mut w, pod, st) = small_world();
        let queued = order(&mut w, &[(A, 2)]);
        w.station_mut(st).queued_orders.push(queued);

        let reqs = w.possible_extract_requests(pod, st, RequestFilter::AssignedOnly);
        assert!(reqs.is_empty());
    }

    #[test]
    fn complete_queued_requires_full_fit() {
        let (mut w, pod, st) = small_world();
        // Pod has {A:2, B:1}.  This order needs more A than remains → not
        // admitted at all under AssignedAndCompleteQueued.
        let too_big = order(&mut w, &[(A, 3)]);
        let fits = order(&mut w, &[(A, 1), (B, 1)]);
        w.station_mut(st).queued_orders.push(too_big);
        w.station_mut(st).queued_orders.push(fits);

        let reqs =
            w.possible_extract_requests(pod, st, RequestFilter::AssignedAndCompleteQueued);
        assert_eq!(reqs.len(), 2);
        assert!(reqs.iter().all(|r| r.order == fits));
    }

    #[test]
    fn relevance_check() {
        let (mut w, pod, st) = small_world();
        assert!(!w.has_relevant_extract_requests(pod, st));
        let o = order(&mut w, &[(B, 1)]);
        w.station_mut(st).queued_orders.push(o);
        assert!(w.has_relevant_extract_requests(pod, st));
    }

    #[test]
    fn station_inbound_availability_sums_pods() {
        let (mut w, pod, st) = small_world();
        let second = w.add_pod(rmfs_core::WaypointId(3), 0, 16);
        w.pod_mut(second).add_items(A, 5);
        w.station_mut(st).add_inbound_pod(pod);
        w.station_mut(st).add_inbound_pod(second);

        let inv = w.station_inbound_availability(st);
        assert_eq!(inv.get(&A).copied(), Some(7));
        assert_eq!(inv.get(&B).copied(), Some(1));
    }
}

// ── Order progress ────────────────────────────────────────────────────────────

#[cfg(test)]
mod orders {
    use rmfs_core::SimTime;

    use super::helpers::{order, small_world, A, B};

    #[test]
    fn open_accounts_for_in_flight_and_served() {
        let (mut w, _, _) = small_world();
        let o = order(&mut w, &[(A, 2), (B, 1)]);
        assert_eq!(w.order(o).total_units(), 3);

        w.order_mut(o).bind_unit(A).unwrap();
        assert_eq!(w.order(o).open(A), 1);
        w.order_mut(o).serve_unit(A).unwrap();
        assert_eq!(w.order(o).open(A), 1);
        assert_eq!(w.order(o).served(A), 1);
    }

    #[test]
    fn completion() {
        let (mut w, _, _) = small_world();
        let o = order(&mut w, &[(A, 1)]);
        w.order_mut(o).bind_unit(A).unwrap();
        w.order_mut(o).serve_unit(A).unwrap();
        assert!(w.order(o).is_complete());
    }

    #[test]
    fn lateness_and_stay() {
        let (mut w, _, _) = small_world();
        let o = order(&mut w, &[(A, 1)]);
        let ord = w.order(o);
        assert!(!ord.is_late(SimTime(599.0)));
        assert!(ord.is_late(SimTime(601.0)));
        assert_eq!(ord.time_stay(SimTime(30.0)), 30.0);
    }
}
