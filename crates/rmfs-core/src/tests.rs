//! Unit tests for rmfs-core.

#[cfg(test)]
mod ids {
    use crate::{BotId, PodId, WaypointId};

    #[test]
    fn invalid_sentinel() {
        assert_eq!(BotId::INVALID.0, u32::MAX);
        assert_eq!(BotId::default(), BotId::INVALID);
    }

    #[test]
    fn index_roundtrip() {
        let id = PodId(7);
        assert_eq!(id.index(), 7);
        assert_eq!(PodId::try_from(7usize).unwrap(), id);
    }

    #[test]
    fn ids_are_ordered_map_keys() {
        use std::collections::BTreeSet;
        let set: BTreeSet<WaypointId> =
            [WaypointId(3), WaypointId(1), WaypointId(2)].into_iter().collect();
        let sorted: Vec<_> = set.into_iter().collect();
        assert_eq!(sorted, vec![WaypointId(1), WaypointId(2), WaypointId(3)]);
    }
}

#[cfg(test)]
mod time {
    use crate::SimTime;

    #[test]
    fn total_order() {
        let a = SimTime(1.0);
        let b = SimTime(2.5);
        assert!(a < b);
        assert!(b < SimTime::INFINITY);
        assert_eq!(a.max(b), b);
        assert_eq!(a.min(b), a);
    }

    #[test]
    fn arithmetic() {
        let t = SimTime(10.0) + 2.5;
        assert_eq!(t, SimTime(12.5));
        assert_eq!(t - SimTime(10.0), 2.5);
        assert_eq!(t.since(SimTime(12.0)), 0.5);
    }

    #[test]
    fn infinity_is_not_finite() {
        assert!(!SimTime::INFINITY.is_finite());
        assert!(SimTime::ZERO.is_finite());
    }

    #[test]
    fn sorts_in_collections() {
        let mut v = vec![SimTime(3.0), SimTime::INFINITY, SimTime(1.0)];
        v.sort();
        assert_eq!(v[0], SimTime(1.0));
        assert_eq!(v[2], SimTime::INFINITY);
    }
}

#[cfg(test)]
mod rng {
    use crate::SimRng;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SimRng::new(42);
        let mut b = SimRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.uniform().to_bits(), b.uniform().to_bits());
        }
    }

    #[test]
    fn uniform_in_unit_interval() {
        let mut rng = SimRng::new(7);
        for _ in 0..100 {
            let u = rng.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn choose_empty_is_none() {
        let mut rng = SimRng::new(1);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
    }
}
