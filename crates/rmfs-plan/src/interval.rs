//! Per-waypoint reservation intervals.
//!
//! A reservation `[start, end)` means some bot occupies the waypoint over
//! that span; `end = SimTime::INFINITY` is a tail reservation (the bot stays
//! until further notice).  Per waypoint, intervals are kept sorted by start
//! and pairwise disjoint.
//!
//! Two insertion flavors exist because the two legitimate callers differ:
//! path reservations must never overlap (overlap is an invariant violation,
//! reported as an error), while tail reservations may collide when bots
//! emerge from a station queue — those are silently suppressed.

use std::hash::{Hash, Hasher};

use rmfs_core::{SimTime, WaypointId};

use crate::{PlanError, PlanResult};

// ── Interval ──────────────────────────────────────────────────────────────────

/// A half-open occupancy span `[start, end)` at one waypoint.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    pub start: SimTime,
    pub end: SimTime,
}

impl Interval {
    /// # Panics
    /// Panics in debug builds if `start > end`.
    #[inline]
    pub fn new(start: SimTime, end: SimTime) -> Self {
        debug_assert!(start <= end, "interval start after end");
        Self { start, end }
    }

    /// Tail reservation: occupied from `start` on.
    #[inline]
    pub fn tail(start: SimTime) -> Self {
        Self { start, end: SimTime::INFINITY }
    }

    #[inline]
    pub fn is_tail(&self) -> bool {
        !self.end.is_finite()
    }

    #[inline]
    pub fn contains(&self, t: SimTime) -> bool {
        self.start <= t && t < self.end
    }

    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// ── NodeIntervals ─────────────────────────────────────────────────────────────

/// The sorted, disjoint interval set of one waypoint.
#[derive(Clone, Debug, Default)]
struct NodeIntervals(Vec<Interval>);

impl NodeIntervals {
    fn is_free_at(&self, t: SimTime) -> bool {
        !self.0.iter().any(|iv| iv.contains(t))
    }

    fn is_free_during(&self, probe: Interval) -> bool {
        // Sorted by start; stop once intervals begin at or after probe.end.
        for iv in &self.0 {
            if iv.start >= probe.end {
                break;
            }
            if iv.overlaps(&probe) {
                return false;
            }
        }
        true
    }

    fn insert(&mut self, iv: Interval) -> bool {
        if !self.is_free_during(iv) {
            return false;
        }
        let pos = self.0.partition_point(|x| x.start < iv.start);
        self.0.insert(pos, iv);
        true
    }

    /// Remove the exact interval, if present.
    fn remove(&mut self, iv: Interval) -> bool {
        match self.0.iter().position(|x| *x == iv) {
            Some(pos) => {
                self.0.remove(pos);
                true
            }
            None => false,
        }
    }

    /// First reservation ending after `t` (the next blocker for a waiter).
    fn next_block_after(&self, t: SimTime) -> Option<Interval> {
        self.0.iter().copied().find(|iv| iv.end > t)
    }

    fn tail(&self) -> Option<Interval> {
        self.0.last().copied().filter(Interval::is_tail)
    }
}

// ── ReservationTable ──────────────────────────────────────────────────────────

/// Disjoint-interval occupancy index over all waypoints.
///
/// Deep copy is `Clone` — the planner's scheduled table is created exactly
/// that way.
#[derive(Clone, Debug)]
pub struct ReservationTable {
    nodes: Vec<NodeIntervals>,
}

impl ReservationTable {
    pub fn new(node_count: usize) -> Self {
        Self { nodes: vec![NodeIntervals::default(); node_count] }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_free_at(&self, node: WaypointId, t: SimTime) -> bool {
        self.nodes[node.index()].is_free_at(t)
    }

    #[inline]
    pub fn is_free_during(&self, node: WaypointId, iv: Interval) -> bool {
        self.nodes[node.index()].is_free_during(iv)
    }

    /// Add a path reservation.  Overlap is an invariant violation.
    pub fn insert(&mut self, node: WaypointId, iv: Interval) -> PlanResult<()> {
        if self.nodes[node.index()].insert(iv) {
            Ok(())
        } else {
            Err(PlanError::Overlap { node })
        }
    }

    /// Add a tail reservation; silently suppressed on overlap.
    ///
    /// Returns whether the interval was actually added, so a later
    /// careful-remove knows whether there is anything to take out.
    pub fn insert_suppressed(&mut self, node: WaypointId, iv: Interval) -> bool {
        self.nodes[node.index()].insert(iv)
    }

    /// Careful-remove: take out exactly `iv` if it is present, and only then.
    pub fn remove(&mut self, node: WaypointId, iv: Interval) -> bool {
        self.nodes[node.index()].remove(iv)
    }

    /// First reservation at `node` ending after `t`.
    pub fn next_block_after(&self, node: WaypointId, t: SimTime) -> Option<Interval> {
        self.nodes[node.index()].next_block_after(t)
    }

    /// Start of the half-infinite tail reservation at `node`, if any.
    pub fn end_reservation_start(&self, node: WaypointId) -> Option<SimTime> {
        self.nodes[node.index()].tail().map(|iv| iv.start)
    }

    pub fn clear(&mut self) {
        for n in &mut self.nodes {
            n.0.clear();
        }
    }

    /// Order-sensitive content hash, for isolation checks and diagnostics.
    pub fn fingerprint(&self) -> u64 {
        let mut h = std::hash::DefaultHasher::new();
        for (i, n) in self.nodes.iter().enumerate() {
            if n.0.is_empty() {
                continue;
            }
            i.hash(&mut h);
            for iv in &n.0 {
                iv.start.0.to_bits().hash(&mut h);
                iv.end.0.to_bits().hash(&mut h);
            }
        }
        h.finish()
    }
}
