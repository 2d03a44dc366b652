//! Windowed space-time A*.
//!
//! One search plans one agent against a fixed reservation table.  States are
//! `(waypoint, time)` pairs; moving traverses an edge in `length / speed`
//! seconds, waiting is an explicit action of `wait_step` seconds.  The search
//! only commits motion inside the look-ahead window; a state reaching the
//! window boundary is an *exit*, and the remaining travel time to the true
//! goal is estimated by the RRA* heuristic.
//!
//! Occupancy convention (matched by `Path::reservations`): a bot owns a
//! waypoint from its arrival there until its arrival at the next waypoint.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use rmfs_core::{SimTime, WaypointId};
use rmfs_graph::WaypointGraph;

use crate::agent::{Path, PathStep};
use crate::interval::{Interval, ReservationTable};
use crate::rra::ReverseResumable;

// ── Inputs / outputs ──────────────────────────────────────────────────────────

pub(crate) struct SearchRequest<'a> {
    pub graph: &'a WaypointGraph,
    pub table: &'a ReservationTable,
    pub rra: &'a mut ReverseResumable,
    pub start: WaypointId,
    pub goal: WaypointId,
    pub start_time: SimTime,
    pub speed: f64,
    pub wait_step: f64,
    pub window_end: SimTime,
    /// Wait steps forced before the first move (priority escalation).
    pub forced_wait_steps: u32,
    pub use_bias: bool,
    /// Wall-clock deadline; the search gives up when it passes.
    pub deadline: Option<Instant>,
}

pub(crate) struct SearchOutcome {
    pub path: Path,
    pub reached_goal: bool,
    pub exit: WaypointId,
    /// Arrival time at `exit` (the goal, when reached).
    pub exit_time: SimTime,
    /// Estimated remaining travel time from `exit` to the goal, seconds.
    /// Zero when the goal was reached.
    pub remaining_estimate: f64,
}

impl SearchOutcome {
    /// The estimator result of spec'd `find_path`: window-exit (or goal)
    /// time plus the untimed tail estimate.
    pub fn estimated_end_time(&self) -> SimTime {
        self.exit_time + self.remaining_estimate
    }
}

// ── Search internals ──────────────────────────────────────────────────────────

struct Node {
    waypoint: WaypointId,
    time: SimTime,
    parent: Option<usize>,
}

#[derive(Copy, Clone, PartialEq)]
struct OpenEntry {
    f: f64,
    h: f64,
    idx: usize,
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap via reversal at the call site; tie-break toward smaller h
        // (deeper progress), then arena order for determinism.
        self.f
            .total_cmp(&other.f)
            .then(self.h.total_cmp(&other.h))
            .then(self.idx.cmp(&other.idx))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) fn space_time_astar(req: SearchRequest<'_>) -> Option<SearchOutcome> {
    let SearchRequest {
        graph,
        table,
        rra,
        start,
        goal,
        start_time,
        speed,
        wait_step,
        window_end,
        forced_wait_steps,
        use_bias,
        deadline,
    } = req;

    let bias = if use_bias { 1.001 } else { 1.0 };

    // Goal unreachable on the untimed graph: no point searching.
    let h0 = rra.estimate(graph, start)?;

    // Forced waits let higher-priority agents clear the way first.  If the
    // start cell is not ours for that long, this attempt fails outright and
    // the caller escalates.
    let t0 = start_time + f64::from(forced_wait_steps) * wait_step;
    if forced_wait_steps > 0 && !table.is_free_during(start, Interval::new(start_time, t0)) {
        return None;
    }

    let mut arena: Vec<Node> = vec![Node { waypoint: start, time: t0, parent: None }];
    let mut open = std::collections::BinaryHeap::new();
    // Best arrival time per (waypoint, wait-step slot).
    let mut closed: HashMap<(WaypointId, i64), SimTime> = HashMap::new();
    open.push(std::cmp::Reverse(OpenEntry { f: (t0 - start_time) + h0 * bias, h: h0, idx: 0 }));

    let slot_of = |t: SimTime| -> i64 { ((t - start_time) / wait_step).round() as i64 };

    while let Some(std::cmp::Reverse(OpenEntry { idx, .. })) = open.pop() {
        if let Some(dl) = deadline {
            if Instant::now() >= dl {
                return None;
            }
        }

        let (wp, t) = (arena[idx].waypoint, arena[idx].time);

        // Stale entry: a cheaper state for the same slot was expanded already.
        if let Some(&best) = closed.get(&(wp, slot_of(t))) {
            if best < t {
                continue;
            }
        }

        // ── Goal test ─────────────────────────────────────────────────────
        if wp == goal {
            let hold_end = t.max(window_end);
            if table.is_free_during(goal, Interval::new(t, hold_end)) {
                return Some(SearchOutcome {
                    path: reconstruct(&arena, idx, start_time),
                    reached_goal: true,
                    exit: goal,
                    exit_time: t,
                    remaining_estimate: 0.0,
                });
            }
            // The goal cell is taken for the rest of the window; fall through
            // and keep searching (the bot can wait nearby).
        }

        // ── Window exit ───────────────────────────────────────────────────
        if idx != 0 && t >= window_end {
            // Zero-length window: only a direct one-step arrival at the goal
            // counts (handled above); partial progress is no path.
            if window_end <= start_time {
                continue;
            }
            let rest = rra.estimate(graph, wp)?;
            return Some(SearchOutcome {
                path: reconstruct(&arena, idx, start_time),
                reached_goal: false,
                exit: wp,
                exit_time: t,
                remaining_estimate: rest,
            });
        }

        closed.insert((wp, slot_of(t)), t);

        // ── Wait successor ────────────────────────────────────────────────
        let tw = t + wait_step;
        if table.is_free_during(wp, Interval::new(t, tw)) {
            push_state(
                &mut arena, &mut open, &mut closed, &slot_of,
                wp, tw, Some(idx), rra, graph, start_time, bias,
            );
        }

        // ── Move successors ───────────────────────────────────────────────
        for (next, len) in graph.out_neighbors(wp) {
            let ta = t + len / speed;
            // The origin stays ours until we arrive at `next`.  The target
            // must be free for the whole travel span, not just the arrival
            // instant, or two agents could swap adjacent cells head-on by
            // passing through each other on the edge.  Later occupancy of
            // `next` is validated when that state expands.
            if !table.is_free_during(wp, Interval::new(t, ta)) {
                continue;
            }
            if !table.is_free_during(next, Interval::new(t, ta)) {
                continue;
            }
            if !table.is_free_at(next, ta) {
                continue;
            }
            push_state(
                &mut arena, &mut open, &mut closed, &slot_of,
                next, ta, Some(idx), rra, graph, start_time, bias,
            );
        }
    }

    None
}

#[allow(clippy::too_many_arguments)]
fn push_state(
    arena: &mut Vec<Node>,
    open: &mut std::collections::BinaryHeap<std::cmp::Reverse<OpenEntry>>,
    closed: &mut HashMap<(WaypointId, i64), SimTime>,
    slot_of: &impl Fn(SimTime) -> i64,
    waypoint: WaypointId,
    time: SimTime,
    parent: Option<usize>,
    rra: &mut ReverseResumable,
    graph: &WaypointGraph,
    start_time: SimTime,
    bias: f64,
) {
    let slot = slot_of(time);
    if let Some(&best) = closed.get(&(waypoint, slot)) {
        if best <= time {
            return;
        }
    }
    // Dead-end waypoints (no route to goal) are never worth enqueuing.
    let Some(h) = rra.estimate(graph, waypoint) else {
        return;
    };
    closed.insert((waypoint, slot), time);
    let idx = arena.len();
    arena.push(Node { waypoint, time, parent });
    open.push(std::cmp::Reverse(OpenEntry {
        f: (time - start_time) + h * bias,
        h,
        idx,
    }));
}

/// Walk the parent chain and merge consecutive same-waypoint states (waits)
/// into single steps.  The first step's arrival is pulled back to
/// `start_time` so forced pre-waits are covered by its reservation.
fn reconstruct(arena: &[Node], last: usize, start_time: SimTime) -> Path {
    let mut chain: Vec<(WaypointId, SimTime)> = Vec::new();
    let mut cursor = Some(last);
    while let Some(i) = cursor {
        chain.push((arena[i].waypoint, arena[i].time));
        cursor = arena[i].parent;
    }
    chain.reverse();

    let mut steps: Vec<PathStep> = Vec::new();
    for (wp, t) in chain {
        match steps.last_mut() {
            Some(s) if s.waypoint == wp => s.depart = t,
            _ => steps.push(PathStep { waypoint: wp, arrival: t, depart: t }),
        }
    }
    if let Some(first) = steps.first_mut() {
        first.arrival = start_time;
    }
    Path { steps }
}
