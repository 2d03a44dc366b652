//! Simulated-annealing joint optimizer.
//!
//! Once per `update_period` of simulated time the optimizer refines the
//! joint (station → pod, orders) assignment:
//!
//! 1. allocate whatever is already fully supplied,
//! 2. build a per-station **search space** of `(pod, orders, rate)` points,
//!    where `rate` is the estimated station item throughput if that pod were
//!    fetched next,
//! 3. seed one solution per space, then run a Metropolis loop proposing
//!    replace / replan / swap moves sampled by the rate distribution,
//! 4. emit the surviving solutions as Extract tasks and order allocations.
//!
//! Everything up to the emit phase is speculative: path estimates run
//! against the planner's scheduled table, order claims live in a local set,
//! and no warehouse state is touched.  A budget overrun therefore loses
//! nothing but optimization quality.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, warn};

use rmfs_core::{BotId, OrderId, PodId, SimTime, StationId, WaypointId};
use rmfs_model::{ClaimReason, ExtractRequest, StationKind, Task, Warehouse};
use rmfs_plan::{Interval, PlanAgent, Reservation};

use crate::config::{ControlConfig, SaConfig};
use crate::observer::ControlObserver;
use crate::orderbook::{Backlog, OrderBook};
use crate::selector::{DecisionCtx, PodSelector};

// ── Data structures ───────────────────────────────────────────────────────────

/// One candidate assignment for a station: fetch `pod`, which makes `orders`
/// fully fulfillable.
struct SearchPoint {
    pod: PodId,
    orders: Vec<OrderId>,
    item_count: u32,
    rate: f64,
}

/// Per-station candidate set plus the bot booked to execute the choice.
struct SearchSpace {
    station: StationId,
    bot: BotId,
    bot_free_at: SimTime,
    bot_start: WaypointId,
    bot_speed: f64,
    can_pass_obstacles: bool,
    points: Vec<SearchPoint>,
    /// Cumulative rate distribution over `points`, normalized to `[0, 1]`.
    cdf: Vec<f64>,
}

impl SearchSpace {
    fn sample(&self, u: f64) -> usize {
        self.cdf
            .partition_point(|&c| c < u)
            .min(self.points.len() - 1)
    }
}

/// A concrete plan for one station, valid under the current scheduled table.
#[derive(Clone)]
struct Solution {
    pod: PodId,
    orders: Vec<OrderId>,
    /// Hypothetical units against the new pod; registered only at emit.
    new_pod_requests: Vec<ExtractRequest>,
    /// Hypothetical units against inbound pods; registered only at emit.
    inbound_requests: Vec<(PodId, ExtractRequest)>,
    rate: f64,
    reservations: Vec<Reservation>,
    last_delta: f64,
}

// ── Optimizer ─────────────────────────────────────────────────────────────────

pub struct SaOptimizer {
    config: SaConfig,
    item_pick_time: f64,
    pod_transfer_time: f64,
    next_update: SimTime,
}

impl SaOptimizer {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            config: config.sa.clone(),
            item_pick_time: config.item_pick_time,
            pod_transfer_time: config.pod_transfer_time,
            next_update: SimTime::ZERO,
        }
    }

    /// Simulated time of the next optimizer run.
    pub fn next_update(&self) -> SimTime {
        self.next_update
    }

    /// Run one optimization cycle if the period has elapsed.
    pub fn update(
        &mut self,
        ctx: &mut DecisionCtx<'_>,
        selector: &mut PodSelector,
        observer: &mut dyn ControlObserver,
    ) {
        if ctx.now < self.next_update {
            return;
        }
        self.next_update = ctx.now + self.config.update_period;

        let wall = Instant::now();

        // ── 1. Preamble: drain everything already fully supplied ──────────
        let output_stations: Vec<StationId> = ctx
            .warehouse
            .stations()
            .iter()
            .filter(|s| s.kind == StationKind::Output)
            .map(|s| s.id)
            .collect();
        for &st in &output_stations {
            for backlog in [Backlog::Late, Backlog::NotLate] {
                let supply = ctx.orders.fully_supplied(
                    ctx.warehouse,
                    st,
                    backlog,
                    ctx.rng,
                    ctx.events,
                );
                for (pod, req) in supply.pod_requests {
                    ctx.dispatch.attach_to_pod_task(pod, req);
                }
            }
        }

        // ── 2. Candidate stations ─────────────────────────────────────────
        let candidates: Vec<StationId> = output_stations
            .iter()
            .copied()
            .filter(|&st| {
                !selector.has_pending_pods(st)
                    && ctx.warehouse.station(st).remaining_capacity() > 0
            })
            .collect();
        if candidates.is_empty() {
            return;
        }

        // ── 3. Available bots ─────────────────────────────────────────────
        struct FreeBot {
            bot: BotId,
            free_at: SimTime,
            start: WaypointId,
        }

        let mut free_bots: Vec<FreeBot> = Vec::new();
        let mut any_idle = false;
        for bot in ctx.warehouse.bot_ids() {
            if ctx.dispatch.has_queued_tasks(bot) {
                continue;
            }
            match *ctx.dispatch.current_task(bot) {
                Task::None | Task::Rest { .. } => {
                    any_idle = true;
                    free_bots.push(FreeBot {
                        bot,
                        free_at: ctx.now,
                        start: ctx.warehouse.bot(bot).waypoint,
                    });
                }
                Task::ParkPod { destination, .. } => {
                    let free_at = ctx
                        .planner
                        .find_end_reservation(destination)
                        .unwrap_or(ctx.now);
                    free_bots.push(FreeBot { bot, free_at, start: destination });
                }
                _ => {}
            }
        }
        // Without at least one truly idle bot the cycle is pointless.
        if !any_idle {
            return;
        }

        // Pair each candidate station with its nearest unbooked bot.
        let mut taken: HashSet<BotId> = HashSet::new();
        let mut pairs: Vec<(StationId, usize)> = Vec::new();
        for &st in &candidates {
            let st_wp = ctx.warehouse.station(st).waypoint;
            let pick = free_bots
                .iter()
                .enumerate()
                .filter(|(_, fb)| !taken.contains(&fb.bot))
                .min_by(|(_, a), (_, b)| {
                    let da = ctx
                        .graph
                        .shortest_distance(a.start, st_wp)
                        .unwrap_or(f64::INFINITY);
                    let db = ctx
                        .graph
                        .shortest_distance(b.start, st_wp)
                        .unwrap_or(f64::INFINITY);
                    da.total_cmp(&db).then(a.bot.cmp(&b.bot))
                });
            let Some((i, _)) = pick else { break };
            taken.insert(free_bots[i].bot);
            pairs.push((st, i));
        }

        // ── 4. Search spaces ──────────────────────────────────────────────
        ctx.planner.schedule_init();
        let mut spaces: Vec<SearchSpace> = Vec::new();
        for &(st, fbi) in &pairs {
            let fb = &free_bots[fbi];
            let bot = ctx.warehouse.bot(fb.bot);
            let mut space = SearchSpace {
                station: st,
                bot: fb.bot,
                bot_free_at: fb.free_at,
                bot_start: fb.start,
                bot_speed: bot.physics.max_speed,
                can_pass_obstacles: bot.physics.can_pass_obstacles,
                points: Vec::new(),
                cdf: Vec::new(),
            };
            self.build_points(ctx, &mut space);
            spaces.push(space);
        }

        // ── 5. Empty spaces fall back to pod sets ─────────────────────────
        for i in 0..spaces.len() {
            if !spaces[i].points.is_empty() {
                continue;
            }
            let (st, bot) = (spaces[i].station, spaces[i].bot);
            for backlog in [Backlog::Late, Backlog::NotLate] {
                match selector.reserve_pod_set_for_order(ctx, observer, bot, st, backlog) {
                    Ok(Some(_)) => {
                        // Pods left the unused set; purge them everywhere.
                        for space in &mut spaces {
                            space.retain_unused(ctx.warehouse);
                        }
                        break;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        debug!(station = st.0, error = %e, "pod-set fallback failed");
                        break;
                    }
                }
            }
        }

        // ── 6. Initial solutions ──────────────────────────────────────────
        let mut solutions: HashMap<usize, Solution> = HashMap::new();
        let mut claimed: HashSet<OrderId> = HashSet::new();

        let mut space_order: Vec<usize> = (0..spaces.len()).collect();
        space_order.sort_by_key(|&i| spaces[i].points.len());

        if self.config.init_solution_method {
            for &idx in &space_order {
                for pi in 0..spaces[idx].points.len() {
                    if let Some(sol) = self.create_solution(ctx, &spaces[idx], pi, &claimed) {
                        claimed.extend(sol.orders.iter().copied());
                        ctx.planner
                            .overwrite_scheduled_path(spaces[idx].bot, sol.reservations.clone());
                        solutions.insert(idx, sol);
                        break;
                    }
                }
            }
        }

        // ── 7. Refinement loop ────────────────────────────────────────────
        let accepted = if self.config.brute_force_method {
            self.brute_force(ctx, &spaces, &mut solutions, &mut claimed)
        } else {
            self.metropolis(ctx, wall, &spaces, &mut solutions, &mut claimed)
        };

        // ── 8. Emit ───────────────────────────────────────────────────────
        let mut emitted: Vec<usize> = solutions.keys().copied().collect();
        emitted.sort_unstable();
        for idx in emitted {
            let sol = &solutions[&idx];
            let space = &spaces[idx];
            self.emit_solution(ctx, observer, space, sol);
        }

        ctx.planner
            .output_scheduled_priority(&ctx.dispatch.task_fingerprints());
        observer.on_sa_update(ctx.now, solutions.len(), accepted);
    }

    // ── Space construction ────────────────────────────────────────────────

    /// Fill a station's search space: one point per unused pod that makes at
    /// least one backlog order fully fulfillable, rated by estimated item
    /// throughput (Manhattan-time arrival estimates).
    fn build_points(&self, ctx: &mut DecisionCtx<'_>, space: &mut SearchSpace) {
        let w = &*ctx.warehouse;
        let st_wp = w.station(space.station).waypoint;

        for &pod in w.unused_pods() {
            let (orders, item_count) =
                fulfillable_orders(w, ctx.orders, space.station, pod);
            if orders.is_empty() {
                continue;
            }
            space.points.push(SearchPoint { pod, orders, item_count, rate: 0.0 });
        }

        // Keep only the most item-rich candidates.
        space
            .points
            .sort_by(|a, b| b.item_count.cmp(&a.item_count).then(a.pod.cmp(&b.pod)));
        space.points.truncate(self.config.search_pod_num);

        let queue_time = self.queue_time(w, space.station);
        for p in &mut space.points {
            let pod_wp = w.pod(p.pod).waypoint;
            let travel = (ctx.graph.manhattan(space.bot_start, pod_wp)
                + ctx.graph.manhattan(pod_wp, st_wp))
                / space.bot_speed;
            let arrival = space.bot_free_at + travel + self.pod_transfer_time;
            p.rate = self.rate_of(ctx.now, arrival, queue_time, p.item_count);
        }
        space.points.retain(|p| p.rate > 0.0);
        space
            .points
            .sort_by(|a, b| b.rate.total_cmp(&a.rate).then(a.pod.cmp(&b.pod)));
        space.rebuild_cdf();
    }

    /// Station throughput estimate for serving `item_count` units after the
    /// pod arrives.
    fn rate_of(&self, now: SimTime, arrival: SimTime, queue_time: f64, item_count: u32) -> f64 {
        let wait = arrival.since(now).max(queue_time);
        let denom = wait + f64::from(item_count) * self.item_pick_time;
        if denom <= 0.0 {
            return 0.0;
        }
        f64::from(item_count) / denom
    }

    fn queue_time(&self, w: &Warehouse, station: StationId) -> f64 {
        w.station(station).open_requests as f64 * self.item_pick_time
    }

    // ── Solution construction ─────────────────────────────────────────────

    /// Build a concrete solution for one search point, or `None` when every
    /// order is claimed elsewhere or a leg cannot be planned in the window.
    ///
    /// Purely speculative: request lists are hypothetical tallies and both
    /// path probes leave the scheduled table as they found it.
    fn create_solution(
        &self,
        ctx: &mut DecisionCtx<'_>,
        space: &SearchSpace,
        point_idx: usize,
        claimed: &HashSet<OrderId>,
    ) -> Option<Solution> {
        let w = &*ctx.warehouse;
        let point = &space.points[point_idx];

        let orders: Vec<OrderId> = point
            .orders
            .iter()
            .copied()
            .filter(|o| !claimed.contains(o))
            .collect();
        if orders.is_empty() {
            return None;
        }

        // Dress hypothetically: inbound availability first, the new pod last.
        let station = w.station(space.station);
        let mut inbound: Vec<(PodId, HashMap<rmfs_core::ItemId, u32>)> = station
            .inbound_pods
            .iter()
            .map(|&p| (p, w.pod(p).available_map()))
            .collect();
        let mut pod_avail = w.pod(point.pod).available_map();

        let mut new_pod_requests = Vec::new();
        let mut inbound_requests = Vec::new();
        let mut item_count = 0u32;
        for &oid in &orders {
            for (item, open) in w.order(oid).open_positions() {
                item_count += open;
                let mut need = open;
                for (src, avail) in &mut inbound {
                    let have = avail.get_mut(&item);
                    if let Some(have) = have {
                        while need > 0 && *have > 0 {
                            inbound_requests.push((
                                *src,
                                ExtractRequest::new(item, oid, Some(space.station)),
                            ));
                            *have -= 1;
                            need -= 1;
                        }
                    }
                }
                if need > 0 {
                    let have = pod_avail.entry(item).or_insert(0);
                    while need > 0 && *have > 0 {
                        new_pod_requests
                            .push(ExtractRequest::new(item, oid, Some(space.station)));
                        *have -= 1;
                        need -= 1;
                    }
                }
                if need > 0 {
                    // Inventory moved since the point was built.
                    return None;
                }
            }
        }

        // Two-leg arrival estimate against the scheduled table.
        let pod_wp = w.pod(point.pod).waypoint;
        let st_wp = station.waypoint;
        let agent = PlanAgent {
            id: space.bot,
            start: space.bot_start,
            next: space.bot_start,
            destination: pod_wp,
            speed: space.bot_speed,
            carrying_pod: false,
            can_pass_obstacles: space.can_pass_obstacles,
            fixed_position: false,
            priority: 0,
        };

        let (t1, mut res1, ok1) = ctx.planner.schedule_path(
            &agent,
            space.bot_free_at,
            space.bot_start,
            pod_wp,
            false,
            &[],
            ctx.graph,
        );
        if !ok1 {
            return None;
        }
        let start2 = t1 + self.pod_transfer_time;
        // The first leg's tail only holds the pod cell through the pickup.
        if let Some(last) = res1.last_mut() {
            if last.span.is_tail() {
                last.span = Interval::new(last.span.start, start2);
            }
        }
        let (t2, res2, ok2) = ctx.planner.schedule_path(
            &agent,
            start2,
            pod_wp,
            st_wp,
            true,
            &res1,
            ctx.graph,
        );
        if !ok2 {
            return None;
        }

        let queue_time = self.queue_time(w, space.station);
        let rate = self.rate_of(ctx.now, t2, queue_time, item_count);
        if rate <= 0.0 {
            return None;
        }

        let mut reservations = res1;
        reservations.extend(res2);
        Some(Solution {
            pod: point.pod,
            orders,
            new_pod_requests,
            inbound_requests,
            rate,
            reservations,
            last_delta: f64::INFINITY,
        })
    }

    // ── Metropolis loop ───────────────────────────────────────────────────

    fn metropolis(
        &self,
        ctx: &mut DecisionCtx<'_>,
        wall: Instant,
        spaces: &[SearchSpace],
        solutions: &mut HashMap<usize, Solution>,
        claimed: &mut HashSet<OrderId>,
    ) -> usize {
        let mut temp = self.config.init_temp;
        let mut iter = 0u32;
        let mut accepted = 0usize;
        let reserve = 0.010;

        while temp >= self.config.min_temp && iter < self.config.max_iteration {
            if wall.elapsed().as_secs_f64() + reserve > self.config.runtime_limit {
                warn!(iterations = iter, "annealing budget exhausted, emitting current best");
                break;
            }
            iter += 1;
            temp *= self.config.cooling_rate;

            let sidx = ctx.rng.gen_range(0..spaces.len());
            if spaces[sidx].points.is_empty() {
                continue;
            }
            let pidx = spaces[sidx].sample(ctx.rng.uniform());
            let pod = spaces[sidx].points[pidx].pod;

            let owner = solutions
                .iter()
                .find(|(_, s)| s.pod == pod)
                .map(|(&i, _)| i);

            let did_accept = match owner {
                // Replan our own pod under the current table state.
                Some(o) if o == sidx => {
                    self.try_replace(ctx, spaces, solutions, claimed, sidx, pidx, temp)
                }
                // The pod belongs to another station: propose a swap.
                Some(o) => self.try_swap(ctx, spaces, solutions, claimed, sidx, o, temp),
                // Free pod: propose a replacement.
                None => self.try_replace(ctx, spaces, solutions, claimed, sidx, pidx, temp),
            };
            if did_accept {
                accepted += 1;
            }

            // Converged: every solution's last move was negligible.
            if !solutions.is_empty()
                && solutions
                    .values()
                    .all(|s| s.last_delta.abs() < self.config.min_difference)
            {
                break;
            }
        }

        accepted
    }

    /// Metropolis acceptance on a minimization delta (negated rate gain).
    fn accept(&self, ctx: &mut DecisionCtx<'_>, delta: f64, temp: f64) -> bool {
        delta < 0.0 || (-10_000.0 * delta / temp).exp() > ctx.rng.uniform()
    }

    /// Replace (or replan) station `sidx`'s solution with point `pidx`.
    fn try_replace(
        &self,
        ctx: &mut DecisionCtx<'_>,
        spaces: &[SearchSpace],
        solutions: &mut HashMap<usize, Solution>,
        claimed: &mut HashSet<OrderId>,
        sidx: usize,
        pidx: usize,
        temp: f64,
    ) -> bool {
        let old_rate = solutions.get(&sidx).map_or(0.0, |s| s.rate);

        // Our own orders are up for grabs in the hypothetical.
        let mut hypo_claimed = claimed.clone();
        if let Some(old) = solutions.get(&sidx) {
            for o in &old.orders {
                hypo_claimed.remove(o);
            }
        }

        let Some(mut new) = self.create_solution(ctx, &spaces[sidx], pidx, &hypo_claimed)
        else {
            return false;
        };
        let delta = old_rate - new.rate;
        if !self.accept(ctx, delta, temp) {
            return false;
        }

        new.last_delta = delta;
        self.commit(ctx, spaces, solutions, claimed, sidx, new);
        true
    }

    /// Swap the pods of stations `sidx` and `other`.
    fn try_swap(
        &self,
        ctx: &mut DecisionCtx<'_>,
        spaces: &[SearchSpace],
        solutions: &mut HashMap<usize, Solution>,
        claimed: &mut HashSet<OrderId>,
        sidx: usize,
        other: usize,
        temp: f64,
    ) -> bool {
        // Both points must exist mirrored: the other station's pod in our
        // space and our pod in theirs.
        let our_pod = match solutions.get(&sidx) {
            Some(s) => s.pod,
            None => return false,
        };
        let their_pod = solutions[&other].pod;
        let Some(our_pidx) = spaces[sidx].points.iter().position(|p| p.pod == their_pod)
        else {
            return false;
        };
        let Some(their_pidx) = spaces[other].points.iter().position(|p| p.pod == our_pod)
        else {
            return false;
        };

        let old1 = solutions[&sidx].rate;
        let old2 = solutions[&other].rate;

        let mut hypo_claimed = claimed.clone();
        for o in solutions[&sidx].orders.iter().chain(&solutions[&other].orders) {
            hypo_claimed.remove(o);
        }

        let Some(mut new1) = self.create_solution(ctx, &spaces[sidx], our_pidx, &hypo_claimed)
        else {
            return false;
        };
        hypo_claimed.extend(new1.orders.iter().copied());
        let Some(mut new2) =
            self.create_solution(ctx, &spaces[other], their_pidx, &hypo_claimed)
        else {
            return false;
        };

        let delta = (old1 - new1.rate) + (old2 - new2.rate);
        if !self.accept(ctx, delta, temp) {
            return false;
        }

        new1.last_delta = delta;
        new2.last_delta = delta;
        self.commit(ctx, spaces, solutions, claimed, sidx, new1);
        self.commit(ctx, spaces, solutions, claimed, other, new2);
        true
    }

    /// Install a solution: move order claims and write the scheduled path.
    fn commit(
        &self,
        ctx: &mut DecisionCtx<'_>,
        spaces: &[SearchSpace],
        solutions: &mut HashMap<usize, Solution>,
        claimed: &mut HashSet<OrderId>,
        idx: usize,
        new: Solution,
    ) {
        if let Some(old) = solutions.remove(&idx) {
            for o in &old.orders {
                claimed.remove(o);
            }
        }
        claimed.extend(new.orders.iter().copied());
        ctx.planner
            .overwrite_scheduled_path(spaces[idx].bot, new.reservations.clone());
        solutions.insert(idx, new);
    }

    // ── Brute-force alternate ─────────────────────────────────────────────

    /// Up to five strict-improvement passes over every point of every space.
    fn brute_force(
        &self,
        ctx: &mut DecisionCtx<'_>,
        spaces: &[SearchSpace],
        solutions: &mut HashMap<usize, Solution>,
        claimed: &mut HashSet<OrderId>,
    ) -> usize {
        let mut accepted = 0;
        for _pass in 0..5 {
            let mut changed = false;
            for sidx in 0..spaces.len() {
                for pidx in 0..spaces[sidx].points.len() {
                    let pod = spaces[sidx].points[pidx].pod;
                    // Never steal a pod held by another station here.
                    let foreign = solutions
                        .iter()
                        .any(|(&i, s)| i != sidx && s.pod == pod);
                    if foreign {
                        continue;
                    }

                    let old_rate = solutions.get(&sidx).map_or(0.0, |s| s.rate);
                    let mut hypo = claimed.clone();
                    if let Some(old) = solutions.get(&sidx) {
                        for o in &old.orders {
                            hypo.remove(o);
                        }
                    }
                    let Some(mut new) =
                        self.create_solution(ctx, &spaces[sidx], pidx, &hypo)
                    else {
                        continue;
                    };
                    if new.rate > old_rate {
                        new.last_delta = old_rate - new.rate;
                        self.commit(ctx, spaces, solutions, claimed, sidx, new);
                        accepted += 1;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        accepted
    }

    // ── Emit ──────────────────────────────────────────────────────────────

    /// Turn one surviving solution into warehouse state: claim the pod,
    /// register the requests, allocate the orders, enqueue the task, and
    /// pin the planner's task fingerprint.
    fn emit_solution(
        &self,
        ctx: &mut DecisionCtx<'_>,
        observer: &mut dyn ControlObserver,
        space: &SearchSpace,
        sol: &Solution,
    ) {
        for &order in &sol.orders {
            ctx.orders
                .allocate_order(ctx.warehouse, order, space.station, ctx.events)
                .expect("candidate stations were filtered for capacity");
        }

        for &(pod, req) in &sol.inbound_requests {
            ctx.warehouse
                .register_extract(pod, req)
                .expect("inbound availability was checked speculatively");
            ctx.dispatch.attach_to_pod_task(pod, req);
        }

        ctx.warehouse
            .claim_pod(sol.pod, Some(space.bot), ClaimReason::Extract)
            .expect("solution pods are unused by construction");
        for &req in &sol.new_pod_requests {
            ctx.warehouse
                .register_extract(sol.pod, req)
                .expect("new-pod availability was checked speculatively");
        }

        let task_id = ctx
            .dispatch
            .enqueue_extract(
                ctx.warehouse,
                space.bot,
                space.station,
                sol.pod,
                sol.new_pod_requests.clone(),
                true,
            )
            .expect("pod secured above");
        ctx.planner.record_scheduled_task(space.bot, task_id);
        observer.on_single_pod(space.station, sol.pod);
    }
}

impl SearchSpace {
    /// Drop points whose pod is no longer unused and refresh the CDF.
    fn retain_unused(&mut self, w: &Warehouse) {
        let before = self.points.len();
        self.points.retain(|p| w.pod(p.pod).is_unused());
        if self.points.len() != before {
            self.rebuild_cdf();
        }
    }

    fn rebuild_cdf(&mut self) {
        self.cdf.clear();
        let total: f64 = self.points.iter().map(|p| p.rate).sum();
        if total <= 0.0 {
            return;
        }
        let mut acc = 0.0;
        for p in &self.points {
            acc += p.rate;
            self.cdf.push(acc / total);
        }
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

/// Backlog orders (late first) that become fully fulfillable at `station`
/// with `pod` added to its inbound inventory, bounded by free order slots.
/// Returns the orders and their total unit count.
fn fulfillable_orders(
    w: &Warehouse,
    orders: &OrderBook,
    station: StationId,
    pod: PodId,
) -> (Vec<OrderId>, u32) {
    let mut remain = w.station_inbound_availability(station);
    for (item, avail) in w.pod(pod).available_items() {
        *remain.entry(item).or_insert(0) += avail;
    }

    let mut out = Vec::new();
    let mut items = 0u32;
    let mut slots = w.station(station).remaining_capacity();
    for backlog in [Backlog::Late, Backlog::NotLate] {
        for order in orders.candidates(w, backlog) {
            if slots == 0 {
                break;
            }
            let coverable = w
                .order(order)
                .open_positions()
                .all(|(item, open)| remain.get(&item).copied().unwrap_or(0) >= open);
            if !coverable {
                continue;
            }
            for (item, open) in w.order(order).open_positions() {
                if let Some(r) = remain.get_mut(&item) {
                    *r -= open.min(*r);
                }
                items += open;
            }
            out.push(order);
            slots -= 1;
        }
    }
    (out, items)
}
