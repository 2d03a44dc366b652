//! Pod selection strategies.
//!
//! Every strategy answers the same question — which pod should this bot
//! fetch for this station — through `do_extract_for_station` /
//! `do_store_for_station`.  The carried-pod preamble and pod-set handling
//! are shared; the strategies only differ in how a *new* pod is picked for
//! an empty-handed bot:
//!
//! - **Default**: lexicographic scorer tournament over relevant unused pods.
//! - **FullyDemand**: maximize fully-fulfillable backlog orders; fall back
//!   to a multi-pod set when no single pod suffices.
//! - **Hadod**: cheapest composed path distance over the HADOD index.
//! - **SimulatedAnnealing**: dispense what the optimizer prepared, or run
//!   the greedy FullyDemand variant between updates.

use std::collections::{HashMap, VecDeque};

use rmfs_core::{BotId, ItemId, PodId, SimRng, SimTime, StationId};
use rmfs_graph::WaypointGraph;
use rmfs_model::{RequestFilter, StationKind, Warehouse, WarehouseEvent};
use rmfs_plan::Planner;
use rmfs_score::{BestOf, Candidate, Objective, ScorerStack, SelectionEnv};

use crate::config::{ControlConfig, PodSelectionKind};
use crate::observer::ControlObserver;
use crate::orderbook::{Backlog, OrderBook};
use crate::{ControlResult, Dispatch};

/// What a selection round produced for the requesting bot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    TaskEnqueued,
    ParkPodEnqueued,
    NoTask,
}

/// Borrow bundle threaded through every decision call.  All fields are
/// disjoint pieces of engine state, so one `&mut` context hands out split
/// borrows without ceremony.
pub struct DecisionCtx<'a> {
    pub warehouse: &'a mut Warehouse,
    pub graph: &'a WaypointGraph,
    pub planner: &'a mut Planner,
    pub rng: &'a mut SimRng,
    pub orders: &'a mut OrderBook,
    pub dispatch: &'a mut Dispatch,
    pub events: &'a mut Vec<WarehouseEvent>,
    pub now: SimTime,
}

/// Counters surfaced through the observer / engine statistics.
#[derive(Copy, Clone, Debug, Default)]
pub struct SelectorStats {
    pub single_pod_assignments: u64,
    pub pod_set_assignments: u64,
}

pub struct PodSelector {
    kind: PodSelectionKind,
    sa_greedy: bool,
    extend_radius: f64,

    pod_output_stack: ScorerStack,
    pod_input_stack: ScorerStack,
    station_output_stack: ScorerStack,
    station_input_stack: ScorerStack,

    /// Pod-set leftovers per station, dispensed on subsequent bot requests.
    pending_pods: HashMap<StationId, VecDeque<(PodId, Vec<rmfs_model::ExtractRequest>)>>,

    stats: SelectorStats,
}

impl PodSelector {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            kind: config.pod_selection,
            sa_greedy: config.sa.greedy_method,
            extend_radius: config.extend_radius,
            pod_output_stack: ScorerStack::new(config.roles.pod_for_output_station_bot.clone()),
            pod_input_stack: ScorerStack::new(config.roles.pod_for_input_station_bot.clone()),
            station_output_stack: ScorerStack::new(
                config.roles.output_station_for_bot_with_pod.clone(),
            ),
            station_input_stack: ScorerStack::new(
                config.roles.input_station_for_bot_with_pod.clone(),
            ),
            pending_pods: HashMap::new(),
            stats: SelectorStats::default(),
        }
    }

    pub fn stats(&self) -> SelectorStats {
        self.stats
    }

    pub fn has_pending_pods(&self, station: StationId) -> bool {
        self.pending_pods
            .get(&station)
            .is_some_and(|q| !q.is_empty())
    }

    pub(crate) fn queue_pending_pod(
        &mut self,
        station: StationId,
        pod: PodId,
        requests: Vec<rmfs_model::ExtractRequest>,
    ) {
        self.pending_pods
            .entry(station)
            .or_default()
            .push_back((pod, requests));
    }

    // ── Extract side ──────────────────────────────────────────────────────

    /// Decide what `bot` should do for output `station`.
    ///
    /// Preamble: a carried pod is recycled at this station if it still has
    /// relevant work, offered to neighbor stations within `radius` if
    /// `extend`, and parked otherwise.  Then the configured strategy picks a
    /// new pod.
    pub fn do_extract_for_station(
        &mut self,
        ctx: &mut DecisionCtx<'_>,
        observer: &mut dyn ControlObserver,
        bot: BotId,
        station: StationId,
        extend: bool,
        radius: f64,
    ) -> ControlResult<TaskOutcome> {
        // ── Carried-pod preamble ──────────────────────────────────────────
        if let Some(pod) = ctx.warehouse.bot(bot).carried_pod {
            let reqs = ctx.warehouse.possible_extract_requests(
                pod,
                station,
                RequestFilter::AssignedAndQueuedEqually,
            );
            if !reqs.is_empty() {
                ctx.dispatch
                    .enqueue_extract(ctx.warehouse, bot, station, pod, reqs, false)?;
                return Ok(TaskOutcome::TaskEnqueued);
            }

            if extend {
                if let Some(outcome) =
                    self.extend_to_neighbor(ctx, observer, bot, pod, station, radius)?
                {
                    return Ok(outcome);
                }
            }

            let park_at = ctx.warehouse.pod(pod).waypoint;
            ctx.dispatch.enqueue_park_pod(bot, pod, park_at);
            return Ok(TaskOutcome::ParkPodEnqueued);
        }

        // ── Pending pod-set dispensing ────────────────────────────────────
        if let Some(queue) = self.pending_pods.get_mut(&station) {
            if let Some((pod, reqs)) = queue.pop_front() {
                if queue.is_empty() {
                    self.pending_pods.remove(&station);
                }
                ctx.dispatch
                    .enqueue_extract(ctx.warehouse, bot, station, pod, reqs, true)?;
                return Ok(TaskOutcome::TaskEnqueued);
            }
        }

        // ── Strategy body ─────────────────────────────────────────────────
        match self.kind {
            PodSelectionKind::Default => self.select_default(ctx, observer, bot, station),
            PodSelectionKind::FullyDemand => {
                self.select_fully_demand(ctx, observer, bot, station)
            }
            PodSelectionKind::Hadod => self.select_hadod(ctx, observer, bot, station),
            PodSelectionKind::SimulatedAnnealing => {
                // The optimizer fills `pending_pods` on its own period; in
                // between, fall back to the greedy variant if configured.
                if self.sa_greedy {
                    self.select_fully_demand(ctx, observer, bot, station)
                } else {
                    Ok(TaskOutcome::NoTask)
                }
            }
        }
    }

    // ── Store side ────────────────────────────────────────────────────────

    /// Decide what `bot` should do for input `station`: symmetric to the
    /// extract side with insert requests and the narrower input stacks.
    pub fn do_store_for_station(
        &mut self,
        ctx: &mut DecisionCtx<'_>,
        observer: &mut dyn ControlObserver,
        bot: BotId,
        station: StationId,
        extend: bool,
        radius: f64,
    ) -> ControlResult<TaskOutcome> {
        if let Some(pod) = ctx.warehouse.bot(bot).carried_pod {
            let reqs = ctx.warehouse.possible_insert_requests(pod, station);
            if !reqs.is_empty() {
                ctx.dispatch
                    .enqueue_insert(ctx.warehouse, bot, station, pod, reqs)?;
                return Ok(TaskOutcome::TaskEnqueued);
            }
            if extend {
                let radius = if radius > 0.0 { radius } else { self.extend_radius };
                let demand = ctx.orders.demand_profile(ctx.warehouse);
                let neighbors: Vec<StationId> = {
                    let w = &*ctx.warehouse;
                    let origin = w.station(station).waypoint;
                    w.stations()
                        .iter()
                        .filter(|st| {
                            st.id != station
                                && st.kind == StationKind::Input
                                && ctx.graph.euclidean(origin, st.waypoint) <= radius
                                && w.has_relevant_insert_requests(pod, st.id)
                        })
                        .map(|st| st.id)
                        .collect()
                };
                if !neighbors.is_empty() {
                    let mut best =
                        BestOf::new(self.station_input_stack.len(), Objective::Minimize);
                    {
                        let stack = &self.station_input_stack;
                        let mut env = selection_env(ctx, &demand);
                        for st2 in neighbors {
                            best.reassess(Candidate { bot, pod, station: st2 }, |i, c| {
                                stack.score(i, &mut env, c)
                            });
                        }
                    }
                    let chosen = best.best().expect("neighbors was non-empty");
                    let reqs =
                        ctx.warehouse.possible_insert_requests(pod, chosen.station);
                    ctx.dispatch
                        .enqueue_insert(ctx.warehouse, bot, chosen.station, pod, reqs)?;
                    observer.on_assignment(
                        chosen.station,
                        bot,
                        pod,
                        &self.station_input_stack.record(best.best_scores()),
                    );
                    return Ok(TaskOutcome::TaskEnqueued);
                }
            }
            let park_at = ctx.warehouse.pod(pod).waypoint;
            ctx.dispatch.enqueue_park_pod(bot, pod, park_at);
            return Ok(TaskOutcome::ParkPodEnqueued);
        }

        if ctx.warehouse.station(station).pending_bundles.is_empty() {
            return Ok(TaskOutcome::NoTask);
        }

        let demand = ctx.orders.demand_profile(ctx.warehouse);
        let pool: Vec<PodId> = ctx
            .warehouse
            .unused_pods()
            .iter()
            .copied()
            .filter(|&p| ctx.warehouse.has_relevant_insert_requests(p, station))
            .collect();
        if pool.is_empty() {
            return Ok(TaskOutcome::NoTask);
        }

        let mut best = BestOf::new(self.pod_input_stack.len(), Objective::Minimize);
        {
            let stack = &self.pod_input_stack;
            let mut env = selection_env(ctx, &demand);
            for pod in pool {
                best.reassess(Candidate { bot, pod, station }, |i, c| {
                    stack.score(i, &mut env, c)
                });
            }
        }
        let chosen = best.best().expect("pool was non-empty");
        let reqs = ctx.warehouse.possible_insert_requests(chosen.pod, station);
        ctx.dispatch
            .enqueue_insert(ctx.warehouse, bot, station, chosen.pod, reqs)?;
        observer.on_assignment(
            station,
            bot,
            chosen.pod,
            &self.pod_input_stack.record(best.best_scores()),
        );
        self.stats.single_pod_assignments += 1;
        Ok(TaskOutcome::TaskEnqueued)
    }

    // ── Default strategy ──────────────────────────────────────────────────

    fn select_default(
        &mut self,
        ctx: &mut DecisionCtx<'_>,
        observer: &mut dyn ControlObserver,
        bot: BotId,
        station: StationId,
    ) -> ControlResult<TaskOutcome> {
        let demand = ctx.orders.demand_profile(ctx.warehouse);
        let pool: Vec<PodId> = ctx
            .warehouse
            .unused_pods()
            .iter()
            .copied()
            .filter(|&p| ctx.warehouse.has_relevant_extract_requests(p, station))
            .collect();
        if pool.is_empty() {
            return Ok(TaskOutcome::NoTask);
        }

        let mut best = BestOf::new(self.pod_output_stack.len(), Objective::Minimize);
        {
            let stack = &self.pod_output_stack;
            let mut env = selection_env(ctx, &demand);
            for pod in pool {
                best.reassess(Candidate { bot, pod, station }, |i, c| {
                    stack.score(i, &mut env, c)
                });
            }
        }
        let chosen = best.best().expect("pool was non-empty");

        let reqs = ctx.warehouse.possible_extract_requests(
            chosen.pod,
            station,
            RequestFilter::AssignedAndQueuedEqually,
        );
        ctx.dispatch
            .enqueue_extract(ctx.warehouse, bot, station, chosen.pod, reqs, false)?;
        observer.on_assignment(
            station,
            bot,
            chosen.pod,
            &self.pod_output_stack.record(best.best_scores()),
        );
        self.stats.single_pod_assignments += 1;
        Ok(TaskOutcome::TaskEnqueued)
    }

    // ── Fully-Demand strategy ─────────────────────────────────────────────

    fn select_fully_demand(
        &mut self,
        ctx: &mut DecisionCtx<'_>,
        observer: &mut dyn ControlObserver,
        bot: BotId,
        station: StationId,
    ) -> ControlResult<TaskOutcome> {
        let backlogs: &[Backlog] = if ctx.orders.late_orders_enough() {
            &[Backlog::Late]
        } else if ctx.orders.config().late_before_match {
            &[Backlog::Late, Backlog::NotLate]
        } else {
            &[Backlog::Both]
        };

        for &backlog in backlogs {
            // 1. Allocate whatever the inbound pods already cover.
            let supply =
                ctx.orders
                    .fully_supplied(ctx.warehouse, station, backlog, ctx.rng, ctx.events);
            for (pod, req) in supply.pod_requests {
                ctx.dispatch.attach_to_pod_task(pod, req);
            }
            if ctx.warehouse.station(station).remaining_capacity() == 0 {
                continue;
            }

            // 2. Best single pod by count of orders it makes fully
            //    fulfillable.  Ties fall to the lower pod id.
            let mut best: Option<(PodId, u32)> = None;
            for &pod in ctx.warehouse.unused_pods() {
                let n = count_fulfillable(ctx.warehouse, ctx.orders, station, pod, backlog);
                if n > 0 && best.is_none_or(|(_, bn)| n > bn) {
                    best = Some((pod, n));
                }
            }

            if let Some((pod, _)) = best {
                let extra = ctx.orders.extra_decide_pending_orders(
                    ctx.warehouse,
                    station,
                    pod,
                    backlog,
                    ctx.rng,
                    ctx.events,
                );
                for (inbound, req) in extra.inbound_requests {
                    ctx.dispatch.attach_to_pod_task(inbound, req);
                }
                // Top the trip up with work for already-resident orders.
                let mut reqs = extra.new_pod_requests;
                let more = ctx.warehouse.possible_extract_requests(
                    pod,
                    station,
                    RequestFilter::AssignedAndQueuedEqually,
                );
                for r in more {
                    ctx.warehouse.register_extract(pod, r)?;
                    reqs.push(r);
                }
                ctx.dispatch
                    .enqueue_extract(ctx.warehouse, bot, station, pod, reqs, true)?;
                observer.on_single_pod(station, pod);
                self.stats.single_pod_assignments += 1;
                return Ok(TaskOutcome::TaskEnqueued);
            }

            // 3. No single pod suffices: try a pod set.
            if let Some(outcome) =
                self.reserve_pod_set_for_order(ctx, observer, bot, station, backlog)?
            {
                return Ok(outcome);
            }
        }

        Ok(TaskOutcome::NoTask)
    }

    /// Shared pod-set helper: reserve a set of unused pods covering the
    /// oldest fulfillable backlog order, dispense the first to `bot`, and
    /// queue the rest in `pending_pods`.
    pub(crate) fn reserve_pod_set_for_order(
        &mut self,
        ctx: &mut DecisionCtx<'_>,
        observer: &mut dyn ControlObserver,
        bot: BotId,
        station: StationId,
        backlog: Backlog,
    ) -> ControlResult<Option<TaskOutcome>> {
        let w = &mut *ctx.warehouse;
        let inbound = w.station_inbound_availability(station);

        // Oldest backlog order coverable by inbound + all unused pods.
        let candidates: Vec<_> = ctx.orders.candidates(w, backlog);
        let mut chosen_order = None;
        for order in candidates {
            let mut pool = inbound.clone();
            for &pod in w.unused_pods() {
                for (item, avail) in w.pod(pod).available_items() {
                    *pool.entry(item).or_insert(0) += avail;
                }
            }
            let coverable = w
                .order(order)
                .open_positions()
                .all(|(item, open)| pool.get(&item).copied().unwrap_or(0) >= open);
            if coverable {
                chosen_order = Some(order);
                break;
            }
        }
        let Some(order) = chosen_order else {
            return Ok(None);
        };

        // What the inbound pods cannot cover must come from the set.
        let mut need: HashMap<ItemId, u32> = HashMap::new();
        for (item, open) in w.order(order).open_positions() {
            let rest = open.saturating_sub(inbound.get(&item).copied().unwrap_or(0));
            if rest > 0 {
                need.insert(item, rest);
            }
        }
        if need.is_empty() {
            // Inbound alone covers it; fully_supplied will catch it next
            // round, no set required.
            return Ok(None);
        }

        // Greedy cover: pods in descending order of items they contribute.
        let mut set: Vec<PodId> = Vec::new();
        while !need.is_empty() {
            let mut best: Option<(PodId, u32)> = None;
            for &pod in w.unused_pods() {
                if set.contains(&pod) {
                    continue;
                }
                let contribution: u32 = need
                    .iter()
                    .map(|(&item, &n)| n.min(w.pod(pod).available(item)))
                    .sum();
                if contribution > 0 && best.is_none_or(|(_, bc)| contribution > bc) {
                    best = Some((pod, contribution));
                }
            }
            let Some((pod, _)) = best else {
                // Coverability said yes; running out of contributors here is
                // stale accounting.
                return Ok(None);
            };
            for (item, n) in need.iter_mut() {
                *n -= (*n).min(w.pod(pod).available(*item));
            }
            need.retain(|_, n| *n > 0);
            set.push(pod);
        }

        // Claim the whole set bot-less, dress the order, dispense the first.
        for &pod in &set {
            w.claim_pod(pod, None, rmfs_model::ClaimReason::PodSet)?;
        }
        let mut map =
            ctx.orders
                .extra_decide_pending_order(w, station, &set, order, ctx.events);

        for (pod, reqs) in &map {
            if !set.contains(pod) {
                for &req in reqs {
                    ctx.dispatch.attach_to_pod_task(*pod, req);
                }
            }
        }

        let first = set[0];
        let first_reqs = map.remove(&first).unwrap_or_default();
        ctx.dispatch
            .enqueue_extract(w, bot, station, first, first_reqs, true)?;
        for &pod in &set[1..] {
            let reqs = map.remove(&pod).unwrap_or_default();
            self.queue_pending_pod(station, pod, reqs);
        }

        observer.on_pod_set(station, order, set.len());
        self.stats.pod_set_assignments += 1;
        Ok(Some(TaskOutcome::TaskEnqueued))
    }

    // ── HADOD strategy ────────────────────────────────────────────────────

    fn select_hadod(
        &mut self,
        ctx: &mut DecisionCtx<'_>,
        observer: &mut dyn ControlObserver,
        bot: BotId,
        station: StationId,
    ) -> ControlResult<TaskOutcome> {
        // Snapshot: the index must not be mutated while we walk it.
        let entries = match ctx.orders.hadod_index() {
            Some(index) => index.pods_for(station),
            None => return Ok(TaskOutcome::NoTask),
        };
        if entries.is_empty() {
            return Ok(TaskOutcome::NoTask);
        }

        let w = &*ctx.warehouse;
        let bot_wp = w.bot(bot).waypoint;
        let station_wp = w.station(station).waypoint;
        let mut best: Option<(PodId, f64)> = None;
        for (pod, _) in &entries {
            if !w.pod(*pod).is_unused() {
                continue;
            }
            let pod_wp = w.pod(*pod).waypoint;
            let d1 = ctx.graph.shortest_distance(bot_wp, pod_wp);
            let d2 = ctx.graph.shortest_distance(pod_wp, station_wp);
            let (Some(d1), Some(d2)) = (d1, d2) else { continue };
            let d = d1 + d2;
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((*pod, d));
            }
        }
        let Some((pod, _)) = best else {
            return Ok(TaskOutcome::NoTask);
        };

        // The indexed requests are hypothetical; re-materialize against live
        // inventory and register through the dispatch boundary.
        let reqs = ctx.warehouse.possible_extract_requests(
            pod,
            station,
            RequestFilter::AssignedAndQueuedEqually,
        );
        if reqs.is_empty() {
            return Ok(TaskOutcome::NoTask);
        }
        ctx.dispatch
            .enqueue_extract(ctx.warehouse, bot, station, pod, reqs, false)?;
        observer.on_single_pod(station, pod);
        self.stats.single_pod_assignments += 1;
        Ok(TaskOutcome::TaskEnqueued)
    }

    // ── Shared preamble pieces ────────────────────────────────────────────

    /// Tournament over neighbor output stations for a carried pod with no
    /// work left at its own station.
    fn extend_to_neighbor(
        &mut self,
        ctx: &mut DecisionCtx<'_>,
        observer: &mut dyn ControlObserver,
        bot: BotId,
        pod: PodId,
        station: StationId,
        radius: f64,
    ) -> ControlResult<Option<TaskOutcome>> {
        let radius = if radius > 0.0 { radius } else { self.extend_radius };
        let demand = ctx.orders.demand_profile(ctx.warehouse);
        let neighbors: Vec<StationId> = {
            let w = &*ctx.warehouse;
            let origin = w.station(station).waypoint;
            w.stations()
                .iter()
                .filter(|st| {
                    st.id != station
                        && st.kind == StationKind::Output
                        && ctx.graph.euclidean(origin, st.waypoint) <= radius
                        && w.has_relevant_extract_requests(pod, st.id)
                })
                .map(|st| st.id)
                .collect()
        };
        if neighbors.is_empty() {
            return Ok(None);
        }

        let mut best = BestOf::new(self.station_output_stack.len(), Objective::Minimize);
        {
            let stack = &self.station_output_stack;
            let mut env = selection_env(ctx, &demand);
            for st2 in neighbors {
                best.reassess(Candidate { bot, pod, station: st2 }, |i, c| {
                    stack.score(i, &mut env, c)
                });
            }
        }
        let chosen = best.best().expect("neighbors was non-empty");
        let reqs = ctx.warehouse.possible_extract_requests(
            pod,
            chosen.station,
            RequestFilter::AssignedAndQueuedEqually,
        );
        ctx.dispatch
            .enqueue_extract(ctx.warehouse, bot, chosen.station, pod, reqs, false)?;
        observer.on_assignment(
            chosen.station,
            bot,
            pod,
            &self.station_output_stack.record(best.best_scores()),
        );
        Ok(Some(TaskOutcome::TaskEnqueued))
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

/// Reborrow the scoring slice of a [`DecisionCtx`].
fn selection_env<'a>(
    ctx: &'a mut DecisionCtx<'_>,
    demand: &'a HashMap<ItemId, u32>,
) -> SelectionEnv<'a> {
    SelectionEnv {
        warehouse: ctx.warehouse,
        graph: ctx.graph,
        planner: ctx.planner,
        rng: ctx.rng,
        demand,
        now: ctx.now,
    }
}

/// How many `backlog` orders become fully fulfillable at `station` if `pod`
/// joins its inbound inventory.
fn count_fulfillable(
    w: &Warehouse,
    orders: &OrderBook,
    station: StationId,
    pod: PodId,
    backlog: Backlog,
) -> u32 {
    let mut remain = w.station_inbound_availability(station);
    for (item, avail) in w.pod(pod).available_items() {
        *remain.entry(item).or_insert(0) += avail;
    }

    let mut count = 0;
    let mut slots = w.station(station).remaining_capacity();
    for order in orders.candidates(w, backlog) {
        if slots == 0 {
            break;
        }
        let coverable = w
            .order(order)
            .open_positions()
            .all(|(item, open)| remain.get(&item).copied().unwrap_or(0) >= open);
        if coverable {
            for (item, open) in w.order(order).open_positions() {
                if let Some(r) = remain.get_mut(&item) {
                    *r -= open.min(*r);
                }
            }
            count += 1;
            slots -= 1;
        }
    }
    count
}

