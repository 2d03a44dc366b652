//! Fully-supplied order management.
//!
//! Two backlogs, sorted by submission time: orders already past their due
//! time (`pending_late`) and the rest.  Allocation is **fully-supplied**: an
//! order leaves the backlog only when every one of its positions is covered
//! by inventory already inbound to the station (plus, for the `extra_*`
//! variants, a candidate new pod).  Covering units are registered on the
//! supplying pods immediately, so a later decision can never promise the
//! same unit twice.
//!
//! Failure to dress an order the coverage check admitted is stale inventory
//! accounting — a programmer error — and panics with a diagnostic dump.

use std::collections::HashMap;

use rmfs_core::{ItemId, OrderId, PodId, SimRng, SimTime, StationId};
use rmfs_model::{
    ExtractRequest, ModelResult, RequestFilter, StationKind, Warehouse, WarehouseEvent,
};

use crate::config::{FullySuppliedConfig, TieBreaker};

/// Which pending set an operation draws from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Backlog {
    Late,
    NotLate,
    /// Both sets merged by submission time (used when late orders get no
    /// head start).
    Both,
}

/// Result of one fully-supplied allocation round.
#[derive(Debug, Default)]
pub struct SupplyOutcome {
    /// Orders moved from the backlog to the station queue.
    pub orders: Vec<OrderId>,
    /// Units registered on inbound pods, for forwarding to carrying bots.
    pub pod_requests: Vec<(PodId, ExtractRequest)>,
}

/// Result of an `extra_decide_pending_orders` round.
#[derive(Debug, Default)]
pub struct ExtraSupplyOutcome {
    /// Orders moved from the backlog to the station queue.
    pub orders: Vec<OrderId>,
    /// Units claimed against the candidate new pod.
    pub new_pod_requests: Vec<ExtractRequest>,
    /// Units registered on inbound pods, for forwarding to carrying bots.
    pub inbound_requests: Vec<(PodId, ExtractRequest)>,
}

pub struct OrderBook {
    config: FullySuppliedConfig,
    pending_late: Vec<OrderId>,
    pending_not_late: Vec<OrderId>,
    late_orders_enough: bool,
    hadod: Option<HadodIndex>,
}

impl OrderBook {
    pub fn new(config: FullySuppliedConfig, with_hadod_index: bool) -> Self {
        Self {
            config,
            pending_late: Vec::new(),
            pending_not_late: Vec::new(),
            late_orders_enough: false,
            hadod: with_hadod_index.then(HadodIndex::default),
        }
    }

    // ── Backlog maintenance ───────────────────────────────────────────────

    /// Enter a new order into the proper backlog, keeping submission order.
    pub fn submit_order(&mut self, w: &Warehouse, order: OrderId, now: SimTime) {
        let list = if w.order(order).is_late(now) {
            &mut self.pending_late
        } else {
            &mut self.pending_not_late
        };
        let key = w.order(order).time_submitted;
        let pos = list.partition_point(|&o| w.order(o).time_submitted <= key);
        list.insert(pos, order);
    }

    /// Re-classify orders whose due time has passed and refresh the
    /// late-pressure flag.  Call once per engine update.
    pub fn tick(&mut self, w: &Warehouse, now: SimTime) {
        let mut i = 0;
        while i < self.pending_not_late.len() {
            let o = self.pending_not_late[i];
            if w.order(o).is_late(now) {
                self.pending_not_late.remove(i);
                let key = w.order(o).time_submitted;
                let pos = self
                    .pending_late
                    .partition_point(|&x| w.order(x).time_submitted <= key);
                self.pending_late.insert(pos, o);
            } else {
                i += 1;
            }
        }

        // Late pressure: the late backlog alone could fill every remaining
        // order slot in the warehouse.
        let open_slots: usize = w
            .stations()
            .iter()
            .filter(|s| s.kind == StationKind::Output)
            .map(|s| s.remaining_capacity())
            .sum();
        self.late_orders_enough =
            !self.pending_late.is_empty() && self.pending_late.len() >= open_slots;

        if let Some(h) = &mut self.hadod {
            h.rebuild(w);
        }
    }

    /// The concrete pending list.  `Both` has no single backing slice; use
    /// [`candidates`][Self::candidates] for the merged view.
    pub fn backlog(&self, which: Backlog) -> &[OrderId] {
        match which {
            Backlog::Late => &self.pending_late,
            Backlog::NotLate => &self.pending_not_late,
            Backlog::Both => panic!("merged backlog has no backing slice"),
        }
    }

    /// Candidate orders for allocation, oldest submission first.
    pub fn candidates(&self, w: &Warehouse, which: Backlog) -> Vec<OrderId> {
        match which {
            Backlog::Late => self.pending_late.clone(),
            Backlog::NotLate => self.pending_not_late.clone(),
            Backlog::Both => {
                let mut all: Vec<OrderId> = self
                    .pending_late
                    .iter()
                    .chain(&self.pending_not_late)
                    .copied()
                    .collect();
                all.sort_by_key(|&o| (w.order(o).time_submitted, o));
                all
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending_late.len() + self.pending_not_late.len()
    }

    pub fn late_orders_enough(&self) -> bool {
        self.late_orders_enough
    }

    pub fn hadod_index(&self) -> Option<&HadodIndex> {
        self.hadod.as_ref()
    }

    pub fn config(&self) -> &FullySuppliedConfig {
        &self.config
    }

    /// Open backlog demand per item (feeds the Demand scorer).
    pub fn demand_profile(&self, w: &Warehouse) -> HashMap<ItemId, u32> {
        let mut demand: HashMap<ItemId, u32> = HashMap::new();
        for &o in self.pending_late.iter().chain(&self.pending_not_late) {
            for (item, open) in w.order(o).open_positions() {
                *demand.entry(item).or_insert(0) += open;
            }
        }
        demand
    }

    // ── Allocation ────────────────────────────────────────────────────────

    /// Allocate every backlog order coverable from the station's inbound
    /// inventory, registering the covering units on the inbound pods.
    ///
    /// Deliberately cheap enough to be called from inside pod selection.
    pub fn fully_supplied(
        &mut self,
        w: &mut Warehouse,
        station: StationId,
        backlog: Backlog,
        rng: &mut SimRng,
        events: &mut Vec<WarehouseEvent>,
    ) -> SupplyOutcome {
        let mut outcome = SupplyOutcome::default();
        let mut remain = w.station_inbound_availability(station);

        while w.station(station).remaining_capacity() > 0 {
            let Some(order) = self.pick_coverable(w, backlog, &remain, rng) else {
                break;
            };

            consume(&mut remain, w.order(order).open_positions());
            self.allocate_order(w, order, station, events)
                .expect("capacity checked above");
            let inbound = w.station(station).inbound_pods.clone();
            let reqs = dress_order(w, order, station, &inbound);
            outcome.pod_requests.extend(reqs);
            outcome.orders.push(order);
        }

        if self.config.fast_lane && !outcome.orders.is_empty() {
            self.fast_lane(w, station, rng);
        }

        outcome
    }

    /// Like [`fully_supplied`][Self::fully_supplied], but the candidate
    /// `new_pod`'s availability counts toward coverage.  The outcome
    /// separates the units claimed against `new_pod` from those registered
    /// on already-inbound pods.
    ///
    /// # Panics
    /// Panics if no order ends up assigned — the caller must have verified
    /// that at least one backlog order is coverable.
    pub fn extra_decide_pending_orders(
        &mut self,
        w: &mut Warehouse,
        station: StationId,
        new_pod: PodId,
        backlog: Backlog,
        rng: &mut SimRng,
        events: &mut Vec<WarehouseEvent>,
    ) -> ExtraSupplyOutcome {
        let mut remain = w.station_inbound_availability(station);
        for (item, avail) in w.pod(new_pod).available_items() {
            *remain.entry(item).or_insert(0) += avail;
        }

        let mut outcome = ExtraSupplyOutcome::default();

        while w.station(station).remaining_capacity() > 0 {
            let Some(order) = self.pick_coverable(w, backlog, &remain, rng) else {
                break;
            };

            consume(&mut remain, w.order(order).open_positions());
            self.allocate_order(w, order, station, events)
                .expect("capacity checked above");
            // Inbound inventory first, the new pod last.
            let mut sources = w.station(station).inbound_pods.clone();
            sources.push(new_pod);
            for (pod, req) in dress_order(w, order, station, &sources) {
                if pod == new_pod {
                    outcome.new_pod_requests.push(req);
                } else {
                    outcome.inbound_requests.push((pod, req));
                }
            }
            outcome.orders.push(order);
        }

        assert!(
            !outcome.orders.is_empty(),
            "extra_decide_pending_orders: no coverable order for {new_pod} at {station} \
             (stale inventory accounting)"
        );
        outcome
    }

    /// Pod-set allocation: assign exactly `necessary_order`, distributing its
    /// units across inbound pods first and then across `new_pods` in order.
    ///
    /// The returned map has one entry per pod that received at least one
    /// request — never an empty list.
    ///
    /// # Panics
    /// Panics if the order cannot be fully dressed from the given pods.
    pub fn extra_decide_pending_order(
        &mut self,
        w: &mut Warehouse,
        station: StationId,
        new_pods: &[PodId],
        necessary_order: OrderId,
        events: &mut Vec<WarehouseEvent>,
    ) -> HashMap<PodId, Vec<ExtractRequest>> {
        self.allocate_order(w, necessary_order, station, events)
            .expect("pod-set caller must reserve capacity first");

        let mut sources = w.station(station).inbound_pods.clone();
        sources.extend_from_slice(new_pods);
        let mut map: HashMap<PodId, Vec<ExtractRequest>> = HashMap::new();
        for (pod, req) in dress_order(w, necessary_order, station, &sources) {
            map.entry(pod).or_default().push(req);
        }
        debug_assert!(map.values().all(|v| !v.is_empty()));
        map
    }

    /// Move `order` from its backlog into the station queue, reserving one
    /// order slot and emitting [`WarehouseEvent::OrderAllocated`].
    pub fn allocate_order(
        &mut self,
        w: &mut Warehouse,
        order: OrderId,
        station: StationId,
        events: &mut Vec<WarehouseEvent>,
    ) -> ModelResult<()> {
        w.station_mut(station).reserve_slot()?;
        self.pending_late.retain(|&o| o != order);
        self.pending_not_late.retain(|&o| o != order);
        w.station_mut(station).queued_orders.push(order);
        events.push(WarehouseEvent::OrderAllocated { order, station });
        Ok(())
    }

    /// Exact inverse of [`allocate_order`][Self::allocate_order]: the order
    /// returns to its backlog and the slot is released.  Registered requests
    /// are the caller's responsibility.
    pub fn deallocate_order(
        &mut self,
        w: &mut Warehouse,
        order: OrderId,
        station: StationId,
        now: SimTime,
    ) -> ModelResult<()> {
        let st = w.station_mut(station);
        let Some(pos) = st.queued_orders.iter().position(|&o| o == order) else {
            return Err(rmfs_model::ModelError::OrderNotQueued { station, order });
        };
        st.queued_orders.remove(pos);
        st.release_slot()?;
        self.submit_order(w, order, now);
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// First coverable order in `backlog` under the configured tie breaker.
    fn pick_coverable(
        &self,
        w: &Warehouse,
        backlog: Backlog,
        remain: &HashMap<ItemId, u32>,
        rng: &mut SimRng,
    ) -> Option<OrderId> {
        let coverable: Vec<OrderId> = self
            .candidates(w, backlog)
            .into_iter()
            .filter(|&o| {
                w.order(o)
                    .open_positions()
                    .all(|(item, open)| remain.get(&item).copied().unwrap_or(0) >= open)
            })
            .collect();
        if coverable.is_empty() {
            return None;
        }
        match self.config.tie_breaker {
            // Backlogs are submission-sorted already.
            TieBreaker::Fcfs => coverable.first().copied(),
            TieBreaker::EarliestDueTime => {
                coverable.iter().copied().min_by_key(|&o| w.order(o).due_time)
            }
            TieBreaker::Random => rng.choose(&coverable).copied(),
        }
    }

    /// Fast lane: if one nearest inbound pod can cover a queued order by
    /// itself, move that order to the head of the queue.
    fn fast_lane(&mut self, w: &mut Warehouse, station: StationId, rng: &mut SimRng) {
        let st = w.station(station);
        let Some(&nearest) = st.inbound_pods.first() else {
            return;
        };
        // Inbound pods are kept in arrival order; the head of the multiset is
        // the pod that will reach the pick position first.
        let pod = w.pod(nearest);
        let candidates: Vec<OrderId> = st
            .queued_orders
            .iter()
            .copied()
            .filter(|&o| {
                w.order(o)
                    .unserved_positions()
                    .all(|(item, need)| pod.contained(item) >= need)
            })
            .collect();
        if candidates.is_empty() {
            return;
        }
        let chosen = match self.config.fast_lane_tie_breaker {
            TieBreaker::Fcfs => candidates[0],
            TieBreaker::EarliestDueTime => candidates
                .iter()
                .copied()
                .min_by_key(|&o| w.order(o).due_time)
                .unwrap(),
            TieBreaker::Random => *rng.choose(&candidates).unwrap(),
        };
        let st = w.station_mut(station);
        st.queued_orders.retain(|&o| o != chosen);
        st.queued_orders.insert(0, chosen);
    }
}

/// Register one unit at a time against `sources` in order until every open
/// position of `order` is covered.
///
/// # Panics
/// Panics with a diagnostic dump when the sources cannot cover the order —
/// the coverage check that admitted the order was run against stale state.
fn dress_order(
    w: &mut Warehouse,
    order: OrderId,
    station: StationId,
    sources: &[PodId],
) -> Vec<(PodId, ExtractRequest)> {
    let positions: Vec<(ItemId, u32)> = w.order(order).open_positions().collect();
    let mut out = Vec::new();
    for (item, open) in positions {
        let mut need = open;
        for &pod in sources {
            while need > 0 && w.pod(pod).available(item) > 0 {
                let req = ExtractRequest::new(item, order, Some(station));
                w.register_extract(pod, req)
                    .expect("availability checked in loop condition");
                out.push((pod, req));
                need -= 1;
            }
            if need == 0 {
                break;
            }
        }
        if need > 0 {
            panic!(
                "order {order} cannot be dressed at {station}: {need}×{item} uncovered; \
                 sources: {sources:?}, placed so far: {out:?}"
            );
        }
    }
    out
}

/// Subtract an order's open positions from a remaining-availability map.
fn consume(remain: &mut HashMap<ItemId, u32>, positions: impl Iterator<Item = (ItemId, u32)>) {
    for (item, open) in positions {
        if let Some(r) = remain.get_mut(&item) {
            *r -= open.min(*r);
        }
    }
}

// ── HADOD index ───────────────────────────────────────────────────────────────

/// Station → pod → hypothetical extract requests, rebuilt by
/// [`OrderBook::tick`] when the HADOD order manager is active.
///
/// Consumers snapshot a station's entry before iterating; the index is never
/// mutated mid-iteration.
#[derive(Default)]
pub struct HadodIndex {
    ziops: HashMap<StationId, Vec<(PodId, Vec<ExtractRequest>)>>,
}

impl HadodIndex {
    fn rebuild(&mut self, w: &Warehouse) {
        self.ziops.clear();
        for station in w.stations() {
            if station.kind != StationKind::Output {
                continue;
            }
            let mut entries = Vec::new();
            for &pod in w.unused_pods() {
                let reqs = w.possible_extract_requests(
                    pod,
                    station.id,
                    RequestFilter::AssignedAndQueuedEqually,
                );
                if !reqs.is_empty() {
                    entries.push((pod, reqs));
                }
            }
            if !entries.is_empty() {
                self.ziops.insert(station.id, entries);
            }
        }
    }

    /// Snapshot of the candidate pods (and their requests) for `station`.
    pub fn pods_for(&self, station: StationId) -> Vec<(PodId, Vec<ExtractRequest>)> {
        self.ziops.get(&station).cloned().unwrap_or_default()
    }
}
