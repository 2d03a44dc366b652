//! The `Warehouse` arena: single owner of all entity state.
//!
//! Entities are stored in `Vec` arenas indexed by their typed IDs, so lookup
//! is `arena[id.index()]`.  IDs are handed out sequentially by the `add_*`
//! constructors and never reused.
//!
//! Cross-entity transitions (claiming pods, binding requests) live here so
//! that every site that could break an invariant is a checked method.

use std::collections::{BTreeSet, HashMap};

use rmfs_core::{BotId, ItemId, OrderId, PodId, SimTime, StationId, WaypointId};

use crate::bot::{Bot, BotPhysics};
use crate::order::Order;
use crate::pod::{ClaimReason, Pod, PodState};
use crate::request::{ExtractRequest, InsertRequest, RequestFilter};
use crate::station::{Station, StationKind};
use crate::{ModelError, ModelResult};

#[derive(Default)]
pub struct Warehouse {
    pods:     Vec<Pod>,
    bots:     Vec<Bot>,
    stations: Vec<Station>,
    orders:   Vec<Order>,

    /// Pods in storage and not claimed by anyone, selectable by the
    /// strategies.  Ordered for deterministic iteration.
    unused_pods: BTreeSet<PodId>,
}

impl Warehouse {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ──────────────────────────────────────────────────────

    pub fn add_pod(&mut self, waypoint: WaypointId, tier: u16, capacity: u32) -> PodId {
        let id = PodId(self.pods.len() as u32);
        self.pods.push(Pod::new(id, waypoint, tier, capacity));
        self.unused_pods.insert(id);
        id
    }

    pub fn add_bot(&mut self, waypoint: WaypointId, tier: u16, physics: BotPhysics) -> BotId {
        let id = BotId(self.bots.len() as u32);
        self.bots.push(Bot::new(id, waypoint, tier, physics));
        id
    }

    pub fn add_station(
        &mut self,
        kind: StationKind,
        waypoint: WaypointId,
        tier: u16,
        capacity: usize,
    ) -> StationId {
        let id = StationId(self.stations.len() as u32);
        self.stations.push(Station::new(id, kind, waypoint, tier, capacity));
        id
    }

    pub fn add_order(
        &mut self,
        positions: HashMap<ItemId, u32>,
        time_placed: SimTime,
        due_time: SimTime,
        time_submitted: SimTime,
    ) -> OrderId {
        let id = OrderId(self.orders.len() as u32);
        self.orders
            .push(Order::new(id, positions, time_placed, due_time, time_submitted));
        id
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn pod(&self, id: PodId) -> &Pod {
        &self.pods[id.index()]
    }

    #[inline]
    pub fn pod_mut(&mut self, id: PodId) -> &mut Pod {
        &mut self.pods[id.index()]
    }

    #[inline]
    pub fn bot(&self, id: BotId) -> &Bot {
        &self.bots[id.index()]
    }

    #[inline]
    pub fn bot_mut(&mut self, id: BotId) -> &mut Bot {
        &mut self.bots[id.index()]
    }

    #[inline]
    pub fn station(&self, id: StationId) -> &Station {
        &self.stations[id.index()]
    }

    #[inline]
    pub fn station_mut(&mut self, id: StationId) -> &mut Station {
        &mut self.stations[id.index()]
    }

    #[inline]
    pub fn order(&self, id: OrderId) -> &Order {
        &self.orders[id.index()]
    }

    #[inline]
    pub fn order_mut(&mut self, id: OrderId) -> &mut Order {
        &mut self.orders[id.index()]
    }

    pub fn pods(&self) -> &[Pod] {
        &self.pods
    }

    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station_ids(&self) -> impl Iterator<Item = StationId> + '_ {
        (0..self.stations.len() as u32).map(StationId)
    }

    pub fn bot_ids(&self) -> impl Iterator<Item = BotId> + '_ {
        (0..self.bots.len() as u32).map(BotId)
    }

    pub fn unused_pods(&self) -> &BTreeSet<PodId> {
        &self.unused_pods
    }

    // ── Pod claiming ──────────────────────────────────────────────────────

    /// Exclusively reserve an unused pod.  `by = None` marks a pod-set
    /// reservation that has no bot yet.
    pub fn claim_pod(
        &mut self,
        pod: PodId,
        by: Option<BotId>,
        reason: ClaimReason,
    ) -> ModelResult<()> {
        let p = &mut self.pods[pod.index()];
        if p.state != PodState::Unused {
            return Err(ModelError::PodNotUnused { pod });
        }
        p.state = PodState::Claimed { by, reason };
        self.unused_pods.remove(&pod);
        Ok(())
    }

    /// Return a claimed pod to the unused set.
    pub fn release_pod(&mut self, pod: PodId) -> ModelResult<()> {
        let p = &mut self.pods[pod.index()];
        match p.state {
            PodState::Claimed { .. } => {
                p.state = PodState::Unused;
                self.unused_pods.insert(pod);
                Ok(())
            }
            _ => Err(ModelError::PodNotClaimed { pod }),
        }
    }

    /// A claimed pod is lifted by `bot`.
    pub fn pickup_pod(&mut self, pod: PodId, bot: BotId) -> ModelResult<()> {
        let p = &mut self.pods[pod.index()];
        match p.state {
            PodState::Claimed { .. } => {
                p.state = PodState::Carried { by: bot };
                self.bots[bot.index()].carried_pod = Some(pod);
                Ok(())
            }
            _ => Err(ModelError::PodNotClaimed { pod }),
        }
    }

    /// A carried pod is set down at `at` and becomes unused again.
    pub fn setdown_pod(&mut self, pod: PodId, at: WaypointId) -> ModelResult<()> {
        let p = &mut self.pods[pod.index()];
        let PodState::Carried { by } = p.state else {
            return Err(ModelError::PodNotCarried { pod });
        };
        p.state = PodState::Unused;
        p.waypoint = at;
        self.bots[by.index()].carried_pod = None;
        self.unused_pods.insert(pod);
        Ok(())
    }

    // ── Request bookkeeping ───────────────────────────────────────────────

    /// Bind an extract request to `pod`: registers the unit on the pod and
    /// marks it in flight on the order.
    pub fn register_extract(&mut self, pod: PodId, req: ExtractRequest) -> ModelResult<()> {
        self.pods[pod.index()].register_item(req.item)?;
        if let Err(e) = self.orders[req.order.index()].bind_unit(req.item) {
            // Roll back the pod-side registration so the pair stays consistent.
            self.pods[pod.index()].unregister_item(req.item).ok();
            return Err(e);
        }
        Ok(())
    }

    /// Undo [`register_extract`][Self::register_extract].
    pub fn unregister_extract(&mut self, pod: PodId, req: ExtractRequest) -> ModelResult<()> {
        self.pods[pod.index()].unregister_item(req.item)?;
        self.orders[req.order.index()].unbind_unit(req.item)
    }

    /// The pick for `req` happened at the station.
    pub fn complete_extract(&mut self, pod: PodId, req: ExtractRequest) -> ModelResult<()> {
        self.pods[pod.index()].extract_item(req.item)?;
        self.orders[req.order.index()].serve_unit(req.item)
    }

    // ── Fitting-request materialization ───────────────────────────────────

    /// Extract requests `pod` could serve for `station`, bounded by the pod's
    /// available counts and the orders' open positions.
    ///
    /// Assigned orders are drained first; `filter` decides how queued orders
    /// participate.  Nothing is registered — this is a pure query used by
    /// scorers, selection, and on-the-fly augmentation.
    pub fn possible_extract_requests(
        &self,
        pod: PodId,
        station: StationId,
        filter: RequestFilter,
    ) -> Vec<ExtractRequest> {
        let s = &self.stations[station.index()];
        let mut avail = self.pods[pod.index()].available_map();
        let mut out = Vec::new();

        for &oid in &s.assigned_orders {
            fill_from_order(&self.orders[oid.index()], station, &mut avail, &mut out);
        }

        match filter {
            RequestFilter::AssignedOnly => {}
            RequestFilter::AssignedAndQueuedEqually => {
                for &oid in &s.queued_orders {
                    fill_from_order(&self.orders[oid.index()], station, &mut avail, &mut out);
                }
            }
            RequestFilter::AssignedAndCompleteQueued => {
                for &oid in &s.queued_orders {
                    let order = &self.orders[oid.index()];
                    let fits = order
                        .open_positions()
                        .all(|(item, open)| avail.get(&item).copied().unwrap_or(0) >= open);
                    if fits {
                        fill_from_order(order, station, &mut avail, &mut out);
                    }
                }
            }
        }

        out
    }

    /// Cheap check used to build candidate pools: does `pod` offer anything
    /// any of `station`'s orders still needs?
    pub fn has_relevant_extract_requests(&self, pod: PodId, station: StationId) -> bool {
        let s = &self.stations[station.index()];
        let p = &self.pods[pod.index()];
        s.assigned_orders
            .iter()
            .chain(s.queued_orders.iter())
            .any(|&oid| {
                self.orders[oid.index()]
                    .open_positions()
                    .any(|(item, _)| p.available(item) > 0)
            })
    }

    /// Insert requests `pod` could absorb at an input `station`, bounded by
    /// the pod's free capacity.  Bundles are taken in queue order.
    pub fn possible_insert_requests(&self, pod: PodId, station: StationId) -> Vec<InsertRequest> {
        let s = &self.stations[station.index()];
        let mut free = self.pods[pod.index()].free_capacity();
        let mut out = Vec::new();
        for &bundle in &s.pending_bundles {
            if bundle.count <= free {
                free -= bundle.count;
                out.push(bundle);
            }
        }
        out
    }

    pub fn has_relevant_insert_requests(&self, pod: PodId, station: StationId) -> bool {
        let free = self.pods[pod.index()].free_capacity();
        self.stations[station.index()]
            .pending_bundles
            .iter()
            .any(|b| b.count <= free)
    }

    // ── Aggregate inventory ───────────────────────────────────────────────

    /// Union of the available inventory across a station's inbound pods.
    pub fn station_inbound_availability(&self, station: StationId) -> HashMap<ItemId, u32> {
        let mut total: HashMap<ItemId, u32> = HashMap::new();
        for &pod in &self.stations[station.index()].inbound_pods {
            for (item, avail) in self.pods[pod.index()].available_items() {
                *total.entry(item).or_insert(0) += avail;
            }
        }
        total
    }
}

/// Drain one order's open positions against `avail`, pushing one request per
/// matched unit.
fn fill_from_order(
    order: &Order,
    station: StationId,
    avail: &mut HashMap<ItemId, u32>,
    out: &mut Vec<ExtractRequest>,
) {
    for (item, open) in order.open_positions() {
        let Some(a) = avail.get_mut(&item) else { continue };
        let take = open.min(*a);
        *a -= take;
        for _ in 0..take {
            out.push(ExtractRequest::new(item, order.id, Some(station)));
        }
    }
}
