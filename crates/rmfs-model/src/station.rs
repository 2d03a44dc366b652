//! Stations: fixed workstations at the edge of the storage area.
//!
//! Output stations extract items from pods to fulfill orders; input stations
//! store incoming bundles into pods.  Capacity counts **order slots** (output)
//! or bundle slots (input): `used` are slots occupied by orders being worked,
//! `reserved` are slots promised to allocated-but-not-yet-started orders.
//! `used + reserved ≤ capacity` always.

use rmfs_core::{OrderId, PodId, StationId, WaypointId};

use crate::request::InsertRequest;
use crate::{ModelError, ModelResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StationKind {
    /// Bundles go into pods.
    Input,
    /// Items come out of pods to fulfill orders.
    Output,
}

#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub kind: StationKind,
    pub waypoint: WaypointId,
    pub tier: u16,
    /// Order-slot capacity.
    pub capacity: usize,

    used:     usize,
    reserved: usize,

    /// Orders currently being picked, in working order.
    pub assigned_orders: Vec<OrderId>,
    /// Allocated orders waiting for a free slot, in allocation order.
    pub queued_orders: Vec<OrderId>,
    /// Pods physically queued at or en route to this station (multiset).
    pub inbound_pods: Vec<PodId>,
    /// Bundles waiting to be stored (input stations only).
    pub pending_bundles: Vec<InsertRequest>,

    /// Extract/insert requests enqueued against this station and not yet
    /// worked off.  Feeds queue-time estimates; not slot capacity.
    pub open_requests: usize,
}

impl Station {
    pub fn new(
        id: StationId,
        kind: StationKind,
        waypoint: WaypointId,
        tier: u16,
        capacity: usize,
    ) -> Self {
        Self {
            id,
            kind,
            waypoint,
            tier,
            capacity,
            used: 0,
            reserved: 0,
            assigned_orders: Vec::new(),
            queued_orders: Vec::new(),
            inbound_pods: Vec::new(),
            pending_bundles: Vec::new(),
            open_requests: 0,
        }
    }

    // ── Capacity ──────────────────────────────────────────────────────────

    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Slots neither used nor reserved.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.used - self.reserved
    }

    /// Reserve one order slot.  Fails rather than over-commit.
    pub fn reserve_slot(&mut self) -> ModelResult<()> {
        if self.used + self.reserved >= self.capacity {
            return Err(ModelError::CapacityExceeded { station: self.id });
        }
        self.reserved += 1;
        Ok(())
    }

    /// Release one reserved slot (order deallocated).
    pub fn release_slot(&mut self) -> ModelResult<()> {
        if self.reserved == 0 {
            return Err(ModelError::NoReservedSlot { station: self.id });
        }
        self.reserved -= 1;
        Ok(())
    }

    // ── Order lifecycle ───────────────────────────────────────────────────

    /// Move an order from the queue into active picking: its reserved slot
    /// becomes a used one.
    pub fn promote_order(&mut self, order: OrderId) -> ModelResult<()> {
        let Some(pos) = self.queued_orders.iter().position(|&o| o == order) else {
            return Err(ModelError::OrderNotQueued { station: self.id, order });
        };
        self.queued_orders.remove(pos);
        self.reserved -= 1;
        self.used += 1;
        self.assigned_orders.push(order);
        Ok(())
    }

    /// Retire a completed order and free its slot.
    pub fn complete_order(&mut self, order: OrderId) -> ModelResult<()> {
        let Some(pos) = self.assigned_orders.iter().position(|&o| o == order) else {
            return Err(ModelError::OrderNotAssigned { station: self.id, order });
        };
        self.assigned_orders.remove(pos);
        self.used -= 1;
        Ok(())
    }

    // ── Inbound pods ──────────────────────────────────────────────────────

    pub fn add_inbound_pod(&mut self, pod: PodId) {
        self.inbound_pods.push(pod);
    }

    /// Remove one occurrence of `pod` from the inbound multiset.
    pub fn remove_inbound_pod(&mut self, pod: PodId) -> ModelResult<()> {
        let Some(pos) = self.inbound_pods.iter().position(|&p| p == pod) else {
            return Err(ModelError::UnknownInboundPod { station: self.id, pod });
        };
        self.inbound_pods.remove(pos);
        Ok(())
    }

    pub fn has_inbound_pod(&self, pod: PodId) -> bool {
        self.inbound_pods.contains(&pod)
    }
}
