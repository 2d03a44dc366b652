//! Customer orders.
//!
//! An order is a multiset of `item → required` positions.  Three counters
//! track each position's progress: `required` (fixed at creation), `served`
//! (picks completed), and `in_flight` (units bound to active extract
//! requests).  What allocation may still promise is
//! `open = required − served − in_flight`.

use std::collections::HashMap;

use rmfs_core::{ItemId, OrderId, SimTime};

use crate::{ModelError, ModelResult};

#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    /// When the customer placed the order.
    pub time_placed: SimTime,
    /// Deadline; orders past it are late.
    pub due_time: SimTime,
    /// When the order entered the engine's backlog.
    pub time_submitted: SimTime,

    positions: HashMap<ItemId, u32>,
    served:    HashMap<ItemId, u32>,
    in_flight: HashMap<ItemId, u32>,
}

impl Order {
    pub fn new(
        id: OrderId,
        positions: HashMap<ItemId, u32>,
        time_placed: SimTime,
        due_time: SimTime,
        time_submitted: SimTime,
    ) -> Self {
        Self {
            id,
            time_placed,
            due_time,
            time_submitted,
            positions,
            served:    HashMap::new(),
            in_flight: HashMap::new(),
        }
    }

    // ── Position queries ──────────────────────────────────────────────────

    #[inline]
    pub fn required(&self, item: ItemId) -> u32 {
        self.positions.get(&item).copied().unwrap_or(0)
    }

    #[inline]
    pub fn served(&self, item: ItemId) -> u32 {
        self.served.get(&item).copied().unwrap_or(0)
    }

    #[inline]
    pub fn in_flight(&self, item: ItemId) -> u32 {
        self.in_flight.get(&item).copied().unwrap_or(0)
    }

    /// Units of `item` not yet served and not yet bound to a request.
    #[inline]
    pub fn open(&self, item: ItemId) -> u32 {
        self.required(item) - self.served(item) - self.in_flight(item)
    }

    /// Iterator over `(item, open)` pairs with open demand.
    pub fn open_positions(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.positions.keys().filter_map(|&item| {
            let o = self.open(item);
            (o > 0).then_some((item, o))
        })
    }

    /// Iterator over `(item, required − served)` pairs not fully served yet,
    /// regardless of in-flight requests.  Feasibility checks use this.
    pub fn unserved_positions(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.positions.keys().filter_map(|&item| {
            let u = self.required(item) - self.served(item);
            (u > 0).then_some((item, u))
        })
    }

    /// Total units across all positions.
    pub fn total_units(&self) -> u32 {
        self.positions.values().sum()
    }

    pub fn is_complete(&self) -> bool {
        self.positions
            .iter()
            .all(|(&item, &req)| self.served(item) >= req)
    }

    // ── Progress transitions ──────────────────────────────────────────────

    /// Bind one unit of `item` to an extract request.
    pub fn bind_unit(&mut self, item: ItemId) -> ModelResult<()> {
        if self.open(item) == 0 {
            return Err(ModelError::BindExceedsOpen { order: self.id, item });
        }
        *self.in_flight.entry(item).or_insert(0) += 1;
        Ok(())
    }

    /// Release one bound unit (request aborted).
    pub fn unbind_unit(&mut self, item: ItemId) -> ModelResult<()> {
        match self.in_flight.get_mut(&item) {
            Some(f) if *f > 0 => {
                *f -= 1;
                Ok(())
            }
            _ => Err(ModelError::UnbindWithoutBinding { order: self.id, item }),
        }
    }

    /// Complete one bound unit: the pick happened.
    pub fn serve_unit(&mut self, item: ItemId) -> ModelResult<()> {
        if self.in_flight(item) == 0 {
            return Err(ModelError::UnbindWithoutBinding { order: self.id, item });
        }
        *self.in_flight.get_mut(&item).unwrap() -= 1;
        *self.served.entry(item).or_insert(0) += 1;
        Ok(())
    }

    // ── Timing ────────────────────────────────────────────────────────────

    /// Seconds the order has been waiting since submission.
    #[inline]
    pub fn time_stay(&self, now: SimTime) -> f64 {
        now.since(self.time_submitted)
    }

    #[inline]
    pub fn is_late(&self, now: SimTime) -> bool {
        self.due_time < now
    }
}
