//! Pods: movable storage shelves.
//!
//! A pod tracks two counts per item: `contained` (physically on the shelf)
//! and `registered` (reserved by an active extract request).  What selection
//! may still promise away is `available = contained − registered`.  The
//! registered count never exceeds the contained count; both transitions are
//! checked.

use std::collections::HashMap;

use rmfs_core::{BotId, ItemId, PodId, WaypointId};

use crate::{ModelError, ModelResult};

/// Why a pod was claimed.  Carried in the claim for diagnostics and
/// statistics (single-pod vs pod-set assignments).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClaimReason {
    Extract,
    Insert,
    /// Reserved as part of a pod set covering one order; dispensed later.
    PodSet,
}

/// Exclusive-ownership state of a pod.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PodState {
    /// Standing in storage, selectable.
    Unused,
    /// Reserved but not yet picked up.  `by` is `None` for pod-set
    /// reservations that have not been matched to a bot yet.
    Claimed { by: Option<BotId>, reason: ClaimReason },
    /// On a bot's back.
    Carried { by: BotId },
}

/// A movable shelf.
#[derive(Debug, Clone)]
pub struct Pod {
    pub id: PodId,
    /// Current (or storage) waypoint.  While carried, updated by the
    /// simulator to track the carrying bot.
    pub waypoint: WaypointId,
    pub tier: u16,
    /// Unit capacity of the shelf, for fill-level scoring.
    pub capacity: u32,
    pub state: PodState,

    contained:  HashMap<ItemId, u32>,
    registered: HashMap<ItemId, u32>,
}

impl Pod {
    pub fn new(id: PodId, waypoint: WaypointId, tier: u16, capacity: u32) -> Self {
        Self {
            id,
            waypoint,
            tier,
            capacity,
            state: PodState::Unused,
            contained:  HashMap::new(),
            registered: HashMap::new(),
        }
    }

    // ── Inventory queries ─────────────────────────────────────────────────

    #[inline]
    pub fn contained(&self, item: ItemId) -> u32 {
        self.contained.get(&item).copied().unwrap_or(0)
    }

    #[inline]
    pub fn registered(&self, item: ItemId) -> u32 {
        self.registered.get(&item).copied().unwrap_or(0)
    }

    /// Units of `item` not yet promised to any extract request.
    #[inline]
    pub fn available(&self, item: ItemId) -> u32 {
        self.contained(item) - self.registered(item)
    }

    /// Total units physically on the shelf.
    pub fn total_contained(&self) -> u32 {
        self.contained.values().sum()
    }

    /// Fill fraction in `[0, 1]`.  A zero-capacity pod reads as full.
    pub fn fill_level(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        f64::from(self.total_contained()) / f64::from(self.capacity)
    }

    /// Iterator over `(item, contained)` pairs physically on the shelf.
    pub fn contained_items(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.contained
            .iter()
            .filter_map(|(&item, &c)| (c > 0).then_some((item, c)))
    }

    /// Iterator over `(item, available)` pairs with at least one free unit.
    pub fn available_items(&self) -> impl Iterator<Item = (ItemId, u32)> + '_ {
        self.contained.iter().filter_map(|(&item, &c)| {
            let a = c - self.registered(item);
            (a > 0).then_some((item, a))
        })
    }

    /// Snapshot of the available inventory as an owned map.
    pub fn available_map(&self) -> HashMap<ItemId, u32> {
        self.available_items().collect()
    }

    pub fn free_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.total_contained())
    }

    // ── Inventory transitions ─────────────────────────────────────────────

    /// Stock `count` units of `item` (replenishment / initial fill).
    pub fn add_items(&mut self, item: ItemId, count: u32) {
        *self.contained.entry(item).or_insert(0) += count;
    }

    /// Reserve one unit of `item` for an extract request.
    pub fn register_item(&mut self, item: ItemId) -> ModelResult<()> {
        if self.available(item) == 0 {
            return Err(ModelError::RegisterWithoutStock { pod: self.id, item });
        }
        *self.registered.entry(item).or_insert(0) += 1;
        Ok(())
    }

    /// Undo one registration of `item` (request aborted).
    pub fn unregister_item(&mut self, item: ItemId) -> ModelResult<()> {
        match self.registered.get_mut(&item) {
            Some(r) if *r > 0 => {
                *r -= 1;
                Ok(())
            }
            _ => Err(ModelError::UnregisterWithoutRegistration { pod: self.id, item }),
        }
    }

    /// Consume one registered unit of `item`: the pick happened.
    pub fn extract_item(&mut self, item: ItemId) -> ModelResult<()> {
        if self.registered(item) == 0 {
            return Err(ModelError::UnregisterWithoutRegistration { pod: self.id, item });
        }
        *self.registered.get_mut(&item).unwrap() -= 1;
        *self.contained.get_mut(&item).unwrap() -= 1;
        Ok(())
    }

    // ── State helpers ─────────────────────────────────────────────────────

    #[inline]
    pub fn is_unused(&self) -> bool {
        self.state == PodState::Unused
    }

    pub fn carrier(&self) -> Option<BotId> {
        match self.state {
            PodState::Carried { by } => Some(by),
            _ => None,
        }
    }

    /// Total units currently registered across all items.
    pub fn total_registered(&self) -> u32 {
        self.registered.values().sum()
    }
}
