//! Warehouse state-change events.
//!
//! The engine facade routes these to the dispatch layer, which uses them to
//! invalidate its situation-investigated flags (on-the-fly augmentation).

use rmfs_core::{BotId, OrderId, PodId, StationId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WarehouseEvent {
    /// An order left the backlog for a station's queue.
    OrderAllocated { order: OrderId, station: StationId },
    /// A bundle was assigned to an input station.
    BundleAllocated { station: StationId },
    /// A bot lifted a pod.
    PodPickup { pod: PodId, bot: BotId },
    /// An order's last position was served.
    OrderCompleted { order: OrderId, station: StationId },
}
